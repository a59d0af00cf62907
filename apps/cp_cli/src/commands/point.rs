// apps/cp_cli/src/commands/point.rs

//! 单点转换命令

use super::print_json;
use anyhow::{Context, Result};
use clap::Args;
use cp_transform::{SelectionHint, TransformService};

/// 单点转换参数
#[derive(Args)]
pub struct PointArgs {
    /// 源 CRS（EPSG 代码、别名、WKT 或 PROJ 字符串）
    pub source: String,

    /// 目标 CRS
    pub target: String,

    /// 第一轴（经度或东坐标）
    #[arg(allow_negative_numbers = true)]
    pub x: f64,

    /// 第二轴（纬度或北坐标）
    #[arg(allow_negative_numbers = true)]
    pub y: f64,

    /// 第三轴（高程）
    #[arg(short, long, allow_negative_numbers = true)]
    pub z: Option<f64>,

    /// 显式路径序号（见 paths 命令）
    #[arg(long)]
    pub path_index: Option<usize>,

    /// 偏好词，可重复
    #[arg(long = "prefer")]
    pub preferred: Vec<String>,
}

/// 执行单点转换
pub fn execute(service: &TransformService, args: PointArgs) -> Result<()> {
    let hint = SelectionHint {
        path_index: args.path_index,
        preferred: args.preferred,
    };
    let result = service
        .transform_point_with_selection(&args.source, &args.target, args.x, args.y, args.z, &hint)
        .with_context(|| format!("{} → {} 转换失败", args.source, args.target))?;
    print_json(&result)
}
