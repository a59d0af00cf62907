// apps/cp_cli/src/commands/offset.rs

//! 局部偏移命令

use super::print_json;
use anyhow::{bail, Context, Result};
use clap::Args;
use cp_transform::{LocalOffsetResult, ProjectedPosition, TransformService};
use serde::Serialize;

/// 局部偏移参数
#[derive(Args)]
pub struct OffsetArgs {
    /// 目标 CRS
    pub crs: String,

    /// 参考点经度 (度)
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// 参考点纬度 (度)
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// 参考点椭球高 (m)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub height: f64,

    /// 偏移量 `东,北,天` (m)，可重复
    #[arg(long = "enu", required = true, allow_hyphen_values = true)]
    pub offsets: Vec<String>,

    /// 同时输出比例因子近似及其与精确结果的差
    #[arg(long)]
    pub compare: bool,
}

#[derive(Serialize)]
struct OffsetOutput {
    east: f64,
    north: f64,
    up: f64,
    #[serde(flatten)]
    result: LocalOffsetResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    approximation: Option<ProjectedPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    drift: Option<f64>,
}

/// 执行局部偏移
pub fn execute(service: &TransformService, args: OffsetArgs) -> Result<()> {
    let offsets = args
        .offsets
        .iter()
        .map(String::as_str)
        .map(parse_enu)
        .collect::<Result<Vec<_>>>()?;

    let context = service
        .build_local_offset_context(&args.crs, args.lon, args.lat, args.height)
        .context("无法建立局部切平面")?;

    let mut outputs = Vec::with_capacity(offsets.len());
    for (east, north, up) in offsets {
        let result = service.local_offset(&context, east, north, up)?;
        let approximation = if args.compare {
            Some(service.approximate_local_offset(&context, east, north)?)
        } else {
            None
        };
        let drift = approximation
            .map(|a| (result.projected.x - a.x).hypot(result.projected.y - a.y));
        outputs.push(OffsetOutput {
            east,
            north,
            up,
            result,
            approximation,
            drift,
        });
    }
    print_json(&outputs)
}

fn parse_enu(s: &str) -> Result<(f64, f64, f64)> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("无效的偏移量: {s}"))?;
    match parts.as_slice() {
        [e, n] => Ok((*e, *n, 0.0)),
        [e, n, u] => Ok((*e, *n, *u)),
        _ => bail!("偏移量应为 东,北[,天]: {s}"),
    }
}
