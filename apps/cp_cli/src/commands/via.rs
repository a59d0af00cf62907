// apps/cp_cli/src/commands/via.rs

//! 多跳转换命令

use super::print_json;
use anyhow::{bail, Context, Result};
use clap::Args;
use cp_transform::{SelectionHint, TransformService};

/// 多跳转换参数
#[derive(Args)]
pub struct ViaArgs {
    /// 节点序列，首个为源、末个为目标
    #[arg(required = true, num_args = 2..)]
    pub nodes: Vec<String>,

    /// 第一轴
    #[arg(long, allow_negative_numbers = true)]
    pub x: f64,

    /// 第二轴
    #[arg(long, allow_negative_numbers = true)]
    pub y: f64,

    /// 第三轴
    #[arg(long, allow_negative_numbers = true)]
    pub z: Option<f64>,

    /// 分段路径序号，格式 `<边>:<序号>`，可重复
    #[arg(long = "segment-index")]
    pub segment_index: Vec<String>,

    /// 分段偏好词，格式 `<边>:<偏好词>`，可重复
    #[arg(long = "segment-prefer")]
    pub segment_prefer: Vec<String>,
}

/// 执行多跳转换
pub fn execute(service: &TransformService, args: ViaArgs) -> Result<()> {
    let edges = args.nodes.len().saturating_sub(1);
    let mut hints: Vec<Option<SelectionHint>> = vec![None; edges];

    for spec in &args.segment_index {
        let (edge, value) = split_segment(spec, edges)?;
        let index = value
            .parse::<usize>()
            .with_context(|| format!("无效的路径序号: {spec}"))?;
        hints[edge].get_or_insert_with(SelectionHint::default).path_index = Some(index);
    }
    for spec in &args.segment_prefer {
        let (edge, term) = split_segment(spec, edges)?;
        hints[edge]
            .get_or_insert_with(SelectionHint::default)
            .preferred
            .push(term.to_string());
    }

    // 末尾无提示的边不必传入
    while matches!(hints.last(), Some(None)) {
        hints.pop();
    }

    let result = service
        .transform_via(&args.nodes, &hints, args.x, args.y, args.z)
        .context("多跳转换失败")?;
    print_json(&result)
}

fn split_segment(spec: &str, edges: usize) -> Result<(usize, &str)> {
    let Some((edge, value)) = spec.split_once(':') else {
        bail!("分段参数应为 <边>:<值>: {spec}");
    };
    let edge = edge
        .trim()
        .parse::<usize>()
        .with_context(|| format!("无效的边序号: {spec}"))?;
    if edge >= edges {
        bail!("边序号 {edge} 越界 (共 {edges} 条边)");
    }
    Ok((edge, value.trim()))
}
