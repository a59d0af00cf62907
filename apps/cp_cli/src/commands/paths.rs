// apps/cp_cli/src/commands/paths.rs

//! 路径查询命令

use super::print_json;
use anyhow::Result;
use clap::Args;
use cp_transform::TransformService;

/// 路径查询参数
#[derive(Args)]
pub struct PathsArgs {
    /// 源 CRS
    pub source: String,

    /// 目标 CRS
    pub target: String,

    /// 只显示当前会选用的操作
    #[arg(long)]
    pub selected: bool,
}

/// 执行路径查询
pub fn execute(service: &TransformService, args: PathsArgs) -> Result<()> {
    if args.selected {
        print_json(&service.operation_info(&args.source, &args.target)?)
    } else {
        print_json(&service.available_paths(&args.source, &args.target)?)
    }
}
