// apps/cp_cli/src/commands/factors.rs

//! 投影因子命令

use super::print_json;
use anyhow::Result;
use clap::Args;
use cp_transform::TransformService;

/// 投影因子参数
#[derive(Args)]
pub struct FactorsArgs {
    /// 投影 CRS
    pub crs: String,

    /// 经度 (度)
    #[arg(allow_negative_numbers = true)]
    pub lon: f64,

    /// 纬度 (度)
    #[arg(allow_negative_numbers = true)]
    pub lat: f64,
}

/// 执行投影因子计算
pub fn execute(service: &TransformService, args: FactorsArgs) -> Result<()> {
    print_json(&service.projection_factors(&args.crs, args.lon, args.lat)?)
}
