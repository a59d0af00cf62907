// apps/cp_cli/src/main.rs

//! CoordPath 命令行界面
//!
//! 单点转换、路径查询、多跳转换、局部偏移和投影因子，结果以 JSON 输出。

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// CoordPath 坐标转换命令行工具
#[derive(Parser)]
#[command(name = "cp_cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CRS transformation paths and local geodetic offsets", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// 服务配置文件 (JSON)，缺省使用内置配置
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 单点转换
    Point(commands::point::PointArgs),
    /// 列出可选路径
    Paths(commands::paths::PathsArgs),
    /// 沿给定节点多跳转换
    Via(commands::via::ViaArgs),
    /// 局部切平面偏移
    Offset(commands::offset::OffsetArgs),
    /// 投影因子
    Factors(commands::factors::FactorsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let service = commands::load_service(cli.config.as_deref())?;

    match cli.command {
        Commands::Point(args) => commands::point::execute(&service, args),
        Commands::Paths(args) => commands::paths::execute(&service, args),
        Commands::Via(args) => commands::via::execute(&service, args),
        Commands::Offset(args) => commands::offset::execute(&service, args),
        Commands::Factors(args) => commands::factors::execute(&service, args),
    }
}
