// apps/cp_cli/src/commands/mod.rs

//! 子命令

pub mod factors;
pub mod offset;
pub mod paths;
pub mod point;
pub mod via;

use anyhow::{Context, Result};
use cp_transform::{ServiceConfig, TransformService};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 按配置文件创建服务
pub fn load_service(config: Option<&Path>) -> Result<TransformService> {
    let config = match config {
        Some(path) => {
            info!("加载配置: {}", path.display());
            ServiceConfig::from_file(path)
                .with_context(|| format!("无法加载配置文件 {}", path.display()))?
        }
        None => ServiceConfig::default(),
    };
    TransformService::new(Arc::new(cp_geo::BuiltinEngine::new()), config).context("无法创建转换服务")
}

/// 以缩进 JSON 输出
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
