// crates/cp_transform/src/lib.rs
//! CoordPath 转换路径服务
//!
//! 给定源、目标 CRS 标识，决定对坐标使用哪条大地测量操作管线。
//!
//! # 模块
//!
//! - `resolver`: 标识符规范化与别名
//! - `candidates`: 候选操作集的排序与选择顺序
//! - `cache`: 按选择键缓存成功的操作
//! - `executor`: 单点转换、回退与淘汰
//! - `chain`: 多跳转换链
//! - `offset`: 局部切平面 (ENU) 偏移
//! - `service`: 对外的统一入口
//! - `config`: 服务配置
//!
//! # 示例
//!
//! ```
//! use cp_transform::prelude::*;
//!
//! let service = TransformService::builtin().unwrap();
//! let r = service
//!     .transform_point("EPSG:4326", "EPSG:32631", 2.2945, 48.8584, None)
//!     .unwrap();
//! assert!((r.x - 448_252.0).abs() < 1.0);
//! assert!((r.y - 5_411_954.9).abs() < 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::too_many_arguments)]

pub mod cache;
pub mod candidates;
pub mod chain;
pub mod config;
pub mod error;
pub mod executor;
pub mod offset;
pub mod resolver;
pub mod service;

/// 预导入模块
pub mod prelude {
    pub use crate::chain::{ChainOutcome, ChainSpec, EdgeReport};
    pub use crate::config::{AliasConfig, ChainConfig, PairHintConfig, SelectionHint, ServiceConfig};
    pub use crate::error::{ConfigError, TransformError, TxResult};
    pub use crate::offset::{GeodeticPosition, LocalOffsetResult, ProjectedPosition, TangentPlaneContext};
    pub use crate::service::{
        OperationInfo, PathInfo, TrajectoryInput, TrajectoryPoint, TransformResult, TransformService,
    };
}

// 重导出常用类型
pub use cache::{OperationCache, SelectionKey};
pub use chain::{aggregate_accuracy, ChainOutcome, ChainRegistry, ChainSpec, EdgeReport};
pub use config::{AliasConfig, ChainConfig, PairHintConfig, SelectionHint, ServiceConfig};
pub use error::{ConfigError, TransformError, TxResult};
pub use executor::{Executed, Executor};
pub use offset::{GeodeticPosition, LocalOffsetResult, ProjectedPosition, TangentPlaneContext};
pub use resolver::CrsResolver;
pub use service::{OperationInfo, PathInfo, TrajectoryInput, TrajectoryPoint, TransformResult, TransformService};
