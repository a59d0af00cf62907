// crates/cp_geo/src/lib.rs
//! CoordPath 大地测量引擎
//!
//! 为转换路径服务提供 CRS 解析、候选操作和坐标系换算。
//!
//! # 模块
//!
//! - `ellipsoid`: 椭球体参数
//! - `geometry`: 坐标类型 (Coord, Point3D)
//! - `geocentric`: 大地/地心换算与赫尔默特变换
//! - `projection`: 横轴墨卡托、Web Mercator
//! - `crs`: CRS 定义（类型、基准、单位）
//! - `registry`: 内置 EPSG 注册表
//! - `identifier`: 标识符解析（EPSG、URN、WKT、PROJ 字符串）
//! - `operation`: 坐标操作
//! - `engine`: 引擎接口与内置实现
//!
//! # 示例
//!
//! ```
//! use cp_geo::prelude::*;
//!
//! let engine = BuiltinEngine::new();
//! let wgs84 = engine.resolve("EPSG:4326").unwrap();
//! let utm = engine.resolve("EPSG:32631").unwrap();
//! let op = engine.direct_operation(&wgs84, &utm).unwrap();
//! let out = op.apply(Coord::xy(2.2945, 48.8584)).unwrap();
//! assert!((out.x - 448_252.0).abs() < 1.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod crs;
pub mod ellipsoid;
pub mod engine;
pub mod error;
pub mod geocentric;
pub mod geometry;
pub mod identifier;
pub mod operation;
pub mod projection;
pub mod registry;

/// 预导入模块
pub mod prelude {
    pub use crate::crs::{CrsDefinition, CrsKind, CrsUnits, Datum, DatumShift};
    pub use crate::ellipsoid::Ellipsoid;
    pub use crate::engine::{BuiltinEngine, GeodeticEngine, ProjectionFactors};
    pub use crate::error::{GeoError, GeoResult};
    pub use crate::geometry::{Coord, Point3D};
    pub use crate::operation::{Operation, OperationStep};
}

// 重导出常用类型
pub use crs::{CrsDefinition, CrsKind, CrsUnits, Datum, DatumShift};
pub use ellipsoid::Ellipsoid;
pub use engine::{BuiltinEngine, GeodeticEngine, ProjectionFactors};
pub use error::{GeoError, GeoResult};
pub use geocentric::{geocentric_to_geodetic, geodetic_to_geocentric, Helmert};
pub use geometry::{Coord, Point3D};
pub use operation::{Operation, OperationStep};
