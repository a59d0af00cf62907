//! 纯 Rust 实现的地图投影
//!
//! 支持的投影方法：
//! - 横轴墨卡托（UTM、高斯-克吕格、英国国家格网等），Karney (2011) 算法
//! - Web Mercator (EPSG:3857)
//!
//! # 示例
//!
//! ```
//! use cp_geo::ellipsoid::Ellipsoid;
//! use cp_geo::projection::{Projection, TransverseMercatorParams};
//!
//! let utm31 = Projection::transverse_mercator(TransverseMercatorParams::utm(31, true, Ellipsoid::WGS84));
//! let (x, y) = utm31.forward(2.2945, 48.8584).unwrap();
//! let (lon, lat) = utm31.inverse(x, y).unwrap();
//! assert!((lon - 2.2945).abs() < 1e-9 && (lat - 48.8584).abs() < 1e-9);
//! ```

pub mod math_utils;
pub mod transverse_mercator;
pub mod web_mercator;

pub use transverse_mercator::{TransverseMercator, TransverseMercatorParams};

use crate::ellipsoid::Ellipsoid;
use crate::error::GeoResult;
use std::fmt;

// ============================================================================
// 投影
// ============================================================================

/// 投影方法
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// 横轴墨卡托
    TransverseMercator(TransverseMercator),
    /// Web Mercator（球面）
    WebMercator,
}

impl Projection {
    /// 创建横轴墨卡托投影
    #[must_use]
    pub fn transverse_mercator(params: TransverseMercatorParams) -> Self {
        Self::TransverseMercator(TransverseMercator::new(params))
    }

    /// 正向投影：(经度, 纬度) → (东, 北)
    ///
    /// # Errors
    /// 坐标超出有效范围时返回错误
    #[inline]
    pub fn forward(&self, lon: f64, lat: f64) -> GeoResult<(f64, f64)> {
        match self {
            Self::TransverseMercator(tm) => tm.forward(lon, lat),
            Self::WebMercator => web_mercator::forward(lon, lat),
        }
    }

    /// 逆向投影：(东, 北) → (经度, 纬度)
    ///
    /// # Errors
    /// 输入无效时返回错误
    #[inline]
    pub fn inverse(&self, x: f64, y: f64) -> GeoResult<(f64, f64)> {
        match self {
            Self::TransverseMercator(tm) => tm.inverse(x, y),
            Self::WebMercator => web_mercator::inverse(x, y),
        }
    }

    /// 子午线收敛角 (度) 与点比例因子
    ///
    /// # Errors
    /// 坐标超出有效范围时返回错误
    pub fn factors(&self, lon: f64, lat: f64) -> GeoResult<(f64, f64)> {
        match self {
            Self::TransverseMercator(tm) => tm.factors(lon, lat),
            Self::WebMercator => web_mercator::factors(lat),
        }
    }

    /// 投影所在的椭球体（Web Mercator 为 WGS84）
    #[must_use]
    pub fn ellipsoid(&self) -> Ellipsoid {
        match self {
            Self::TransverseMercator(tm) => tm.params().ellipsoid,
            Self::WebMercator => Ellipsoid::WGS84,
        }
    }

    /// 方法名（EPSG 命名）
    #[must_use]
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::TransverseMercator(_) => "Transverse Mercator",
            Self::WebMercator => "Popular Visualisation Pseudo Mercator",
        }
    }

    /// PROJ 字符串形式
    #[must_use]
    pub fn to_proj_string(&self) -> String {
        match self {
            Self::TransverseMercator(tm) => tm.to_proj_string(),
            Self::WebMercator => {
                "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1".to_string()
            }
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

// ============================================================================
// 测试
// ============================================================================
