// crates/cp_geo/src/crs.rs

//! 坐标参考系统 (CRS) 定义
//!
//! 一个 CRS 由三部分组成：
//! - 类型 [`CrsKind`]：二维/三维地理、地心、投影
//! - 基准 [`Datum`]：椭球体 + 到 WGS 84 的赫尔默特参数列表
//! - 可选的权威机构代码（如 `EPSG:4326`）
//!
//! # 示例
//!
//! ```
//! use cp_geo::crs::CrsDefinition;
//! use cp_geo::registry;
//!
//! let utm = registry::lookup(32631).unwrap();
//! assert!(utm.is_projected());
//! assert_eq!(utm.authority_code().as_deref(), Some("EPSG:32631"));
//! ```

use crate::ellipsoid::Ellipsoid;
use crate::geocentric::Helmert;
use crate::projection::Projection;
use serde::Serialize;
use std::fmt;

/// WGS 84 基准名称，作为所有赫尔默特参数的枢纽基准
pub const WGS84_DATUM_NAME: &str = "World Geodetic System 1984";

// ============================================================================
// 基准
// ============================================================================

/// 基准到 WGS 84 的一组转换参数
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatumShift {
    /// 转换名称（如 "OSGB36 to WGS 84 (6)"）
    pub description: String,
    /// 赫尔默特参数（源基准 → WGS 84）
    pub helmert: Helmert,
    /// 精度估计 (m)，`None` 表示未知
    pub accuracy: Option<f64>,
    /// 是否已被更新的参数取代
    pub superseded: bool,
}

impl DatumShift {
    /// 创建转换参数
    pub fn new(description: impl Into<String>, helmert: Helmert, accuracy: Option<f64>) -> Self {
        Self {
            description: description.into(),
            helmert,
            accuracy,
            superseded: false,
        }
    }

    /// 标记为已取代
    #[must_use]
    pub fn superseded(mut self) -> Self {
        self.superseded = true;
        self
    }
}

/// 大地基准
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Datum {
    /// 基准名称
    pub name: String,
    /// 椭球体
    pub ellipsoid: Ellipsoid,
    /// 到 WGS 84 的转换参数，按注册顺序排列
    pub shifts: Vec<DatumShift>,
}

impl Datum {
    /// 创建基准
    pub fn new(name: impl Into<String>, ellipsoid: Ellipsoid, shifts: Vec<DatumShift>) -> Self {
        Self {
            name: name.into(),
            ellipsoid,
            shifts,
        }
    }

    /// WGS 84 基准
    #[must_use]
    pub fn wgs84() -> Self {
        Self::new(WGS84_DATUM_NAME, Ellipsoid::WGS84, Vec::new())
    }

    /// 仅由椭球体定义、无转换参数的未知基准
    #[must_use]
    pub fn unknown(ellipsoid: Ellipsoid) -> Self {
        let label = ellipsoid
            .proj_name()
            .map_or_else(|| ellipsoid.to_string(), str::to_string);
        Self::new(format!("Unknown based on {label} ellipsoid"), ellipsoid, Vec::new())
    }

    /// 是否为 WGS 84
    #[must_use]
    pub fn is_wgs84(&self) -> bool {
        self.name == WGS84_DATUM_NAME
    }
}

// ============================================================================
// CRS 类型
// ============================================================================

/// CRS 类型
#[derive(Debug, Clone, PartialEq)]
pub enum CrsKind {
    /// 二维地理坐标（经度、纬度）
    Geographic2D,
    /// 三维地理坐标（经度、纬度、椭球高）
    Geographic3D,
    /// 地心直角坐标
    Geocentric,
    /// 投影坐标
    Projected {
        /// 投影换算名称（如 "UTM zone 31N"）
        conversion: String,
        /// 投影方法
        projection: Projection,
    },
}

/// 坐标单位元数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrsUnits {
    /// 水平单位名称
    pub horizontal: String,
    /// 水平单位到 SI 单位（弧度或米）的换算系数
    pub horizontal_factor: f64,
    /// 垂直单位名称
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical: Option<String>,
    /// 垂直单位换算系数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_factor: Option<f64>,
}

impl CrsUnits {
    fn degree(with_height: bool) -> Self {
        Self {
            horizontal: "degree".to_string(),
            horizontal_factor: std::f64::consts::PI / 180.0,
            vertical: with_height.then(|| "metre".to_string()),
            vertical_factor: with_height.then_some(1.0),
        }
    }

    fn metre(with_height: bool) -> Self {
        Self {
            horizontal: "metre".to_string(),
            horizontal_factor: 1.0,
            vertical: with_height.then(|| "metre".to_string()),
            vertical_factor: with_height.then_some(1.0),
        }
    }
}

// ============================================================================
// CRS 定义
// ============================================================================

/// 已解析的 CRS 定义
#[derive(Debug, Clone, PartialEq)]
pub struct CrsDefinition {
    /// 名称
    pub name: String,
    /// 权威机构与代码，如 `("EPSG", "4326")`
    pub authority: Option<(String, String)>,
    /// 类型
    pub kind: CrsKind,
    /// 基准
    pub datum: Datum,
}

impl CrsDefinition {
    /// 二维地理 CRS
    pub fn geographic_2d(name: impl Into<String>, datum: Datum) -> Self {
        Self::with_kind(name, CrsKind::Geographic2D, datum)
    }

    /// 三维地理 CRS
    pub fn geographic_3d(name: impl Into<String>, datum: Datum) -> Self {
        Self::with_kind(name, CrsKind::Geographic3D, datum)
    }

    /// 地心 CRS
    pub fn geocentric(name: impl Into<String>, datum: Datum) -> Self {
        Self::with_kind(name, CrsKind::Geocentric, datum)
    }

    /// 投影 CRS
    pub fn projected(
        name: impl Into<String>,
        datum: Datum,
        conversion: impl Into<String>,
        projection: Projection,
    ) -> Self {
        Self::with_kind(
            name,
            CrsKind::Projected {
                conversion: conversion.into(),
                projection,
            },
            datum,
        )
    }

    fn with_kind(name: impl Into<String>, kind: CrsKind, datum: Datum) -> Self {
        Self {
            name: name.into(),
            authority: None,
            kind,
            datum,
        }
    }

    /// 附加 EPSG 代码
    #[must_use]
    pub fn with_epsg(mut self, code: u32) -> Self {
        self.authority = Some(("EPSG".to_string(), code.to_string()));
        self
    }

    /// `"<authority>:<code>"` 形式的标识符
    #[must_use]
    pub fn authority_code(&self) -> Option<String> {
        self.authority
            .as_ref()
            .map(|(authority, code)| format!("{authority}:{code}"))
    }

    /// EPSG 代码
    #[must_use]
    pub fn epsg(&self) -> Option<u32> {
        match &self.authority {
            Some((authority, code)) if authority.eq_ignore_ascii_case("EPSG") => code.parse().ok(),
            _ => None,
        }
    }

    /// 是否为地理坐标系（二维或三维）
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        matches!(self.kind, CrsKind::Geographic2D | CrsKind::Geographic3D)
    }

    /// 是否为投影坐标系
    #[must_use]
    pub fn is_projected(&self) -> bool {
        matches!(self.kind, CrsKind::Projected { .. })
    }

    /// 是否为地心坐标系
    #[must_use]
    pub fn is_geocentric(&self) -> bool {
        matches!(self.kind, CrsKind::Geocentric)
    }

    /// 投影方法（仅投影坐标系）
    #[must_use]
    pub fn projection(&self) -> Option<&Projection> {
        match &self.kind {
            CrsKind::Projected { projection, .. } => Some(projection),
            _ => None,
        }
    }

    /// 椭球体
    #[must_use]
    pub fn ellipsoid(&self) -> Ellipsoid {
        self.datum.ellipsoid
    }

    /// 坐标单位
    #[must_use]
    pub fn units(&self) -> CrsUnits {
        match self.kind {
            CrsKind::Geographic2D => CrsUnits::degree(false),
            CrsKind::Geographic3D => CrsUnits::degree(true),
            CrsKind::Geocentric => CrsUnits::metre(true),
            CrsKind::Projected { .. } => CrsUnits::metre(false),
        }
    }

    /// PROJ 字符串形式
    #[must_use]
    pub fn to_proj_string(&self) -> String {
        let datum = self.datum_fragment();
        match &self.kind {
            CrsKind::Geographic2D | CrsKind::Geographic3D => {
                format!("+proj=longlat {datum} +no_defs")
            }
            CrsKind::Geocentric => format!("+proj=geocent {datum} +units=m +no_defs"),
            CrsKind::Projected { projection, .. } => match projection {
                Projection::WebMercator => format!("{} +units=m +no_defs", projection.to_proj_string()),
                Projection::TransverseMercator(tm) => {
                    let p = tm.params();
                    if let Some((zone, north)) = p.utm_zone() {
                        let south = if north { "" } else { " +south" };
                        return format!("+proj=utm +zone={zone}{south} {datum} +units=m +no_defs");
                    }
                    format!(
                        "+proj=tmerc +lat_0={} +lon_0={} +k={} +x_0={} +y_0={} {datum} +units=m +no_defs",
                        p.lat_origin, p.central_meridian, p.scale_factor, p.false_easting, p.false_northing
                    )
                }
            },
        }
    }

    fn datum_fragment(&self) -> String {
        let ellps = self.datum.ellipsoid.to_proj_fragment();
        if self.datum.is_wgs84() {
            return "+datum=WGS84".to_string();
        }
        match self.datum.shifts.iter().find(|s| !s.superseded) {
            Some(shift) => format!("{ellps} {}", shift.helmert.to_towgs84()),
            None => ellps,
        }
    }
}

impl fmt::Display for CrsDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.authority_code() {
            Some(code) => write!(f, "{} ({code})", self.name),
            None => f.write_str(&self.name),
        }
    }
}

// ============================================================================
// 测试
// ============================================================================
