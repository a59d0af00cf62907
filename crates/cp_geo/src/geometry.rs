// crates/cp_geo/src/geometry.rs

//! 坐标类型定义
//!
//! - [`Coord`]: 操作输入输出的坐标，第三分量可选（2D/3D 统一表示）
//! - [`Point3D`]: 三维笛卡尔向量，用于地心坐标及其增量运算
//!
//! 地理坐标始终按 (经度, 纬度[, 椭球高]) 顺序存放，单位为度和米。

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

// ============================================================================
// Coord - 操作坐标
// ============================================================================

/// 操作坐标
///
/// `z` 为 `None` 表示二维输入，操作输出时仅在输入带高程或目标为地心系时给出 `z`。
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coord {
    /// 第一轴（经度或东坐标）
    pub x: f64,
    /// 第二轴（纬度或北坐标）
    pub y: f64,
    /// 第三轴（椭球高、地心 Z），可选
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Coord {
    /// 二维坐标
    #[inline]
    #[must_use]
    pub const fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// 三维坐标
    #[inline]
    #[must_use]
    pub const fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// 从可选高程创建
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: Option<f64>) -> Self {
        Self { x, y, z }
    }

    /// 所有存在的分量是否都为有限数（非 NaN、非 Inf）
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }

    /// 是否带第三分量
    #[inline]
    #[must_use]
    pub fn has_z(&self) -> bool {
        self.z.is_some()
    }
}

impl From<(f64, f64)> for Coord {
    fn from((x, y): (f64, f64)) -> Self {
        Self::xy(x, y)
    }
}

impl From<(f64, f64, f64)> for Coord {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self::xyz(x, y, z)
    }
}

// ============================================================================
// Point3D - 地心向量
// ============================================================================

/// 三维笛卡尔向量
///
/// # 示例
///
/// ```
/// use cp_geo::geometry::Point3D;
///
/// let origin = Point3D::new(4_200_000.0, 168_000.0, 4_780_000.0);
/// let moved = origin + Point3D::new(1.0, 0.0, 0.0);
/// assert!((moved.distance(&origin) - 1.0).abs() < 1e-9);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    /// X坐标
    pub x: f64,
    /// Y坐标
    pub y: f64,
    /// Z坐标
    pub z: f64,
}

impl Point3D {
    /// 零向量
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// 创建新的3D点
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// 向量长度
    #[inline]
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// 到另一点的距离
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        (*self - *other).length()
    }

    /// 判断是否为有限数
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// 转为三维操作坐标
    #[inline]
    #[must_use]
    pub const fn to_coord(self) -> Coord {
        Coord::xyz(self.x, self.y, self.z)
    }
}

impl Add for Point3D {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Point3D {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Point3D {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Point3D {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_finite() {
        assert!(Coord::xy(1.0, 2.0).is_finite());
        assert!(Coord::xyz(1.0, 2.0, 3.0).is_finite());
        assert!(!Coord::xyz(1.0, 2.0, f64::NAN).is_finite());
        assert!(!Coord::xy(f64::INFINITY, 2.0).is_finite());
    }

    #[test]
    fn test_coord_serde_skips_missing_z() {
        let json = serde_json::to_string(&Coord::xy(1.0, 2.0)).expect("serialize");
        assert_eq!(json, r#"{"x":1.0,"y":2.0}"#);
        let parsed: Coord = serde_json::from_str(r#"{"x":1.0,"y":2.0,"z":3.0}"#).expect("parse");
        assert_eq!(parsed, Coord::xyz(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_point_ops() {
        let a = Point3D::new(1.0, 2.0, 3.0);
        let b = Point3D::new(4.0, 6.0, 3.0);
        assert!(((b - a).length() - 5.0).abs() < 1e-12);
        assert_eq!(a + b, Point3D::new(5.0, 8.0, 6.0));
        assert_eq!(a * 2.0, Point3D::new(2.0, 4.0, 6.0));
    }
}
