// crates/cp_geo/src/ellipsoid.rs

//! 椭球体定义
//!
//! 提供地球椭球体参数，支持 WGS84、GRS80、Airy 1830、International 1924 等标准椭球体，
//! 以及 PROJ 风格的 `+ellps=` 名称解析。
//!
//! # 示例
//!
//! ```
//! use cp_geo::ellipsoid::Ellipsoid;
//!
//! let wgs84 = Ellipsoid::WGS84;
//! assert!((wgs84.b() - 6_356_752.314_245).abs() < 1e-3);
//! assert_eq!(Ellipsoid::from_proj_name("airy"), Some(Ellipsoid::AIRY_1830));
//! ```

use serde::{Deserialize, Serialize};

/// 地球椭球体
///
/// 以长半轴和扁率定义，派生参数按需计算。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ellipsoid {
    /// 长半轴 (m)
    pub a: f64,
    /// 扁率 (flattening)
    pub f: f64,
}

impl Ellipsoid {
    // ========================================================================
    // 预定义椭球体
    // ========================================================================

    /// WGS84 椭球体 (EPSG:7030)
    pub const WGS84: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_223_563,
    };

    /// GRS80 椭球体 (EPSG:7019)，ETRS89、NAD83 使用
    pub const GRS80: Self = Self {
        a: 6_378_137.0,
        f: 1.0 / 298.257_222_101,
    };

    /// CGCS2000 椭球体 (EPSG:1024)
    ///
    /// 扁率与 GRS80 一致
    pub const CGCS2000: Self = Self::GRS80;

    /// Airy 1830 椭球体 (EPSG:7001)，OSGB36 使用
    pub const AIRY_1830: Self = Self {
        a: 6_377_563.396,
        f: 1.0 / 299.324_964_6,
    };

    /// International 1924 椭球体 (EPSG:7022)，ED50 使用
    pub const INTERNATIONAL_1924: Self = Self {
        a: 6_378_388.0,
        f: 1.0 / 297.0,
    };

    /// Clarke 1866 椭球体 (EPSG:7008)，NAD27 使用
    pub const CLARKE_1866: Self = Self {
        a: 6_378_206.4,
        f: 1.0 / 294.978_698_2,
    };

    /// 克拉索夫斯基椭球体 (EPSG:7024)
    pub const KRASSOVSKY: Self = Self {
        a: 6_378_245.0,
        f: 1.0 / 298.3,
    };

    // ========================================================================
    // 构造方法
    // ========================================================================

    /// 从长半轴和扁率创建椭球体
    #[must_use]
    pub const fn new(a: f64, f: f64) -> Self {
        Self { a, f }
    }

    /// 从长半轴和扁率倒数创建椭球体（`rf = 0` 表示正球体）
    #[must_use]
    pub fn from_inverse_flattening(a: f64, rf: f64) -> Self {
        let f = if rf == 0.0 { 0.0 } else { 1.0 / rf };
        Self { a, f }
    }

    /// 从长半轴和短半轴创建椭球体
    #[must_use]
    pub fn from_semi_axes(a: f64, b: f64) -> Self {
        Self { a, f: (a - b) / a }
    }

    /// 从长半轴和第一偏心率创建椭球体
    #[must_use]
    pub fn from_eccentricity(a: f64, e: f64) -> Self {
        let b = a * (1.0 - e * e).sqrt();
        Self::from_semi_axes(a, b)
    }

    /// 从 PROJ 椭球体名称获取（`+ellps=` 的取值）
    #[must_use]
    pub fn from_proj_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "wgs84" => Some(Self::WGS84),
            "grs80" => Some(Self::GRS80),
            "airy" => Some(Self::AIRY_1830),
            "intl" => Some(Self::INTERNATIONAL_1924),
            "clrk66" => Some(Self::CLARKE_1866),
            "krass" => Some(Self::KRASSOVSKY),
            _ => None,
        }
    }

    /// 对应的 PROJ 名称（用于序列化操作步骤）
    #[must_use]
    pub fn proj_name(&self) -> Option<&'static str> {
        [
            (Self::WGS84, "WGS84"),
            (Self::GRS80, "GRS80"),
            (Self::AIRY_1830, "airy"),
            (Self::INTERNATIONAL_1924, "intl"),
            (Self::CLARKE_1866, "clrk66"),
            (Self::KRASSOVSKY, "krass"),
        ]
        .into_iter()
        .find(|(e, _)| e == self)
        .map(|(_, name)| name)
    }

    /// PROJ 形式的椭球体参数片段
    #[must_use]
    pub fn to_proj_fragment(&self) -> String {
        match self.proj_name() {
            Some(name) => format!("+ellps={name}"),
            None if self.f == 0.0 => format!("+R={}", self.a),
            None => format!("+a={} +rf={}", self.a, 1.0 / self.f),
        }
    }

    // ========================================================================
    // 派生参数
    // ========================================================================

    /// 短半轴 b = a(1-f)
    #[inline]
    #[must_use]
    pub fn b(&self) -> f64 {
        self.a * (1.0 - self.f)
    }

    /// 第一偏心率的平方 e² = 2f - f²
    #[inline]
    #[must_use]
    pub fn e2(&self) -> f64 {
        self.f * (2.0 - self.f)
    }

    /// 第三扁率 n = f/(2-f)
    #[inline]
    #[must_use]
    pub fn n(&self) -> f64 {
        self.f / (2.0 - self.f)
    }

    /// 子午圈曲率半径 M = a(1-e²) / (1-e²sin²φ)^(3/2)
    #[inline]
    #[must_use]
    pub fn meridional_radius(&self, lat_rad: f64) -> f64 {
        let sin_lat = lat_rad.sin();
        let e2 = self.e2();
        self.a * (1.0 - e2) / (1.0 - e2 * sin_lat * sin_lat).powf(1.5)
    }

    /// 卯酉圈曲率半径 N = a / √(1-e²sin²φ)
    #[inline]
    #[must_use]
    pub fn prime_vertical_radius(&self, lat_rad: f64) -> f64 {
        let sin_lat = lat_rad.sin();
        self.a / (1.0 - self.e2() * sin_lat * sin_lat).sqrt()
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

impl std::fmt::Display for Ellipsoid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.f == 0.0 {
            write!(f, "Sphere(R={})", self.a)
        } else {
            write!(f, "Ellipsoid(a={}, f=1/{:.6})", self.a, 1.0 / self.f)
        }
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_parameters() {
        let e = Ellipsoid::WGS84;
        assert!((e.b() - 6_356_752.314_245).abs() < 0.001);
        assert!((e.e2() - 0.006_694_379_990_14).abs() < 1e-12);
    }

    #[test]
    fn test_airy_semi_minor() {
        // OS 手册给出 b = 6356256.909
        assert!((Ellipsoid::AIRY_1830.b() - 6_356_256.909).abs() < 0.001);
    }

    #[test]
    fn test_curvature_radius() {
        let e = Ellipsoid::WGS84;
        let m_equator = e.meridional_radius(0.0);
        let n_equator = e.prime_vertical_radius(0.0);
        assert!(n_equator > m_equator);
        assert!((n_equator - e.a).abs() < 1e-6);
    }

    #[test]
    fn test_proj_names() {
        assert_eq!(Ellipsoid::from_proj_name("intl"), Some(Ellipsoid::INTERNATIONAL_1924));
        assert_eq!(Ellipsoid::from_proj_name("GRS80"), Some(Ellipsoid::GRS80));
        assert_eq!(Ellipsoid::from_proj_name("bessel"), None);
        assert_eq!(Ellipsoid::AIRY_1830.to_proj_fragment(), "+ellps=airy");
        assert!(Ellipsoid::new(6_000_000.0, 0.0).to_proj_fragment().starts_with("+R="));
    }

    #[test]
    fn test_from_eccentricity() {
        let wgs = Ellipsoid::WGS84;
        let e = Ellipsoid::from_eccentricity(wgs.a, wgs.e2().sqrt());
        assert!((e.f - wgs.f).abs() < 1e-12);
    }
}
