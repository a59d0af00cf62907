// crates/cp_geo/src/geocentric.rs

//! 地心坐标转换与七参数赫尔默特变换
//!
//! - 大地坐标 (λ, φ, h) ↔ 地心坐标 (X, Y, Z)
//! - 七参数赫尔默特（位置矢量约定，与 PROJ `+towgs84` 一致）

use crate::ellipsoid::Ellipsoid;
use crate::geometry::Point3D;
use serde::{Deserialize, Serialize};

/// 1 角秒对应的弧度
const ARCSEC_TO_RAD: f64 = std::f64::consts::PI / (180.0 * 3600.0);

/// 大地坐标 → 地心坐标
///
/// # Arguments
/// - `lon`, `lat`: 经纬度 (度)
/// - `h`: 椭球高 (米)
#[must_use]
pub fn geodetic_to_geocentric(ellipsoid: &Ellipsoid, lon: f64, lat: f64, h: f64) -> Point3D {
    let (sin_lat, cos_lat) = lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = lon.to_radians().sin_cos();
    let n = ellipsoid.prime_vertical_radius(lat.to_radians());

    Point3D::new(
        (n + h) * cos_lat * cos_lon,
        (n + h) * cos_lat * sin_lon,
        (n * (1.0 - ellipsoid.e2()) + h) * sin_lat,
    )
}

/// 地心坐标 → 大地坐标
///
/// 纬度迭代至 1e-14 弧度（约 0.06 nm），高程使用在极区也稳定的闭式表达。
/// 返回 (经度°, 纬度°, 椭球高 m)。
#[must_use]
pub fn geocentric_to_geodetic(ellipsoid: &Ellipsoid, p: Point3D) -> (f64, f64, f64) {
    const MAX_ITER: usize = 16;
    const TOL: f64 = 1e-14;

    let e2 = ellipsoid.e2();
    let rho = p.x.hypot(p.y);
    let lon = p.y.atan2(p.x);

    let mut lat = if rho == 0.0 {
        std::f64::consts::FRAC_PI_2.copysign(p.z)
    } else {
        p.z.atan2(rho * (1.0 - e2))
    };

    if rho != 0.0 {
        for _ in 0..MAX_ITER {
            let n = ellipsoid.prime_vertical_radius(lat);
            let h = rho * lat.cos() + p.z * lat.sin() - ellipsoid.a * (1.0 - e2 * lat.sin().powi(2)).sqrt();
            let next = p.z.atan2(rho * (1.0 - e2 * n / (n + h)));
            let delta = (next - lat).abs();
            lat = next;
            if delta < TOL {
                break;
            }
        }
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let h = rho * cos_lat + p.z * sin_lat - ellipsoid.a * (1.0 - e2 * sin_lat * sin_lat).sqrt();

    (lon.to_degrees(), lat.to_degrees(), h)
}

// ============================================================================
// 赫尔默特变换
// ============================================================================

/// 七参数赫尔默特变换（位置矢量约定）
///
/// 平移单位米，旋转单位角秒，尺度单位 ppm。三参数变换即旋转和尺度为零。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Helmert {
    /// X 平移 (m)
    pub tx: f64,
    /// Y 平移 (m)
    pub ty: f64,
    /// Z 平移 (m)
    pub tz: f64,
    /// X 旋转 (角秒)
    pub rx: f64,
    /// Y 旋转 (角秒)
    pub ry: f64,
    /// Z 旋转 (角秒)
    pub rz: f64,
    /// 尺度 (ppm)
    pub ds: f64,
}

impl Helmert {
    /// 零变换
    pub const NULL: Self = Self {
        tx: 0.0,
        ty: 0.0,
        tz: 0.0,
        rx: 0.0,
        ry: 0.0,
        rz: 0.0,
        ds: 0.0,
    };

    /// 三参数平移
    #[must_use]
    pub const fn translation(tx: f64, ty: f64, tz: f64) -> Self {
        Self {
            tx,
            ty,
            tz,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            ds: 0.0,
        }
    }

    /// 七参数
    #[must_use]
    pub const fn seven(tx: f64, ty: f64, tz: f64, rx: f64, ry: f64, rz: f64, ds: f64) -> Self {
        Self {
            tx,
            ty,
            tz,
            rx,
            ry,
            rz,
            ds,
        }
    }

    /// 从 `+towgs84` 参数列表创建（3 或 7 个值）
    #[must_use]
    pub fn from_towgs84(values: &[f64]) -> Option<Self> {
        match *values {
            [tx, ty, tz] => Some(Self::translation(tx, ty, tz)),
            [tx, ty, tz, rx, ry, rz, ds] => Some(Self::seven(tx, ty, tz, rx, ry, rz, ds)),
            _ => None,
        }
    }

    /// 是否只有平移
    #[must_use]
    pub fn is_translation(&self) -> bool {
        self.rx == 0.0 && self.ry == 0.0 && self.rz == 0.0 && self.ds == 0.0
    }

    /// 正向变换（源基准 → WGS 84）
    #[must_use]
    pub fn apply(&self, p: Point3D) -> Point3D {
        let (rx, ry, rz) = (
            self.rx * ARCSEC_TO_RAD,
            self.ry * ARCSEC_TO_RAD,
            self.rz * ARCSEC_TO_RAD,
        );
        let m = 1.0 + self.ds * 1e-6;
        Point3D::new(
            self.tx + m * (p.x - rz * p.y + ry * p.z),
            self.ty + m * (rz * p.x + p.y - rx * p.z),
            self.tz + m * (-ry * p.x + rx * p.y + p.z),
        )
    }

    /// 逆向变换（WGS 84 → 源基准）
    ///
    /// 使用旋转矩阵转置，小角度下误差远低于亚毫米。
    #[must_use]
    pub fn apply_inverse(&self, p: Point3D) -> Point3D {
        let (rx, ry, rz) = (
            self.rx * ARCSEC_TO_RAD,
            self.ry * ARCSEC_TO_RAD,
            self.rz * ARCSEC_TO_RAD,
        );
        let m = 1.0 + self.ds * 1e-6;
        let q = Point3D::new(
            (p.x - self.tx) / m,
            (p.y - self.ty) / m,
            (p.z - self.tz) / m,
        );
        Point3D::new(
            q.x + rz * q.y - ry * q.z,
            -rz * q.x + q.y + rx * q.z,
            ry * q.x - rx * q.y + q.z,
        )
    }

    /// PROJ `+towgs84=` 参数片段
    #[must_use]
    pub fn to_towgs84(&self) -> String {
        if self.is_translation() {
            format!("+towgs84={},{},{}", self.tx, self.ty, self.tz)
        } else {
            format!(
                "+towgs84={},{},{},{},{},{},{}",
                self.tx, self.ty, self.tz, self.rx, self.ry, self.rz, self.ds
            )
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
    fn test_geocentric_equator() {
        let p = geodetic_to_geocentric(&Ellipsoid::WGS84, 0.0, 0.0, 0.0);
        assert!((p.x - Ellipsoid::WGS84.a).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_geocentric_pole() {
        let e = Ellipsoid::WGS84;
        let p = geodetic_to_geocentric(&e, 0.0, 90.0, 100.0);
        assert!((p.z - (e.b() + 100.0)).abs() < 1e-6);

        let (_, lat, h) = geocentric_to_geodetic(&e, Point3D::new(0.0, 0.0, e.b() + 100.0));
        assert!((lat - 90.0).abs() < 1e-12);
        assert!((h - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_geocentric_roundtrip() {
        let e = Ellipsoid::WGS84;
        for (lon, lat, h) in [
            (2.2945, 48.8584, 35.0),
            (-74.0, 40.7, -20.0),
            (151.2, -33.9, 1200.0),
            (116.0, 89.9, 0.0),
        ] {
            let p = geodetic_to_geocentric(&e, lon, lat, h);
            let (lon2, lat2, h2) = geocentric_to_geodetic(&e, p);
            assert!((lon - lon2).abs() < 1e-11, "lon {lon} -> {lon2}");
            assert!((lat - lat2).abs() < 1e-11, "lat {lat} -> {lat2}");
            assert!((h - h2).abs() < 1e-6, "h {h} -> {h2}");
        }
    }

    #[test]
    fn test_helmert_inverse() {
        let osgb = Helmert::seven(446.448, -125.157, 542.06, 0.15, 0.247, 0.842, -20.489);
        let p = geodetic_to_geocentric(&Ellipsoid::AIRY_1830, -3.1883, 55.9533, 50.0);
        let back = osgb.apply_inverse(osgb.apply(p));
        assert!(back.distance(&p) < 1e-3);
    }

    #[test]
    fn test_towgs84_parse() {
        assert_eq!(
            Helmert::from_towgs84(&[-87.0, -98.0, -121.0]),
            Some(Helmert::translation(-87.0, -98.0, -121.0))
        );
        assert!(Helmert::from_towgs84(&[1.0, 2.0]).is_none());
        assert_eq!(
            Helmert::translation(1.0, 2.0, 3.0).to_towgs84(),
            "+towgs84=1,2,3"
        );
    }
}
