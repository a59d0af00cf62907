//! Web Mercator 投影实现 (EPSG:3857)
//!
//! 也称为 Pseudo Mercator 或 Spherical Mercator。
//!
//! # 注意
//!
//! Web Mercator 将地球视为半径为 WGS84 长半轴的正球体。
//! 高纬度形变大，仅适用于底图对齐，不用于精密计算。

use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, GeoResult};
use std::f64::consts::PI;

/// Web Mercator 使用的地球半径（等于 WGS84 长半轴）
pub const WEB_MERCATOR_RADIUS: f64 = Ellipsoid::WGS84.a;

/// Web Mercator 最大纬度 (度)
///
/// 对应 y = ±20037508.34... 米
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779;

/// 地理坐标 → Web Mercator
///
/// 纬度裁剪到 ±[`WEB_MERCATOR_MAX_LAT`]。
///
/// # Errors
/// 纬度超出 [-90, 90] 时返回错误
pub fn forward(lon: f64, lat: f64) -> GeoResult<(f64, f64)> {
    GeoError::check_latitude(lat)?;
    let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);

    let x = WEB_MERCATOR_RADIUS * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    Ok((x, y))
}

/// Web Mercator → 地理坐标
///
/// # Errors
/// 输入为非有限数时返回错误
pub fn inverse(x: f64, y: f64) -> GeoResult<(f64, f64)> {
    if !x.is_finite() || !y.is_finite() {
        return Err(GeoError::projection_failed(
            "Web Mercator 逆向投影",
            format!("非有限输入 ({x}, {y})"),
        ));
    }
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    Ok((lon, lat))
}

/// 点比例因子 k = sec(φ)，子午线收敛角恒为 0
///
/// # Errors
/// 纬度超出 Web Mercator 有效范围时返回错误
pub fn factors(lat: f64) -> GeoResult<(f64, f64)> {
    if !(-WEB_MERCATOR_MAX_LAT..=WEB_MERCATOR_MAX_LAT).contains(&lat) {
        return Err(GeoError::coordinate_out_of_range(
            "纬度",
            lat,
            -WEB_MERCATOR_MAX_LAT,
            WEB_MERCATOR_MAX_LAT,
        ));
    }
    Ok((0.0, 1.0 / lat.to_radians().cos()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_mercator_roundtrip() {
        let (x, y) = forward(116.0, 40.0).expect("forward");
        let (lon, lat) = inverse(x, y).expect("inverse");
        assert!((lon - 116.0).abs() < 1e-9);
        assert!((lat - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_web_mercator_extent() {
        let (x, y) = forward(180.0, WEB_MERCATOR_MAX_LAT).expect("forward");
        assert!((x - PI * WEB_MERCATOR_RADIUS).abs() < 1e-6);
        assert!((y - PI * WEB_MERCATOR_RADIUS).abs() < 1.0);
    }

    #[test]
    fn test_web_mercator_factors() {
        let (gamma, k) = factors(60.0).expect("factors");
        assert_eq!(gamma, 0.0);
        assert!((k - 2.0).abs() < 1e-12);
        assert!(factors(89.0).is_err());
    }
}
