//! 高精度横轴墨卡托投影（Karney 2011 算法）
//!
//! 基于 6 阶 Krüger 级数，精度可达亚毫米级，支持任意椭球体和非零纬度原点
//! （例如英国国家格网 `lat_0=49`）。
//!
//! # 参考文献
//!
//! Karney, C. F. F. (2011). "Transverse Mercator with an accuracy of a few nanometers".
//! Journal of Geodesy, 85(8), 475-485.

use super::math_utils::{ang_diff, ang_normalize, polyval, sincosd, tauf, taupf};
use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, GeoResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

// ============================================================================
// 系数表 (GeographicLib)
// ============================================================================

/// alpha 系数 (正向投影)
const ALPHA_COEFFS: [&[f64]; MAX_ORDER] = [
    &[31564.0, -66675.0, 34440.0, 47250.0, -100800.0, 75600.0, 151200.0],
    &[-1983433.0, 863232.0, 748608.0, -1161216.0, 524160.0, 1935360.0],
    &[670412.0, 406647.0, -533952.0, 184464.0, 725760.0],
    &[6601661.0, -7732800.0, 2230245.0, 7257600.0],
    &[-13675556.0, 3438171.0, 7983360.0],
    &[212378941.0, 319334400.0],
];

/// beta 系数 (逆向投影)
const BETA_COEFFS: [&[f64]; MAX_ORDER] = [
    &[384796.0, -382725.0, -6720.0, 932400.0, -1612800.0, 1209600.0, 2419200.0],
    &[-1118711.0, 1695744.0, -1174656.0, 258048.0, 80640.0, 3870720.0],
    &[22276.0, -16929.0, -15984.0, 12852.0, 362880.0],
    &[-830251.0, -158400.0, 197865.0, 7257600.0],
    &[-435388.0, 453717.0, 15966720.0],
    &[20648693.0, 638668800.0],
];

/// b1 系数（子午线弧长比例）
const B1_COEFFS: [f64; 5] = [1.0, 4.0, 64.0, 256.0, 256.0];

const MAX_ORDER: usize = 6;

// ============================================================================
// 投影参数
// ============================================================================

/// 横轴墨卡托投影参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransverseMercatorParams {
    /// 椭球体
    pub ellipsoid: Ellipsoid,
    /// 中央子午线 (度)
    pub central_meridian: f64,
    /// 纬度原点 (度)
    pub lat_origin: f64,
    /// 比例因子
    pub scale_factor: f64,
    /// 假东 (米)
    pub false_easting: f64,
    /// 假北 (米)
    pub false_northing: f64,
}

impl TransverseMercatorParams {
    /// UTM 参数
    #[must_use]
    pub fn utm(zone: u32, north: bool, ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            central_meridian: f64::from(zone) * 6.0 - 183.0,
            lat_origin: 0.0,
            scale_factor: 0.9996,
            false_easting: 500_000.0,
            false_northing: if north { 0.0 } else { 10_000_000.0 },
        }
    }

    /// 高斯-克吕格参数（比例因子 1，假东 500 km）
    #[must_use]
    pub fn gauss_kruger(central_meridian: f64, false_easting: f64, ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            central_meridian,
            lat_origin: 0.0,
            scale_factor: 1.0,
            false_easting,
            false_northing: 0.0,
        }
    }

    /// 英国国家格网参数（Airy 1830）
    #[must_use]
    pub fn british_national_grid() -> Self {
        Self {
            ellipsoid: Ellipsoid::AIRY_1830,
            central_meridian: -2.0,
            lat_origin: 49.0,
            scale_factor: 0.999_601_271_7,
            false_easting: 400_000.0,
            false_northing: -100_000.0,
        }
    }

    /// 参数符合 UTM 定义时返回 (带号, 是否北半球)
    #[must_use]
    #[allow(clippy::float_cmp, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn utm_zone(&self) -> Option<(u32, bool)> {
        if self.lat_origin != 0.0 || self.scale_factor != 0.9996 || self.false_easting != 500_000.0 {
            return None;
        }
        let north = match self.false_northing {
            n if n == 0.0 => true,
            n if n == 10_000_000.0 => false,
            _ => return None,
        };
        let zone = (self.central_meridian + 183.0) / 6.0;
        if zone.fract() != 0.0 || !(1.0..=60.0).contains(&zone) {
            return None;
        }
        Some((zone as u32, north))
    }
}

// ============================================================================
// 预计算投影
// ============================================================================

/// 预计算系数的横轴墨卡托投影
///
/// 系数只依赖椭球体，构造时计算一次，正反算复用。
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    params: TransverseMercatorParams,
    e2: f64,
    es: f64,
    e2m: f64,
    b1: f64,
    a1: f64,
    alp: [f64; MAX_ORDER],
    bet: [f64; MAX_ORDER],
    /// 纬度原点在中央子午线上的北坐标（未加假北）
    origin_northing: f64,
}

impl PartialEq for TransverseMercator {
    fn eq(&self, other: &Self) -> bool {
        self.params == other.params
    }
}

/// 正算中间结果
#[derive(Debug, Clone, Copy)]
struct Projected {
    x: f64,
    y: f64,
    /// 子午线收敛角 (度)
    gamma: f64,
    /// 点比例因子
    k: f64,
}

impl TransverseMercator {
    /// 从参数创建
    #[must_use]
    pub fn new(params: TransverseMercatorParams) -> Self {
        let f = params.ellipsoid.f;
        let e2 = f * (2.0 - f);
        let es = f.signum() * e2.abs().sqrt();
        let n = f / (2.0 - f);
        let n2 = n * n;

        let b1 = polyval(&B1_COEFFS[..B1_COEFFS.len() - 1], n2)
            / (B1_COEFFS[B1_COEFFS.len() - 1] * (1.0 + n));

        let mut alp = [0.0; MAX_ORDER];
        let mut bet = [0.0; MAX_ORDER];
        let mut d = n;
        for l in 0..MAX_ORDER {
            let ca = ALPHA_COEFFS[l];
            let cb = BETA_COEFFS[l];
            let m = ca.len() - 1;
            alp[l] = d * polyval(&ca[..m], n) / ca[m];
            bet[l] = d * polyval(&cb[..m], n) / cb[m];
            d *= n;
        }

        let mut tm = Self {
            params,
            e2,
            es,
            e2m: 1.0 - e2,
            b1,
            a1: b1 * params.ellipsoid.a,
            alp,
            bet,
            origin_northing: 0.0,
        };
        if params.lat_origin != 0.0 {
            tm.origin_northing = tm.project(params.central_meridian, params.lat_origin).y;
        }
        tm
    }

    /// 投影参数
    #[must_use]
    pub fn params(&self) -> &TransverseMercatorParams {
        &self.params
    }

    /// 正向投影：(经度, 纬度) → (东, 北)
    ///
    /// # Errors
    /// 纬度超出 [-90, 90] 时返回错误
    pub fn forward(&self, lon: f64, lat: f64) -> GeoResult<(f64, f64)> {
        GeoError::check_latitude(lat)?;
        let p = self.project(lon, lat);
        Ok((
            p.x + self.params.false_easting,
            p.y - self.origin_northing + self.params.false_northing,
        ))
    }

    /// 逆向投影：(东, 北) → (经度, 纬度)
    ///
    /// # Errors
    /// 输入为非有限数时返回错误
    pub fn inverse(&self, x: f64, y: f64) -> GeoResult<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(GeoError::projection_failed("逆向投影", format!("非有限输入 ({x}, {y})")));
        }
        let scale = self.a1 * self.params.scale_factor;
        let xi = (y - self.params.false_northing + self.origin_northing) / scale;
        let eta = (x - self.params.false_easting) / scale;

        let xisign = if xi.is_sign_negative() { -1.0 } else { 1.0 };
        let etasign = if eta.is_sign_negative() { -1.0 } else { 1.0 };
        let xi = xi.abs();
        let eta = eta.abs();

        let backside = xi > PI / 2.0;
        let xi = if backside { PI - xi } else { xi };

        let c0 = (2.0 * xi).cos();
        let ch0 = (2.0 * eta).cosh();
        let s0 = (2.0 * xi).sin();
        let sh0 = (2.0 * eta).sinh();
        let a = Complex64::new(2.0 * c0 * ch0, -2.0 * s0 * sh0);

        let mut y0 = Complex64::new(0.0, 0.0);
        let mut y1 = Complex64::new(0.0, 0.0);
        for j in (0..MAX_ORDER).rev() {
            let tmp = y0;
            y0 = a * y0 - y1 - self.bet[j];
            y1 = tmp;
        }

        let sin_zeta = Complex64::new(s0 * ch0, c0 * sh0);
        let zeta = Complex64::new(xi, eta) + sin_zeta * y0;
        let (xip, etap) = (zeta.re, zeta.im);

        let s = etap.sinh();
        let c = xip.cos().max(0.0);
        let r = s.hypot(c);

        let (mut lon, lat) = if r == 0.0 {
            (0.0, 90.0)
        } else {
            let tau = tauf(xip.sin() / r, self.es);
            (s.atan2(c).to_degrees(), tau.atan().to_degrees())
        };

        lon *= etasign;
        if backside {
            lon = 180.0 - lon;
        }

        Ok((
            ang_normalize(lon + self.params.central_meridian),
            lat * xisign,
        ))
    }

    /// 子午线收敛角 (度) 与点比例因子
    ///
    /// # Errors
    /// 纬度超出范围时返回错误
    pub fn factors(&self, lon: f64, lat: f64) -> GeoResult<(f64, f64)> {
        GeoError::check_latitude(lat)?;
        let p = self.project(lon, lat);
        Ok((p.gamma, p.k))
    }

    /// Clenshaw 求和的核心正算，不含假东假北与纬度原点偏移
    fn project(&self, lon: f64, lat: f64) -> Projected {
        let k0 = self.params.scale_factor;
        let lon_diff = ang_diff(self.params.central_meridian, lon);

        let latsign = if lat.is_sign_negative() { -1.0 } else { 1.0 };
        let lonsign = if lon_diff.is_sign_negative() { -1.0 } else { 1.0 };
        let lat = lat.abs();
        let lon_diff = lon_diff.abs();

        let backside = lon_diff > 90.0;
        let lon_diff = if backside { 180.0 - lon_diff } else { lon_diff };

        let (sphi, cphi) = sincosd(lat);
        let (slam, clam) = sincosd(lon_diff);

        let (xip, etap, mut gamma, mut k);
        if lat == 90.0 {
            xip = PI / 2.0;
            etap = 0.0;
            gamma = lon_diff;
            k = (1.0 + self.e2m.sqrt()) / 2.0 / self.e2m.sqrt().sqrt();
        } else {
            let tau = sphi / cphi;
            let taup = taupf(tau, self.es);
            xip = taup.atan2(clam);
            etap = (slam / taup.hypot(clam)).asinh();
            gamma = (slam * taup).atan2(clam * taup.hypot(1.0)).to_degrees();
            k = (self.e2m + self.e2 * cphi * cphi).sqrt() * tau.hypot(1.0) / taup.hypot(clam);
        }

        let c0 = (2.0 * xip).cos();
        let ch0 = (2.0 * etap).cosh();
        let s0 = (2.0 * xip).sin();
        let sh0 = (2.0 * etap).sinh();
        let a = Complex64::new(2.0 * c0 * ch0, -2.0 * s0 * sh0);

        let mut y0 = Complex64::new(0.0, 0.0);
        let mut y1 = Complex64::new(0.0, 0.0);
        let mut z0 = Complex64::new(0.0, 0.0);
        let mut z1 = Complex64::new(0.0, 0.0);
        for j in (0..MAX_ORDER).rev() {
            let (ty, tz) = (y0, z0);
            y0 = a * y0 - y1 + self.alp[j];
            z0 = a * z0 - z1 + (2 * (j + 1)) as f64 * self.alp[j];
            y1 = ty;
            z1 = tz;
        }

        let sin_zeta = Complex64::new(s0 * ch0, c0 * sh0);
        let yr = Complex64::new(xip, etap) + sin_zeta * y0;
        let zr = Complex64::new(1.0, 0.0) - z1 + (a / 2.0) * z0;

        let xi = if backside { PI - yr.re } else { yr.re };
        gamma -= zr.im.atan2(zr.re).to_degrees();
        k *= k0 * self.b1 * zr.norm();

        Projected {
            x: self.a1 * k0 * yr.im * lonsign,
            y: self.a1 * k0 * xi * latsign,
            gamma: gamma * latsign * lonsign,
            k,
        }
    }

    /// PROJ 字符串形式
    #[must_use]
    pub fn to_proj_string(&self) -> String {
        let p = &self.params;
        if let Some((zone, north)) = p.utm_zone() {
            let south = if north { "" } else { " +south" };
            return format!("+proj=utm +zone={zone}{south} {}", p.ellipsoid.to_proj_fragment());
        }
        format!(
            "+proj=tmerc +lat_0={} +lon_0={} +k={} +x_0={} +y_0={} {}",
            p.lat_origin,
            p.central_meridian,
            p.scale_factor,
            p.false_easting,
            p.false_northing,
            p.ellipsoid.to_proj_fragment()
        )
    }
}

// ============================================================================
// 测试
// ============================================================================
