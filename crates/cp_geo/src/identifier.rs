// crates/cp_geo/src/identifier.rs

//! CRS 标识符解析
//!
//! 支持的形式：
//! - `EPSG:<code>`（大小写不敏感）
//! - `urn:ogc:def:crs:EPSG::<code>`
//! - WKT1 / WKT2：取最外层的 `AUTHORITY["EPSG","<code>"]` 或 `ID["EPSG",<code>]`
//! - PROJ 字符串（`+proj=...`）

use crate::crs::{CrsDefinition, Datum, DatumShift};
use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, GeoResult};
use crate::geocentric::Helmert;
use crate::projection::{web_mercator::WEB_MERCATOR_RADIUS, Projection, TransverseMercatorParams};
use crate::registry;
use std::collections::HashMap;

/// 标识符形式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier<'a> {
    /// EPSG 代码
    Epsg(u32),
    /// PROJ 字符串
    Proj(&'a str),
}

/// 识别标识符形式
///
/// # Errors
/// 无法识别或代码不是数字时返回 [`GeoError::CrsNotFound`]
pub fn classify(input: &str) -> GeoResult<Identifier<'_>> {
    let s = input.trim();
    if s.is_empty() {
        return Err(GeoError::crs_not_found(input, "空标识符"));
    }
    if s.starts_with('+') || s.contains("+proj=") {
        return Ok(Identifier::Proj(s));
    }
    if let Some(code) = strip_prefix_ignore_case(s, "EPSG:") {
        return parse_code(input, code).map(Identifier::Epsg);
    }
    if let Some(code) = strip_prefix_ignore_case(s, "urn:ogc:def:crs:EPSG::") {
        return parse_code(input, code).map(Identifier::Epsg);
    }
    if s.ends_with(']') {
        return wkt_epsg_code(s)
            .map(Identifier::Epsg)
            .ok_or_else(|| GeoError::crs_not_found(input, "WKT 缺少顶层 EPSG 标识"));
    }
    Err(GeoError::crs_not_found(input, "无法识别的标识符格式"))
}

/// 解析标识符为 CRS 定义
///
/// # Errors
/// 标识符无法识别、代码未注册或 PROJ 字符串无效时返回错误
pub fn resolve(input: &str) -> GeoResult<CrsDefinition> {
    match classify(input)? {
        Identifier::Epsg(code) => registry::lookup(code)
            .ok_or_else(|| GeoError::crs_not_found(input, format!("未注册的 EPSG 代码 {code}"))),
        Identifier::Proj(s) => parse_proj_string(s),
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}

fn parse_code(input: &str, code: &str) -> GeoResult<u32> {
    code.trim()
        .parse()
        .map_err(|_| GeoError::crs_not_found(input, format!("无效的 EPSG 代码 '{code}'")))
}

// ============================================================================
// WKT
// ============================================================================

/// 提取 WKT 最外层对象的 EPSG 代码
///
/// 嵌套对象（基准、椭球体、单位）也带有 AUTHORITY，只认深度为 1 的那个。
#[must_use]
pub fn wkt_epsg_code(wkt: &str) -> Option<u32> {
    let bytes = wkt.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut token_start = 0usize;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => in_string = !in_string,
            _ if in_string => {}
            b'[' | b'(' => {
                if depth == 1 {
                    let keyword = wkt[token_start..i].trim();
                    if keyword.eq_ignore_ascii_case("AUTHORITY") || keyword.eq_ignore_ascii_case("ID") {
                        if let Some(code) = authority_args(&wkt[i + 1..]) {
                            return Some(code);
                        }
                    }
                }
                depth += 1;
                token_start = i + 1;
            }
            b']' | b')' => {
                depth = depth.saturating_sub(1);
                token_start = i + 1;
            }
            b',' => token_start = i + 1,
            _ => {}
        }
    }
    None
}

/// 解析 `"EPSG","4326"]` 或 `"EPSG",4326]`
fn authority_args(rest: &str) -> Option<u32> {
    let end = rest.find([']', ')'])?;
    let mut parts = rest[..end].split(',').map(|p| p.trim().trim_matches('"'));
    let authority = parts.next()?;
    if !authority.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    parts.next()?.parse().ok()
}

// ============================================================================
// PROJ 字符串
// ============================================================================

/// 解析 PROJ 字符串
///
/// 支持 `longlat`/`latlong`/`utm`/`tmerc`/`merc`/`geocent`。
///
/// # Errors
/// 参数缺失或取值无效时返回 [`GeoError::CrsParseFailed`]
pub fn parse_proj_string(def: &str) -> GeoResult<CrsDefinition> {
    let params = ProjParams::parse(def)?;
    let datum = params.datum()?;
    let ellipsoid = datum.ellipsoid;

    let proj = params
        .get("proj")
        .ok_or_else(|| GeoError::crs_parse_failed(def, "缺少 +proj"))?;

    let crs = match proj {
        "longlat" | "latlong" | "lonlat" | "latlon" => CrsDefinition::geographic_2d("unknown", datum),
        "geocent" => CrsDefinition::geocentric("unknown", datum),
        "utm" => {
            let zone = params
                .get("zone")
                .ok_or_else(|| GeoError::crs_parse_failed(def, "utm 缺少 +zone"))?;
            let zone: u32 = zone
                .parse()
                .map_err(|_| GeoError::crs_parse_failed(def, format!("无效的 +zone={zone}")))?;
            GeoError::check_utm_zone(zone)?;
            let north = !params.has("south");
            let hemisphere = if north { 'N' } else { 'S' };
            CrsDefinition::projected(
                "unknown",
                datum,
                format!("UTM zone {zone}{hemisphere}"),
                Projection::transverse_mercator(TransverseMercatorParams::utm(zone, north, ellipsoid)),
            )
        }
        "tmerc" => {
            let tm = TransverseMercatorParams {
                ellipsoid,
                central_meridian: params.number("lon_0")?.unwrap_or(0.0),
                lat_origin: params.number("lat_0")?.unwrap_or(0.0),
                scale_factor: match params.number("k_0")? {
                    Some(k) => k,
                    None => params.number("k")?.unwrap_or(1.0),
                },
                false_easting: params.number("x_0")?.unwrap_or(0.0),
                false_northing: params.number("y_0")?.unwrap_or(0.0),
            };
            GeoError::check_latitude(tm.lat_origin)?;
            CrsDefinition::projected("unknown", datum, "Transverse Mercator", Projection::transverse_mercator(tm))
        }
        "merc" => {
            let spherical = ellipsoid.f == 0.0 && (ellipsoid.a - WEB_MERCATOR_RADIUS).abs() < 1e-6;
            let offsets_zero = ["lon_0", "x_0", "y_0", "lat_ts"]
                .iter()
                .map(|key| params.number(key))
                .collect::<GeoResult<Vec<_>>>()?
                .into_iter()
                .all(|v| v.unwrap_or(0.0) == 0.0);
            if !spherical || !offsets_zero {
                return Err(GeoError::crs_parse_failed(def, "merc 仅支持 Web Mercator 球面参数"));
            }
            let datum = Datum::wgs84();
            CrsDefinition::projected("unknown", datum, "Popular Visualisation Pseudo-Mercator", Projection::WebMercator)
        }
        other => {
            return Err(GeoError::crs_parse_failed(def, format!("不支持的投影 +proj={other}")));
        }
    };
    Ok(crs)
}

/// PROJ 参数表
struct ProjParams<'a> {
    source: &'a str,
    values: HashMap<&'a str, &'a str>,
}

impl<'a> ProjParams<'a> {
    fn parse(def: &'a str) -> GeoResult<Self> {
        let mut values = HashMap::new();
        for token in def.split_whitespace() {
            let Some(token) = token.strip_prefix('+') else {
                return Err(GeoError::crs_parse_failed(def, format!("无效的参数 '{token}'")));
            };
            let (key, value) = token.split_once('=').unwrap_or((token, ""));
            values.insert(key, value);
        }
        Ok(Self { source: def, values })
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.values.get(key).copied()
    }

    fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn number(&self, key: &str) -> GeoResult<Option<f64>> {
        self.get(key)
            .map(|v| {
                v.parse::<f64>().map_err(|_| {
                    GeoError::crs_parse_failed(self.source, format!("无效的数值 +{key}={v}"))
                })
            })
            .transpose()
    }

    fn ellipsoid(&self) -> GeoResult<Option<Ellipsoid>> {
        if let Some(name) = self.get("ellps") {
            return Ellipsoid::from_proj_name(name)
                .map(Some)
                .ok_or_else(|| GeoError::crs_parse_failed(self.source, format!("未知椭球体 +ellps={name}")));
        }
        if let Some(r) = self.number("R")? {
            return Ok(Some(Ellipsoid::new(r, 0.0)));
        }
        let Some(a) = self.number("a")? else {
            return Ok(None);
        };
        let ellipsoid = if let Some(rf) = self.number("rf")? {
            Ellipsoid::from_inverse_flattening(a, rf)
        } else if let Some(b) = self.number("b")? {
            Ellipsoid::from_semi_axes(a, b)
        } else if let Some(e) = self.number("e")? {
            Ellipsoid::from_eccentricity(a, e)
        } else if let Some(f) = self.number("f")? {
            Ellipsoid::new(a, f)
        } else {
            Ellipsoid::new(a, 0.0)
        };
        Ok(Some(ellipsoid))
    }

    /// 基准：`+datum` 优先，其次 `+towgs84`，否则为仅由椭球体定义的未知基准
    fn datum(&self) -> GeoResult<Datum> {
        if let Some(name) = self.get("datum") {
            return registry::datum_from_proj_name(name)
                .ok_or_else(|| GeoError::crs_parse_failed(self.source, format!("未知基准 +datum={name}")));
        }
        let ellipsoid = self.ellipsoid()?.unwrap_or(Ellipsoid::GRS80);
        let Some(raw) = self.get("towgs84") else {
            return Ok(Datum::unknown(ellipsoid));
        };
        let values = raw
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| GeoError::crs_parse_failed(self.source, format!("无效的 +towgs84={raw}")))?;
        let helmert = Helmert::from_towgs84(&values).ok_or_else(|| {
            GeoError::crs_parse_failed(self.source, "+towgs84 需要 3 个或 7 个参数")
        })?;
        let mut datum = Datum::unknown(ellipsoid);
        datum.shifts.push(DatumShift::new(
            format!("Transformation from {} to WGS84", datum.name),
            helmert,
            None,
        ));
        Ok(datum)
    }
}

// ============================================================================
// 测试
// ============================================================================
