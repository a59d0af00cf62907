// crates/cp_geo/src/registry.rs

//! 内置 EPSG 注册表
//!
//! 覆盖的代码：
//! - WGS 84: 4326, 4979, 4978；UTM 32601-32660, 32701-32760；Web Mercator 3857
//! - ETRS89: 4258, 4937, 4936；ETRS89 / UTM 28N-38N (25828-25838)
//! - OSGB36: 4277；英国国家格网 27700
//! - ED50: 4230；ED50 / UTM 28N-38N (23028-23038)
//! - NAD27: 4267；NAD83: 4269
//! - CGCS2000: 4490；3 度带 4534-4554；6 度带 4502-4512
//!
//! 基准转换参数取自 EPSG 数据集，采用位置矢量约定。

use crate::crs::{CrsDefinition, Datum, DatumShift};
use crate::ellipsoid::Ellipsoid;
use crate::geocentric::Helmert;
use crate::projection::{Projection, TransverseMercatorParams};

// ============================================================================
// 基准
// ============================================================================

/// ETRS89 基准
#[must_use]
pub fn etrs89() -> Datum {
    Datum::new(
        "European Terrestrial Reference System 1989",
        Ellipsoid::GRS80,
        vec![DatumShift::new("ETRS89 to WGS 84 (1)", Helmert::NULL, Some(1.0))],
    )
}

/// OSGB36 基准
///
/// 三参数转换 (1) 已被七参数转换 (6) 取代，保留以便显式选择。
#[must_use]
pub fn osgb36() -> Datum {
    Datum::new(
        "Ordnance Survey of Great Britain 1936",
        Ellipsoid::AIRY_1830,
        vec![
            DatumShift::new(
                "OSGB36 to WGS 84 (6)",
                Helmert::seven(446.448, -125.157, 542.06, 0.15, 0.247, 0.842, -20.489),
                Some(2.0),
            ),
            DatumShift::new(
                "OSGB36 to WGS 84 (1)",
                Helmert::translation(375.0, -111.0, 431.0),
                Some(21.0),
            )
            .superseded(),
        ],
    )
}

/// ED50 基准
#[must_use]
pub fn ed50() -> Datum {
    Datum::new(
        "European Datum 1950",
        Ellipsoid::INTERNATIONAL_1924,
        vec![
            DatumShift::new(
                "ED50 to WGS 84 (1)",
                Helmert::translation(-87.0, -98.0, -121.0),
                Some(10.0),
            ),
            DatumShift::new(
                "ED50 to WGS 84 (23)",
                Helmert::seven(-89.5, -93.8, -123.1, 0.0, 0.0, -0.156, 1.2),
                Some(1.0),
            ),
        ],
    )
}

/// NAD27 基准
#[must_use]
pub fn nad27() -> Datum {
    Datum::new(
        "North American Datum 1927",
        Ellipsoid::CLARKE_1866,
        vec![DatumShift::new(
            "NAD27 to WGS 84 (4)",
            Helmert::translation(-8.0, 160.0, 176.0),
            Some(10.0),
        )],
    )
}

/// NAD83 基准
#[must_use]
pub fn nad83() -> Datum {
    Datum::new(
        "North American Datum 1983",
        Ellipsoid::GRS80,
        vec![DatumShift::new("NAD83 to WGS 84 (1)", Helmert::NULL, Some(4.0))],
    )
}

/// CGCS2000 基准（无公开的 WGS 84 转换参数，只能走粗略转换）
#[must_use]
pub fn cgcs2000() -> Datum {
    Datum::new("China 2000", Ellipsoid::CGCS2000, Vec::new())
}

/// PROJ `+datum=` 名称对应的基准
#[must_use]
pub fn datum_from_proj_name(name: &str) -> Option<Datum> {
    match name.to_ascii_lowercase().as_str() {
        "wgs84" => Some(Datum::wgs84()),
        "nad83" => Some(nad83()),
        "nad27" => Some(nad27()),
        "osgb36" => Some(osgb36()),
        _ => None,
    }
}

// ============================================================================
// CRS 查找
// ============================================================================

/// 按 EPSG 代码查找 CRS
#[must_use]
pub fn lookup(code: u32) -> Option<CrsDefinition> {
    let crs = match code {
        4326 => CrsDefinition::geographic_2d("WGS 84", Datum::wgs84()),
        4979 => CrsDefinition::geographic_3d("WGS 84", Datum::wgs84()),
        4978 => CrsDefinition::geocentric("WGS 84", Datum::wgs84()),
        3857 => CrsDefinition::projected(
            "WGS 84 / Pseudo-Mercator",
            Datum::wgs84(),
            "Popular Visualisation Pseudo-Mercator",
            Projection::WebMercator,
        ),
        32601..=32660 => utm("WGS 84", Datum::wgs84(), code - 32600, true),
        32701..=32760 => utm("WGS 84", Datum::wgs84(), code - 32700, false),

        4258 => CrsDefinition::geographic_2d("ETRS89", etrs89()),
        4937 => CrsDefinition::geographic_3d("ETRS89", etrs89()),
        4936 => CrsDefinition::geocentric("ETRS89", etrs89()),
        25828..=25838 => utm("ETRS89", etrs89(), code - 25800, true),

        4277 => CrsDefinition::geographic_2d("OSGB36", osgb36()),
        27700 => CrsDefinition::projected(
            "OSGB36 / British National Grid",
            osgb36(),
            "British National Grid",
            Projection::transverse_mercator(TransverseMercatorParams::british_national_grid()),
        ),

        4230 => CrsDefinition::geographic_2d("ED50", ed50()),
        23028..=23038 => utm("ED50", ed50(), code - 23000, true),

        4267 => CrsDefinition::geographic_2d("NAD27", nad27()),
        4269 => CrsDefinition::geographic_2d("NAD83", nad83()),

        4490 => CrsDefinition::geographic_2d("China Geodetic Coordinate System 2000", cgcs2000()),
        // 3 度带，带号 25-45，中央经线 75°E-135°E
        4534..=4554 => {
            let cm = f64::from(code - 4534 + 25) * 3.0;
            gauss_kruger(&format!("CGCS2000 / 3-degree Gauss-Kruger CM {cm}E"), cm)
        }
        // 6 度带，带号 13-23，中央经线 75°E-135°E
        4502..=4512 => {
            let cm = f64::from(code - 4502 + 13) * 6.0 - 3.0;
            gauss_kruger(&format!("CGCS2000 / Gauss-Kruger CM {cm}E"), cm)
        }
        _ => return None,
    };
    Some(crs.with_epsg(code))
}

/// 与基准对应的 (三维地理, 地心) EPSG 代码
#[must_use]
pub fn datum_3d_codes(datum: &Datum) -> Option<(u32, u32)> {
    if datum.is_wgs84() {
        Some((4979, 4978))
    } else if datum.name == etrs89().name {
        Some((4937, 4936))
    } else {
        None
    }
}

/// 所有已注册的 EPSG 代码
pub fn codes() -> impl Iterator<Item = u32> {
    [4326, 4979, 4978, 3857, 4258, 4937, 4936, 4277, 27700, 4230, 4267, 4269, 4490]
        .into_iter()
        .chain(32601..=32660)
        .chain(32701..=32760)
        .chain(25828..=25838)
        .chain(23028..=23038)
        .chain(4502..=4512)
        .chain(4534..=4554)
}

fn utm(datum_label: &str, datum: Datum, zone: u32, north: bool) -> CrsDefinition {
    let hemisphere = if north { 'N' } else { 'S' };
    let ellipsoid = datum.ellipsoid;
    CrsDefinition::projected(
        format!("{datum_label} / UTM zone {zone}{hemisphere}"),
        datum,
        format!("UTM zone {zone}{hemisphere}"),
        Projection::transverse_mercator(TransverseMercatorParams::utm(zone, north, ellipsoid)),
    )
}

fn gauss_kruger(name: &str, central_meridian: f64) -> CrsDefinition {
    let conversion = name.trim_start_matches("CGCS2000 / ").to_string();
    CrsDefinition::projected(
        name,
        cgcs2000(),
        conversion,
        Projection::transverse_mercator(TransverseMercatorParams::gauss_kruger(
            central_meridian,
            500_000.0,
            Ellipsoid::CGCS2000,
        )),
    )
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_code_resolves() {
        for code in codes() {
            let crs = lookup(code).unwrap_or_else(|| panic!("EPSG:{code} 未注册"));
            assert_eq!(crs.epsg(), Some(code));
        }
        assert!(lookup(2000).is_none());
    }

    #[test]
    fn test_utm_names() {
        assert_eq!(lookup(32631).expect("32631").name, "WGS 84 / UTM zone 31N");
        assert_eq!(lookup(32750).expect("32750").name, "WGS 84 / UTM zone 50S");
        assert_eq!(lookup(25832).expect("25832").name, "ETRS89 / UTM zone 32N");
    }

    #[test]
    fn test_gauss_kruger_zones() {
        let gk = lookup(4539).expect("4539");
        assert_eq!(gk.name, "CGCS2000 / 3-degree Gauss-Kruger CM 90E");
        let gk6 = lookup(4508).expect("4508");
        assert_eq!(gk6.name, "CGCS2000 / Gauss-Kruger CM 111E");
    }

    #[test]
    fn test_osgb36_superseded_shift() {
        let datum = osgb36();
        assert_eq!(datum.shifts.len(), 2);
        assert!(!datum.shifts[0].superseded);
        assert!(datum.shifts[1].superseded);
    }

    #[test]
    fn test_3d_codes() {
        assert_eq!(datum_3d_codes(&Datum::wgs84()), Some((4979, 4978)));
        assert_eq!(datum_3d_codes(&etrs89()), Some((4937, 4936)));
        assert_eq!(datum_3d_codes(&osgb36()), None);
    }
}
