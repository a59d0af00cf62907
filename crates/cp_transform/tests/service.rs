// crates/cp_transform/tests/service.rs

//! 内置引擎下的端到端转换
//!
//! 参考值：埃菲尔铁塔 (2.2945°E, 48.8584°N) 在 UTM 31N 中约为
//! (448252.0, 5411954.9)。

use cp_transform::prelude::*;

fn svc() -> TransformService {
    TransformService::builtin().expect("service")
}

// ============================================================================
// 单点转换
// ============================================================================

#[test]
fn test_eiffel_tower_round_trip() {
    let service = svc();
    let fwd = service
        .transform_point("EPSG:4326", "EPSG:32631", 2.2945, 48.8584, None)
        .expect("forward");
    assert!((fwd.x - 448_252.0).abs() < 1.0, "x = {}", fwd.x);
    assert!((fwd.y - 5_411_954.9).abs() < 1.0, "y = {}", fwd.y);
    assert_eq!(fwd.source_crs, "EPSG:4326");
    assert_eq!(fwd.target_crs, "EPSG:32631");

    let inv = service
        .transform_point("EPSG:32631", "EPSG:4326", fwd.x, fwd.y, None)
        .expect("inverse");
    assert!((inv.x - 2.2945).abs() < 1e-6);
    assert!((inv.y - 48.8584).abs() < 1e-6);
}

#[test]
fn test_height_is_carried() {
    let service = svc();
    let r = service
        .transform_point("EPSG:4326", "EPSG:32631", 2.2945, 48.8584, Some(35.0))
        .expect("transform");
    assert!((r.z.expect("height") - 35.0).abs() < 1e-9);

    let r = service
        .transform_point("EPSG:4326", "EPSG:32631", 2.2945, 48.8584, None)
        .expect("transform");
    assert!(r.z.is_none());
}

#[test]
fn test_datum_shift_round_trip() {
    let service = svc();
    let osgb = service
        .transform_point("EPSG:4326", "EPSG:4277", -1.5, 52.5, Some(100.0))
        .expect("forward");
    // WGS 84 与 OSGB36 在英国相差约百米级
    let shift = ((osgb.x + 1.5).powi(2) + (osgb.y - 52.5).powi(2)).sqrt();
    assert!(shift > 1e-4 && shift < 1e-2, "shift = {shift}");

    let back = service
        .transform_point("EPSG:4277", "EPSG:4326", osgb.x, osgb.y, osgb.z)
        .expect("inverse");
    assert!((back.x + 1.5).abs() < 1e-7);
    assert!((back.y - 52.5).abs() < 1e-7);
}

#[test]
fn test_path_index_out_of_range_falls_back() {
    let service = svc();
    let default = service
        .transform_point("EPSG:4326", "EPSG:4230", 2.0, 45.0, None)
        .expect("default");
    let r = service
        .transform_point_with_selection("EPSG:4326", "EPSG:4230", 2.0, 45.0, None, &SelectionHint::index(999))
        .expect("fallback");
    assert!((r.x - default.x).abs() < 1e-12);
    assert!((r.y - default.y).abs() < 1e-12);
    assert_eq!(r.operation, default.operation);
}

#[test]
fn test_selection_picks_superseded_path() {
    let service = svc();
    let paths = service.available_paths("EPSG:4326", "EPSG:27700").expect("paths");
    let index = paths
        .iter()
        .position(|p| p.description.contains("OSGB36 to WGS 84 (1)"))
        .expect("three-parameter path");

    let r = service
        .transform_point_with_selection(
            "EPSG:4326",
            "EPSG:27700",
            -3.1883,
            55.9533,
            None,
            &SelectionHint::index(index),
        )
        .expect("transform");
    assert_eq!(r.accuracy, Some(21.0));
    assert!(r.chain.is_empty());
    assert!(r.operation.expect("operation").contains("(1)"));
}

// ============================================================================
// 规范化
// ============================================================================

#[test]
fn test_canonicalize_idempotent() {
    let service = svc();
    for id in [
        "EPSG:4326",
        "epsg:27700",
        "urn:ogc:def:crs:EPSG::32631",
        "BNG",
        "wgs84-lonlat",
        "+proj=utm +zone=33 +ellps=GRS80 +units=m +no_defs",
        r#"PROJCS["WGS 84 / UTM zone 31N",GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]],AUTHORITY["EPSG","32631"]]"#,
    ] {
        let canonical = service.canonicalize(id).expect("canonical");
        assert_eq!(service.canonicalize(&canonical).expect("canonical"), canonical, "{id}");
    }
}

#[test]
fn test_equivalent_ids_share_cache_entry() {
    let service = svc();
    for id in ["EPSG:4326", "epsg:4326", " urn:ogc:def:crs:EPSG::4326 ", "WGS84"] {
        service
            .transform_point(id, "EPSG:32631", 2.2945, 48.8584, None)
            .expect("transform");
    }
    assert_eq!(service.cache_len(), 1);
}

#[test]
fn test_wkt_resolves_to_code() {
    let service = svc();
    let wkt = r#"PROJCS["WGS 84 / UTM zone 31N",GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]],AUTHORITY["EPSG","32631"]]"#;
    assert_eq!(service.canonicalize(wkt).expect("canonical"), "EPSG:32631");
}

// ============================================================================
// 路径查询
// ============================================================================

#[test]
fn test_available_paths_sorted() {
    let service = svc();
    let paths = service.available_paths("EPSG:4326", "EPSG:27700").expect("paths");
    assert_eq!(paths.len(), 3);
    assert!(paths[0].is_best_available);
    assert_eq!(paths[0].accuracy, Some(2.0));
    assert_eq!(paths[1].accuracy, Some(21.0));
    assert_eq!(paths[2].accuracy, None);
    for (i, p) in paths.iter().enumerate() {
        assert_eq!(p.index, i);
        assert!(!p.steps.is_empty());
    }
    assert!(paths[0]
        .steps
        .iter()
        .any(|s| s.method.contains("Position Vector")));
}

#[test]
fn test_superseded_can_be_excluded() {
    let mut config = ServiceConfig::default();
    config.include_superseded = false;
    let service = TransformService::new(std::sync::Arc::new(cp_geo::BuiltinEngine), config).expect("service");
    let paths = service.available_paths("EPSG:4326", "EPSG:27700").expect("paths");
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| !p.description.contains("(1)")));
}

#[test]
fn test_operation_info() {
    let service = svc();
    let info = service.operation_info("EPSG:4326", "EPSG:32631").expect("info");
    assert_eq!(info.accuracy, Some(0.0));
    assert!(info.steps.iter().any(|s| s.definition.contains("+proj=utm +zone=31")));
}

#[test]
fn test_pair_hint_applies_to_direct() {
    let mut config = ServiceConfig::default();
    config.pair_hints.push(PairHintConfig {
        source: "EPSG:4326".to_string(),
        target: "EPSG:4230".to_string(),
        hint: SelectionHint::preferred(["(23)"]),
    });
    let service = TransformService::new(std::sync::Arc::new(cp_geo::BuiltinEngine), config).expect("service");

    let r = service
        .transform_point("EPSG:4326", "EPSG:4230", 2.0, 45.0, None)
        .expect("transform");
    assert!(r.operation.expect("operation").contains("(23)"));
    assert_eq!(r.accuracy, Some(1.0));

    let info = service.operation_info("EPSG:4326", "EPSG:4230").expect("info");
    assert!(info.description.contains("(23)"));
}

// ============================================================================
// 其他接口
// ============================================================================

#[test]
fn test_projection_factors() {
    let service = svc();
    let f = service.projection_factors("EPSG:32631", 3.0, 0.0).expect("factors");
    assert!(f.meridian_convergence.abs() < 1e-9);
    assert!((f.meridional_scale - 0.9996).abs() < 1e-9);
    assert!((f.areal_scale - 0.9996 * 0.9996).abs() < 1e-9);

    assert!(service.projection_factors("EPSG:4326", 3.0, 0.0).is_err());
}

#[test]
fn test_trajectory_matches_single_points() {
    let service = svc();
    let points = [
        TrajectoryInput { id: Some("p0".to_string()), x: 2.2945, y: 48.8584, z: None },
        TrajectoryInput { id: None, x: 2.35, y: 48.85, z: Some(40.0) },
    ];
    let out = service
        .transform_trajectory("EPSG:4326", "EPSG:32631", &points)
        .expect("trajectory");
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].id, "p0");
    assert_eq!(out[1].id, "1");
    assert!((out[1].z.expect("height") - 40.0).abs() < 1e-9);

    let single = service
        .transform_point("EPSG:4326", "EPSG:32631", 2.35, 48.85, Some(40.0))
        .expect("single");
    assert!((out[1].x - single.x).abs() < 1e-9);
    assert!((out[1].y - single.y).abs() < 1e-9);
}

#[test]
fn test_result_serializes() {
    let service = svc();
    let r = service
        .transform_point("EPSG:4326", "EPSG:32631", 2.2945, 48.8584, None)
        .expect("transform");
    let json = serde_json::to_value(&r).expect("json");
    assert_eq!(json["units_target"]["horizontal"], "metre");
    assert!(json.get("z").is_none());
    assert!(json.get("chain").is_none());
}
