// crates/cp_geo/src/engine.rs

//! 大地测量引擎
//!
//! [`GeodeticEngine`] 是转换服务依赖的全部能力：解析 CRS、列出候选操作、
//! 构造直接操作、求取三维地理/地心对应系以及投影因子。
//! [`BuiltinEngine`] 是基于内置注册表的纯 Rust 实现。

use crate::crs::{CrsDefinition, CrsKind, Datum, DatumShift};
use crate::error::{GeoError, GeoResult};
use crate::geocentric::{geocentric_to_geodetic, geodetic_to_geocentric, Helmert};
use crate::geometry::{Coord, Point3D};
use crate::identifier;
use crate::operation::{Operation, OperationStep};
use crate::registry;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// 引擎接口
// ============================================================================

/// 投影因子
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectionFactors {
    /// 子午线收敛角 (度)
    pub meridian_convergence: f64,
    /// 子午线方向比例
    pub meridional_scale: f64,
    /// 纬线方向比例
    pub parallel_scale: f64,
    /// 面积比例
    pub areal_scale: f64,
}

impl ProjectionFactors {
    /// 等角投影的因子：各方向比例相同，面积比例为其平方
    #[must_use]
    pub fn conformal(convergence: f64, k: f64) -> Self {
        Self {
            meridian_convergence: convergence,
            meridional_scale: k,
            parallel_scale: k,
            areal_scale: k * k,
        }
    }
}

/// 大地测量引擎
pub trait GeodeticEngine: Send + Sync {
    /// 解析标识符
    ///
    /// # Errors
    /// 无法解析时返回 [`GeoError::CrsNotFound`] 或 [`GeoError::CrsParseFailed`]
    fn resolve(&self, identifier: &str) -> GeoResult<CrsDefinition>;

    /// 两个 CRS 之间的全部候选操作，按引擎自身的顺序
    ///
    /// # Errors
    /// 两者之间不存在任何转换路径时返回错误
    fn candidate_operations(
        &self,
        source: &CrsDefinition,
        target: &CrsDefinition,
        include_superseded: bool,
    ) -> GeoResult<Vec<Operation>>;

    /// 通用的点对点直接操作
    ///
    /// # Errors
    /// 无法构造时返回错误
    fn direct_operation(&self, source: &CrsDefinition, target: &CrsDefinition) -> GeoResult<Operation>;

    /// 该 CRS 所在基准的三维地理坐标系
    ///
    /// # Errors
    /// 无法推导时返回错误
    fn geodetic_3d(&self, crs: &CrsDefinition) -> GeoResult<CrsDefinition>;

    /// 该 CRS 所在基准的地心坐标系
    ///
    /// # Errors
    /// 无法推导时返回错误
    fn earth_centered(&self, crs: &CrsDefinition) -> GeoResult<CrsDefinition>;

    /// 投影因子
    ///
    /// # Errors
    /// 非投影坐标系或坐标越界时返回错误
    fn projection_factors(&self, crs: &CrsDefinition, lon: f64, lat: f64) -> GeoResult<ProjectionFactors>;
}

// ============================================================================
// 内置引擎
// ============================================================================

/// 基于内置 EPSG 注册表与 PROJ 字符串子集的引擎
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEngine;

impl BuiltinEngine {
    /// 创建引擎
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl GeodeticEngine for BuiltinEngine {
    fn resolve(&self, identifier: &str) -> GeoResult<CrsDefinition> {
        identifier::resolve(identifier)
    }

    fn candidate_operations(
        &self,
        source: &CrsDefinition,
        target: &CrsDefinition,
        include_superseded: bool,
    ) -> GeoResult<Vec<Operation>> {
        if source.datum == target.datum {
            return Ok(vec![build_operation(source, target, DatumStep::Same)]);
        }

        let source_shifts = hub_shifts(&source.datum, include_superseded);
        let target_shifts = hub_shifts(&target.datum, include_superseded);

        let mut ops = Vec::with_capacity(source_shifts.len() * target_shifts.len() + 1);
        for s in &source_shifts {
            for t in &target_shifts {
                ops.push(build_operation(source, target, DatumStep::Shift { source: *s, target: *t }));
            }
        }
        ops.push(build_operation(source, target, DatumStep::Ballpark));

        debug!(
            source = %source,
            target = %target,
            count = ops.len(),
            "内置引擎生成候选操作"
        );
        Ok(ops)
    }

    fn direct_operation(&self, source: &CrsDefinition, target: &CrsDefinition) -> GeoResult<Operation> {
        let ops = self.candidate_operations(source, target, false)?;
        ops.iter()
            .filter(|op| op.accuracy().is_some())
            .min_by(|a, b| a.accuracy().partial_cmp(&b.accuracy()).unwrap_or(std::cmp::Ordering::Equal))
            .or_else(|| ops.last())
            .cloned()
            .ok_or_else(|| GeoError::unsupported("直接转换", format!("{source} → {target}")))
    }

    fn geodetic_3d(&self, crs: &CrsDefinition) -> GeoResult<CrsDefinition> {
        if matches!(crs.kind, CrsKind::Geographic3D) {
            return Ok(crs.clone());
        }
        Ok(match registry::datum_3d_codes(&crs.datum).and_then(|(code, _)| registry::lookup(code)) {
            Some(registered) => registered,
            None => CrsDefinition::geographic_3d(format!("{} (geog3D)", crs.datum.name), crs.datum.clone()),
        })
    }

    fn earth_centered(&self, crs: &CrsDefinition) -> GeoResult<CrsDefinition> {
        if crs.is_geocentric() {
            return Ok(crs.clone());
        }
        Ok(match registry::datum_3d_codes(&crs.datum).and_then(|(_, code)| registry::lookup(code)) {
            Some(registered) => registered,
            None => CrsDefinition::geocentric(format!("{} (geocentric)", crs.datum.name), crs.datum.clone()),
        })
    }

    fn projection_factors(&self, crs: &CrsDefinition, lon: f64, lat: f64) -> GeoResult<ProjectionFactors> {
        let projection = crs
            .projection()
            .ok_or_else(|| GeoError::unsupported("投影因子计算", crs.to_string()))?;
        let (convergence, k) = projection.factors(lon, lat)?;
        Ok(ProjectionFactors::conformal(convergence, k))
    }
}

// ============================================================================
// 操作管线
// ============================================================================

/// 基准层的处理方式
#[derive(Debug, Clone, Copy)]
enum DatumStep<'a> {
    /// 同一基准，只做坐标换算
    Same,
    /// 经 WGS 84 枢纽的赫尔默特转换，`None` 表示该侧即为 WGS 84
    Shift {
        source: Option<&'a DatumShift>,
        target: Option<&'a DatumShift>,
    },
    /// 粗略转换：忽略基准差异，保留经纬度和高程
    Ballpark,
}

/// 到 WGS 84 枢纽的可选参数；WGS 84 自身返回单个 `None`
fn hub_shifts(datum: &Datum, include_superseded: bool) -> Vec<Option<&DatumShift>> {
    if datum.is_wgs84() {
        return vec![None];
    }
    datum
        .shifts
        .iter()
        .filter(|s| include_superseded || !s.superseded)
        .map(Some)
        .collect()
}

/// 构造一条完整的操作管线
fn build_operation(source: &CrsDefinition, target: &CrsDefinition, datum_step: DatumStep<'_>) -> Operation {
    let mut parts = Vec::new();
    let mut steps = Vec::new();

    if let CrsKind::Projected { conversion, projection } = &source.kind {
        parts.push(format!("Inverse of {conversion}"));
        steps.push(OperationStep::new(
            format!("Inverse of {}", projection.method_name()),
            format!("+proj=pipeline +step +inv {}", projection.to_proj_string()),
        ));
    }

    let (shift_in, shift_out, accuracy, superseded) = match datum_step {
        DatumStep::Same => (None, None, Some(0.0), false),
        DatumStep::Ballpark => {
            parts.push(format!(
                "Ballpark geographic offset from {} to {}",
                source.datum.name, target.datum.name
            ));
            steps.push(OperationStep::new("Geographic2D offsets", "+proj=noop"));
            (None, None, None, false)
        }
        DatumStep::Shift { source: s, target: t } => {
            if let Some(s) = s {
                parts.push(s.description.clone());
                steps.push(helmert_step(&s.helmert, false));
            }
            if let Some(t) = t {
                parts.push(format!("Inverse of {}", t.description));
                steps.push(helmert_step(&t.helmert, true));
            }
            let accuracy = match (s.map_or(Some(0.0), |s| s.accuracy), t.map_or(Some(0.0), |t| t.accuracy)) {
                (Some(a), Some(b)) => Some(a + b),
                _ => None,
            };
            let superseded = s.is_some_and(|s| s.superseded) || t.is_some_and(|t| t.superseded);
            (s.map(|s| s.helmert), t.map(|t| t.helmert), accuracy, superseded)
        }
    };

    if let CrsKind::Projected { conversion, projection } = &target.kind {
        parts.push(conversion.clone());
        steps.push(OperationStep::new(projection.method_name(), projection.to_proj_string()));
    }

    if parts.is_empty() {
        parts.push(format!(
            "Conversion from {} ({}) to {} ({})",
            source.name,
            kind_label(&source.kind),
            target.name,
            kind_label(&target.kind)
        ));
    }

    let pipeline = Pipeline {
        source: source.clone(),
        target: target.clone(),
        shift_in,
        shift_out,
    };

    Operation::builder(parts.join(" + "))
        .accuracy(accuracy)
        .steps(steps)
        .superseded(superseded)
        .build(move |coord| pipeline.apply(coord))
}

fn helmert_step(h: &Helmert, inverse: bool) -> OperationStep {
    let method = if h.is_translation() {
        "Geocentric translations (geocentric domain)"
    } else {
        "Position Vector transformation (geocentric domain)"
    };
    let inv = if inverse { " +inv" } else { "" };
    let definition = format!(
        "+proj=helmert{inv} +x={} +y={} +z={} +rx={} +ry={} +rz={} +s={} +convention=position_vector",
        h.tx, h.ty, h.tz, h.rx, h.ry, h.rz, h.ds
    );
    if inverse {
        OperationStep::new(format!("Inverse of {method}"), definition)
    } else {
        OperationStep::new(method, definition)
    }
}

fn kind_label(kind: &CrsKind) -> &'static str {
    match kind {
        CrsKind::Geographic2D => "geog2D",
        CrsKind::Geographic3D => "geog3D",
        CrsKind::Geocentric => "geocentric",
        CrsKind::Projected { .. } => "projected",
    }
}

/// 管线：源坐标 → 源大地坐标 → (地心 + 赫尔默特) → 目标大地坐标 → 目标坐标
#[derive(Debug, Clone)]
struct Pipeline {
    source: CrsDefinition,
    target: CrsDefinition,
    shift_in: Option<Helmert>,
    shift_out: Option<Helmert>,
}

impl Pipeline {
    fn apply(&self, coord: Coord) -> GeoResult<Coord> {
        let has_height = coord.has_z() || self.source.is_geocentric();
        let (lon, lat, h) = self.to_geodetic(coord)?;

        let (lon, lat, h) = if self.shift_in.is_some() || self.shift_out.is_some() {
            let mut p: Point3D = geodetic_to_geocentric(&self.source.ellipsoid(), lon, lat, h);
            if let Some(shift) = &self.shift_in {
                p = shift.apply(p);
            }
            if let Some(shift) = &self.shift_out {
                p = shift.apply_inverse(p);
            }
            geocentric_to_geodetic(&self.target.ellipsoid(), p)
        } else {
            (lon, lat, h)
        };

        self.from_geodetic(lon, lat, h, has_height)
    }

    fn to_geodetic(&self, coord: Coord) -> GeoResult<(f64, f64, f64)> {
        let h = coord.z.unwrap_or(0.0);
        match &self.source.kind {
            CrsKind::Geographic2D | CrsKind::Geographic3D => {
                GeoError::check_latitude(coord.y)?;
                Ok((coord.x, coord.y, h))
            }
            CrsKind::Projected { projection, .. } => {
                let (lon, lat) = projection.inverse(coord.x, coord.y)?;
                Ok((lon, lat, h))
            }
            CrsKind::Geocentric => {
                let z = coord.z.ok_or(GeoError::MissingHeight {
                    operation: "地心坐标转换",
                })?;
                Ok(geocentric_to_geodetic(
                    &self.source.ellipsoid(),
                    Point3D::new(coord.x, coord.y, z),
                ))
            }
        }
    }

    fn from_geodetic(&self, lon: f64, lat: f64, h: f64, has_height: bool) -> GeoResult<Coord> {
        let z = has_height.then_some(h);
        match &self.target.kind {
            CrsKind::Geographic2D | CrsKind::Geographic3D => Ok(Coord::new(lon, lat, z)),
            CrsKind::Projected { projection, .. } => {
                let (x, y) = projection.forward(lon, lat)?;
                Ok(Coord::new(x, y, z))
            }
            CrsKind::Geocentric => {
                Ok(geodetic_to_geocentric(&self.target.ellipsoid(), lon, lat, h).to_coord())
            }
        }
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(id: &str) -> CrsDefinition {
        BuiltinEngine.resolve(id).unwrap_or_else(|e| panic!("{id}: {e}"))
    }

    #[test]
    fn test_same_datum_single_conversion() {
        let ops = BuiltinEngine
            .candidate_operations(&resolve("EPSG:4326"), &resolve("EPSG:32631"), true)
            .expect("candidates");
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].accuracy(), Some(0.0));
        assert_eq!(ops[0].description(), "UTM zone 31N");
    }

    #[test]
    fn test_osgb36_candidates() {
        let wgs = resolve("EPSG:4326");
        let bng = resolve("EPSG:27700");
        let ops = BuiltinEngine.candidate_operations(&wgs, &bng, true).expect("candidates");
        // 七参数、三参数（已取代）、粗略转换
        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].accuracy(), Some(2.0));
        assert!(ops[0].matches_term("Position Vector"));
        assert!(ops[1].is_superseded());
        assert_eq!(ops[2].accuracy(), None);
        assert!(ops[2].description().starts_with("Ballpark"));

        let current = BuiltinEngine.candidate_operations(&wgs, &bng, false).expect("candidates");
        assert_eq!(current.len(), 2);
    }

    #[test]
    fn test_eiffel_tower_utm() {
        let op = BuiltinEngine
            .direct_operation(&resolve("EPSG:4326"), &resolve("EPSG:32631"))
            .expect("direct");
        let out = op.apply(Coord::xy(2.2945, 48.8584)).expect("apply");
        assert!((out.x - 448_252.0).abs() < 1.0, "x = {}", out.x);
        assert!((out.y - 5_411_954.9).abs() < 1.0, "y = {}", out.y);
        assert!(out.z.is_none());
    }

    #[test]
    fn test_osgb36_helmert_magnitude() {
        // OSGB36 与 WGS 84 在英国的经度差约 100 m 量级
        let op = BuiltinEngine
            .direct_operation(&resolve("EPSG:4326"), &resolve("EPSG:4277"))
            .expect("direct");
        let out = op.apply(Coord::xy(-3.1883, 55.9533)).expect("apply");
        let dlon_m = (out.x + 3.1883).abs() * 111_320.0 * 55.9533_f64.to_radians().cos();
        let dlat_m = (out.y - 55.9533).abs() * 111_320.0;
        assert!(dlon_m > 30.0 && dlon_m < 200.0, "dlon = {dlon_m}");
        assert!(dlat_m < 200.0, "dlat = {dlat_m}");
    }

    #[test]
    fn test_geocentric_requires_height() {
        let op = BuiltinEngine
            .direct_operation(&resolve("EPSG:4978"), &resolve("EPSG:4979"))
            .expect("direct");
        assert!(matches!(
            op.apply(Coord::xy(4_200_000.0, 168_000.0)),
            Err(GeoError::MissingHeight { .. })
        ));
    }

    #[test]
    fn test_geocentric_output_has_height() {
        let op = BuiltinEngine
            .direct_operation(&resolve("EPSG:4326"), &resolve("EPSG:4978"))
            .expect("direct");
        let out = op.apply(Coord::xy(0.0, 0.0)).expect("apply");
        assert!((out.x - 6_378_137.0).abs() < 1e-6);
        assert_eq!(out.z, Some(0.0));
    }

    #[test]
    fn test_derived_frames() {
        let bng = resolve("EPSG:27700");
        let geog = BuiltinEngine.geodetic_3d(&bng).expect("geog3d");
        assert!(matches!(geog.kind, CrsKind::Geographic3D));
        assert_eq!(geog.datum, bng.datum);
        let ecef = BuiltinEngine.earth_centered(&geog).expect("ecef");
        assert!(ecef.is_geocentric());

        let wgs = BuiltinEngine.geodetic_3d(&resolve("EPSG:32631")).expect("geog3d");
        assert_eq!(wgs.epsg(), Some(4979));
        assert_eq!(BuiltinEngine.earth_centered(&wgs).expect("ecef").epsg(), Some(4978));
    }

    #[test]
    fn test_projection_factors() {
        let f = BuiltinEngine
            .projection_factors(&resolve("EPSG:32631"), 3.0, 45.0)
            .expect("factors");
        assert!(f.meridian_convergence.abs() < 1e-12);
        assert!((f.meridional_scale - 0.9996).abs() < 1e-9);
        assert!((f.areal_scale - 0.9996 * 0.9996).abs() < 1e-9);
        assert!(BuiltinEngine.projection_factors(&resolve("EPSG:4326"), 3.0, 45.0).is_err());
    }
}
