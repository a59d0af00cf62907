// crates/cp_transform/tests/common/mod.rs

//! 测试用的脚本化引擎
//!
//! CRS 以 `EPSG:<code>` 注册，候选操作和直接操作按代码对预先写好，
//! 可以精确控制哪个候选成功、输出 NaN 或报错。

#![allow(dead_code)]

use cp_geo::{Coord, CrsDefinition, Datum, GeoError, GeoResult, GeodeticEngine, Operation, ProjectionFactors};
use cp_transform::{ServiceConfig, TransformService};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// 脚本化引擎
// ============================================================================

#[derive(Default)]
pub struct ScriptedEngine {
    crs: HashMap<u32, CrsDefinition>,
    candidates: HashMap<(u32, u32), Vec<Operation>>,
    direct: HashMap<(u32, u32), Operation>,
    queries: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册若干地理 CRS
    pub fn with_crs(mut self, codes: &[u32]) -> Self {
        for &code in codes {
            let def = CrsDefinition::geographic_2d(format!("Test CRS {code}"), Datum::wgs84()).with_epsg(code);
            self.crs.insert(code, def);
        }
        self
    }

    pub fn with_candidates(mut self, source: u32, target: u32, ops: Vec<Operation>) -> Self {
        self.candidates.insert((source, target), ops);
        self
    }

    pub fn with_direct(mut self, source: u32, target: u32, op: Operation) -> Self {
        self.direct.insert((source, target), op);
        self
    }

    /// 候选查询次数
    pub fn candidate_queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn codes(source: &CrsDefinition, target: &CrsDefinition) -> (u32, u32) {
        (source.epsg().unwrap_or(0), target.epsg().unwrap_or(0))
    }
}

impl GeodeticEngine for ScriptedEngine {
    fn resolve(&self, identifier: &str) -> GeoResult<CrsDefinition> {
        let id = identifier.trim().to_ascii_uppercase();
        id.strip_prefix("EPSG:")
            .and_then(|code| code.parse::<u32>().ok())
            .and_then(|code| self.crs.get(&code).cloned())
            .ok_or_else(|| GeoError::crs_not_found(identifier, "未注册"))
    }

    fn candidate_operations(
        &self,
        source: &CrsDefinition,
        target: &CrsDefinition,
        _include_superseded: bool,
    ) -> GeoResult<Vec<Operation>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.candidates
            .get(&Self::codes(source, target))
            .cloned()
            .ok_or_else(|| GeoError::unsupported("候选操作", format!("{source} → {target}")))
    }

    fn direct_operation(&self, source: &CrsDefinition, target: &CrsDefinition) -> GeoResult<Operation> {
        self.direct
            .get(&Self::codes(source, target))
            .cloned()
            .ok_or_else(|| GeoError::unsupported("直接转换", format!("{source} → {target}")))
    }

    fn geodetic_3d(&self, crs: &CrsDefinition) -> GeoResult<CrsDefinition> {
        Err(GeoError::unsupported("三维地理坐标系", crs.to_string()))
    }

    fn earth_centered(&self, crs: &CrsDefinition) -> GeoResult<CrsDefinition> {
        Err(GeoError::unsupported("地心坐标系", crs.to_string()))
    }

    fn projection_factors(&self, crs: &CrsDefinition, _lon: f64, _lat: f64) -> GeoResult<ProjectionFactors> {
        Err(GeoError::unsupported("投影因子计算", crs.to_string()))
    }
}

// ============================================================================
// 脚本化操作
// ============================================================================

/// x 平移 `dx` 的操作
pub fn shift(description: &str, accuracy: Option<f64>, dx: f64) -> Operation {
    Operation::builder(description)
        .accuracy(accuracy)
        .step("Test shift", format!("+proj=affine +xoff={dx}"))
        .build(move |c: Coord| Ok(Coord::new(c.x + dx, c.y, c.z)))
}

/// 输出 NaN 的操作
pub fn nan_op(description: &str, accuracy: Option<f64>) -> Operation {
    Operation::builder(description)
        .accuracy(accuracy)
        .build(|c: Coord| Ok(Coord::new(f64::NAN, c.y, c.z)))
}

/// 直接报错的操作
pub fn failing(description: &str, accuracy: Option<f64>) -> Operation {
    Operation::builder(description)
        .accuracy(accuracy)
        .build(|_| Err(GeoError::projection_failed("测试操作", "脚本化失败")))
}

/// 开关打开后开始输出 NaN 的操作
pub fn switchable(description: &str, accuracy: Option<f64>, dx: f64) -> (Operation, Arc<AtomicBool>) {
    let broken = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&broken);
    let op = Operation::builder(description)
        .accuracy(accuracy)
        .build(move |c: Coord| {
            if flag.load(Ordering::SeqCst) {
                Ok(Coord::new(f64::NAN, c.y, c.z))
            } else {
                Ok(Coord::new(c.x + dx, c.y, c.z))
            }
        });
    (op, broken)
}

/// 记录调用次数的平移操作
pub fn counted(description: &str, accuracy: Option<f64>, dx: f64) -> (Operation, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let op = Operation::builder(description)
        .accuracy(accuracy)
        .build(move |c: Coord| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Coord::new(c.x + dx, c.y, c.z))
        });
    (op, calls)
}

/// 用脚本化引擎创建服务
pub fn service(engine: ScriptedEngine, config: ServiceConfig) -> TransformService<ScriptedEngine> {
    TransformService::new(Arc::new(engine), config).expect("service")
}
