// crates/cp_transform/src/service.rs

//! 转换服务
//!
//! 面向请求处理层的统一入口。服务实例持有引擎、解析器、操作缓存、
//! 转换链注册表和成对偏好表，创建后除缓存外只读，可在线程间共享。

use crate::cache::OperationCache;
use crate::candidates::candidates;
use crate::chain::{run_chain, ChainRegistry, ChainSpec, EdgeReport};
use crate::config::{SelectionHint, ServiceConfig};
use crate::error::{TransformError, TxResult};
use crate::executor::Executor;
use crate::offset::{LocalOffsetResult, ProjectedPosition, TangentPlaneContext};
use crate::resolver::CrsResolver;
use cp_geo::{BuiltinEngine, Coord, CrsUnits, GeodeticEngine, OperationStep, ProjectionFactors};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 经纬度中转坐标系
const GEOGRAPHIC_HUB: &str = "EPSG:4326";

// ============================================================================
// 结果类型
// ============================================================================

/// 单点转换结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformResult {
    /// 输出第一轴
    pub x: f64,
    /// 输出第二轴
    pub y: f64,
    /// 输出第三轴
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// 规范源 CRS
    pub source_crs: String,
    /// 规范目标 CRS
    pub target_crs: String,
    /// 源单位
    pub units_source: CrsUnits,
    /// 目标单位
    pub units_target: CrsUnits,
    /// 精度 (m)；链为聚合精度
    pub accuracy: Option<f64>,
    /// 直接转换使用的操作
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// 链转换的逐边记录
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<EdgeReport>,
}

impl TransformResult {
    /// 输出坐标
    #[must_use]
    pub fn coord(&self) -> Coord {
        Coord::new(self.x, self.y, self.z)
    }
}

/// 可选路径
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathInfo {
    /// 路径序号（可用作 `path_index`）
    pub index: usize,
    /// 描述
    pub description: String,
    /// 精度 (m)
    pub accuracy: Option<f64>,
    /// 步骤
    pub steps: Vec<OperationStep>,
    /// 是否为默认会选用的路径
    pub is_best_available: bool,
}

/// 当前选用操作的详情
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationInfo {
    /// 描述
    pub description: String,
    /// 精度 (m)
    pub accuracy: Option<f64>,
    /// 步骤
    pub steps: Vec<OperationStep>,
}

/// 轨迹输入点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryInput {
    /// 点标识，缺省时使用序号
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// 第一轴
    pub x: f64,
    /// 第二轴
    pub y: f64,
    /// 第三轴
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

/// 轨迹输出点
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    /// 点标识
    pub id: String,
    /// 第一轴
    pub x: f64,
    /// 第二轴
    pub y: f64,
    /// 第三轴
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// 精度 (m)
    pub accuracy: Option<f64>,
}

// ============================================================================
// 服务
// ============================================================================

/// 坐标转换服务
pub struct TransformService<E: GeodeticEngine + ?Sized = BuiltinEngine> {
    engine: Arc<E>,
    resolver: CrsResolver,
    cache: OperationCache,
    chains: ChainRegistry,
    pair_hints: HashMap<(String, String), SelectionHint>,
    global_frame: String,
    include_superseded: bool,
}

impl TransformService<BuiltinEngine> {
    /// 使用内置引擎和默认配置
    ///
    /// # Errors
    /// 默认配置中的 CRS 无法解析时返回错误
    pub fn builtin() -> TxResult<Self> {
        Self::new(Arc::new(BuiltinEngine::new()), ServiceConfig::default())
    }
}

impl<E: GeodeticEngine + ?Sized> TransformService<E> {
    /// 创建服务
    ///
    /// 配置中的链节点和成对偏好在此处全部规范化，无法解析的条目直接报错。
    ///
    /// # Errors
    /// 配置无效或引用了无法解析的 CRS 时返回错误
    pub fn new(engine: Arc<E>, config: ServiceConfig) -> TxResult<Self> {
        config.validate()?;
        let resolver = CrsResolver::new(config.aliases);
        let chains = ChainRegistry::from_config(engine.as_ref(), &resolver, &config.chains)?;

        let mut pair_hints = HashMap::with_capacity(config.pair_hints.len());
        for pair in config.pair_hints {
            let source = resolver.canonicalize(engine.as_ref(), &pair.source)?;
            let target = resolver.canonicalize(engine.as_ref(), &pair.target)?;
            let key = (
                resolver.underlying(engine.as_ref(), &source)?,
                resolver.underlying(engine.as_ref(), &target)?,
            );
            pair_hints.insert(key, pair.hint);
        }

        info!(
            chains = chains.len(),
            pair_hints = pair_hints.len(),
            global_frame = %config.global_frame,
            "转换服务已创建"
        );

        Ok(Self {
            engine,
            resolver,
            cache: OperationCache::new(),
            chains,
            pair_hints,
            global_frame: config.global_frame,
            include_superseded: config.include_superseded,
        })
    }

    /// 引擎
    pub fn engine(&self) -> &E {
        self.engine.as_ref()
    }

    /// 标识符解析器
    pub fn resolver(&self) -> &CrsResolver {
        &self.resolver
    }

    /// 规范化标识符
    ///
    /// # Errors
    /// 无法解析时返回 [`TransformError::CrsNotFound`]
    pub fn canonicalize(&self, id: &str) -> TxResult<String> {
        self.resolver.canonicalize(self.engine(), id)
    }

    fn executor(&self) -> Executor<'_, E> {
        Executor::new(self.engine(), &self.resolver, &self.cache, self.include_superseded)
    }

    fn pair_hint(&self, source_underlying: &str, target_underlying: &str) -> Option<SelectionHint> {
        self.pair_hints
            .get(&(source_underlying.to_string(), target_underlying.to_string()))
            .cloned()
    }

    // ------------------------------------------------------------------------
    // 单点转换
    // ------------------------------------------------------------------------

    /// 单点转换
    ///
    /// 该 CRS 对注册了转换链时按链执行，否则按成对偏好直接转换。
    ///
    /// # Errors
    /// 标识符无法解析、无转换路径或所有候选均失败时返回错误
    pub fn transform_point(&self, source_id: &str, target_id: &str, x: f64, y: f64, z: Option<f64>) -> TxResult<TransformResult> {
        self.transform_point_with_selection(source_id, target_id, x, y, z, &SelectionHint::default())
    }

    /// 带显式选择的单点转换
    ///
    /// 非空提示直接作用于该 CRS 对的候选集，不走转换链；越界的路径序号回退到默认排序。
    ///
    /// # Errors
    /// 同 [`transform_point`](Self::transform_point)
    pub fn transform_point_with_selection(
        &self,
        source_id: &str,
        target_id: &str,
        x: f64,
        y: f64,
        z: Option<f64>,
        hint: &SelectionHint,
    ) -> TxResult<TransformResult> {
        let coord = finite_input(x, y, z)?;
        let engine = self.engine();
        let source = self.resolver.canonicalize(engine, source_id)?;
        let target = self.resolver.canonicalize(engine, target_id)?;
        let source_underlying = self.resolver.underlying(engine, &source)?;
        let target_underlying = self.resolver.underlying(engine, &target)?;

        let executor = self.executor();
        let chain = if hint.is_empty() {
            self.chains.get(&source_underlying, &target_underlying)
        } else {
            None
        };

        let (out, accuracy, operation, edges) = match chain {
            Some(spec) => {
                let spec = spec.with_endpoints(&source, &target);
                debug!(source = %source, target = %target, nodes = ?spec.nodes(), "使用转换链");
                let outcome = run_chain(&executor, engine, &self.resolver, &spec, coord, |a, b| self.pair_hint(a, b))?;
                (outcome.coord, outcome.accuracy, None, outcome.edges)
            }
            None => {
                let hint = if hint.is_empty() {
                    self.pair_hint(&source_underlying, &target_underlying).unwrap_or_default()
                } else {
                    hint.clone()
                };
                let executed = executor.execute(&source, &target, coord, &hint)?;
                let accuracy = executed.accuracy();
                let description = executed.operation.description().to_string();
                (executed.coord, accuracy, Some(description), Vec::new())
            }
        };

        self.finish(source, target, out, accuracy, operation, edges)
    }

    fn finish(
        &self,
        source: String,
        target: String,
        out: Coord,
        accuracy: Option<f64>,
        operation: Option<String>,
        chain: Vec<EdgeReport>,
    ) -> TxResult<TransformResult> {
        let units_source = self.resolver.resolve(self.engine(), &source)?.units();
        let units_target = self.resolver.resolve(self.engine(), &target)?.units();
        Ok(TransformResult {
            x: out.x,
            y: out.y,
            z: out.z,
            source_crs: source,
            target_crs: target,
            units_source,
            units_target,
            accuracy,
            operation,
            chain,
        })
    }

    /// 沿调用方给出的节点序列转换
    ///
    /// `segment_hints[i]` 作用于第 i 条边，优先于成对偏好。
    ///
    /// # Errors
    /// 节点少于两个或提示多于边数时返回 [`TransformError::InvalidInput`]；
    /// 任一边失败时返回 [`TransformError::ChainStepFailed`]
    pub fn transform_via<S: AsRef<str>>(
        &self,
        path: &[S],
        segment_hints: &[Option<SelectionHint>],
        x: f64,
        y: f64,
        z: Option<f64>,
    ) -> TxResult<TransformResult> {
        if path.len() < 2 {
            return Err(TransformError::invalid_input(format!(
                "转换路径至少需要两个节点，实际 {}",
                path.len()
            )));
        }
        if segment_hints.len() > path.len() - 1 {
            return Err(TransformError::invalid_input(format!(
                "分段提示数 {} 超过边数 {}",
                segment_hints.len(),
                path.len() - 1
            )));
        }
        let coord = finite_input(x, y, z)?;

        let nodes = path
            .iter()
            .map(|n| self.canonicalize(n.as_ref()))
            .collect::<TxResult<Vec<_>>>()?;
        let hints = segment_hints
            .iter()
            .map(|h| h.clone().filter(|h| !h.is_empty()))
            .collect();
        let spec = ChainSpec::new(nodes, hints)?;

        let outcome = run_chain(&self.executor(), self.engine(), &self.resolver, &spec, coord, |a, b| {
            self.pair_hint(a, b)
        })?;

        let source = spec.source().to_string();
        let target = spec.target().to_string();
        self.finish(source, target, outcome.coord, outcome.accuracy, None, outcome.edges)
    }

    /// 批量转换带标识的轨迹点
    ///
    /// 与 [`transform_point`](Self::transform_point) 共用缓存。任一点失败则整批失败。
    ///
    /// # Errors
    /// 任一点转换失败时返回该点的错误
    pub fn transform_trajectory(
        &self,
        source_id: &str,
        target_id: &str,
        points: &[TrajectoryInput],
    ) -> TxResult<Vec<TrajectoryPoint>> {
        points
            .iter()
            .enumerate()
            .map(|(i, p)| -> TxResult<TrajectoryPoint> {
                let r = self.transform_point(source_id, target_id, p.x, p.y, p.z)?;
                Ok(TrajectoryPoint {
                    id: p.id.clone().unwrap_or_else(|| i.to_string()),
                    x: r.x,
                    y: r.y,
                    z: r.z,
                    accuracy: r.accuracy,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // 路径查询
    // ------------------------------------------------------------------------

    /// 列出可选路径，按精度排序
    ///
    /// 序号与 `path_index` 一致。引擎没有候选时列出直接操作。
    ///
    /// # Errors
    /// 标识符无法解析或无任何路径时返回错误
    pub fn available_paths(&self, source_id: &str, target_id: &str) -> TxResult<Vec<PathInfo>> {
        let engine = self.engine();
        let source = self.resolver.resolve(engine, source_id)?;
        let target = self.resolver.resolve(engine, target_id)?;

        let mut ops = candidates(engine, &source, &target, self.include_superseded);
        if ops.is_empty() {
            let direct = engine
                .direct_operation(&source, &target)
                .map_err(|e| TransformError::NoTransformPath {
                    source_crs: source_id.trim().to_string(),
                    target_crs: target_id.trim().to_string(),
                    reason: e.to_string(),
                })?;
            ops.push(direct);
        }

        Ok(ops
            .into_iter()
            .enumerate()
            .map(|(index, op)| PathInfo {
                index,
                description: op.description().to_string(),
                accuracy: op.accuracy(),
                steps: op.steps().to_vec(),
                is_best_available: index == 0,
            })
            .collect())
    }

    /// 该 CRS 对当前会选用的操作
    ///
    /// # Errors
    /// 标识符无法解析或无任何路径时返回错误
    pub fn operation_info(&self, source_id: &str, target_id: &str) -> TxResult<OperationInfo> {
        let engine = self.engine();
        let source = self.resolver.canonicalize(engine, source_id)?;
        let target = self.resolver.canonicalize(engine, target_id)?;
        let hint = self
            .pair_hint(
                &self.resolver.underlying(engine, &source)?,
                &self.resolver.underlying(engine, &target)?,
            )
            .unwrap_or_default();

        let op = self.executor().select(&source, &target, &hint)?;
        Ok(OperationInfo {
            description: op.description().to_string(),
            accuracy: op.accuracy(),
            steps: op.steps().to_vec(),
        })
    }

    /// 转换为经纬度
    ///
    /// 地理 CRS 原样返回，其余经 WGS 84 地理坐标系转换。
    ///
    /// # Errors
    /// 标识符无法解析或转换失败时返回错误
    pub fn to_geographic(&self, crs_id: &str, x: f64, y: f64) -> TxResult<(f64, f64)> {
        let crs = self.resolver.resolve(self.engine(), crs_id)?;
        if crs.is_geographic() {
            return Ok((x, y));
        }
        let r = self.transform_point(crs_id, GEOGRAPHIC_HUB, x, y, None)?;
        Ok((r.x, r.y))
    }

    /// 投影因子
    ///
    /// # Errors
    /// 非投影坐标系或坐标越界时返回错误
    pub fn projection_factors(&self, crs_id: &str, lon: f64, lat: f64) -> TxResult<ProjectionFactors> {
        let crs = self.resolver.resolve(self.engine(), crs_id)?;
        Ok(self.engine.projection_factors(&crs, lon, lat)?)
    }

    // ------------------------------------------------------------------------
    // 局部偏移
    // ------------------------------------------------------------------------

    /// 构造局部切平面上下文
    ///
    /// 全局参考框架无法解析时记录警告，结果中不含全局坐标。
    ///
    /// # Errors
    /// CRS 无法解析或参考点换算失败时返回错误
    pub fn build_local_offset_context(&self, crs_id: &str, lon: f64, lat: f64, height: f64) -> TxResult<TangentPlaneContext> {
        finite_input(lon, lat, Some(height))?;
        let engine = self.engine();
        let crs = self.resolver.resolve(engine, crs_id)?;
        let global = match self.resolver.resolve(engine, &self.global_frame) {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(frame = %self.global_frame, error = %e, "全局参考框架无法解析");
                None
            }
        };
        TangentPlaneContext::build(engine, crs, global.as_ref(), lon, lat, height)
    }

    /// 局部偏移
    ///
    /// # Errors
    /// 偏移无效或换算失败时返回错误
    pub fn local_offset(&self, context: &TangentPlaneContext, east: f64, north: f64, up: f64) -> TxResult<LocalOffsetResult> {
        context.offset(east, north, up)
    }

    /// 同一参考点的批量局部偏移
    ///
    /// # Errors
    /// 上下文构造失败或任一偏移失败时返回错误
    pub fn local_offset_bulk(
        &self,
        crs_id: &str,
        lon: f64,
        lat: f64,
        height: f64,
        offsets: &[(f64, f64, f64)],
    ) -> TxResult<Vec<LocalOffsetResult>> {
        let context = self.build_local_offset_context(crs_id, lon, lat, height)?;
        offsets
            .iter()
            .map(|&(east, north, up)| context.offset(east, north, up))
            .collect()
    }

    /// 比例因子近似的局部偏移，用于检查投影漂移
    ///
    /// # Errors
    /// 目标不是投影坐标系时返回错误
    pub fn approximate_local_offset(&self, context: &TangentPlaneContext, east: f64, north: f64) -> TxResult<ProjectedPosition> {
        context.approximate_offset(self.engine(), east, north)
    }

    // ------------------------------------------------------------------------
    // 诊断
    // ------------------------------------------------------------------------

    /// 缓存条目数
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// 清空操作缓存
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn finite_input(x: f64, y: f64, z: Option<f64>) -> TxResult<Coord> {
    let coord = Coord::new(x, y, z);
    if coord.is_finite() {
        Ok(coord)
    } else {
        Err(TransformError::invalid_input(format!("坐标必须为有限数: ({x}, {y}, {z:?})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_finite_input() {
        let service = TransformService::builtin().expect("service");
        let err = service
            .transform_point("EPSG:4326", "EPSG:32631", f64::NAN, 48.0, None)
            .expect_err("should fail");
        assert!(matches!(err, TransformError::InvalidInput(_)));
    }

    #[test]
    fn test_units_metadata() {
        let service = TransformService::builtin().expect("service");
        let r = service
            .transform_point("EPSG:4326", "EPSG:32631", 2.2945, 48.8584, None)
            .expect("transform");
        assert_eq!(r.units_source.horizontal, "degree");
        assert_eq!(r.units_target.horizontal, "metre");
        assert_eq!(r.accuracy, Some(0.0));
        assert!(r.chain.is_empty());
    }

    #[test]
    fn test_via_needs_two_nodes() {
        let service = TransformService::builtin().expect("service");
        let err = service
            .transform_via(&["EPSG:4326"], &[], 0.0, 0.0, None)
            .expect_err("should fail");
        assert!(matches!(err, TransformError::InvalidInput(_)));
    }

    #[test]
    fn test_to_geographic() {
        let service = TransformService::builtin().expect("service");
        assert_eq!(service.to_geographic("EPSG:4326", 2.0, 48.0).expect("geo"), (2.0, 48.0));
        let (lon, lat) = service
            .to_geographic("EPSG:32631", 448_252.0, 5_411_954.9)
            .expect("geo");
        assert!((lon - 2.2945).abs() < 1e-4);
        assert!((lat - 48.8584).abs() < 1e-4);
    }

    #[test]
    fn test_trajectory_default_ids() {
        let service = TransformService::builtin().expect("service");
        let points = vec![
            TrajectoryInput { id: Some("a".to_string()), x: 2.0, y: 48.0, z: None },
            TrajectoryInput { id: None, x: 2.1, y: 48.1, z: None },
        ];
        let out = service
            .transform_trajectory("EPSG:4326", "EPSG:32631", &points)
            .expect("trajectory");
        assert_eq!(out[0].id, "a");
        assert_eq!(out[1].id, "1");
        assert_eq!(service.cache_len(), 1);
    }
}
