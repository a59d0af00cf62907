// crates/cp_transform/src/executor.rs

//! 单点转换执行器
//!
//! 每个 SelectionKey 的状态机：
//!
//! ```text
//! 未缓存 ──解析候选──▶ 尝试中 ──首个成功──▶ 已缓存
//!    ▲                    │                    │
//!    │                 全部失败             调用失败
//!    │                    ▼                    │
//!    └──────淘汰────── 终止失败 ◀───────────────┘
//! ```
//!
//! 缓存的操作失败时淘汰条目，本次调用重新解析一次，不会无限重试。

use crate::cache::{OperationCache, SelectionKey};
use crate::candidates::{candidates, prioritize};
use crate::config::SelectionHint;
use crate::error::{TransformError, TxResult};
use crate::resolver::CrsResolver;
use cp_geo::{Coord, GeodeticEngine, Operation};
use tracing::{debug, warn};

/// 一次成功执行的结果
#[derive(Debug, Clone)]
pub struct Executed {
    /// 输出坐标
    pub coord: Coord,
    /// 使用的操作
    pub operation: Operation,
}

impl Executed {
    /// 操作精度
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        self.operation.accuracy()
    }
}

/// 单点转换执行器
pub struct Executor<'a, E: GeodeticEngine + ?Sized> {
    engine: &'a E,
    resolver: &'a CrsResolver,
    cache: &'a OperationCache,
    include_superseded: bool,
}

impl<'a, E: GeodeticEngine + ?Sized> Executor<'a, E> {
    /// 创建执行器
    pub fn new(
        engine: &'a E,
        resolver: &'a CrsResolver,
        cache: &'a OperationCache,
        include_superseded: bool,
    ) -> Self {
        Self {
            engine,
            resolver,
            cache,
            include_superseded,
        }
    }

    /// 执行一次转换
    ///
    /// # Errors
    /// - 标识符无法解析：[`TransformError::CrsNotFound`]
    /// - 无任何路径：[`TransformError::NoTransformPath`]
    /// - 候选全部失败：[`TransformError::OperationFailed`]
    pub fn execute(
        &self,
        source_id: &str,
        target_id: &str,
        coord: Coord,
        hint: &SelectionHint,
    ) -> TxResult<Executed> {
        let source = self.resolver.canonicalize(self.engine, source_id)?;
        let target = self.resolver.canonicalize(self.engine, target_id)?;
        let key = SelectionKey::new(source, target, hint);

        let mut attempted = 0usize;
        let mut last_error = None;
        let mut failed: Option<Operation> = None;

        if let Some(op) = self.cache.get(&key) {
            debug!(source = %key.source, target = %key.target, operation = op.description(), "缓存命中");
            attempted += 1;
            match try_apply(&op, coord) {
                Ok(out) => return Ok(Executed { coord: out, operation: op }),
                Err(e) => {
                    warn!(
                        source = %key.source,
                        target = %key.target,
                        operation = op.description(),
                        error = %e,
                        "缓存的操作失败，淘汰后重新解析"
                    );
                    self.cache.evict_if_same(&key, &op);
                    last_error = Some(e);
                    failed = Some(op);
                }
            }
        }

        let gate = self.cache.gate(&key);
        let _guard = gate.lock();
        let result = self.resolve_gated(&key, source_id, target_id, coord, failed.as_ref(), attempted, last_error);
        // 赢家先入缓存再移除闸门
        self.cache.release_gate(&key, &gate);
        result
    }

    /// 持有闸门时的解析：复查缓存后按顺序尝试候选
    fn resolve_gated(
        &self,
        key: &SelectionKey,
        source_id: &str,
        target_id: &str,
        coord: Coord,
        failed: Option<&Operation>,
        mut attempted: usize,
        mut last_error: Option<TransformError>,
    ) -> TxResult<Executed> {
        // 等待闸门期间可能已有其他调用方写入
        if let Some(op) = self.cache.get(key) {
            let retried = failed.is_some_and(|f| Operation::ptr_eq(f, &op));
            if !retried {
                attempted += 1;
                match try_apply(&op, coord) {
                    Ok(out) => return Ok(Executed { coord: out, operation: op }),
                    Err(e) => {
                        self.cache.evict_if_same(key, &op);
                        last_error = Some(e);
                    }
                }
            }
        }

        for op in self.ordered_candidates(key, source_id, target_id)? {
            attempted += 1;
            debug!(source = %key.source, target = %key.target, operation = op.description(), "尝试候选操作");
            match try_apply(&op, coord) {
                Ok(out) => {
                    let operation = self.cache.insert_if_absent(key.clone(), op);
                    return Ok(Executed { coord: out, operation });
                }
                Err(e) => {
                    warn!(
                        source = %key.source,
                        target = %key.target,
                        operation = op.description(),
                        error = %e,
                        "候选操作失败，尝试下一个"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => TransformError::OperationFailed {
                source_crs: key.source.clone(),
                target_crs: key.target.clone(),
                attempted,
                last: Box::new(e),
            },
            None => TransformError::NoSuitableOperation {
                source_crs: key.source.clone(),
                target_crs: key.target.clone(),
            },
        })
    }

    /// 该键当前会选用的操作（不执行变换）
    ///
    /// 有缓存时返回缓存的操作，否则返回尝试顺序中的第一个。
    ///
    /// # Errors
    /// 标识符无法解析或无任何路径时返回错误
    pub fn select(&self, source_id: &str, target_id: &str, hint: &SelectionHint) -> TxResult<Operation> {
        let source = self.resolver.canonicalize(self.engine, source_id)?;
        let target = self.resolver.canonicalize(self.engine, target_id)?;
        let key = SelectionKey::new(source, target, hint);
        if let Some(op) = self.cache.get(&key) {
            return Ok(op);
        }
        self.ordered_candidates(&key, source_id, target_id)?
            .into_iter()
            .next()
            .ok_or(TransformError::NoSuitableOperation {
                source_crs: key.source,
                target_crs: key.target,
            })
    }

    /// 排好尝试顺序的候选集；候选为空时退回引擎的直接操作
    fn ordered_candidates(&self, key: &SelectionKey, source_id: &str, target_id: &str) -> TxResult<Vec<Operation>> {
        let source_def = self.resolver.resolve(self.engine, source_id)?;
        let target_def = self.resolver.resolve(self.engine, target_id)?;

        let set = candidates(self.engine, &source_def, &target_def, self.include_superseded);
        if !set.is_empty() {
            return Ok(prioritize(set, &key.hint()));
        }

        match self.engine.direct_operation(&source_def, &target_def) {
            Ok(op) => {
                debug!(source = %key.source, target = %key.target, "候选集为空，使用直接操作");
                Ok(vec![op])
            }
            Err(e) => Err(TransformError::NoTransformPath {
                source_crs: key.source.clone(),
                target_crs: key.target.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

/// 执行操作并校验输出为有限数
///
/// # Errors
/// 操作报错或输出含 NaN/Inf 时返回错误
pub fn try_apply(op: &Operation, coord: Coord) -> TxResult<Coord> {
    let out = op.apply(coord)?;
    if out.is_finite() {
        Ok(out)
    } else {
        Err(TransformError::NonFiniteResult {
            operation: op.description().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_geo::{BuiltinEngine, GeoError};

    #[test]
    fn test_try_apply_rejects_nan() {
        let op = Operation::builder("nan").build(|_| Ok(Coord::xy(f64::NAN, 0.0)));
        assert!(matches!(
            try_apply(&op, Coord::xy(0.0, 0.0)),
            Err(TransformError::NonFiniteResult { .. })
        ));

        let op = Operation::builder("err")
            .build(|_| Err(GeoError::projection_failed("正向投影", "越界")));
        assert!(matches!(try_apply(&op, Coord::xy(0.0, 0.0)), Err(TransformError::Engine(_))));
    }

    #[test]
    fn test_execute_caches_winner() {
        let engine = BuiltinEngine;
        let resolver = CrsResolver::default();
        let cache = OperationCache::new();
        let exec = Executor::new(&engine, &resolver, &cache, true);

        let first = exec
            .execute("EPSG:4326", "epsg:32631", Coord::xy(2.2945, 48.8584), &SelectionHint::default())
            .expect("execute");
        assert_eq!(cache.len(), 1);

        let second = exec
            .execute("urn:ogc:def:crs:EPSG::4326", "EPSG:32631", Coord::xy(2.2945, 48.8584), &SelectionHint::default())
            .expect("execute");
        assert_eq!(cache.len(), 1);
        assert!(Operation::ptr_eq(&first.operation, &second.operation));
        assert_eq!(first.coord, second.coord);
    }

    #[test]
    fn test_gates_released_after_resolution() {
        let engine = BuiltinEngine;
        let resolver = CrsResolver::default();
        let cache = OperationCache::new();
        let exec = Executor::new(&engine, &resolver, &cache, true);

        for term in ["a", "b", "c"] {
            exec.execute("EPSG:4326", "EPSG:32631", Coord::xy(2.2945, 48.8584), &SelectionHint::preferred([term]))
                .expect("execute");
        }
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.gate_count(), 0);

        // 解析失败的键同样不留闸门
        let err = exec.execute("EPSG:4326", "EPSG:32631", Coord::xy(f64::NAN, 0.0), &SelectionHint::index(7));
        assert!(err.is_err());
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.gate_count(), 0);
    }

    #[test]
    fn test_select_without_applying() {
        let engine = BuiltinEngine;
        let resolver = CrsResolver::default();
        let cache = OperationCache::new();
        let exec = Executor::new(&engine, &resolver, &cache, true);

        let op = exec
            .select("EPSG:4326", "EPSG:27700", &SelectionHint::default())
            .expect("select");
        assert_eq!(op.accuracy(), Some(2.0));
        assert!(cache.is_empty());
    }
}
