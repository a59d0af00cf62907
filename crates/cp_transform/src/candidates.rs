// crates/cp_transform/src/candidates.rs

//! 候选操作集
//!
//! 按精度升序稳定排序，精度未知视为 +∞ 排在最后，同精度保持引擎顺序。
//! 引擎查询失败时返回空集，由调用方退回到直接操作。

use crate::config::SelectionHint;
use crate::error::TransformError;
use cp_geo::{CrsDefinition, GeodeticEngine, Operation};
use tracing::{debug, warn};

/// 查询并排序候选操作
pub fn candidates<E: GeodeticEngine + ?Sized>(
    engine: &E,
    source: &CrsDefinition,
    target: &CrsDefinition,
    include_superseded: bool,
) -> Vec<Operation> {
    match engine.candidate_operations(source, target, include_superseded) {
        Ok(mut ops) => {
            sort_by_accuracy(&mut ops);
            debug!(source = %source, target = %target, count = ops.len(), "候选操作集");
            ops
        }
        Err(e) => {
            debug!(source = %source, target = %target, error = %e, "引擎无候选操作");
            Vec::new()
        }
    }
}

/// 按精度稳定排序，未知精度排最后
pub fn sort_by_accuracy(ops: &mut [Operation]) {
    ops.sort_by(|a, b| {
        let ka = a.accuracy().unwrap_or(f64::INFINITY);
        let kb = b.accuracy().unwrap_or(f64::INFINITY);
        ka.total_cmp(&kb)
    });
}

/// 显式路径序号校验
///
/// # Errors
/// 序号越界时返回 [`TransformError::InvalidSelection`]
pub fn explicit_index(candidates: &[Operation], index: usize) -> Result<usize, TransformError> {
    if index < candidates.len() {
        Ok(index)
    } else {
        Err(TransformError::InvalidSelection {
            index,
            available: candidates.len(),
        })
    }
}

/// 按选择提示排列尝试顺序
///
/// 1. 有效的显式序号：该候选在前
/// 2. 否则若有偏好词：匹配任一偏好词的候选按原顺序在前
/// 3. 其余候选作为回退
///
/// 越界序号记录警告后回退到默认排序，不向调用方报错。
pub fn prioritize(candidates: Vec<Operation>, hint: &SelectionHint) -> Vec<Operation> {
    if let Some(index) = hint.path_index {
        match explicit_index(&candidates, index) {
            Ok(index) => {
                let mut ordered = candidates;
                let chosen = ordered.remove(index);
                ordered.insert(0, chosen);
                return ordered;
            }
            Err(e) => warn!(error = %e, "忽略无效的路径选择"),
        }
    }

    if hint.preferred.is_empty() {
        return candidates;
    }

    let (preferred, rest): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|op| hint.preferred.iter().any(|term| op.matches_term(term)));
    if preferred.is_empty() {
        debug!(terms = ?hint.preferred, "偏好词未匹配任何候选");
    }
    preferred.into_iter().chain(rest).collect()
}
