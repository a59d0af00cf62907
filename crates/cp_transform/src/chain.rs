// crates/cp_transform/src/chain.rs

//! 多跳转换链
//!
//! 对没有单步高精度操作的 CRS 对，按配置的节点序列逐边执行：
//! - 首尾节点替换为实际请求的规范源/目标，同一链服务所有共享底层 CRS 的别名
//! - 恒等边（两端底层 CRS 相同）不执行变换，沿用上一条边的精度
//! - 边提示 → 成对偏好 → 无提示
//! - 任一边失败则整条链失败，不返回部分结果
//!
//! 链的精度为逆序扫描各边遇到的第一个非空精度。这是沿用的近似做法，
//! 并非严格的误差传播。

use crate::config::{ChainConfig, SelectionHint};
use crate::error::{ConfigError, TransformError, TxResult};
use crate::executor::Executor;
use crate::resolver::CrsResolver;
use cp_geo::{Coord, GeodeticEngine};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// 已规范化的转换链
#[derive(Debug, Clone, PartialEq)]
///
/// 只能经 [`ChainSpec::new`] 构造，保证至少两个节点且边提示与边一一对应。
pub struct ChainSpec {
    nodes: Vec<String>,
    edge_hints: Vec<Option<SelectionHint>>,
}

impl ChainSpec {
    /// 从节点和边提示创建，边提示不足的部分补 `None`
    ///
    /// # Errors
    /// 节点少于两个时返回 [`TransformError::InvalidInput`]
    pub fn new(nodes: Vec<String>, mut edge_hints: Vec<Option<SelectionHint>>) -> TxResult<Self> {
        if nodes.len() < 2 {
            return Err(TransformError::invalid_input(format!(
                "转换链至少需要两个节点，实际 {}",
                nodes.len()
            )));
        }
        edge_hints.resize(nodes.len() - 1, None);
        Ok(Self { nodes, edge_hints })
    }

    /// 节点（规范标识）
    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// 第 `step` 条边的提示
    #[must_use]
    pub fn edge_hint(&self, step: usize) -> Option<&SelectionHint> {
        self.edge_hints.get(step).and_then(Option::as_ref)
    }

    /// 边数
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// 首节点
    #[must_use]
    pub fn source(&self) -> &str {
        self.nodes.first().map_or("", String::as_str)
    }

    /// 尾节点
    #[must_use]
    pub fn target(&self) -> &str {
        self.nodes.last().map_or("", String::as_str)
    }

    /// 将首尾节点替换为实际请求的源和目标
    #[must_use]
    pub fn with_endpoints(&self, source: &str, target: &str) -> Self {
        let mut spec = self.clone();
        if let Some(first) = spec.nodes.first_mut() {
            *first = source.to_string();
        }
        if let Some(last) = spec.nodes.last_mut() {
            *last = target.to_string();
        }
        spec
    }
}

/// 单条边的执行记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeReport {
    /// 边源
    pub from: String,
    /// 边目标
    pub to: String,
    /// 使用的操作描述；恒等边为 `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// 该边记录的精度
    pub accuracy: Option<f64>,
    /// 是否为跳过执行的恒等边
    pub identity: bool,
}

/// 链执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    /// 输出坐标
    pub coord: Coord,
    /// 聚合精度
    pub accuracy: Option<f64>,
    /// 各边记录
    pub edges: Vec<EdgeReport>,
}

/// 逆序扫描取第一个非空精度
#[must_use]
pub fn aggregate_accuracy(edge_accuracies: &[Option<f64>]) -> Option<f64> {
    edge_accuracies.iter().rev().find_map(|a| *a)
}

// ============================================================================
// 链注册表
// ============================================================================

/// 按 (底层源, 底层目标) 索引的链表
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<(String, String), ChainSpec>,
}

impl ChainRegistry {
    /// 从配置构建，节点和端点全部规范化
    ///
    /// # Errors
    /// 节点无法解析、链无效或两条链规范化后端点相同时返回错误
    pub fn from_config<E: GeodeticEngine + ?Sized>(
        engine: &E,
        resolver: &CrsResolver,
        configs: &[ChainConfig],
    ) -> TxResult<Self> {
        let mut chains = HashMap::with_capacity(configs.len());
        for (i, config) in configs.iter().enumerate() {
            let nodes = config
                .nodes
                .iter()
                .map(|n| resolver.canonicalize(engine, n))
                .collect::<TxResult<Vec<_>>>()?;
            let spec = ChainSpec::new(nodes, config.edge_hints.clone())?;
            let source = resolver.canonicalize(engine, &config.source)?;
            let target = resolver.canonicalize(engine, &config.target)?;
            let key = (resolver.underlying(engine, &source)?, resolver.underlying(engine, &target)?);
            if chains.contains_key(&key) {
                return Err(ConfigError::invalid(
                    format!("chains[{i}]"),
                    format!("{} → {}", key.0, key.1),
                    "规范化后与已有转换链重复",
                )
                .into());
            }
            chains.insert(key, spec);
        }
        Ok(Self { chains })
    }

    /// 查找链（参数为底层 CRS 的规范标识）
    #[must_use]
    pub fn get(&self, source: &str, target: &str) -> Option<&ChainSpec> {
        self.chains.get(&(source.to_string(), target.to_string()))
    }

    /// 已注册链数
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// 是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

// ============================================================================
// 链执行
// ============================================================================

/// 逐边执行转换链
///
/// `pair_hint` 按边两端的底层 CRS 查询成对偏好。
///
/// # Errors
/// 任一边失败时返回 [`TransformError::ChainStepFailed`]
pub fn run_chain<E, F>(
    executor: &Executor<'_, E>,
    engine: &E,
    resolver: &CrsResolver,
    spec: &ChainSpec,
    coord: Coord,
    pair_hint: F,
) -> TxResult<ChainOutcome>
where
    E: GeodeticEngine + ?Sized,
    F: Fn(&str, &str) -> Option<SelectionHint>,
{
    let mut current = coord;
    let mut previous_accuracy = None;
    let mut edges = Vec::with_capacity(spec.edge_count());

    for (step, pair) in spec.nodes.windows(2).enumerate() {
        let (from, to) = (&pair[0], &pair[1]);
        let wrap = |cause: TransformError| TransformError::ChainStepFailed {
            step,
            from: from.clone(),
            to: to.clone(),
            cause: Box::new(cause),
        };

        let from_underlying = resolver.underlying(engine, from).map_err(wrap)?;
        let to_underlying = resolver.underlying(engine, to).map_err(wrap)?;
        if from_underlying == to_underlying {
            debug!(step, from = %from, to = %to, "恒等边，跳过");
            edges.push(EdgeReport {
                from: from.clone(),
                to: to.clone(),
                operation: None,
                accuracy: previous_accuracy,
                identity: true,
            });
            continue;
        }

        let hint = spec
            .edge_hint(step)
            .filter(|h| !h.is_empty())
            .cloned()
            .or_else(|| pair_hint(&from_underlying, &to_underlying))
            .unwrap_or_default();

        let executed = executor.execute(from, to, current, &hint).map_err(wrap)?;
        current = executed.coord;
        previous_accuracy = executed.accuracy();
        edges.push(EdgeReport {
            from: from.clone(),
            to: to.clone(),
            operation: Some(executed.operation.description().to_string()),
            accuracy: previous_accuracy,
            identity: false,
        });
    }

    let accuracies: Vec<_> = edges.iter().map(|e| e.accuracy).collect();
    let accuracy = aggregate_accuracy(&accuracies);
    info!(
        nodes = ?spec.nodes(),
        edges = edges.len(),
        accuracy = ?accuracy,
        "转换链执行完成"
    );
    Ok(ChainOutcome {
        coord: current,
        accuracy,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_reverse_scan() {
        assert_eq!(aggregate_accuracy(&[Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(aggregate_accuracy(&[Some(1.0), None]), Some(1.0));
        assert_eq!(aggregate_accuracy(&[None, Some(3.0), None]), Some(3.0));
        assert_eq!(aggregate_accuracy(&[None, None]), None);
        assert_eq!(aggregate_accuracy(&[]), None);
    }

    #[test]
    fn test_chain_pads_hints() {
        let spec = ChainSpec::new(
            vec!["A".to_string(), "B".to_string(), "C".to_string()],
            vec![Some(SelectionHint::index(0))],
        )
        .expect("spec");
        assert_eq!(spec.edge_count(), 2);
        assert_eq!(spec.edge_hint(0), Some(&SelectionHint::index(0)));
        assert!(spec.edge_hint(1).is_none());
        assert!(spec.edge_hint(5).is_none());
        assert!(ChainSpec::new(vec!["A".to_string()], Vec::new()).is_err());
        assert!(ChainSpec::new(Vec::new(), Vec::new()).is_err());
    }

    #[test]
    fn test_with_endpoints() {
        let spec = ChainSpec::new(
            vec!["EPSG:4326".to_string(), "EPSG:4277".to_string(), "EPSG:27700".to_string()],
            Vec::new(),
        )
        .expect("spec");
        let rewritten = spec.with_endpoints("WGS84-LONLAT", "EPSG:27700");
        assert_eq!(rewritten.nodes(), ["WGS84-LONLAT", "EPSG:4277", "EPSG:27700"]);
        assert_eq!(rewritten.source(), "WGS84-LONLAT");
        assert_eq!(rewritten.target(), "EPSG:27700");
    }

    #[test]
    fn test_extra_hints_truncated() {
        let spec = ChainSpec::new(
            vec!["A".to_string(), "B".to_string()],
            vec![None, Some(SelectionHint::index(3))],
        )
        .expect("spec");
        assert_eq!(spec.edge_count(), 1);
        assert!(spec.edge_hint(1).is_none());
    }
}
