// crates/cp_transform/src/cache.rs

//! 操作缓存
//!
//! SelectionKey → Operation 的记忆化存储，随服务实例创建，不持久化。
//!
//! - 读取走读锁，命中路径无互斥
//! - 首次解析按键串行：同一键的并发调用方在闸门上排队，后到者复用先到者的结果
//! - 淘汰只移除仍为失败实例的条目，不会误删并发写入的新操作

use crate::config::SelectionHint;
use cp_geo::Operation;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// 缓存键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectionKey {
    /// 规范源 CRS
    pub source: String,
    /// 规范目标 CRS
    pub target: String,
    /// 显式路径序号
    pub path_index: Option<usize>,
    /// 偏好词（保持顺序）
    pub preferred: Vec<String>,
}

impl SelectionKey {
    /// 由规范标识和选择提示构造
    pub fn new(source: impl Into<String>, target: impl Into<String>, hint: &SelectionHint) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            path_index: hint.path_index,
            preferred: hint.preferred.clone(),
        }
    }

    /// 对应的选择提示
    #[must_use]
    pub fn hint(&self) -> SelectionHint {
        SelectionHint {
            path_index: self.path_index,
            preferred: self.preferred.clone(),
        }
    }
}

/// 操作缓存
#[derive(Debug, Default)]
pub struct OperationCache {
    entries: RwLock<HashMap<SelectionKey, Operation>>,
    gates: Mutex<HashMap<SelectionKey, Arc<Mutex<()>>>>,
}

impl OperationCache {
    /// 创建空缓存
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取缓存的操作
    pub fn get(&self, key: &SelectionKey) -> Option<Operation> {
        self.entries.read().get(key).cloned()
    }

    /// 不存在时插入，返回最终留在缓存中的操作
    pub fn insert_if_absent(&self, key: SelectionKey, op: Operation) -> Operation {
        self.entries.write().entry(key).or_insert(op).clone()
    }

    /// 仅当缓存的仍是 `failed` 这个实例时移除
    pub fn evict_if_same(&self, key: &SelectionKey, failed: &Operation) -> bool {
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(current) if Operation::ptr_eq(current, failed) => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// 该键的首次解析闸门
    pub fn gate(&self, key: &SelectionKey) -> Arc<Mutex<()>> {
        self.gates
            .lock()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 解析结束后移除闸门条目（仅当仍是同一个闸门）
    pub fn release_gate(&self, key: &SelectionKey, gate: &Arc<Mutex<()>>) {
        let mut gates = self.gates.lock();
        if gates.get(key).is_some_and(|g| Arc::ptr_eq(g, gate)) {
            gates.remove(key);
        }
    }

    /// 当前存在的闸门数
    pub fn gate_count(&self) -> usize {
        self.gates.lock().len()
    }

    /// 条目数
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.entries.write().clear();
        self.gates.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cp_geo::Coord;

    fn op(name: &str) -> Operation {
        Operation::builder(name).build(|c: Coord| Ok(c))
    }

    fn key() -> SelectionKey {
        SelectionKey::new("EPSG:4326", "EPSG:32631", &SelectionHint::default())
    }

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let cache = OperationCache::new();
        let first = op("first");
        let winner = cache.insert_if_absent(key(), first.clone());
        assert!(Operation::ptr_eq(&winner, &first));

        let winner = cache.insert_if_absent(key(), op("second"));
        assert!(Operation::ptr_eq(&winner, &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evict_only_same_instance() {
        let cache = OperationCache::new();
        let stale = op("stale");
        let fresh = op("fresh");
        cache.insert_if_absent(key(), fresh.clone());

        assert!(!cache.evict_if_same(&key(), &stale));
        assert_eq!(cache.len(), 1);
        assert!(cache.evict_if_same(&key(), &fresh));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keys_differ_by_hint() {
        let a = SelectionKey::new("A", "B", &SelectionHint::index(1));
        let b = SelectionKey::new("A", "B", &SelectionHint::preferred(["x"]));
        assert_ne!(a, b);
        assert_eq!(a.hint(), SelectionHint::index(1));
    }

    #[test]
    fn test_gate_shared_per_key() {
        let cache = OperationCache::new();
        let g1 = cache.gate(&key());
        let g2 = cache.gate(&key());
        assert!(Arc::ptr_eq(&g1, &g2));
        cache.clear();
        assert!(!Arc::ptr_eq(&g1, &cache.gate(&key())));
    }

    #[test]
    fn test_release_gate_only_same_instance() {
        let cache = OperationCache::new();
        let stale = cache.gate(&key());
        cache.release_gate(&key(), &stale);
        assert_eq!(cache.gate_count(), 0);

        let current = cache.gate(&key());
        cache.release_gate(&key(), &stale);
        assert_eq!(cache.gate_count(), 1);
        cache.release_gate(&key(), &current);
        assert_eq!(cache.gate_count(), 0);
    }
}
