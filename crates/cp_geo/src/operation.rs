// crates/cp_geo/src/operation.rs

//! 坐标操作
//!
//! [`Operation`] 是两个 CRS 之间的一条具体转换管线：描述、精度、步骤列表
//! 以及坐标变换核。创建后不可变，克隆只增加引用计数，
//! 缓存和正在执行的转换可以共享同一个实例。

use crate::error::GeoResult;
use crate::geometry::Coord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// 坐标变换核
pub type Kernel = dyn Fn(Coord) -> GeoResult<Coord> + Send + Sync;

/// 操作中的单个步骤
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStep {
    /// 方法名（如 "Transverse Mercator"）
    pub method: String,
    /// 序列化形式（PROJ 字符串）
    pub definition: String,
}

impl OperationStep {
    /// 创建步骤
    pub fn new(method: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            definition: definition.into(),
        }
    }
}

struct OperationInner {
    description: String,
    accuracy: Option<f64>,
    steps: Vec<OperationStep>,
    superseded: bool,
    kernel: Box<Kernel>,
}

/// 坐标操作
#[derive(Clone)]
pub struct Operation {
    inner: Arc<OperationInner>,
}

impl Operation {
    /// 开始构建操作
    pub fn builder(description: impl Into<String>) -> OperationBuilder {
        OperationBuilder {
            description: description.into(),
            accuracy: None,
            steps: Vec::new(),
            superseded: false,
        }
    }

    /// 描述
    #[must_use]
    pub fn description(&self) -> &str {
        &self.inner.description
    }

    /// 精度估计 (m)，`None` 表示未知
    #[must_use]
    pub fn accuracy(&self) -> Option<f64> {
        self.inner.accuracy
    }

    /// 步骤列表
    #[must_use]
    pub fn steps(&self) -> &[OperationStep] {
        &self.inner.steps
    }

    /// 是否为已取代的操作
    #[must_use]
    pub fn is_superseded(&self) -> bool {
        self.inner.superseded
    }

    /// 执行变换
    ///
    /// # Errors
    /// 输入坐标对该操作无效时返回错误
    #[inline]
    pub fn apply(&self, coord: Coord) -> GeoResult<Coord> {
        (self.inner.kernel)(coord)
    }

    /// 偏好词匹配：不区分大小写，检查描述、步骤方法名和步骤定义
    #[must_use]
    pub fn matches_term(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        if term.is_empty() {
            return false;
        }
        self.description().to_lowercase().contains(&term)
            || self.steps().iter().any(|step| {
                step.method.to_lowercase().contains(&term)
                    || step.definition.to_lowercase().contains(&term)
            })
    }

    /// 是否为同一个实例
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("description", &self.inner.description)
            .field("accuracy", &self.inner.accuracy)
            .field("steps", &self.inner.steps)
            .field("superseded", &self.inner.superseded)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accuracy() {
            Some(acc) => write!(f, "{} (±{acc} m)", self.description()),
            None => write!(f, "{} (精度未知)", self.description()),
        }
    }
}

/// [`Operation`] 构建器
#[derive(Debug)]
pub struct OperationBuilder {
    description: String,
    accuracy: Option<f64>,
    steps: Vec<OperationStep>,
    superseded: bool,
}

impl OperationBuilder {
    /// 设置精度
    #[must_use]
    pub fn accuracy(mut self, accuracy: Option<f64>) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// 追加步骤
    #[must_use]
    pub fn step(mut self, method: impl Into<String>, definition: impl Into<String>) -> Self {
        self.steps.push(OperationStep::new(method, definition));
        self
    }

    /// 追加多个步骤
    #[must_use]
    pub fn steps(mut self, steps: impl IntoIterator<Item = OperationStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    /// 标记是否已取代
    #[must_use]
    pub fn superseded(mut self, superseded: bool) -> Self {
        self.superseded = superseded;
        self
    }

    /// 绑定变换核，完成构建
    pub fn build<F>(self, kernel: F) -> Operation
    where
        F: Fn(Coord) -> GeoResult<Coord> + Send + Sync + 'static,
    {
        Operation {
            inner: Arc::new(OperationInner {
                description: self.description,
                accuracy: self.accuracy,
                steps: self.steps,
                superseded: self.superseded,
                kernel: Box::new(kernel),
            }),
        }
    }
}

// ============================================================================
// 测试
// ============================================================================
