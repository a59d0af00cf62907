// crates/cp_transform/src/error.rs

//! 转换服务错误类型
//!
//! 候选操作的单次失败在回退循环内部消化，只有候选全部耗尽、
//! 链中某一步不可恢复或输入本身无效时才返回给调用方。

use cp_geo::GeoError;
use thiserror::Error;

/// 转换服务结果类型
pub type TxResult<T> = Result<T, TransformError>;

/// 转换服务错误
#[derive(Debug, Error)]
pub enum TransformError {
    /// 标识符无法解析
    #[error("CRS 未找到: {identifier} ({reason})")]
    CrsNotFound {
        /// 输入的标识符
        identifier: String,
        /// 失败原因
        reason: String,
    },

    /// 两个 CRS 之间没有任何转换路径
    #[error("无转换路径: {source_crs} → {target_crs} ({reason})")]
    NoTransformPath {
        /// 源 CRS
        source_crs: String,
        /// 目标 CRS
        target_crs: String,
        /// 原因
        reason: String,
    },

    /// 操作输出了 NaN 或无穷大
    #[error("操作 '{operation}' 产生非有限结果")]
    NonFiniteResult {
        /// 操作描述
        operation: String,
    },

    /// 全部候选操作均失败
    #[error("{source_crs} → {target_crs} 的 {attempted} 个候选操作均失败，最后一个错误: {last}")]
    OperationFailed {
        /// 源 CRS
        source_crs: String,
        /// 目标 CRS
        target_crs: String,
        /// 尝试的候选数
        attempted: usize,
        /// 最后一次失败的原因
        #[source]
        last: Box<TransformError>,
    },

    /// 没有可尝试的操作
    #[error("{source_crs} → {target_crs} 没有合适的操作")]
    NoSuitableOperation {
        /// 源 CRS
        source_crs: String,
        /// 目标 CRS
        target_crs: String,
    },

    /// 转换链中某一步失败
    #[error("转换链第 {step} 步失败 ({from} → {to}): {cause}")]
    ChainStepFailed {
        /// 步骤序号（从 0 开始）
        step: usize,
        /// 该步源 CRS
        from: String,
        /// 该步目标 CRS
        to: String,
        /// 该步的错误
        #[source]
        cause: Box<TransformError>,
    },

    /// 显式路径序号越界（内部使用，选择接口会回退到默认排序）
    #[error("路径序号 {index} 越界 (共 {available} 条候选)")]
    InvalidSelection {
        /// 请求的序号
        index: usize,
        /// 候选数
        available: usize,
    },

    /// 输入无效
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 引擎错误
    #[error("引擎错误: {0}")]
    Engine(#[from] GeoError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

impl TransformError {
    /// 将解析失败映射为 [`TransformError::CrsNotFound`]，其余引擎错误原样包装
    pub fn from_resolve(identifier: &str, err: GeoError) -> Self {
        if err.is_not_found() {
            Self::CrsNotFound {
                identifier: identifier.to_string(),
                reason: err.to_string(),
            }
        } else {
            Self::Engine(err)
        }
    }

    /// 创建无效输入错误
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// 剥离链和耗尽包装，取最内层原因
    #[must_use]
    pub fn root_cause(&self) -> &TransformError {
        match self {
            Self::OperationFailed { last, .. } => last.root_cause(),
            Self::ChainStepFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

// ============================================================================
// 配置错误
// ============================================================================

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },
}

impl ConfigError {
    /// 创建无效值错误
    pub fn invalid(key: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_resolve() {
        let err = TransformError::from_resolve("EPSG:99999", GeoError::crs_not_found("EPSG:99999", "未注册"));
        assert!(matches!(err, TransformError::CrsNotFound { .. }));

        let err = TransformError::from_resolve("x", GeoError::InvalidUtmZone { zone: 99 });
        assert!(matches!(err, TransformError::Engine(_)));
    }

    #[test]
    fn test_root_cause() {
        let inner = TransformError::NonFiniteResult {
            operation: "op".to_string(),
        };
        let err = TransformError::ChainStepFailed {
            step: 1,
            from: "EPSG:4277".to_string(),
            to: "EPSG:27700".to_string(),
            cause: Box::new(TransformError::OperationFailed {
                source_crs: "EPSG:4277".to_string(),
                target_crs: "EPSG:27700".to_string(),
                attempted: 2,
                last: Box::new(inner),
            }),
        };
        assert!(matches!(err.root_cause(), TransformError::NonFiniteResult { .. }));
        assert!(err.to_string().contains("第 1 步"));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::invalid("chains[0].nodes", "1", "至少需要两个节点");
        assert!(err.to_string().contains("chains[0].nodes"));
    }
}
