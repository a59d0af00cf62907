// crates/cp_geo/src/error.rs

//! 大地测量引擎错误类型
//!
//! 包含 CRS 解析、投影转换、坐标系转换相关的错误。
//!
//! # 错误分类
//!
//! - **解析错误**：标识符无法解析、PROJ 字符串参数无效
//! - **验证错误**：坐标越界、缺少高程、UTM 带号无效
//! - **计算错误**：投影转换失败、操作不适用于该 CRS

use thiserror::Error;

/// Geo 模块结果类型
pub type GeoResult<T> = Result<T, GeoError>;

/// 大地测量引擎错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// 标识符无法解析为任何 CRS
    #[error("CRS 未找到: {identifier} ({reason})")]
    CrsNotFound {
        /// 输入的标识符
        identifier: String,
        /// 失败原因
        reason: String,
    },

    /// CRS 定义解析失败
    #[error("CRS 定义解析失败 [{definition}]: {reason}")]
    CrsParseFailed {
        /// 失败的定义字符串
        definition: String,
        /// 失败原因
        reason: String,
    },

    /// 坐标超出有效范围
    #[error("{coord_type} 超出范围: {value:.6} (允许范围: {min} 到 {max})")]
    CoordinateOutOfRange {
        /// 坐标类型（如"纬度"、"经度"）
        coord_type: &'static str,
        /// 实际值
        value: f64,
        /// 最小允许值
        min: f64,
        /// 最大允许值
        max: f64,
    },

    /// UTM 带号无效
    #[error("无效的 UTM 带号: {zone} (允许范围: 1-60)")]
    InvalidUtmZone {
        /// 无效的带号
        zone: u32,
    },

    /// 地心坐标缺少 Z 分量
    #[error("{operation} 需要三维坐标输入")]
    MissingHeight {
        /// 操作描述
        operation: &'static str,
    },

    /// 投影转换失败
    #[error("投影转换失败 [{operation}]: {message}")]
    ProjectionFailed {
        /// 操作类型（如"正向投影"、"逆向投影"）
        operation: &'static str,
        /// 错误详情
        message: String,
    },

    /// 操作不适用于该 CRS
    #[error("{operation} 不适用于 CRS {crs}")]
    Unsupported {
        /// 操作描述
        operation: &'static str,
        /// CRS 名称
        crs: String,
    },
}

// ============================================================================
// 便捷构造函数
// ============================================================================

impl GeoError {
    /// 创建 CRS 未找到错误
    #[inline]
    pub fn crs_not_found(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CrsNotFound {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// 创建 CRS 解析失败错误
    #[inline]
    pub fn crs_parse_failed(definition: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CrsParseFailed {
            definition: definition.into(),
            reason: reason.into(),
        }
    }

    /// 创建坐标越界错误
    #[inline]
    pub fn coordinate_out_of_range(coord_type: &'static str, value: f64, min: f64, max: f64) -> Self {
        Self::CoordinateOutOfRange {
            coord_type,
            value,
            min,
            max,
        }
    }

    /// 创建投影转换失败错误
    #[inline]
    pub fn projection_failed(operation: &'static str, message: impl Into<String>) -> Self {
        Self::ProjectionFailed {
            operation,
            message: message.into(),
        }
    }

    /// 创建不支持操作错误
    #[inline]
    pub fn unsupported(operation: &'static str, crs: impl Into<String>) -> Self {
        Self::Unsupported {
            operation,
            crs: crs.into(),
        }
    }

    /// 是否为"未找到"类错误
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CrsNotFound { .. } | Self::CrsParseFailed { .. })
    }

    /// 验证 UTM 带号
    #[inline]
    pub fn check_utm_zone(zone: u32) -> GeoResult<()> {
        if (1..=60).contains(&zone) {
            Ok(())
        } else {
            Err(Self::InvalidUtmZone { zone })
        }
    }

    /// 验证纬度范围
    #[inline]
    pub fn check_latitude(lat: f64) -> GeoResult<()> {
        if (-90.0..=90.0).contains(&lat) {
            Ok(())
        } else {
            Err(Self::coordinate_out_of_range("纬度", lat, -90.0, 90.0))
        }
    }
}
