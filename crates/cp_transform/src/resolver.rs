// crates/cp_transform/src/resolver.rs

//! CRS 标识符解析
//!
//! - `canonicalize`: 别名表 → 引擎解析出的 `authority:code` → 去空白的原文
//! - `resolve_definition`: 别名替换为完整定义，其余原样传给引擎
//!
//! 解析失败不在此处吞掉，统一以 [`TransformError::CrsNotFound`] 返回。

use crate::config::AliasConfig;
use crate::error::{TransformError, TxResult};
use cp_geo::{CrsDefinition, GeodeticEngine};

/// CRS 标识符解析器
#[derive(Debug, Clone, Default)]
pub struct CrsResolver {
    aliases: Vec<AliasConfig>,
}

impl CrsResolver {
    /// 从别名表创建
    #[must_use]
    pub fn new(aliases: Vec<AliasConfig>) -> Self {
        Self { aliases }
    }

    /// 查找别名（记号大小写不敏感）
    #[must_use]
    pub fn alias(&self, id: &str) -> Option<&AliasConfig> {
        let id = id.trim();
        self.aliases.iter().find(|a| a.token.trim().eq_ignore_ascii_case(id))
    }

    /// 引擎可识别的定义
    #[must_use]
    pub fn resolve_definition<'a>(&'a self, id: &'a str) -> &'a str {
        match self.alias(id) {
            Some(alias) => alias.definition.trim(),
            None => id.trim(),
        }
    }

    /// 解析为引擎的 CRS 定义
    ///
    /// # Errors
    /// 无法解析时返回 [`TransformError::CrsNotFound`]
    pub fn resolve<E: GeodeticEngine + ?Sized>(&self, engine: &E, id: &str) -> TxResult<CrsDefinition> {
        engine
            .resolve(self.resolve_definition(id))
            .map_err(|e| TransformError::from_resolve(id, e))
    }

    /// 规范化标识符
    ///
    /// 幂等：对规范标识再次规范化返回其自身。
    ///
    /// # Errors
    /// 无法解析时返回 [`TransformError::CrsNotFound`]
    pub fn canonicalize<E: GeodeticEngine + ?Sized>(&self, engine: &E, id: &str) -> TxResult<String> {
        let crs = self.resolve(engine, id)?;
        if let Some(code) = crs.authority_code() {
            return Ok(code);
        }
        Ok(match self.alias(id) {
            Some(alias) => alias.token.trim().to_string(),
            None => id.trim().to_string(),
        })
    }

    /// 规范标识对应的底层 CRS
    ///
    /// 声明了 `underlying` 的别名返回其底层 CRS 的规范标识，其余返回自身。
    ///
    /// # Errors
    /// 底层 CRS 无法解析时返回错误
    pub fn underlying<E: GeodeticEngine + ?Sized>(&self, engine: &E, canonical: &str) -> TxResult<String> {
        match self.alias(canonical).and_then(|a| a.underlying.as_deref()) {
            Some(underlying) => self.canonicalize(engine, underlying),
            None => Ok(canonical.trim().to_string()),
        }
    }

    /// 两个规范标识是否指向同一底层 CRS（恒等边）
    ///
    /// # Errors
    /// 任一标识无法解析时返回错误
    pub fn is_identity_edge<E: GeodeticEngine + ?Sized>(&self, engine: &E, a: &str, b: &str) -> TxResult<bool> {
        Ok(self.underlying(engine, a)? == self.underlying(engine, b)?)
    }
}
