// crates/cp_transform/src/config.rs

//! 转换服务配置
//!
//! 静态的进程级配置数据：别名表、转换链、成对偏好和全局参考框架。
//! 以 JSON 形式存取。

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

// ============================================================================
// 配置项
// ============================================================================

/// 自定义别名
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasConfig {
    /// 别名记号
    pub token: String,
    /// 引擎可识别的完整定义（EPSG 代码、WKT 或 PROJ 字符串）
    pub definition: String,
    /// 该别名所代表的底层 CRS（规范标识），用于识别恒等边
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underlying: Option<String>,
}

impl AliasConfig {
    /// 创建别名
    pub fn new(token: impl Into<String>, definition: impl Into<String>, underlying: Option<&str>) -> Self {
        Self {
            token: token.into(),
            definition: definition.into(),
            underlying: underlying.map(str::to_string),
        }
    }
}

/// 操作选择提示
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionHint {
    /// 显式路径序号（候选集排序后的下标）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_index: Option<usize>,
    /// 偏好词，按顺序匹配操作描述与步骤
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred: Vec<String>,
}

impl SelectionHint {
    /// 按路径序号选择
    #[must_use]
    pub fn index(path_index: usize) -> Self {
        Self {
            path_index: Some(path_index),
            preferred: Vec::new(),
        }
    }

    /// 按偏好词选择
    pub fn preferred<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path_index: None,
            preferred: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// 是否为空提示
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.path_index.is_none() && self.preferred.is_empty()
    }
}

/// 转换链配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// 源 CRS
    pub source: String,
    /// 目标 CRS
    pub target: String,
    /// 节点序列（首尾在执行时替换为实际请求的源和目标）
    pub nodes: Vec<String>,
    /// 每条边的选择提示，`null` 表示使用成对偏好
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge_hints: Vec<Option<SelectionHint>>,
}

/// 成对偏好
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairHintConfig {
    /// 源 CRS
    pub source: String,
    /// 目标 CRS
    pub target: String,
    /// 提示
    #[serde(flatten)]
    pub hint: SelectionHint,
}

// ============================================================================
// 服务配置
// ============================================================================

/// 转换服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// 别名表
    #[serde(default = "default_aliases")]
    pub aliases: Vec<AliasConfig>,

    /// 转换链
    #[serde(default = "default_chains")]
    pub chains: Vec<ChainConfig>,

    /// 成对偏好
    #[serde(default)]
    pub pair_hints: Vec<PairHintConfig>,

    /// 局部偏移的全局参考框架
    #[serde(default = "default_global_frame")]
    pub global_frame: String,

    /// 候选集是否包含已取代的操作
    #[serde(default = "default_include_superseded")]
    pub include_superseded: bool,
}

fn default_global_frame() -> String { "EPSG:4979".to_string() }
fn default_include_superseded() -> bool { true }

fn default_aliases() -> Vec<AliasConfig> {
    vec![
        AliasConfig::new("WGS84", "EPSG:4326", None),
        AliasConfig::new("ETRS89", "EPSG:4258", None),
        AliasConfig::new("OSGB36", "EPSG:4277", None),
        AliasConfig::new("BNG", "EPSG:27700", None),
        AliasConfig::new("CGCS2000", "EPSG:4490", None),
        AliasConfig::new("WGS84-LONLAT", "+proj=longlat +datum=WGS84 +no_defs", Some("EPSG:4326")),
        AliasConfig::new(
            "OSGB36-LONLAT",
            "+proj=longlat +ellps=airy +towgs84=446.448,-125.157,542.06,0.15,0.247,0.842,-20.489 +no_defs",
            Some("EPSG:4277"),
        ),
        AliasConfig::new(
            "ED50-UTM31",
            "+proj=utm +zone=31 +ellps=intl +towgs84=-87,-98,-121 +units=m +no_defs",
            Some("EPSG:23031"),
        ),
    ]
}

fn default_chains() -> Vec<ChainConfig> {
    vec![ChainConfig {
        source: "EPSG:4326".to_string(),
        target: "EPSG:27700".to_string(),
        nodes: vec![
            "EPSG:4326".to_string(),
            "EPSG:4277".to_string(),
            "EPSG:27700".to_string(),
        ],
        edge_hints: vec![Some(SelectionHint::preferred(["Position Vector"])), None],
    }]
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            aliases: default_aliases(),
            chains: default_chains(),
            pair_hints: Vec::new(),
            global_frame: default_global_frame(),
            include_superseded: default_include_superseded(),
        }
    }
}

impl ServiceConfig {
    /// 不含别名、转换链和偏好的空配置
    #[must_use]
    pub fn empty() -> Self {
        Self {
            aliases: Vec::new(),
            chains: Vec::new(),
            pair_hints: Vec::new(),
            global_frame: default_global_frame(),
            include_superseded: default_include_superseded(),
        }
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json(&content)
    }

    /// 从 JSON 字符串解析配置
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, alias) in self.aliases.iter().enumerate() {
            if alias.token.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("aliases[{i}].token"),
                    &alias.token,
                    "别名记号不能为空",
                ));
            }
            if alias.definition.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("aliases[{i}].definition"),
                    &alias.definition,
                    "别名定义不能为空",
                ));
            }
        }

        let mut pairs = HashSet::new();
        for (i, chain) in self.chains.iter().enumerate() {
            if chain.nodes.len() < 2 {
                return Err(ConfigError::invalid(
                    format!("chains[{i}].nodes"),
                    chain.nodes.len().to_string(),
                    "转换链至少需要两个节点",
                ));
            }
            if chain.edge_hints.len() > chain.nodes.len() - 1 {
                return Err(ConfigError::invalid(
                    format!("chains[{i}].edge_hints"),
                    chain.edge_hints.len().to_string(),
                    "边提示数不能超过边数",
                ));
            }
            if !pairs.insert((chain.source.trim(), chain.target.trim())) {
                return Err(ConfigError::invalid(
                    format!("chains[{i}]"),
                    format!("{} → {}", chain.source, chain.target),
                    "重复的转换链",
                ));
            }
            for (j, hint) in chain.edge_hints.iter().enumerate() {
                if hint.as_ref().is_some_and(SelectionHint::is_empty) {
                    return Err(ConfigError::invalid(
                        format!("chains[{i}].edge_hints[{j}]"),
                        "{}",
                        "提示需要 path_index 或 preferred",
                    ));
                }
            }
        }

        for (i, pair) in self.pair_hints.iter().enumerate() {
            if pair.hint.is_empty() {
                return Err(ConfigError::invalid(
                    format!("pair_hints[{i}]"),
                    format!("{} → {}", pair.source, pair.target),
                    "提示需要 path_index 或 preferred",
                ));
            }
        }

        if self.global_frame.trim().is_empty() {
            return Err(ConfigError::invalid("global_frame", "", "全局参考框架不能为空"));
        }
        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.global_frame, "EPSG:4979");
        assert!(config.include_superseded);
        assert_eq!(config.chains.len(), 1);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = ServiceConfig::from_json("{}").expect("parse");
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_pair_hint_flatten() {
        let json = r#"{
            "chains": [],
            "pair_hints": [{"source": "EPSG:4326", "target": "EPSG:4230", "preferred": ["(23)"]}]
        }"#;
        let config = ServiceConfig::from_json(json).expect("parse");
        assert_eq!(config.pair_hints[0].hint.preferred, vec!["(23)".to_string()]);
        assert!(config.chains.is_empty());
    }

    #[test]
    fn test_invalid_chain() {
        let mut config = ServiceConfig::empty();
        config.chains.push(ChainConfig {
            source: "EPSG:4326".to_string(),
            target: "EPSG:27700".to_string(),
            nodes: vec!["EPSG:4326".to_string()],
            edge_hints: Vec::new(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_chain() {
        let mut config = ServiceConfig::default();
        config.chains.push(config.chains[0].clone());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_hint_rejected() {
        let mut config = ServiceConfig::empty();
        config.pair_hints.push(PairHintConfig {
            source: "EPSG:4326".to_string(),
            target: "EPSG:4277".to_string(),
            hint: SelectionHint::default(),
        });
        assert!(config.validate().is_err());

        config.pair_hints[0].hint = SelectionHint::index(0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_alias_token() {
        let mut config = ServiceConfig::empty();
        config.aliases.push(AliasConfig::new(" ", "EPSG:4326", None));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("cp_transform_config_{}.json", std::process::id()));
        let config = ServiceConfig::default();
        config.save_to_file(&path).expect("save");
        let loaded = ServiceConfig::from_file(&path).expect("load");
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded, config);
    }
}
