use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::compare::path::{PathPattern, Segment};

/// `match` 规则里表示“任意值都相等”的字面量
pub const MATCH_ANY: &str = "*";
/// `match` 规则里正则的前缀：`regex:<pattern>`
pub const REGEX_PREFIX: &str = "regex:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffKind {
    Added,
    Removed,
    Changed,
    TypeMismatch,
}

impl DiffKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffKind::Added => "added",
            DiffKind::Removed => "removed",
            DiffKind::Changed => "changed",
            DiffKind::TypeMismatch => "type_mismatch",
        }
    }
}

impl fmt::Display for DiffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一条差异
///
/// `baseline`/`current` 为 None 表示该侧不存在这个路径（不同于 JSON null）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Value>,
    pub kind: DiffKind,
}

/// 参与比较的顶层部分
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Status,
    Headers,
    Body,
}

impl Facet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facet::Status => "status",
            Facet::Headers => "headers",
            Facet::Body => "body",
        }
    }
}

impl std::str::FromStr for Facet {
    type Err = crate::CurlcheckError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(Facet::Status),
            "headers" => Ok(Facet::Headers),
            "body" => Ok(Facet::Body),
            _ => Err(crate::CurlcheckError::ParseError(format!(
                "Unknown facet: {}",
                s
            ))),
        }
    }
}

/// 快照测试默认只比较 status 和 body
pub const SNAPSHOT_DEFAULT_FACETS: [Facet; 2] = [Facet::Status, Facet::Body];
/// 基线对比默认比较全部三部分
pub const BASELINE_DEFAULT_FACETS: [Facet; 3] = [Facet::Status, Facet::Headers, Facet::Body];

/// 比较规则（配置文件 / 请求级别的原始形式）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
    #[serde(
        default,
        rename = "match",
        skip_serializing_if = "Option::is_none"
    )]
    pub match_rules: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<Facet>>,
}

impl ComparisonRules {
    /// 请求级规则逐字段覆盖全局规则：请求声明了哪个字段，哪个字段就整体替换
    pub fn overridden_by(&self, request: Option<&ComparisonRules>) -> ComparisonRules {
        let Some(request) = request else {
            return self.clone();
        };
        ComparisonRules {
            exclude: request.exclude.clone().or_else(|| self.exclude.clone()),
            match_rules: request
                .match_rules
                .clone()
                .or_else(|| self.match_rules.clone()),
            include: request.include.clone().or_else(|| self.include.clone()),
        }
    }

    pub fn facets(&self, default: &[Facet]) -> Vec<Facet> {
        match &self.include {
            Some(include) => include.clone(),
            None => default.to_vec(),
        }
    }

    /// 编译路径模式和正则；无效的模式记录告警后跳过
    pub fn compile(&self) -> CompiledRules {
        let exclude = self
            .exclude
            .iter()
            .flatten()
            .filter_map(|p| match PathPattern::parse(p) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(error = %e, "skipping exclude pattern");
                    None
                }
            })
            .collect();

        let matches = self
            .match_rules
            .iter()
            .flatten()
            .filter_map(|(p, value)| {
                let pattern = match PathPattern::parse(p) {
                    Ok(pattern) => pattern,
                    Err(e) => {
                        warn!(error = %e, "skipping match pattern");
                        return None;
                    }
                };
                let rule = MatchRule::parse(value)?;
                Some((pattern, rule))
            })
            .collect();

        CompiledRules { exclude, matches }
    }
}

/// 单条 match 规则
#[derive(Debug, Clone)]
pub enum MatchRule {
    /// `*`
    Any,
    /// `regex:<pattern>`；无效正则保存为 None，永远不匹配
    Pattern(Option<Regex>),
}

impl MatchRule {
    pub fn parse(value: &str) -> Option<Self> {
        if value == MATCH_ANY {
            return Some(MatchRule::Any);
        }
        match value.strip_prefix(REGEX_PREFIX) {
            Some(pattern) => match Regex::new(pattern) {
                Ok(re) => Some(MatchRule::Pattern(Some(re))),
                Err(e) => {
                    warn!(pattern, error = %e, "invalid regex in match rule, it will never match");
                    Some(MatchRule::Pattern(None))
                }
            },
            None => {
                warn!(value, "unsupported match value, expected '*' or 'regex:<pattern>'");
                None
            }
        }
    }
}

/// 编译后的规则，比较时直接使用
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    exclude: Vec<PathPattern>,
    matches: Vec<(PathPattern, MatchRule)>,
}

impl CompiledRules {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_excluded(&self, path: &[Segment]) -> bool {
        self.exclude.iter().any(|p| p.matches(path))
    }

    /// 第一条命中的 match 规则
    pub fn match_rule(&self, path: &[Segment]) -> Option<&MatchRule> {
        self.matches
            .iter()
            .find(|(p, _)| p.matches(path))
            .map(|(_, rule)| rule)
    }
}

impl From<&ComparisonRules> for CompiledRules {
    fn from(rules: &ComparisonRules) -> Self {
        rules.compile()
    }
}
