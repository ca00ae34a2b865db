use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::condition::parser::parse_condition;

/// 条件表达式错误类型
///
/// 只有解析阶段会失败，求值永远返回布尔值。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("Invalid condition syntax: {0}")]
    InvalidSyntax(String),

    #[error("Invalid operator: {0}")]
    InvalidOperator(String),
}

/// 条件运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionOp {
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "matches")]
    Matches,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "not-exists")]
    NotExists,
}

impl ConditionOp {
    /// 简写解析时的尝试顺序：同一位置上长的先试，`>=` 不会被拆成 `>` 和 `=`
    pub const SCAN_ORDER: [ConditionOp; 10] = [
        ConditionOp::NotExists,
        ConditionOp::Contains,
        ConditionOp::Matches,
        ConditionOp::Exists,
        ConditionOp::GreaterOrEqual,
        ConditionOp::LessOrEqual,
        ConditionOp::Equal,
        ConditionOp::NotEqual,
        ConditionOp::Greater,
        ConditionOp::Less,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "==" => Some(Self::Equal),
            "!=" => Some(Self::NotEqual),
            ">" => Some(Self::Greater),
            "<" => Some(Self::Less),
            ">=" => Some(Self::GreaterOrEqual),
            "<=" => Some(Self::LessOrEqual),
            "contains" => Some(Self::Contains),
            "matches" => Some(Self::Matches),
            "exists" => Some(Self::Exists),
            "not-exists" => Some(Self::NotExists),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
            Self::Contains => "contains",
            Self::Matches => "matches",
            Self::Exists => "exists",
            Self::NotExists => "not-exists",
        }
    }

    /// 单词形式的运算符两侧必须是空白
    pub fn is_word(&self) -> bool {
        self.as_str().starts_with(|c: char| c.is_ascii_alphabetic())
    }

    /// 不需要右操作数
    pub fn is_unary(&self) -> bool {
        matches!(self, Self::Exists | Self::NotExists)
    }
}

impl fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单个比较
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionExpression {
    pub left: String,
    pub operator: ConditionOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub case_sensitive: bool,
}

impl ConditionExpression {
    pub fn new(left: impl Into<String>, operator: ConditionOp, right: Option<String>) -> Self {
        Self {
            left: left.into(),
            operator,
            right,
            case_sensitive: false,
        }
    }

    pub fn case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }
}

impl fmt::Display for ConditionExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.right {
            Some(right) => write!(f, "{} {} {}", self.left, self.operator, right),
            None => write!(f, "{} {}", self.left, self.operator),
        }
    }
}

/// `when` 条件
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WhenCondition {
    Single(ConditionExpression),
    /// 遇到第一个 false 就停止
    All(Vec<ConditionExpression>),
    /// 遇到第一个 true 就停止
    Any(Vec<ConditionExpression>),
    /// 没有任何条件，恒为 true
    #[default]
    Always,
}

impl WhenCondition {
    pub fn parse(input: &str) -> Result<Self, ConditionError> {
        Ok(WhenCondition::Single(parse_condition(input)?))
    }
}

/// 配置里的表达式既可以是对象，也可以是简写字符串
#[derive(Deserialize)]
#[serde(untagged)]
enum RawExpression {
    Shorthand(String),
    Object(RawObject),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawObject {
    #[serde(default)]
    left: Option<String>,
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    right: Option<serde_json::Value>,
    #[serde(default)]
    case_sensitive: Option<bool>,
    #[serde(default)]
    all: Option<Vec<RawExpression>>,
    #[serde(default)]
    any: Option<Vec<RawExpression>>,
}

impl RawExpression {
    fn into_expression(self) -> Result<ConditionExpression, ConditionError> {
        match self {
            RawExpression::Shorthand(text) => parse_condition(&text),
            RawExpression::Object(mut obj) => {
                let left = obj.left.take().ok_or_else(|| {
                    ConditionError::InvalidSyntax("expression is missing 'left'".to_string())
                })?;
                obj.into_single(left)
            }
        }
    }
}

impl RawObject {
    fn into_single(self, left: String) -> Result<ConditionExpression, ConditionError> {
        let op_str = self.operator.ok_or_else(|| {
            ConditionError::InvalidSyntax(format!("expression on '{}' is missing 'operator'", left))
        })?;
        let operator = ConditionOp::parse(op_str.trim())
            .ok_or_else(|| ConditionError::InvalidOperator(op_str.clone()))?;
        let right = match self.right {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s),
            Some(other) => Some(other.to_string()),
        };
        if right.is_none() && !operator.is_unary() {
            return Err(ConditionError::InvalidSyntax(format!(
                "operator '{}' requires a right operand",
                operator
            )));
        }
        Ok(ConditionExpression {
            left,
            operator,
            right,
            case_sensitive: self.case_sensitive.unwrap_or(false),
        })
    }

    /// `all` 优先于 `any`，两者都没有时看 `left`，都没有就是恒真
    fn into_when(mut self) -> Result<WhenCondition, ConditionError> {
        if let Some(all) = self.all.take() {
            return Ok(WhenCondition::All(collect(all)?));
        }
        if let Some(any) = self.any.take() {
            return Ok(WhenCondition::Any(collect(any)?));
        }
        match self.left.take() {
            Some(left) => Ok(WhenCondition::Single(self.into_single(left)?)),
            None => Ok(WhenCondition::Always),
        }
    }
}

fn collect(items: Vec<RawExpression>) -> Result<Vec<ConditionExpression>, ConditionError> {
    items.into_iter().map(RawExpression::into_expression).collect()
}

impl<'de> Deserialize<'de> for WhenCondition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawExpression::deserialize(deserializer)?;
        let when = match raw {
            RawExpression::Shorthand(text) => {
                if text.trim().is_empty() {
                    Ok(WhenCondition::Always)
                } else {
                    WhenCondition::parse(&text)
                }
            }
            RawExpression::Object(obj) => obj.into_when(),
        };
        when.map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for ConditionExpression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawExpression::deserialize(deserializer)?
            .into_expression()
            .map_err(de::Error::custom)
    }
}

impl Serialize for WhenCondition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            WhenCondition::Single(expr) => expr.serialize(serializer),
            WhenCondition::All(list) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("all", list)?;
                map.end()
            }
            WhenCondition::Any(list) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("any", list)?;
                map.end()
            }
            WhenCondition::Always => serializer.serialize_map(Some(0))?.end(),
        }
    }
}
