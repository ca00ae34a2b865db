use std::fmt;

use serde_json::Value;

use crate::{CurlcheckError, Result};

/// 具体路径上的一段：对象字段或数组下标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// 把具体路径格式化成规范写法：`a.b`、`items[0]`、根数组 `[0]`，根路径为空串
///
/// key 原样写入，不做转义：包含 `.` 或 `[` 的 key（如 `{"a.b": 1}`）得到的路径
/// 与嵌套路径 `a.b` 无法区分，exclude / match 模式也无法单独指向它。
pub fn format_path(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Key(String),
    Index(usize),
    /// `*`：这个位置上的任意字段或任意下标
    Wildcard,
}

/// exclude / match 规则里的路径模式
///
/// 和具体路径逐段比较，段数必须相同。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut key = String::new();
        let mut chars = pattern.trim().chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => {
                    if key.is_empty() {
                        // `a[0].b` 中 `]` 之后的点是合法的
                        if !matches!(
                            segments.last(),
                            Some(PatternSegment::Index(_) | PatternSegment::Wildcard)
                        ) {
                            return Err(invalid(pattern, "empty field name"));
                        }
                    } else {
                        segments.push(key_segment(std::mem::take(&mut key)));
                    }
                }
                '[' => {
                    if !key.is_empty() {
                        segments.push(key_segment(std::mem::take(&mut key)));
                    }
                    let mut inner = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(ch) => inner.push(ch),
                            None => return Err(invalid(pattern, "unclosed '['")),
                        }
                    }
                    let inner = inner.trim();
                    if inner == "*" {
                        segments.push(PatternSegment::Wildcard);
                    } else {
                        let index = inner
                            .parse::<usize>()
                            .map_err(|_| invalid(pattern, "array index must be a number or '*'"))?;
                        segments.push(PatternSegment::Index(index));
                    }
                }
                ']' => return Err(invalid(pattern, "unexpected ']'")),
                _ => key.push(c),
            }
        }
        if !key.is_empty() {
            segments.push(key_segment(key));
        } else if pattern.trim().ends_with('.') {
            return Err(invalid(pattern, "trailing '.'"));
        }

        Ok(Self {
            source: pattern.trim().to_string(),
            segments,
        })
    }

    pub fn matches(&self, path: &[Segment]) -> bool {
        self.segments.len() == path.len()
            && self
                .segments
                .iter()
                .zip(path)
                .all(|(pattern, segment)| match (pattern, segment) {
                    (PatternSegment::Wildcard, _) => true,
                    (PatternSegment::Key(a), Segment::Key(b)) => a == b,
                    (PatternSegment::Index(a), Segment::Index(b)) => a == b,
                    _ => false,
                })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// 解析不含通配符的具体路径，例如 `user.items[0].id`
pub fn parse_path(path: &str) -> Result<Vec<Segment>> {
    PathPattern::parse(path)?
        .segments
        .into_iter()
        .map(|segment| match segment {
            PatternSegment::Key(key) => Ok(Segment::Key(key)),
            PatternSegment::Index(index) => Ok(Segment::Index(index)),
            PatternSegment::Wildcard => Err(invalid(path, "wildcard is not allowed here")),
        })
        .collect()
}

/// 按具体路径取值；数组上的数字字段名（`items.0`）按下标处理
pub fn lookup<'a>(value: &'a Value, path: &[Segment]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| match (current, segment) {
        (Value::Object(map), Segment::Key(key)) => map.get(key),
        (Value::Array(items), Segment::Index(index)) => items.get(*index),
        (Value::Array(items), Segment::Key(key)) => items.get(key.parse::<usize>().ok()?),
        _ => None,
    })
}

fn key_segment(key: String) -> PatternSegment {
    if key == "*" {
        PatternSegment::Wildcard
    } else {
        PatternSegment::Key(key)
    }
}

fn invalid(pattern: &str, reason: &str) -> CurlcheckError {
    CurlcheckError::ParseError(format!("Invalid path pattern '{}': {}", pattern, reason))
}
