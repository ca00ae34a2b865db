use serde_json::Value;
use tracing::debug;

use crate::capture::CapturedResponse;
use crate::compare::facets::body_value;
use crate::compare::path::{Segment, lookup, parse_path};
use crate::store::context::StoreContext;
use crate::{CurlcheckError, Result};

/// `store` 指令的取值来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSource {
    /// 最终状态码
    Status,
    /// 响应头，名字不区分大小写
    /// 示例: headers.x-trace-id
    Header(String),
    /// 整个 body 原文
    Body,
    /// body JSON 中的路径
    /// 示例: body.user.id, body.items[0].name
    BodyPath(Vec<Segment>),
    /// curl 指标原始字段
    /// 示例: metrics.time_total
    Metric(String),
}

impl StoreSource {
    /// 解析来源字符串
    ///
    /// 语法:
    /// - `status`
    /// - `headers.X-Token`（也接受 `header.X-Token`）
    /// - `body` / `body.user.id`
    /// - `metrics.time_total`
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        if source == "status" {
            return Ok(StoreSource::Status);
        }
        if source == "body" {
            return Ok(StoreSource::Body);
        }
        if let Some(name) = source
            .strip_prefix("headers.")
            .or_else(|| source.strip_prefix("header."))
        {
            return Ok(StoreSource::Header(name.to_string()));
        }
        if let Some(path) = source.strip_prefix("body.") {
            return Ok(StoreSource::BodyPath(parse_path(path)?));
        }
        if let Some(field) = source.strip_prefix("metrics.") {
            return Ok(StoreSource::Metric(field.to_string()));
        }
        Err(CurlcheckError::ParseError(format!(
            "Invalid store source: {}. Must be 'status', 'headers.<name>', 'body', 'body.<path>' or 'metrics.<field>'",
            source
        )))
    }

    /// 从响应中取值；取不到时返回 None
    pub fn extract(&self, response: &CapturedResponse) -> Option<String> {
        match self {
            StoreSource::Status => response.status().map(|s| s.to_string()),
            StoreSource::Header(name) => response.header(name).map(str::to_string),
            StoreSource::Body => Some(response.body.clone()),
            StoreSource::BodyPath(path) => {
                let body = body_value(&response.body);
                lookup(&body, path).map(stringify)
            }
            StoreSource::Metric(field) => response.metrics.get(field).map(stringify),
        }
    }
}

/// 单条 `store` 指令：变量名 + 来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreDirective {
    pub name: String,
    pub source: StoreSource,
}

impl StoreDirective {
    pub fn parse(name: &str, source: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(CurlcheckError::ParseError(
                "store variable name is empty".to_string(),
            ));
        }
        Ok(Self {
            name: name.trim().to_string(),
            source: StoreSource::parse(source)?,
        })
    }

    /// 解析请求配置里的全部 `store` 指令（保持声明顺序）
    pub fn parse_all(entries: &[(String, String)]) -> Result<Vec<Self>> {
        entries
            .iter()
            .map(|(name, source)| Self::parse(name, source))
            .collect()
    }
}

/// 依次执行 `store` 指令，写入上下文；取不到的值写入空串
pub fn apply_store(
    directives: &[StoreDirective],
    response: &CapturedResponse,
    context: &mut StoreContext,
) {
    for directive in directives {
        let value = directive.source.extract(response).unwrap_or_default();
        debug!(name = %directive.name, value = %value, "store");
        context.insert(directive.name.clone(), value);
    }
}

/// 字符串取原文，null 为空串，其他值取 JSON 文本
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::Metrics;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn response() -> CapturedResponse {
        let mut metrics = Metrics::new();
        metrics.insert("response_code", json!(201));
        metrics.insert("time_total", json!(0.5));
        CapturedResponse {
            body: r#"{"token":"abc","user":{"id":42,"tags":["a","b"]},"none":null}"#.to_string(),
            metrics,
            headers: BTreeMap::from([("X-Trace-Id".to_string(), "t-1".to_string())]),
        }
    }

    #[test]
    fn test_parse_sources() {
        assert_eq!(StoreSource::parse("status").unwrap(), StoreSource::Status);
        assert_eq!(StoreSource::parse("body").unwrap(), StoreSource::Body);
        assert_eq!(
            StoreSource::parse("header.X-Token").unwrap(),
            StoreSource::Header("X-Token".to_string())
        );
        assert_eq!(
            StoreSource::parse("metrics.time_total").unwrap(),
            StoreSource::Metric("time_total".to_string())
        );
        assert!(matches!(
            StoreSource::parse("body.items[0].id").unwrap(),
            StoreSource::BodyPath(_)
        ));
        assert!(StoreSource::parse("cookie.session").is_err());
        assert!(StoreSource::parse("body.items[*]").is_err());
    }

    #[test]
    fn test_extract_values() {
        let r = response();
        let extract = |s: &str| StoreSource::parse(s).unwrap().extract(&r);

        assert_eq!(extract("status").as_deref(), Some("201"));
        assert_eq!(extract("headers.x-trace-id").as_deref(), Some("t-1"));
        assert_eq!(extract("body.token").as_deref(), Some("abc"));
        assert_eq!(extract("body.user.id").as_deref(), Some("42"));
        assert_eq!(extract("body.user.tags").as_deref(), Some(r#"["a","b"]"#));
        assert_eq!(extract("body.user.tags[1]").as_deref(), Some("b"));
        assert_eq!(extract("body.none").as_deref(), Some(""));
        assert_eq!(extract("metrics.time_total").as_deref(), Some("0.5"));
        assert_eq!(extract("body.missing"), None);
    }

    #[test]
    fn test_apply_store_writes_in_order() {
        let directives = StoreDirective::parse_all(&[
            ("token".to_string(), "body.token".to_string()),
            ("code".to_string(), "status".to_string()),
            ("gone".to_string(), "body.nope".to_string()),
        ])
        .unwrap();

        let mut context = StoreContext::new();
        context.insert("code", "old");
        apply_store(&directives, &response(), &mut context);

        let entries: Vec<_> = context.iter().collect();
        assert_eq!(entries, vec![("code", "201"), ("token", "abc"), ("gone", "")]);
    }
}
