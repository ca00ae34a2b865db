use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CurlcheckError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl FromStr for Method {
    type Err = CurlcheckError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(CurlcheckError::ParseError(format!(
                "Invalid HTTP method: {}",
                s
            ))),
        }
    }
}

impl Method {
    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 协议版本，对应 curl 的 --http1.0 / --http1.1 / --http2 / --http3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http1_0,
    Http1_1,
    Http2,
    Http3,
}

impl HttpVersion {
    pub fn flag(&self) -> &'static str {
        match self {
            HttpVersion::Http1_0 => "--http1.0",
            HttpVersion::Http1_1 => "--http1.1",
            HttpVersion::Http2 => "--http2",
            HttpVersion::Http3 => "--http3",
        }
    }
}

impl FromStr for HttpVersion {
    type Err = CurlcheckError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().trim_start_matches("http").trim_start_matches('/') {
            "1.0" | "1" => Ok(HttpVersion::Http1_0),
            "1.1" => Ok(HttpVersion::Http1_1),
            "2" | "2.0" => Ok(HttpVersion::Http2),
            "3" | "3.0" => Ok(HttpVersion::Http3),
            _ => Err(CurlcheckError::ParseError(format!(
                "Invalid HTTP version: {}",
                s
            ))),
        }
    }
}

/// 认证方式
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Auth {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer {
        token: String,
    },
}

/// multipart 表单字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    /// 普通文本值
    Value(String),
    /// 文件引用：路径 + 可选的文件名覆盖 + 可选的 content-type
    File {
        path: PathBuf,
        filename: Option<String>,
        content_type: Option<String>,
    },
}

impl FormField {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        FormField::File {
            path: path.into(),
            filename: None,
            content_type: None,
        }
    }
}

/// 请求体
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// 原样发送的字符串
    Raw(String),
    /// 结构化值，发送前序列化为 JSON
    Json(serde_json::Value),
}

impl RequestBody {
    /// 交给外部进程的最终文本
    ///
    /// serde_json 的 Map 默认是 BTreeMap，序列化时 key 顺序稳定。
    pub fn to_payload(&self) -> String {
        match self {
            RequestBody::Raw(text) => text.clone(),
            RequestBody::Json(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TlsOptions {
    pub insecure: bool,
    pub ca_cert: Option<PathBuf>,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedirectPolicy {
    pub follow: bool,
    pub max_redirects: Option<u32>,
}

/// 有序 header 表
///
/// key 唯一（区分大小写，按调用方给出的原样比较），重复写入时后者覆盖前者，位置保持不变。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(" PATCH ".parse::<Method>().unwrap(), Method::Patch);
        assert!("FETCH".parse::<Method>().is_err());
    }

    #[test]
    fn test_http_version_from_str() {
        assert_eq!("2".parse::<HttpVersion>().unwrap(), HttpVersion::Http2);
        assert_eq!("HTTP/1.1".parse::<HttpVersion>().unwrap(), HttpVersion::Http1_1);
        assert_eq!("http3".parse::<HttpVersion>().unwrap(), HttpVersion::Http3);
        assert!("spdy".parse::<HttpVersion>().is_err());
    }

    #[test]
    fn test_headers_last_write_wins() {
        let mut headers = Headers::new();
        headers.insert("Accept", "text/plain");
        headers.insert("X-Trace", "1");
        headers.insert("Accept", "application/json");

        let entries: Vec<_> = headers.iter().collect();
        assert_eq!(
            entries,
            vec![("Accept", "application/json"), ("X-Trace", "1")]
        );
    }

    #[test]
    fn test_headers_are_case_sensitive() {
        let mut headers = Headers::new();
        headers.insert("content-type", "text/plain");
        assert!(headers.contains("content-type"));
        assert!(!headers.contains("Content-Type"));
    }

    #[test]
    fn test_json_body_has_stable_key_order() {
        let body = RequestBody::Json(serde_json::json!({"b": 1, "a": {"d": 2, "c": 3}}));
        assert_eq!(body.to_payload(), r#"{"a":{"c":3,"d":2},"b":1}"#);
    }
}
