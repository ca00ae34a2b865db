use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::compare::ComparisonRules;
use crate::condition::WhenCondition;
use crate::invocation::request::RequestSpec;
use crate::invocation::serialization::{ordered_map, scalar_string};
use crate::invocation::types::{FormField, HttpVersion, RedirectPolicy, RequestBody, TlsOptions};
use crate::{CurlcheckError, Result};

/// 编排器交给引擎的单个请求描述（camelCase，可直接从 JSON/YAML 反序列化）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub url: String,

    /// 追加到 URL 上的查询参数
    #[serde(
        default,
        deserialize_with = "scalar_string::deserialize",
        serialize_with = "ordered_map::serialize",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub params: Vec<(String, String)>,
    #[serde(
        default,
        deserialize_with = "scalar_string::deserialize",
        serialize_with = "ordered_map::serialize",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub headers: Vec<(String, String)>,

    /// 字符串按原样发送，其他 JSON 值按结构化 body 处理
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(
        default,
        with = "ordered_map",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub form: Vec<(String, FormValueConfig)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<PathBuf>,

    /// 毫秒
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_redirects: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<u32>,
    #[serde(default)]
    pub http2: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,

    /// 变量名 -> 响应中的来源路径
    #[serde(
        default,
        with = "ordered_map",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub store: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<WhenCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<ComparisonRules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<ComparisonRules>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FormValueConfig {
    File {
        file: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filename: Option<String>,
        #[serde(
            default,
            rename = "contentType",
            skip_serializing_if = "Option::is_none"
        )]
        content_type: Option<String>,
    },
    Scalar(serde_json::Value),
}

impl From<&FormValueConfig> for FormField {
    fn from(value: &FormValueConfig) -> Self {
        match value {
            FormValueConfig::File {
                file,
                filename,
                content_type,
            } => FormField::File {
                path: file.clone(),
                filename: filename.clone(),
                content_type: content_type.clone(),
            },
            FormValueConfig::Scalar(v) => FormField::Value(scalar_string::to_string(v)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    Basic {
        username: String,
        #[serde(default)]
        password: String,
    },
    Bearer {
        token: String,
    },
}

impl RequestConfig {
    /// 从 JSON 文本加载
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 日志和快照里使用的名字：没有 name 时退回到 `METHOD url`
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!(
                "{} {}",
                self.method.as_deref().unwrap_or("GET").to_uppercase(),
                self.url
            ),
        }
    }

    fn http_version_or_default(&self) -> Result<Option<HttpVersion>> {
        match &self.http_version {
            Some(v) => Ok(Some(v.parse()?)),
            None if self.http2 => Ok(Some(HttpVersion::Http2)),
            None => Ok(None),
        }
    }
}

/// 将 RequestConfig 转换为不可变的 RequestSpec
impl TryFrom<&RequestConfig> for RequestSpec {
    type Error = CurlcheckError;

    fn try_from(config: &RequestConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(CurlcheckError::InvalidRequest("url is empty".to_string()));
        }

        // 1. method + url
        let mut spec = RequestSpec::new(config.method.as_deref().unwrap_or("GET"), &config.url)?;
        if let Some(name) = &config.name {
            spec = spec.with_name(name);
        }

        // 2. query + headers
        for (key, value) in &config.params {
            spec = spec.with_query(key, value);
        }
        for (key, value) in &config.headers {
            spec = spec.with_header(key, value);
        }

        // 3. body / form
        match &config.body {
            None | Some(serde_json::Value::Null) => {}
            Some(serde_json::Value::String(text)) => spec = spec.with_text(text),
            Some(value) => spec = spec.with_body(RequestBody::Json(value.clone())),
        }
        for (name, value) in &config.form {
            spec = spec.with_form_field(name, value.into());
        }

        // 4. auth
        match &config.auth {
            Some(AuthConfig::Basic { username, password }) => {
                spec = spec.with_auth_basic(username, password)
            }
            Some(AuthConfig::Bearer { token }) => spec = spec.with_auth_bearer(token),
            None => {}
        }

        // 5. 连接选项
        if let Some(proxy) = &config.proxy {
            spec = spec.with_proxy(proxy);
        }
        spec = spec.with_tls(TlsOptions {
            insecure: config.insecure,
            ca_cert: config.ca_cert.clone(),
            client_cert: config.client_cert.clone(),
            client_key: config.client_key.clone(),
        });
        if let Some(ms) = config.timeout {
            spec = spec.with_timeout(Duration::from_millis(ms));
        }
        spec = spec.with_redirects(RedirectPolicy {
            follow: config.follow_redirects.unwrap_or(false),
            max_redirects: config.max_redirects,
        });
        if let Some(version) = config.http_version_or_default()? {
            spec = spec.with_http_version(version);
        }
        if let Some(output) = &config.output {
            spec = spec.with_output(output.clone());
        }

        Ok(spec)
    }
}

impl TryFrom<RequestConfig> for RequestSpec {
    type Error = CurlcheckError;

    fn try_from(config: RequestConfig) -> Result<Self> {
        RequestSpec::try_from(&config)
    }
}
