use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::{CurlcheckError, Result};
use crate::invocation::types::{
    Auth, FormField, Headers, HttpVersion, Method, RedirectPolicy, RequestBody, TlsOptions,
};

/// 一个逻辑请求的完整描述
///
/// 通过 `with_*` 链式构建，构建完成后不再修改。
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    name: Option<String>,
    method: Method,
    url: url::Url,
    headers: Headers,
    body: Option<RequestBody>,
    form: Vec<(String, FormField)>,
    auth: Auth,
    proxy: Option<String>,
    tls: TlsOptions,
    timeout: Option<Duration>,
    redirects: RedirectPolicy,
    http_version: Option<HttpVersion>,
    output: Option<PathBuf>,
}

impl RequestSpec {
    /// 默认 host，当 URL 中未指定 host 时使用
    const DEFAULT_HOST: &'static str = "localhost";
    /// 默认 scheme，当 URL 中未指定 scheme 时使用
    const DEFAULT_SCHEME: &'static str = "http";

    pub fn new(method: &str, url: &str) -> Result<Self> {
        Ok(Self {
            name: None,
            method: method.parse()?,
            url: url::Url::parse(&Self::normalize_url(url))
                .map_err(|e| CurlcheckError::InvalidUrl(format!("{}: {}", url.trim(), e)))?,
            headers: Headers::new(),
            body: None,
            form: Vec::new(),
            auth: Auth::None,
            proxy: None,
            tls: TlsOptions::default(),
            timeout: None,
            redirects: RedirectPolicy::default(),
            http_version: None,
            output: None,
        })
    }

    /// 处理各种简化格式:
    /// 1. ":3000" -> "http://localhost:3000"
    /// 2. "localhost:3000" -> "http://localhost:3000"
    /// 3. "https://:8080" -> "https://localhost:8080"
    fn normalize_url(input: &str) -> String {
        let input = input.trim();
        if input.starts_with(':') {
            format!("{}://{}{}", Self::DEFAULT_SCHEME, Self::DEFAULT_HOST, input)
        } else if !input.contains("://") {
            format!("{}://{}", Self::DEFAULT_SCHEME, input)
        } else if let Some(pos) = input.find("://") {
            let after_scheme = &input[pos + 3..];
            if after_scheme.starts_with(':') {
                format!("{}://{}{}", &input[..pos], Self::DEFAULT_HOST, after_scheme)
            } else {
                input.to_string()
            }
        } else {
            input.to_string()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.body = Some(RequestBody::Raw(text.to_owned()));
        self
    }

    pub fn with_json<T: Serialize>(mut self, data: &T) -> Result<Self> {
        self.body = Some(RequestBody::Json(serde_json::to_value(data)?));
        Ok(self)
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_form_field(mut self, name: &str, field: FormField) -> Self {
        self.form.push((name.to_string(), field));
        self
    }

    pub fn with_auth_basic(mut self, username: &str, password: &str) -> Self {
        self.auth = Auth::Basic {
            username: username.to_string(),
            password: password.to_string(),
        };
        self
    }

    pub fn with_auth_bearer(mut self, token: &str) -> Self {
        self.auth = Auth::Bearer {
            token: token.to_string(),
        };
        self
    }

    pub fn with_proxy(mut self, proxy: &str) -> Self {
        self.proxy = Some(proxy.to_string());
        self
    }

    pub fn with_tls(mut self, tls: TlsOptions) -> Self {
        self.tls = tls;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_redirects(mut self, redirects: RedirectPolicy) -> Self {
        self.redirects = redirects;
        self
    }

    pub fn with_http_version(mut self, version: HttpVersion) -> Self {
        self.http_version = Some(version);
        self
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn form(&self) -> &[(String, FormField)] {
        &self.form
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn tls(&self) -> &TlsOptions {
        &self.tls
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn redirects(&self) -> RedirectPolicy {
        self.redirects
    }

    pub fn http_version(&self) -> Option<HttpVersion> {
        self.http_version
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_shorthand_urls() {
        let spec = RequestSpec::new("get", ":3000/health").unwrap();
        assert_eq!(spec.url().as_str(), "http://localhost:3000/health");

        let spec = RequestSpec::new("GET", "example.com/api").unwrap();
        assert_eq!(spec.url().as_str(), "http://example.com/api");

        let spec = RequestSpec::new("GET", "https://:8443/").unwrap();
        assert_eq!(spec.url().as_str(), "https://localhost:8443/");
    }

    #[test]
    fn test_new_rejects_invalid_method() {
        assert!(RequestSpec::new("SEND", "https://example.com").is_err());
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(matches!(
            RequestSpec::new("GET", "http://exa mple.com"),
            Err(CurlcheckError::InvalidUrl(msg)) if msg.starts_with("http://exa mple.com")
        ));
        assert!(matches!(
            RequestSpec::new("GET", ""),
            Err(CurlcheckError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_with_query_appends_encoded_pairs() {
        let spec = RequestSpec::new("GET", "https://example.com/search?page=1")
            .unwrap()
            .with_query("q", "a b");
        assert_eq!(spec.url().as_str(), "https://example.com/search?page=1&q=a+b");
    }

    #[test]
    fn test_with_json_keeps_structured_body() {
        let spec = RequestSpec::new("POST", "https://example.com")
            .unwrap()
            .with_json(&serde_json::json!({"name": "test"}))
            .unwrap();
        assert!(matches!(spec.body(), Some(RequestBody::Json(_))));
        // 结构化 body 不会在这里补 Content-Type，交给 builder 决定
        assert!(spec.headers().is_empty());
    }
}
