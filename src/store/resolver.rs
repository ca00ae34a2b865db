use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::invocation::{AuthConfig, FormValueConfig, RequestConfig};
use crate::store::context::StoreContext;

static STORE_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*store\.([A-Za-z_][A-Za-z0-9_\-]*)\s*\}\}").expect("valid store regex")
});

/// 替换文本中的所有 `{{store.name}}` 占位符
///
/// 未知的变量保持原样。
pub fn interpolate(text: &str, context: &StoreContext) -> String {
    STORE_REF
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            context.get(name).unwrap_or(&caps[0]).to_string()
        })
        .into_owned()
}

/// 递归替换 JSON 值里所有字符串中的占位符（只替换值，不替换 key）
pub fn interpolate_value(value: &Value, context: &StoreContext) -> Value {
    match value {
        Value::String(s) => Value::String(interpolate(s, context)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| interpolate_value(item, context))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), interpolate_value(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// 返回替换了 url、params、headers、body、form、auth 和 proxy 中占位符的新配置
pub fn interpolate_request(config: &RequestConfig, context: &StoreContext) -> RequestConfig {
    let pairs = |entries: &[(String, String)]| -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.clone(), interpolate(v, context)))
            .collect()
    };

    RequestConfig {
        url: interpolate(&config.url, context),
        params: pairs(&config.params),
        headers: pairs(&config.headers),
        body: config.body.as_ref().map(|b| interpolate_value(b, context)),
        form: config
            .form
            .iter()
            .map(|(name, value)| {
                let value = match value {
                    FormValueConfig::Scalar(v) => FormValueConfig::Scalar(interpolate_value(v, context)),
                    file => file.clone(),
                };
                (name.clone(), value)
            })
            .collect(),
        auth: config.auth.as_ref().map(|auth| match auth {
            AuthConfig::Basic { username, password } => AuthConfig::Basic {
                username: interpolate(username, context),
                password: interpolate(password, context),
            },
            AuthConfig::Bearer { token } => AuthConfig::Bearer {
                token: interpolate(token, context),
            },
        }),
        proxy: config.proxy.as_deref().map(|p| interpolate(p, context)),
        ..config.clone()
    }
}
