use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// 主状态码字段
pub const PRIMARY_STATUS_FIELD: &str = "response_code";
/// 主字段缺失时才使用的备用字段
pub const SECONDARY_STATUS_FIELD: &str = "http_code";

/// 以秒为单位、需要换算成毫秒的字段
pub const DURATION_FIELDS: [&str; 7] = [
    "time_total",
    "time_namelookup",
    "time_connect",
    "time_appconnect",
    "time_starttransfer",
    "time_pretransfer",
    "time_redirect",
];

pub const SIZE_DOWNLOAD_FIELD: &str = "size_download";

/// curl `%{json}` 输出的稀疏指标对象，原样保留
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(Map<String, Value>);

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析失败或不是 JSON 对象时返回空指标，不报错
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text.trim()) {
            Ok(Value::Object(map)) => Self(map),
            Ok(other) => {
                warn!(kind = %json_kind(&other), "metrics payload is not an object, ignoring");
                Self::default()
            }
            Err(e) => {
                warn!(error = %e, "failed to parse metrics payload, using empty metrics");
                Self::default()
            }
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// 数字字段；数字形式的字符串也接受
    pub fn number(&self, field: &str) -> Option<f64> {
        match self.0.get(field)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        resolve_status(self)
    }

    pub fn timings(&self) -> Timings {
        Timings::from_metrics(self)
    }
}

impl From<Map<String, Value>> for Metrics {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// 状态码解析：主字段存在时只看主字段，缺失时才看备用字段
///
/// 主字段为 null 视同缺失；主字段存在但值非法时结果是 None，不会退回到备用字段。
pub fn resolve_status(metrics: &Metrics) -> Option<u16> {
    let field = match metrics.get(PRIMARY_STATUS_FIELD) {
        None | Some(Value::Null) => SECONDARY_STATUS_FIELD,
        Some(_) => PRIMARY_STATUS_FIELD,
    };
    let code = metrics.number(field)?;
    if code.fract() != 0.0 || !(0.0..=f64::from(u16::MAX)).contains(&code) {
        return None;
    }
    Some(code as u16)
}

/// [200, 400) 视为成功，3xx 也算
pub fn is_success(status: Option<u16>) -> bool {
    matches!(status, Some(code) if (200..400).contains(&code))
}

/// 归一化后的耗时（毫秒）
///
/// 缺失的耗时字段记为 0，`size_download` 缺失时保持 None。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    pub total_ms: f64,
    pub dns_ms: f64,
    pub connect_ms: f64,
    pub tls_ms: f64,
    pub first_byte_ms: f64,
    pub pretransfer_ms: f64,
    pub redirect_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_download: Option<u64>,
}

impl Timings {
    pub fn from_metrics(metrics: &Metrics) -> Self {
        let ms = |field: &str| metrics.number(field).map(seconds_to_ms).unwrap_or(0.0);
        Self {
            total_ms: ms("time_total"),
            dns_ms: ms("time_namelookup"),
            connect_ms: ms("time_connect"),
            tls_ms: ms("time_appconnect"),
            first_byte_ms: ms("time_starttransfer"),
            pretransfer_ms: ms("time_pretransfer"),
            redirect_ms: ms("time_redirect"),
            size_download: metrics
                .number(SIZE_DOWNLOAD_FIELD)
                .filter(|n| *n >= 0.0)
                .map(|n| n as u64),
        }
    }
}

pub fn seconds_to_ms(seconds: f64) -> f64 {
    seconds * 1000.0
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
