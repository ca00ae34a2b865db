use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::capture::CapturedResponse;
use crate::compare::comparator::compare;
use crate::compare::types::{CompiledRules, DiffEntry, Facet};

/// 一次响应里可以参与比较的部分
///
/// 快照记录和刚捕获的响应都先转成这个形式，再交给比较器，
/// 规则里的路径因此统一写成 `status`、`headers.<name>`、`body.<path>`。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacetView {
    pub status: Option<u16>,
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<Value>,
}

impl FacetView {
    pub fn from_response(response: &CapturedResponse) -> Self {
        Self {
            status: response.status(),
            headers: Some(normalize_headers(&response.headers)),
            body: Some(body_value(&response.body)),
        }
    }

    /// 只保留 `facets` 中列出的部分；缺失的部分不出现在结果对象里
    pub fn to_value(&self, facets: &[Facet]) -> Value {
        let mut map = Map::new();
        for facet in facets {
            match facet {
                Facet::Status => {
                    if let Some(status) = self.status {
                        map.insert("status".to_string(), Value::from(status));
                    }
                }
                Facet::Headers => {
                    if let Some(headers) = &self.headers {
                        let obj = headers
                            .iter()
                            .map(|(k, v)| (k.to_ascii_lowercase(), Value::String(v.clone())))
                            .collect();
                        map.insert("headers".to_string(), Value::Object(obj));
                    }
                }
                Facet::Body => {
                    if let Some(body) = &self.body {
                        map.insert("body".to_string(), body.clone());
                    }
                }
            }
        }
        Value::Object(map)
    }
}

/// 比较两个视图中选定的部分
pub fn compare_views(
    previous: &FacetView,
    current: &FacetView,
    facets: &[Facet],
    rules: &CompiledRules,
) -> Vec<DiffEntry> {
    compare(&previous.to_value(facets), &current.to_value(facets), rules)
}

/// body 能解析成 JSON 就按结构比较，否则按整段字符串比较
pub fn body_value(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// header 名统一转小写，重复时保留排序靠后的那个
pub fn normalize_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
        .collect()
}
