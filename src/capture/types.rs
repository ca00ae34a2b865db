use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::capture::headers::find_header;
use crate::capture::metrics::{Metrics, Timings, is_success};

/// 外部进程的两路输出：stdout（body + marker）和 stderr（`-v` 诊断信息）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCapture {
    pub stdout: String,
    pub stderr: String,
}

impl RawCapture {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// 一次请求（一次尝试）的结果，创建后不再修改；重试会产生新的实例
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    pub body: String,
    pub metrics: Metrics,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl CapturedResponse {
    pub fn status(&self) -> Option<u16> {
        self.metrics.status()
    }

    pub fn is_success(&self) -> bool {
        is_success(self.status())
    }

    pub fn timings(&self) -> Timings {
        self.metrics.timings()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// body 能解析成 JSON 时返回解析结果
    pub fn json_body(&self) -> Option<serde_json::Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// Demux 的结果：`found = false` 表示这一路没有找到完整的 marker 对
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Demuxed {
    pub found: bool,
    pub response: CapturedResponse,
}
