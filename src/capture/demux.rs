use tracing::{debug, warn};

use crate::capture::headers::parse_headers;
use crate::capture::metrics::Metrics;
use crate::capture::types::{CapturedResponse, Demuxed, RawCapture};
use crate::invocation::{InvocationPlan, Marker, Sentinels};

/// 单请求模式
///
/// 找不到完整的 marker 对时整段输出（trim 后）就是 body，指标为空。
/// 这不是错误：外部进程中途崩溃时就会出现这种输出。
pub fn demux_single(raw: &RawCapture, marker: &Marker) -> Demuxed {
    let text = raw.stdout.as_str();
    let headers = parse_headers(&raw.stderr);

    match locate(text, marker) {
        Some(span) => {
            let response = CapturedResponse {
                body: text[..span.start].trim().to_string(),
                metrics: Metrics::parse(&text[span.payload_start..span.payload_end]),
                headers,
            };
            debug!(body_len = response.body.len(), "demuxed single response");
            Demuxed {
                found: true,
                response,
            }
        }
        None => {
            debug!("markers not found, treating whole output as body");
            Demuxed {
                found: false,
                response: CapturedResponse {
                    body: text.trim().to_string(),
                    metrics: Metrics::new(),
                    headers,
                },
            }
        }
    }
}

/// 批量模式下取第 `index` 个请求
///
/// 这个编号的起止 marker 缺任意一个都返回 `found = false`。
/// body 从前一个编号的结束 marker 之后开始。批量模式下无法把 `-v` 输出
/// 归属到具体请求，headers 留空。
pub fn demux_indexed(raw: &RawCapture, sentinels: &Sentinels, index: usize) -> Demuxed {
    let text = raw.stdout.as_str();
    let marker = sentinels.indexed(index);

    let Some(span) = locate(text, &marker) else {
        debug!(index, "marker pair not found");
        return Demuxed::default();
    };

    let body_start = (0..index)
        .filter_map(|j| {
            let end = sentinels.indexed(j).end;
            text[..span.start].rfind(&end).map(|pos| pos + end.len())
        })
        .max()
        .unwrap_or(0);

    Demuxed {
        found: true,
        response: CapturedResponse {
            body: text[body_start..span.start].trim().to_string(),
            metrics: Metrics::parse(&text[span.payload_start..span.payload_end]),
            headers: Default::default(),
        },
    }
}

/// 按调用计划拆分所有请求的结果，顺序与 `plan.markers` 一致
pub fn demux_plan(raw: &RawCapture, plan: &InvocationPlan, sentinels: &Sentinels) -> Vec<Demuxed> {
    plan.markers
        .iter()
        .map(|marker| match marker.index {
            Some(index) => demux_indexed(raw, sentinels, index),
            None => demux_single(raw, marker),
        })
        .collect()
}

struct Span {
    /// 起始哨兵的位置
    start: usize,
    payload_start: usize,
    /// 结束哨兵的位置
    payload_end: usize,
}

fn locate(text: &str, marker: &Marker) -> Option<Span> {
    let start = text.find(&marker.start)?;
    let payload_start = start + marker.start.len();
    match text[payload_start..].find(&marker.end) {
        Some(offset) => Some(Span {
            start,
            payload_start,
            payload_end: payload_start + offset,
        }),
        None => {
            warn!(marker = %marker.start, "start marker without matching end marker");
            None
        }
    }
}
