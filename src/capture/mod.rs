//! Output demultiplexer：从外部进程的输出里恢复每个请求的 body、指标和响应头

pub mod demux;
pub mod headers;
pub mod metrics;
pub mod types;

pub use demux::{demux_indexed, demux_plan, demux_single};
pub use headers::{find_header, parse_headers};
pub use metrics::{Metrics, Timings, is_success, resolve_status};
pub use types::{CapturedResponse, Demuxed, RawCapture};
