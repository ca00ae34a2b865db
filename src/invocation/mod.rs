//! Invocation builder：把请求描述转换成 curl 参数列表和 write-out marker

pub mod builder;
pub mod config;
pub mod marker;
pub mod request;
pub mod serialization;
pub mod shell;
pub mod types;

pub use builder::{BuildOptions, InvocationPlan, build_batch_plan, build_plan};
pub use config::{AuthConfig, FormValueConfig, RequestConfig};
pub use marker::{Marker, Sentinels};
pub use request::RequestSpec;
pub use shell::format_shell_line;
pub use types::{Auth, FormField, Headers, HttpVersion, Method, RedirectPolicy, RequestBody, TlsOptions};
