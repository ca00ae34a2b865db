use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::invocation::marker::{Marker, Sentinels};
use crate::invocation::request::RequestSpec;
use crate::invocation::types::{Auth, FormField};

/// 外部 HTTP 客户端
pub const CURL_PROGRAM: &str = "curl";
/// 批量模式下分隔各个请求的参数
pub const NEXT_SEPARATOR: &str = "--next";

const CONTENT_TYPE: &str = "Content-Type";
const AUTHORIZATION: &str = "Authorization";
const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub sentinels: Sentinels,
    /// 追加 `-v`，让响应头出现在诊断输出里
    pub capture_headers: bool,
    /// 追加 `-s -S`：关闭进度条但保留错误信息
    pub silent: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            sentinels: Sentinels::default(),
            capture_headers: true,
            silent: true,
        }
    }
}

/// 一次外部进程调用的参数列表和对应的 marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationPlan {
    pub program: String,
    pub args: Vec<String>,
    pub markers: Vec<Marker>,
}

impl InvocationPlan {
    pub fn is_batched(&self) -> bool {
        self.markers.iter().any(|m| m.index.is_some())
    }
}

/// 单请求模式
pub fn build_plan(spec: &RequestSpec, options: &BuildOptions) -> InvocationPlan {
    let marker = options.sentinels.single();
    let args = request_args(spec, &marker, options);
    debug!(
        method = %spec.method(),
        url = %spec.url(),
        args = args.len(),
        "built invocation plan"
    );

    InvocationPlan {
        program: CURL_PROGRAM.to_string(),
        args,
        markers: vec![marker],
    }
}

/// 批量模式：N 个请求共享一次 curl 调用（同一个连接），用 `--next` 分隔，
/// 第 i 个请求使用带编号 i 的 marker。
pub fn build_batch_plan(specs: &[RequestSpec], options: &BuildOptions) -> InvocationPlan {
    let mut args = Vec::new();
    let mut markers = Vec::with_capacity(specs.len());

    for (index, spec) in specs.iter().enumerate() {
        if index > 0 {
            args.push(NEXT_SEPARATOR.to_string());
        }
        let marker = options.sentinels.indexed(index);
        args.extend(request_args(spec, &marker, options));
        markers.push(marker);
    }
    debug!(requests = specs.len(), args = args.len(), "built batched invocation plan");

    InvocationPlan {
        program: CURL_PROGRAM.to_string(),
        args,
        markers,
    }
}

/// 参数顺序固定：method、write-out marker、headers、auth、body/form、timeout、
/// redirect/proxy/TLS、输出文件、协议版本、静默/诊断开关，最后是 URL。
fn request_args(spec: &RequestSpec, marker: &Marker, options: &BuildOptions) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    args.push("-X".to_string());
    args.push(spec.method().as_str().to_string());

    args.push("-w".to_string());
    args.push(marker.write_out());

    for (name, value) in spec.headers().iter() {
        push_header(&mut args, name, value);
    }
    let use_form = !spec.form().is_empty();
    // 只有 --data-raw 路径才补 Content-Type，表单交给 curl 自己生成 boundary
    if !use_form && spec.body().is_some() && !spec.headers().contains(CONTENT_TYPE) {
        push_header(&mut args, CONTENT_TYPE, JSON_CONTENT_TYPE);
    }

    match spec.auth() {
        Auth::None => {}
        Auth::Basic { username, password } => {
            args.push("-u".to_string());
            args.push(format!("{}:{}", username, password));
        }
        Auth::Bearer { token } => {
            if !spec.headers().contains(AUTHORIZATION) {
                push_header(&mut args, AUTHORIZATION, &format!("Bearer {}", token));
            }
        }
    }

    if use_form {
        for (name, field) in spec.form() {
            push_form_field(&mut args, name, field);
        }
    } else if let Some(body) = spec.body() {
        args.push("--data-raw".to_string());
        args.push(body.to_payload());
    }

    if let Some(timeout) = spec.timeout() {
        args.push("--max-time".to_string());
        args.push(format_seconds(timeout));
    }

    let redirects = spec.redirects();
    if redirects.follow {
        args.push("-L".to_string());
        if let Some(max) = redirects.max_redirects {
            args.push("--max-redirs".to_string());
            args.push(max.to_string());
        }
    }
    if let Some(proxy) = spec.proxy() {
        args.push("-x".to_string());
        args.push(proxy.to_string());
    }
    let tls = spec.tls();
    if tls.insecure {
        args.push("-k".to_string());
    }
    if let Some(path) = &tls.ca_cert {
        args.push("--cacert".to_string());
        args.push(path.display().to_string());
    }
    if let Some(path) = &tls.client_cert {
        args.push("--cert".to_string());
        args.push(path.display().to_string());
    }
    if let Some(path) = &tls.client_key {
        args.push("--key".to_string());
        args.push(path.display().to_string());
    }

    if let Some(path) = spec.output() {
        args.push("-o".to_string());
        args.push(path.display().to_string());
    }

    if let Some(version) = spec.http_version() {
        args.push(version.flag().to_string());
    }

    if options.silent {
        args.push("-s".to_string());
        args.push("-S".to_string());
    }
    if options.capture_headers {
        args.push("-v".to_string());
    }

    args.push(spec.url().to_string());
    args
}

fn push_header(args: &mut Vec<String>, name: &str, value: &str) {
    args.push("-H".to_string());
    args.push(format!("{}: {}", name, value));
}

fn push_form_field(args: &mut Vec<String>, name: &str, field: &FormField) {
    match field {
        // --form-string 不会把开头的 @ 或 < 当成文件引用
        FormField::Value(value) => {
            args.push("--form-string".to_string());
            args.push(format!("{}={}", name, value));
        }
        FormField::File {
            path,
            filename,
            content_type,
        } => {
            let mut spec = format!("{}=@{}", name, path.display());
            if let Some(filename) = filename {
                spec.push_str(&format!(";filename={}", filename));
            }
            if let Some(content_type) = content_type {
                spec.push_str(&format!(";type={}", content_type));
            }
            args.push("-F".to_string());
            args.push(spec);
        }
    }
}

fn format_seconds(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        duration.as_secs().to_string()
    } else {
        format!("{:.3}", duration.as_secs_f64())
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
