use curlcheck::capture::{RawCapture, demux_plan, demux_single};
use curlcheck::compare::ComparisonRules;
use curlcheck::condition::evaluate;
use curlcheck::invocation::{
    BuildOptions, Marker, RequestConfig, RequestSpec, build_batch_plan, build_plan,
    format_shell_line,
};
use curlcheck::snapshot::{CheckStatus, SnapshotStore, UpdatePolicy};
use curlcheck::store::{StoreContext, StoreDirective, apply_store, interpolate_request};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

/// 模拟 curl 的 stdout：body 后面紧跟 `-w` 输出
fn curl_stdout(body: &str, marker: &Marker, metrics: &serde_json::Value) -> String {
    format!("{}\n{}{}{}", body, marker.start, metrics, marker.end)
}

fn count(args: &[String], token: &str) -> usize {
    args.iter().filter(|a| a.as_str() == token).count()
}

/// 登录 -> store token -> 条件判断 -> 带 token 的第二个请求 -> 快照
#[test]
fn test_sequential_flow_with_store_and_snapshot() {
    let options = BuildOptions::default();

    let login = RequestConfig::from_json(
        r#"{
            "name": "login",
            "method": "POST",
            "url": "https://api.example.com/login",
            "body": {"user": "alice", "password": "secret"},
            "store": {"token": "body.token", "code": "status", "trace": "headers.x-trace-id"}
        }"#,
    )
    .unwrap();
    let spec = RequestSpec::try_from(&login).unwrap();
    let plan = build_plan(&spec, &options);
    assert_eq!(count(&plan.args, "-X"), 1);
    assert_eq!(count(&plan.args, "-w"), 1);
    assert!(plan.args.contains(&"Content-Type: application/json".to_string()));
    assert!(format_shell_line(&plan).starts_with("curl -X POST"));

    let raw = RawCapture::new(
        curl_stdout(
            r#"{"token":"abc123","user":{"id":7}}"#,
            &plan.markers[0],
            &json!({"response_code": 200, "time_total": 0.05}),
        ),
        "< HTTP/1.1 200 OK\n< Content-Type: application/json\n< X-Trace-Id: t-1\n",
    );
    let demuxed = demux_single(&raw, &plan.markers[0]);
    assert!(demuxed.found);
    assert_eq!(demuxed.response.status(), Some(200));
    assert_eq!(demuxed.response.timings().total_ms, 50.0);

    let mut context = StoreContext::new();
    let directives = StoreDirective::parse_all(&login.store).unwrap();
    apply_store(&directives, &demuxed.response, &mut context);
    assert_eq!(context.get("token"), Some("abc123"));
    assert_eq!(context.get("code"), Some("200"));
    assert_eq!(context.get("trace"), Some("t-1"));

    let profile = RequestConfig::from_json(
        r#"{
            "name": "profile",
            "url": "https://api.example.com/users/me",
            "headers": {"Authorization": "Bearer {{store.token}}"},
            "when": {"all": ["store.code == 200", "store.token exists"]}
        }"#,
    )
    .unwrap();
    let when = profile.when.clone().unwrap_or_default();
    assert!(evaluate(&when, &context));

    let resolved = interpolate_request(&profile, &context);
    let spec = RequestSpec::try_from(resolved).unwrap();
    let plan = build_plan(&spec, &options);
    assert!(plan.args.contains(&"Authorization: Bearer abc123".to_string()));
    assert!(!plan.args.contains(&"Content-Type: application/json".to_string()));

    let raw = RawCapture::new(
        curl_stdout(
            r#"{"id":7,"name":"Alice","lastLogin":"2024-01-01"}"#,
            &plan.markers[0],
            &json!({"response_code": 200}),
        ),
        "",
    );
    let response = demux_single(&raw, &plan.markers[0]).response;

    let temp_dir = TempDir::new().unwrap();
    let store = SnapshotStore::for_suite(temp_dir.path(), "flow");
    let rules = ComparisonRules {
        exclude: Some(vec!["body.lastLogin".to_string()]),
        ..ComparisonRules::default()
    };
    let first = store
        .check("profile", &response, &rules, UpdatePolicy::default())
        .unwrap();
    assert_eq!(first.status, CheckStatus::Created);

    let raw = RawCapture::new(
        curl_stdout(
            r#"{"id":7,"name":"Alice","lastLogin":"2024-02-02"}"#,
            &plan.markers[0],
            &json!({"response_code": 200}),
        ),
        "",
    );
    let again = demux_single(&raw, &plan.markers[0]).response;
    let second = store
        .check("profile", &again, &rules, UpdatePolicy::default())
        .unwrap();
    assert_eq!(second.status, CheckStatus::Passed);
}

#[test]
fn test_condition_gates_request() {
    let config = RequestConfig::from_json(
        r#"{"url": "https://api.example.com/admin", "when": "store.role == admin"}"#,
    )
    .unwrap();
    let when = config.when.unwrap_or_default();

    let admin: StoreContext = [("role", "Admin")].into_iter().collect();
    let guest: StoreContext = [("role", "guest")].into_iter().collect();
    assert!(evaluate(&when, &admin));
    assert!(!evaluate(&when, &guest));
    assert!(!evaluate(&when, &StoreContext::new()));
}

#[test]
fn test_batched_flow() {
    let specs = vec![
        RequestSpec::new("GET", "https://api.example.com/a").unwrap(),
        RequestSpec::new("GET", "https://api.example.com/b").unwrap(),
        RequestSpec::new("DELETE", "https://api.example.com/c").unwrap(),
    ];
    let options = BuildOptions::default();
    let plan = build_batch_plan(&specs, &options);
    assert!(plan.is_batched());
    assert_eq!(plan.markers.len(), 3);
    assert_eq!(count(&plan.args, "--next"), 2);
    assert_eq!(count(&plan.args, "-X"), 3);

    // 第三个请求没有输出（进程中途退出）
    let stdout = format!(
        "{}{}",
        curl_stdout("alpha", &plan.markers[0], &json!({"response_code": 200})),
        curl_stdout("beta", &plan.markers[1], &json!({"response_code": 404})),
    );
    let results = demux_plan(&RawCapture::new(stdout, ""), &plan, &options.sentinels);

    assert_eq!(results.len(), 3);
    assert!(results[0].found);
    assert_eq!(results[0].response.body, "alpha");
    assert!(results[0].response.is_success());
    assert!(results[1].found);
    assert_eq!(results[1].response.body, "beta");
    assert!(!results[1].response.is_success());
    assert!(!results[2].found);
    assert!(!results[2].response.is_success());
}

#[test]
fn test_missing_markers_degrade_to_body() {
    let spec = RequestSpec::new("GET", "https://api.example.com").unwrap();
    let plan = build_plan(&spec, &BuildOptions::default());

    let raw = RawCapture::new("  curl: (7) Failed to connect  ", "");
    let demuxed = demux_single(&raw, &plan.markers[0]);
    assert!(!demuxed.found);
    assert_eq!(demuxed.response.body, "curl: (7) Failed to connect");
    assert!(demuxed.response.metrics.is_empty());
    assert_eq!(demuxed.response.status(), None);
}
