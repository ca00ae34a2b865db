use tracing_subscriber::{EnvFilter, fmt};

/// 初始化日志系统
///
/// 支持通过 RUST_LOG 环境变量控制日志级别，默认级别: info
///
/// 日志写到 stderr，stdout 只留给命令的机器可读输出（JSON、shell 命令行等）。
///
/// 示例:
/// - RUST_LOG=debug curlcheck demux out.txt
/// - RUST_LOG=curlcheck::condition=trace curlcheck when "store.x exists"
pub fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    tracing::debug!("Logger initialized");
}
