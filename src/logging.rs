// ==========================================
// 日志系统初始化
// ==========================================
// tracing-subscriber，输出到 stderr（stdout 留给命令行的 JSON 结果）
// 级别: RUST_LOG 优先，其次调用方给定的默认级别
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 默认日志级别
pub const DEFAULT_LEVEL: &str = "info";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 人类可读文本（含 target 与行号）
    #[default]
    Text,
    /// 每行一个 JSON 对象（供日志采集）
    Json,
}

/// 构建过滤器: RUST_LOG 未设置或无法解析时回退到 default_level
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// 按格式与默认级别初始化（重复初始化时忽略）
///
/// # 示例
/// ```no_run
/// use excel_import::logging::{self, LogFormat};
/// logging::init_with(LogFormat::Json, "debug");
/// ```
pub fn init_with(format: LogFormat, default_level: &str) {
    let filter = env_filter(default_level);
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Text => builder.with_target(true).with_line_number(true).try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if let Err(e) = result {
        eprintln!("日志系统已初始化，忽略重复初始化: {}", e);
    }
}

/// 文本格式、默认 info 级别
pub fn init() {
    init_with(LogFormat::Text, DEFAULT_LEVEL);
}

/// 测试环境: debug 级别，输出交给测试框架捕获
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
