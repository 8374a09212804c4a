use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry, util::SubscriberInitExt, EnvFilter,
};

/// 初始化日志：控制台 + 按天滚动的文件。返回的 guard 必须在进程生命周期内持有，
/// 否则非阻塞写入线程会提前退出，尾部日志丢失。
pub fn init(log_level: &str, log_dir: &str) -> WorkerGuard {
    // 1. 文件输出层：按天轮询，存放在 log_dir 下
    let file_appender = tracing_appender::rolling::daily(log_dir, "catalog-admin.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // 2. 格式化层（文件）- 不带颜色，包含代码位置
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    // 3. 格式化层（控制台）
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(true)
        .with_line_number(true);

    registry()
        .with(EnvFilter::new(log_level))
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}
