//! 日志初始化
//!
//! 终端输出；配置 `LOG_DIR` 时改为按天滚动的文件 `print-agent.YYYY-MM-DD`。

use std::path::Path;

/// 使用默认级别初始化日志
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// 初始化日志，可选文件输出
///
/// `RUST_LOG` 设置时优先于 `log_level`。重复初始化 (如测试中) 会被忽略。
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(false);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if std::fs::create_dir_all(log_path).is_ok() {
            let file_appender = tracing_appender::rolling::daily(log_path, "print-agent");
            let _ = subscriber.with_ansi(false).with_writer(file_appender).try_init();
            return;
        }
    }

    let _ = subscriber.try_init();
}
