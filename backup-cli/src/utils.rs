use backup_core::constants::config;
use tracing_appender::non_blocking::WorkerGuard;

/// # CMMS Backup 日志系统
///
/// - 库代码只使用 `tracing` 宏，入口处调用 `setup_logging()` 配置输出
/// - `-v, --verbose` 启用 DEBUG 级别，`RUST_LOG` 可覆盖
/// - 设置 `CMMS_BACKUP_LOG_FILE` 后日志写入文件（非阻塞写入，带模块路径与行号）
///
/// ```bash
/// cmms-backup -v status
/// CMMS_BACKUP_LOG_FILE=backup.log cmms-backup serve
/// RUST_LOG=backup_core::backup::scheduler=debug cmms-backup serve
/// ```
///
/// 返回的 `WorkerGuard` 需要持有到进程退出，否则文件日志可能丢失。
pub fn setup_logging(verbose: bool) -> Option<WorkerGuard> {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Ok(log_file) = std::env::var(config::LOG_FILE_ENV) {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
        {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .init();
                return Some(guard);
            }
            Err(e) => {
                eprintln!("无法打开日志文件 {log_file}: {e}，改为输出到终端");
            }
        }
    }

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_names(false)
        .with_line_number(false)
        .without_time()
        .compact()
        .init();
    None
}
