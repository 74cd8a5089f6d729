use backup_cli::{Cli, CliApp, Commands, run_init, setup_logging};
use backup_core::BackupError;
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 设置日志记录，guard 需要在退出前释放以刷新文件日志
    let log_guard = setup_logging(cli.verbose);
    let exit_code = run(cli).await;
    drop(log_guard);

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> i32 {
    // `init` 命令是特例，它不需要预先加载配置
    if let Commands::Init { force } = cli.command {
        if let Err(e) = run_init(cli.config.as_deref(), force).await {
            error!("❌ 初始化失败: {}", e);
            return 1;
        }
        return 0;
    }

    let app = match &cli.config {
        Some(path) => CliApp::new_with_config_file(path).await,
        None => CliApp::new_with_auto_config().await,
    };
    let mut app = match app {
        Ok(app) => app,
        Err(BackupError::ConfigNotFound) => {
            let path = cli
                .config
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            error!("❌ 配置文件 '{}' 未找到。", path);
            error!("👉 请先运行 'cmms-backup init' 命令来创建配置文件。");
            return 1;
        }
        Err(e) => {
            error!("❌ 应用初始化失败: {}", e);
            return 1;
        }
    };

    // 运行命令
    if let Err(e) = app.run_command(cli.command).await {
        error!("❌ 操作失败: {}", e);
        return 1;
    }
    0
}
