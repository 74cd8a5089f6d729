use crate::app::CliApp;
use crate::commands::status::print_status;
use backup_core::backup::{BackupTrigger, RunOutcome};
use backup_core::error::{BackupError, Result};
use tracing::{error, info, instrument, warn};

/// 立即执行一次手动备份
#[instrument(skip(app))]
pub async fn run_backup(app: &CliApp) -> Result<()> {
    let outcome = app.service.run_backup_now(BackupTrigger::Manual).await?;
    let code = outcome.error_code();

    match &outcome {
        RunOutcome::Success { files, .. } => {
            info!("✅ 备份完成，共生成 {} 个文件", files.len());
            for file in files {
                info!("   📄 {}", file.display());
            }
        }
        RunOutcome::Rejected { .. } => {
            warn!("⏳ 已有备份正在运行，本次请求被拒绝");
        }
        RunOutcome::Failed { message, .. } => {
            error!("❌ 备份失败: {}", message);
        }
    }
    print_status(outcome.status());

    match code {
        None => Ok(()),
        Some(code) => Err(BackupError::custom(format!("备份未完成 [{code}]"))),
    }
}

/// 常驻运行：按设置调度自动备份，直到收到 Ctrl-C
#[instrument(skip(app))]
pub async fn run_serve(app: &CliApp) -> Result<()> {
    let settings = app.service.initialize().await?;
    if settings.enabled {
        info!(
            "⏰ 自动备份已启动，每 {} 分钟执行一次，备份目录: {}",
            settings.interval_minutes,
            settings.backup_dir.display()
        );
    } else {
        warn!("自动备份当前处于禁用状态，可通过 'cmms-backup settings set --enabled true' 启用");
    }
    if let Some(next) = app.service.get_status().await?.next_run_at {
        info!("   下次自动备份: {}", next.with_timezone(&chrono::Local));
    }
    info!("按 Ctrl-C 退出");

    tokio::signal::ctrl_c().await?;
    info!("收到退出信号，停止自动备份");
    app.service.shutdown();
    Ok(())
}
