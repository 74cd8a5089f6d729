use crate::app::CliApp;
use backup_core::backup::{BackupStatusView, RunResultKind};
use backup_core::error::Result;
use chrono::{DateTime, Local, Utc};
use tracing::{info, warn};

/// 显示客户端版本信息
pub fn show_client_version() {
    info!("🗄️  CMMS Backup 状态");
    info!("==================");
    info!("📋 基本信息:");
    info!("   版本: v{}", env!("CARGO_PKG_VERSION"));
}

/// 显示备份状态
pub async fn run_status(app: &CliApp) -> Result<()> {
    show_client_version();
    info!("   主数据库: {}", app.config.effective_database_url());

    match app.locator.resolve() {
        Ok(path) => info!("   ✅ 数据文件: {}", path.display()),
        Err(e) => warn!("   ❌ {}", e),
    }

    let settings = app.service.get_settings().await?;
    info!("⚙️  备份设置:");
    info!(
        "   自动备份: {}",
        if settings.enabled { "启用" } else { "禁用" }
    );
    info!("   备份间隔: {} 分钟", settings.interval_minutes);
    info!("   备份目录: {}", settings.backup_dir.display());

    let view = app.service.get_status().await?;
    print_status(&view);
    Ok(())
}

pub(crate) fn print_status(view: &BackupStatusView) {
    let status = &view.status;
    info!("📊 最近一次备份:");
    info!("   运行时间: {}", format_time(status.last_run_at));
    info!("   最近成功: {}", format_time(status.last_success_at));
    match status.last_result {
        RunResultKind::Idle => info!("   结果: 尚未运行"),
        RunResultKind::Success => info!("   结果: ✅ 成功"),
        RunResultKind::Error => warn!(
            "   结果: ❌ 失败 ({})",
            status.last_error.as_deref().unwrap_or("-")
        ),
    }
    if let Some(trigger) = status.last_trigger {
        info!("   触发方式: {}", trigger);
    }
    if let Some(dir) = &status.last_output_dir {
        info!("   输出目录: {}", dir);
    }
    for file in &status.last_files {
        info!("   📄 {}", file);
    }
    info!("   下次自动备份: {}", format_time(view.next_run_at));
    if view.is_running {
        info!("   ⏳ 备份正在进行中");
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| {
        t.with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    })
    .unwrap_or_else(|| "-".to_string())
}
