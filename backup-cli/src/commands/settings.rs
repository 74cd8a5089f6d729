use crate::app::CliApp;
use backup_core::backup::BackupSettings;
use backup_core::error::Result;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// 命令行给出的部分设置
#[derive(Debug, Default, Clone)]
pub struct SettingsPatch {
    pub enabled: Option<bool>,
    pub interval_minutes: Option<i64>,
    pub backup_dir: Option<PathBuf>,
    pub include_database: Option<bool>,
    pub include_completed_excel: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.interval_minutes.is_none()
            && self.backup_dir.is_none()
            && self.include_database.is_none()
            && self.include_completed_excel.is_none()
    }

    /// 转为与存储格式一致的 JSON 对象，只包含提供的字段
    pub fn to_json(&self) -> Value {
        let mut fields = Map::new();
        if let Some(enabled) = self.enabled {
            fields.insert("enabled".to_string(), Value::from(enabled));
        }
        if let Some(minutes) = self.interval_minutes {
            fields.insert("intervalMinutes".to_string(), Value::from(minutes));
        }
        if let Some(dir) = &self.backup_dir {
            fields.insert(
                "backupDir".to_string(),
                Value::from(dir.to_string_lossy().to_string()),
            );
        }
        if let Some(include) = self.include_database {
            fields.insert("includeDatabase".to_string(), Value::from(include));
        }
        if let Some(include) = self.include_completed_excel {
            fields.insert("includeCompletedExcel".to_string(), Value::from(include));
        }
        Value::Object(fields)
    }
}

/// 显示当前设置
pub async fn show_settings(app: &CliApp) -> Result<()> {
    let settings = app.service.get_settings().await?;
    print_settings(&settings)
}

/// 更新设置
#[instrument(skip(app))]
pub async fn update_settings(app: &CliApp, patch: SettingsPatch) -> Result<()> {
    if patch.is_empty() {
        warn!("未提供任何需要修改的设置");
        info!("示例: cmms-backup settings set --interval 60 --enabled true");
        return show_settings(app).await;
    }

    let settings = app.service.update_settings(&patch.to_json()).await?;
    if let Some(requested) = patch.interval_minutes {
        if requested != settings.interval_minutes {
            warn!(
                "备份间隔 {} 超出范围，已调整为 {} 分钟",
                requested, settings.interval_minutes
            );
        }
    }
    info!("✅ 备份设置已更新");
    print_settings(&settings)
}

fn print_settings(settings: &BackupSettings) -> Result<()> {
    info!("⚙️  备份设置:");
    for line in serde_json::to_string_pretty(settings)?.lines() {
        info!("   {}", line);
    }
    Ok(())
}
