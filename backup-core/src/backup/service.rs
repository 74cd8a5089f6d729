use super::runner::{BackupRunner, RunOutcome};
use super::runtime::RuntimeState;
use super::scheduler::BackupScheduler;
use super::settings::{BackupSettings, SettingsRepository};
use super::snapshot::DataFileLocator;
use super::status::{BackupStatusView, BackupTrigger, StatusRepository};
use crate::db::Database;
use crate::error::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// 备份子系统对外接口
///
/// 持有运行状态、定时器和执行器，宿主进程只需创建一个实例。
#[derive(Debug)]
pub struct BackupService {
    settings: SettingsRepository,
    status: StatusRepository,
    runner: Arc<BackupRunner>,
    scheduler: BackupScheduler,
}

impl BackupService {
    pub fn new(db: Database, defaults: BackupSettings, locator: DataFileLocator) -> Self {
        let runtime = Arc::new(RuntimeState::new());
        let settings = SettingsRepository::new(db.clone(), defaults);
        let status = StatusRepository::new(db.clone(), runtime.clone());
        let runner = Arc::new(BackupRunner::new(
            db,
            settings.clone(),
            status.clone(),
            runtime.clone(),
            locator,
        ));
        let scheduler = BackupScheduler::new(runner.clone(), runtime);

        Self {
            settings,
            status,
            runner,
            scheduler,
        }
    }

    /// 启动时调用：读取设置、确保状态记录存在并调度自动备份
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<BackupSettings> {
        let settings = self.settings.get().await?;
        self.status.load().await?;
        self.scheduler.arm(&settings);
        info!(
            enabled = settings.enabled,
            interval_minutes = settings.interval_minutes,
            "备份服务已初始化"
        );
        Ok(settings)
    }

    pub async fn get_settings(&self) -> Result<BackupSettings> {
        self.settings.get().await
    }

    /// 合并部分更新并重新调度
    #[instrument(skip(self, patch))]
    pub async fn update_settings(&self, patch: &Value) -> Result<BackupSettings> {
        let settings = self.settings.update(patch).await?;
        self.scheduler.arm(&settings);
        Ok(settings)
    }

    pub async fn get_status(&self) -> Result<BackupStatusView> {
        self.status.get().await
    }

    pub async fn run_backup_now(&self, trigger: BackupTrigger) -> Result<RunOutcome> {
        self.runner.run_backup_now(trigger).await
    }

    /// 停止自动备份，正在执行的备份不受影响
    pub fn shutdown(&self) {
        self.scheduler.disarm();
        info!("备份服务已停止");
    }
}
