use super::excel::export_completed_jobs;
use super::runtime::RuntimeState;
use super::settings::{BackupSettings, SettingsRepository};
use super::snapshot::{DataFileLocator, export_database_snapshot};
use super::status::{BackupStatus, BackupStatusView, BackupTrigger, RunResultKind, StatusRepository};
use crate::constants::backup;
use crate::db::Database;
use crate::error::{BackupError, Result};
use chrono::{Local, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// 并发运行被拒绝的错误码
pub const ERROR_CODE_RUNNING: &str = "RUNNING";

/// 运行失败的错误码
pub const ERROR_CODE_FAILED: &str = "FAILED";

/// 一次备份调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// 备份完成
    Success {
        files: Vec<PathBuf>,
        status: BackupStatusView,
    },
    /// 已有备份在运行，本次调用未执行任何操作
    Rejected { status: BackupStatusView },
    /// 备份失败，错误已记录到状态
    Failed {
        message: String,
        status: BackupStatusView,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Success { .. } => None,
            Self::Rejected { .. } => Some(ERROR_CODE_RUNNING),
            Self::Failed { .. } => Some(ERROR_CODE_FAILED),
        }
    }

    pub fn status(&self) -> &BackupStatusView {
        match self {
            Self::Success { status, .. }
            | Self::Rejected { status }
            | Self::Failed { status, .. } => status,
        }
    }
}

/// 备份执行器
#[derive(Debug)]
pub struct BackupRunner {
    db: Database,
    settings: SettingsRepository,
    status: StatusRepository,
    runtime: Arc<RuntimeState>,
    locator: DataFileLocator,
}

impl BackupRunner {
    pub fn new(
        db: Database,
        settings: SettingsRepository,
        status: StatusRepository,
        runtime: Arc<RuntimeState>,
        locator: DataFileLocator,
    ) -> Self {
        Self {
            db,
            settings,
            status,
            runtime,
            locator,
        }
    }

    /// 立即执行一次备份
    #[instrument(skip(self))]
    pub async fn run_backup_now(&self, trigger: BackupTrigger) -> Result<RunOutcome> {
        let Some(lease) = self.runtime.try_begin_run() else {
            warn!("已有备份正在运行，忽略本次触发");
            return Ok(RunOutcome::Rejected {
                status: self.status.get().await?,
            });
        };

        let started_at = Utc::now();
        let token = Local::now().format(backup::TIMESTAMP_FORMAT).to_string();

        let outcome = self.execute(trigger, started_at, &token).await;
        drop(lease);

        let status = self.status.get().await?;
        Ok(match outcome? {
            Ok(files) => RunOutcome::Success { files, status },
            Err(message) => RunOutcome::Failed { message, status },
        })
    }

    /// 外层 `Err` 表示状态存储失败；内层区分备份成功与失败
    async fn execute(
        &self,
        trigger: BackupTrigger,
        started_at: chrono::DateTime<Utc>,
        token: &str,
    ) -> Result<std::result::Result<Vec<PathBuf>, String>> {
        let settings = self.settings.get().await?;
        let previous = self.status.load().await?;
        let output_dir = settings.backup_dir.to_string_lossy().to_string();

        info!(
            backup_dir = %output_dir,
            include_database = settings.include_database,
            include_completed_excel = settings.include_completed_excel,
            "开始备份"
        );

        match self.export_all(&settings, token).await {
            Ok(files) => {
                let status = BackupStatus {
                    last_run_at: Some(started_at),
                    last_success_at: Some(Utc::now()),
                    last_result: RunResultKind::Success,
                    last_error: None,
                    last_trigger: Some(trigger),
                    last_output_dir: Some(output_dir),
                    last_files: files
                        .iter()
                        .map(|f| f.to_string_lossy().to_string())
                        .collect(),
                };
                self.status.save(&status).await?;
                info!(files = files.len(), "备份完成");
                Ok(Ok(files))
            }
            Err(e) => {
                let message = e.to_string();
                error!(error = %message, "备份失败");
                let status = BackupStatus {
                    last_run_at: Some(started_at),
                    last_success_at: previous.last_success_at,
                    last_result: RunResultKind::Error,
                    last_error: Some(message.clone()),
                    last_trigger: Some(trigger),
                    last_output_dir: Some(output_dir),
                    last_files: Vec::new(),
                };
                self.status.save(&status).await?;
                Ok(Err(message))
            }
        }
    }

    /// 按设置依次导出：数据库快照在前，表格在后
    async fn export_all(&self, settings: &BackupSettings, token: &str) -> Result<Vec<PathBuf>> {
        tokio::fs::create_dir_all(&settings.backup_dir)
            .await
            .map_err(|e| {
                BackupError::export(format!(
                    "创建备份目录失败 {}: {e}",
                    settings.backup_dir.display()
                ))
            })?;

        let mut files = Vec::new();

        if settings.include_database {
            if let Err(e) = self.db.checkpoint().await {
                warn!(error = %e, "数据库CHECKPOINT失败，继续复制数据文件");
            }
            let snapshot = export_database_snapshot(&self.locator, &settings.backup_dir, token)
                .await
                .map_err(BackupError::into_export_failure)?;
            files.push(snapshot);
        }

        if settings.include_completed_excel {
            let sheet = export_completed_jobs(&self.db, &settings.backup_dir, token)
                .await
                .map_err(BackupError::into_export_failure)?;
            files.push(sheet);
        }

        Ok(files)
    }
}
