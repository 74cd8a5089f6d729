// 备份子系统
//
// - settings / status: 基于键值状态存储的设置与状态仓库
// - snapshot / excel: 数据库快照与已完成工作表格两个导出器
// - runner: 单次备份编排与互斥
// - scheduler / service: 定时器与对外接口

pub mod excel;
pub mod runner;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod settings;
pub mod snapshot;
pub mod status;
pub mod xlsx;

pub use runner::{BackupRunner, ERROR_CODE_FAILED, ERROR_CODE_RUNNING, RunOutcome};
pub use runtime::RuntimeState;
pub use scheduler::{BackupScheduler, RepeatingTask};
pub use service::BackupService;
pub use settings::{BackupSettings, SettingsRepository, normalize_settings};
pub use snapshot::{DataFileLocator, export_database_snapshot};
pub use status::{
    BackupStatus, BackupStatusView, BackupTrigger, RunResultKind, StatusRepository,
    normalize_status,
};
