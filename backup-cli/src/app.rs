use backup_core::{
    backup::{BackupService, BackupSettings, DataFileLocator},
    config::AppConfig,
    db::Database,
    error::Result,
};
use std::path::Path;

use crate::cli::{Commands, SettingsCommand};
use crate::commands;
use tracing::{debug, info};

pub struct CliApp {
    pub config: AppConfig,
    pub database: Database,
    pub locator: DataFileLocator,
    pub service: BackupService,
}

impl CliApp {
    /// 使用智能配置查找初始化CLI应用
    pub async fn new_with_auto_config() -> Result<Self> {
        let config = AppConfig::find_and_load_config()?;
        Self::new(config).await
    }

    /// 使用指定的配置文件初始化
    pub async fn new_with_config_file(path: &Path) -> Result<Self> {
        let config = AppConfig::load_from_file(path)?;
        Self::new(config).await
    }

    pub async fn new(config: AppConfig) -> Result<Self> {
        let database_url = config.effective_database_url();
        let locator = DataFileLocator::from_url(&database_url)?;
        let db_path = locator.preferred_path();
        debug!(url = %database_url, path = %db_path.display(), "连接主数据库");

        let database = Database::connect(&db_path).await?;
        let defaults = BackupSettings::defaults_with_dir(config.get_default_backup_dir());
        let service = BackupService::new(database.clone(), defaults, locator.clone());

        Ok(Self {
            config,
            database,
            locator,
            service,
        })
    }

    /// 运行应用命令
    pub async fn run_command(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { .. } => unreachable!(), // 已经在 main.rs 中处理
            Commands::Status => commands::run_status(self).await,
            Commands::Settings(settings_cmd) => self.run_settings_command(settings_cmd).await,
            Commands::Run => {
                info!("🔄 开始手动备份...");
                commands::run_backup(self).await
            }
            Commands::Serve => commands::run_serve(self).await,
            Commands::SeedDemo { count } => commands::run_seed_demo(self, count).await,
        }
    }

    async fn run_settings_command(&mut self, cmd: SettingsCommand) -> Result<()> {
        match cmd {
            SettingsCommand::Show => commands::show_settings(self).await,
            SettingsCommand::Set {
                enabled,
                interval,
                dir,
                include_database,
                include_excel,
            } => {
                let patch = commands::SettingsPatch {
                    enabled,
                    interval_minutes: interval,
                    backup_dir: dir,
                    include_database,
                    include_completed_excel: include_excel,
                };
                commands::update_settings(self, patch).await
            }
        }
    }
}
