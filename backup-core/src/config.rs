use crate::constants::{config, database, settings};
use crate::error::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub backup: BackupConfig,
}

/// 主数据库配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
}

/// 备份相关配置
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackupConfig {
    pub default_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: database::DEFAULT_DATABASE_URL.to_string(),
            },
            backup: BackupConfig {
                default_dir: settings::get_default_backup_dir()
                    .to_string_lossy()
                    .to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 智能查找并加载配置文件
    /// 按优先级查找：cmms-backup.toml -> config.toml
    pub fn find_and_load_config() -> Result<Self> {
        for config_file in &config::CONFIG_FILE_CANDIDATES {
            if Path::new(config_file).exists() {
                tracing::info!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        // 如果没找到配置文件，创建默认配置
        tracing::warn!("未找到配置文件，创建默认配置: {}", config::CONFIG_FILE_NAME);
        let default_config = Self::default();
        default_config.save_to_file(config::CONFIG_FILE_NAME)?;
        Ok(default_config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Err(BackupError::ConfigNotFound);
        }
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_with_comments();
        fs::write(&path, content)?;
        Ok(())
    }

    /// 生成带注释的TOML配置
    fn to_toml_with_comments(&self) -> String {
        const TEMPLATE: &str = include_str!("../templates/config.toml.template");

        TEMPLATE
            .replace("{database_url}", &escape_toml(&self.database.url))
            .replace("{backup_default_dir}", &escape_toml(&self.backup.default_dir))
    }

    /// 主数据库连接串，环境变量优先
    pub fn effective_database_url(&self) -> String {
        std::env::var(database::DATABASE_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.database.url.clone())
    }

    /// 获取默认备份目录路径
    pub fn get_default_backup_dir(&self) -> PathBuf {
        PathBuf::from(&self.backup.default_dir)
    }
}

fn escape_toml(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip_with_comments() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cmms-backup.toml");

        let config = AppConfig {
            database: DatabaseConfig {
                url: "file:\"C:\\data\\cmms.db\"".to_string(),
            },
            backup: BackupConfig {
                default_dir: "/var/backups/cmms".to_string(),
            },
        };
        config.save_to_file(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("# CMMS 备份工具配置文件"));

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_config_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = AppConfig::load_from_file(temp_dir.path().join("missing.toml"));
        assert!(matches!(result, Err(BackupError::ConfigNotFound)));
    }
}
