use crate::constants::{settings, state_keys};
use crate::db::Database;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};

/// 备份设置（持久化为 `backup.settings`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSettings {
    pub enabled: bool,
    pub interval_minutes: i64,
    pub backup_dir: PathBuf,
    pub include_database: bool,
    pub include_completed_excel: bool,
}

impl BackupSettings {
    /// 以指定目录为备份目录的默认设置
    pub fn defaults_with_dir(backup_dir: impl AsRef<Path>) -> Self {
        Self {
            enabled: true,
            interval_minutes: settings::DEFAULT_INTERVAL_MINUTES,
            backup_dir: absolutize(backup_dir.as_ref()),
            include_database: true,
            include_completed_excel: true,
        }
    }
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self::defaults_with_dir(settings::get_default_backup_dir())
    }
}

/// 将任意 JSON 规范化为合法设置，逐字段回退到 `fallback`
pub fn normalize_settings(raw: &Value, fallback: &BackupSettings) -> BackupSettings {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    BackupSettings {
        enabled: fields
            .get("enabled")
            .and_then(coerce_bool)
            .unwrap_or(fallback.enabled),
        interval_minutes: fields
            .get("intervalMinutes")
            .and_then(coerce_integer)
            .map(|minutes| {
                minutes.clamp(settings::MIN_INTERVAL_MINUTES, settings::MAX_INTERVAL_MINUTES)
            })
            .unwrap_or_else(|| {
                fallback
                    .interval_minutes
                    .clamp(settings::MIN_INTERVAL_MINUTES, settings::MAX_INTERVAL_MINUTES)
            }),
        backup_dir: fields
            .get("backupDir")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|dir| !dir.is_empty())
            .map(|dir| absolutize(Path::new(dir)))
            .unwrap_or_else(|| absolutize(&fallback.backup_dir)),
        include_database: fields
            .get("includeDatabase")
            .and_then(coerce_bool)
            .unwrap_or(fallback.include_database),
        include_completed_excel: fields
            .get("includeCompletedExcel")
            .and_then(coerce_bool)
            .unwrap_or(fallback.include_completed_excel),
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

/// 相对路径基于工作目录解析，并去掉 `.`/`..`
pub fn absolutize(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("/"))
            .join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// 备份设置仓库
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    db: Database,
    defaults: BackupSettings,
}

impl SettingsRepository {
    pub fn new(db: Database, defaults: BackupSettings) -> Self {
        Self { db, defaults }
    }

    /// 读取设置；不存在时写入默认值
    pub async fn get(&self) -> Result<BackupSettings> {
        match self.db.get_state(state_keys::BACKUP_SETTINGS).await? {
            Some(raw) => Ok(normalize_settings(&raw, &self.defaults)),
            None => {
                debug!("备份设置不存在，写入默认值");
                let defaults = normalize_settings(&Value::Null, &self.defaults);
                self.save(&defaults).await?;
                Ok(defaults)
            }
        }
    }

    /// 合并部分设置并保存，返回最终设置
    ///
    /// 调用方负责随后重新调度定时器。
    pub async fn update(&self, patch: &Value) -> Result<BackupSettings> {
        let current = self.get().await?;

        let mut merged = match serde_json::to_value(&current)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        if let Value::Object(patch_fields) = patch {
            for (key, value) in patch_fields {
                merged.insert(key.clone(), value.clone());
            }
        }

        let next = normalize_settings(&Value::Object(merged), &current);
        self.save(&next).await?;
        info!(
            enabled = next.enabled,
            interval_minutes = next.interval_minutes,
            backup_dir = %next.backup_dir.display(),
            include_database = next.include_database,
            include_completed_excel = next.include_completed_excel,
            "备份设置已更新"
        );
        Ok(next)
    }

    async fn save(&self, settings: &BackupSettings) -> Result<()> {
        self.db
            .set_state(state_keys::BACKUP_SETTINGS, serde_json::to_value(settings)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fallback() -> BackupSettings {
        BackupSettings {
            enabled: false,
            interval_minutes: 120,
            backup_dir: PathBuf::from("/srv/cmms/backups"),
            include_database: true,
            include_completed_excel: false,
        }
    }

    #[test]
    fn test_normalize_non_object_returns_fallback() {
        for raw in [json!(null), json!(42), json!("garbage"), json!([1, 2, 3])] {
            assert_eq!(normalize_settings(&raw, &fallback()), fallback());
        }
    }

    #[test]
    fn test_normalize_clamps_interval() {
        let low = normalize_settings(&json!({"intervalMinutes": 1}), &fallback());
        assert_eq!(low.interval_minutes, 5);

        let high = normalize_settings(&json!({"intervalMinutes": 100000}), &fallback());
        assert_eq!(high.interval_minutes, 1440);

        let negative = normalize_settings(&json!({"intervalMinutes": -30}), &fallback());
        assert_eq!(negative.interval_minutes, 5);

        let text = normalize_settings(&json!({"intervalMinutes": " 60 "}), &fallback());
        assert_eq!(text.interval_minutes, 60);

        let float = normalize_settings(&json!({"intervalMinutes": 30.9}), &fallback());
        assert_eq!(float.interval_minutes, 30);

        let junk = normalize_settings(&json!({"intervalMinutes": "soon"}), &fallback());
        assert_eq!(junk.interval_minutes, 120);
    }

    #[test]
    fn test_normalize_coerces_booleans() {
        let raw = json!({
            "enabled": "1",
            "includeDatabase": "false",
            "includeCompletedExcel": "TRUE",
        });
        let settings = normalize_settings(&raw, &fallback());
        assert!(settings.enabled);
        assert!(!settings.include_database);
        assert!(settings.include_completed_excel);

        let numeric = normalize_settings(&json!({"enabled": 1, "includeDatabase": 0}), &fallback());
        assert!(numeric.enabled);
        assert!(!numeric.include_database);

        let junk = normalize_settings(&json!({"enabled": "yes", "includeDatabase": {}}), &fallback());
        assert!(!junk.enabled);
        assert!(junk.include_database);
    }

    #[test]
    fn test_normalize_backup_dir_is_always_absolute() {
        let empty = normalize_settings(&json!({"backupDir": "   "}), &fallback());
        assert_eq!(empty.backup_dir, PathBuf::from("/srv/cmms/backups"));

        let wrong_type = normalize_settings(&json!({"backupDir": 7}), &fallback());
        assert_eq!(wrong_type.backup_dir, PathBuf::from("/srv/cmms/backups"));

        let relative = normalize_settings(&json!({"backupDir": "./nightly/../daily"}), &fallback());
        assert!(relative.backup_dir.is_absolute());
        assert!(relative.backup_dir.ends_with("daily"));
        assert!(!relative.backup_dir.to_string_lossy().contains(".."));

        let mut relative_fallback = fallback();
        relative_fallback.backup_dir = PathBuf::from("backups");
        let from_fallback = normalize_settings(&json!({}), &relative_fallback);
        assert!(from_fallback.backup_dir.is_absolute());
    }

    #[tokio::test]
    async fn test_get_writes_defaults_once_and_is_stable() {
        let db = Database::connect_memory().await.unwrap();
        let repo = SettingsRepository::new(db.clone(), fallback());

        let first = repo.get().await.unwrap();
        assert_eq!(first, fallback());
        assert!(db.get_state(state_keys::BACKUP_SETTINGS).await.unwrap().is_some());

        let second = repo.get().await.unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_get_degrades_corrupt_fields() {
        let db = Database::connect_memory().await.unwrap();
        db.set_state(
            state_keys::BACKUP_SETTINGS,
            json!({"enabled": "maybe", "intervalMinutes": 30, "backupDir": null}),
        )
        .await
        .unwrap();

        let repo = SettingsRepository::new(db, fallback());
        let settings = repo.get().await.unwrap();
        assert!(!settings.enabled);
        assert_eq!(settings.interval_minutes, 30);
        assert_eq!(settings.backup_dir, PathBuf::from("/srv/cmms/backups"));
    }

    #[tokio::test]
    async fn test_update_merges_partial_input() {
        let db = Database::connect_memory().await.unwrap();
        let repo = SettingsRepository::new(db, fallback());

        let updated = repo
            .update(&json!({"enabled": "true", "intervalMinutes": 2}))
            .await
            .unwrap();
        assert!(updated.enabled);
        assert_eq!(updated.interval_minutes, 5);
        assert_eq!(updated.backup_dir, PathBuf::from("/srv/cmms/backups"));
        assert!(!updated.include_completed_excel);

        // 非对象补丁不改变设置
        let unchanged = repo.update(&json!("nope")).await.unwrap();
        assert_eq!(unchanged, updated);
        assert_eq!(repo.get().await.unwrap(), updated);
    }
}
