use super::runtime::RuntimeState;
use crate::constants::state_keys;
use crate::db::Database;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 最近一次运行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunResultKind {
    #[default]
    Idle,
    Success,
    Error,
}

/// 触发来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupTrigger {
    Manual,
    Auto,
}

impl BackupTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for BackupTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 持久化的备份状态（`backup.status`）
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_result: RunResultKind,
    pub last_error: Option<String>,
    pub last_trigger: Option<BackupTrigger>,
    pub last_output_dir: Option<String>,
    pub last_files: Vec<String>,
}

/// 对外可见的状态：持久化字段 + 运行时字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatusView {
    #[serde(flatten)]
    pub status: BackupStatus,
    pub next_run_at: Option<DateTime<Utc>>,
    pub is_running: bool,
}

/// 将任意 JSON 规范化为状态，无法识别的字段回退为默认值
pub fn normalize_status(raw: &Value) -> BackupStatus {
    let empty = Map::new();
    let fields = raw.as_object().unwrap_or(&empty);

    let timestamp = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    };
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    BackupStatus {
        last_run_at: timestamp("lastRunAt"),
        last_success_at: timestamp("lastSuccessAt"),
        last_result: match fields.get("lastResult").and_then(Value::as_str) {
            Some("success") => RunResultKind::Success,
            Some("error") => RunResultKind::Error,
            _ => RunResultKind::Idle,
        },
        last_error: text("lastError"),
        last_trigger: match fields.get("lastTrigger").and_then(Value::as_str) {
            Some("manual") => Some(BackupTrigger::Manual),
            Some("auto") => Some(BackupTrigger::Auto),
            _ => None,
        },
        last_output_dir: text("lastOutputDir"),
        last_files: fields
            .get("lastFiles")
            .and_then(Value::as_array)
            .map(|files| {
                files
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

/// 备份状态仓库
#[derive(Debug, Clone)]
pub struct StatusRepository {
    db: Database,
    runtime: Arc<RuntimeState>,
}

impl StatusRepository {
    pub fn new(db: Database, runtime: Arc<RuntimeState>) -> Self {
        Self { db, runtime }
    }

    /// 读取持久化状态；不存在时写入默认值
    pub async fn load(&self) -> Result<BackupStatus> {
        match self.db.get_state(state_keys::BACKUP_STATUS).await? {
            Some(raw) => Ok(normalize_status(&raw)),
            None => {
                debug!("备份状态不存在，写入默认值");
                let status = BackupStatus::default();
                self.save(&status).await?;
                Ok(status)
            }
        }
    }

    /// 读取状态并合并运行时字段
    pub async fn get(&self) -> Result<BackupStatusView> {
        let status = self.load().await?;
        Ok(BackupStatusView {
            status,
            next_run_at: self.runtime.next_run_at(),
            is_running: self.runtime.is_running(),
        })
    }

    /// 保存状态（仅由备份执行器调用）
    pub async fn save(&self, status: &BackupStatus) -> Result<()> {
        self.db
            .set_state(state_keys::BACKUP_STATUS, serde_json::to_value(status)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_status_defaults() {
        for raw in [json!(null), json!("broken"), json!({})] {
            assert_eq!(normalize_status(&raw), BackupStatus::default());
        }
    }

    #[test]
    fn test_normalize_status_drops_invalid_fields() {
        let raw = json!({
            "lastRunAt": "2024-05-01T10:00:00Z",
            "lastSuccessAt": "yesterday",
            "lastResult": "exploded",
            "lastError": 12,
            "lastTrigger": "cron",
            "lastOutputDir": "/backups",
            "lastFiles": ["/backups/a.duckdb", 3, null, "/backups/b.xlsx"],
        });
        let status = normalize_status(&raw);
        assert_eq!(
            status.last_run_at,
            Some("2024-05-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap())
        );
        assert_eq!(status.last_success_at, None);
        assert_eq!(status.last_result, RunResultKind::Idle);
        assert_eq!(status.last_error, None);
        assert_eq!(status.last_trigger, None);
        assert_eq!(status.last_output_dir.as_deref(), Some("/backups"));
        assert_eq!(
            status.last_files,
            vec!["/backups/a.duckdb".to_string(), "/backups/b.xlsx".to_string()]
        );
    }

    #[test]
    fn test_status_serializes_camel_case_round_trip() {
        let status = BackupStatus {
            last_run_at: Some(Utc::now()),
            last_success_at: None,
            last_result: RunResultKind::Error,
            last_error: Some("disk full".to_string()),
            last_trigger: Some(BackupTrigger::Auto),
            last_output_dir: Some("/b".to_string()),
            last_files: vec![],
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["lastResult"], json!("error"));
        assert_eq!(value["lastTrigger"], json!("auto"));
        assert_eq!(normalize_status(&value), status);
    }

    #[tokio::test]
    async fn test_get_merges_runtime_fields_and_is_stable() {
        let db = Database::connect_memory().await.unwrap();
        let runtime = Arc::new(RuntimeState::new());
        let repo = StatusRepository::new(db, runtime.clone());

        let first = repo.get().await.unwrap();
        assert_eq!(first.status, BackupStatus::default());
        assert_eq!(first.next_run_at, None);
        assert!(!first.is_running);

        let next = Utc::now();
        runtime.set_next_run_at(Some(next));
        let _lease = runtime.try_begin_run().unwrap();

        let second = repo.get().await.unwrap();
        assert_eq!(second.next_run_at, Some(next));
        assert!(second.is_running);

        let third = repo.get().await.unwrap();
        assert_eq!(
            serde_json::to_string(&second).unwrap(),
            serde_json::to_string(&third).unwrap()
        );
    }

    #[test]
    fn test_view_flattens_persisted_fields() {
        let view = BackupStatusView {
            status: BackupStatus::default(),
            next_run_at: None,
            is_running: true,
        };
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["lastResult"], json!("idle"));
        assert_eq!(value["isRunning"], json!(true));
        assert!(value["nextRunAt"].is_null());
    }
}
