use crate::{BackupError, Result};
use serde_json::Value;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

use super::actor::DuckDbActor;
use super::messages::DbMessage;
use super::models::{CompletedJob, NewCompletedJob};

/// DuckDB数据库管理器
#[derive(Debug, Clone)]
pub struct DuckDbManager {
    sender: mpsc::Sender<DbMessage>,
}

impl DuckDbManager {
    /// 连接到数据库文件（不存在时创建）
    pub async fn connect<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        // 确保数据库文件的父目录存在
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let (sender, receiver) = mpsc::channel(100);

        // 启动DuckDB Actor
        let actor = DuckDbActor::new(db_path)?;
        tokio::spawn(actor.run(receiver));

        let manager = Self { sender };

        // 初始化数据库表
        manager.init_tables().await?;

        Ok(manager)
    }

    /// 连接到内存数据库 (主要用于测试，生产环境使用connect()以确保数据持久化)
    pub async fn connect_memory() -> Result<Self> {
        let (sender, receiver) = mpsc::channel(100);

        // 启动DuckDB Actor（内存模式）
        let actor = DuckDbActor::new_memory()?;
        tokio::spawn(actor.run(receiver));

        let manager = Self { sender };

        // 初始化数据库表
        manager.init_tables().await?;

        Ok(manager)
    }

    /// 发送消息并等待Actor响应
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> DbMessage,
    ) -> Result<T> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| BackupError::Custom("数据库Actor已关闭".to_string()))?;

        receiver
            .await
            .map_err(|_| BackupError::Custom("等待数据库响应失败".to_string()))?
    }

    /// 初始化数据库表
    async fn init_tables(&self) -> Result<()> {
        self.request(|respond_to| DbMessage::InitTables { respond_to })
            .await
    }

    /// 获取状态值
    pub async fn get_state(&self, key: &str) -> Result<Option<Value>> {
        self.request(|respond_to| DbMessage::GetState {
            key: key.to_string(),
            respond_to,
        })
        .await
    }

    /// 写入状态值
    pub async fn set_state(&self, key: &str, value: Value) -> Result<()> {
        self.request(|respond_to| DbMessage::SetState {
            key: key.to_string(),
            value,
            respond_to,
        })
        .await
    }

    /// 查询全部已完成工作（日期倒序，同日按ID倒序）
    pub async fn list_completed_jobs(&self) -> Result<Vec<CompletedJob>> {
        self.request(|respond_to| DbMessage::ListCompletedJobs { respond_to })
            .await
    }

    /// 新增已完成工作，返回记录ID
    pub async fn insert_completed_job(&self, job: NewCompletedJob) -> Result<i64> {
        self.request(|respond_to| DbMessage::InsertCompletedJob { job, respond_to })
            .await
    }

    /// 将WAL合并进主数据文件
    pub async fn checkpoint(&self) -> Result<()> {
        self.request(|respond_to| DbMessage::Checkpoint { respond_to })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{AnalysisAssignment, JobPersonnel};
    use chrono::NaiveDate;
    use serde_json::json;

    fn sample_job(date: NaiveDate, personnel: Vec<JobPersonnel>) -> NewCompletedJob {
        NewCompletedJob {
            date,
            shift: "Gündüz".to_string(),
            equipment: "Pres 3".to_string(),
            intervention_type: "Arıza".to_string(),
            start_time: "08:00".to_string(),
            end_time: "09:30".to_string(),
            duration_minutes: 90,
            description: "Hidrolik kaçak giderildi".to_string(),
            materials_used: None,
            analysis: None,
            personnel,
        }
    }

    fn person(name: &str, no: &str) -> JobPersonnel {
        JobPersonnel {
            full_name: name.to_string(),
            personnel_no: no.to_string(),
            department: "Bakım".to_string(),
        }
    }

    #[tokio::test]
    async fn test_state_get_set_upsert() {
        let db = DuckDbManager::connect_memory().await.unwrap();

        assert_eq!(db.get_state("backup.settings").await.unwrap(), None);

        db.set_state("backup.settings", json!({"enabled": true}))
            .await
            .unwrap();
        db.set_state("backup.settings", json!({"enabled": false}))
            .await
            .unwrap();

        assert_eq!(
            db.get_state("backup.settings").await.unwrap(),
            Some(json!({"enabled": false}))
        );
    }

    #[tokio::test]
    async fn test_completed_jobs_ordering_and_personnel() {
        let db = DuckDbManager::connect_memory().await.unwrap();
        let older = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let newer = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();

        let first = db
            .insert_completed_job(sample_job(older, vec![person("Ali Veli", "S-1")]))
            .await
            .unwrap();
        let second = db
            .insert_completed_job(sample_job(
                newer,
                vec![person("Ayşe Kaya", "S-2"), person("Mehmet Demir", "S-3")],
            ))
            .await
            .unwrap();
        let mut with_analysis = sample_job(newer, vec![]);
        with_analysis.analysis = Some(AnalysisAssignment {
            assignee_name: "Zeynep Ak".to_string(),
            assignee_id: "S-9".to_string(),
            work_order_no: Some("IE-42".to_string()),
        });
        let third = db.insert_completed_job(with_analysis).await.unwrap();

        let jobs = db.list_completed_jobs().await.unwrap();
        let ids: Vec<i64> = jobs.iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![third, second, first]);

        assert_eq!(jobs[0].date, newer);
        assert!(jobs[0].personnel.is_empty());
        assert_eq!(
            jobs[0].analysis.as_ref().unwrap().work_order_no.as_deref(),
            Some("IE-42")
        );
        let names: Vec<&str> = jobs[1]
            .personnel
            .iter()
            .map(|p| p.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ayşe Kaya", "Mehmet Demir"]);
        assert!(jobs[2].analysis.is_none());
    }
}
