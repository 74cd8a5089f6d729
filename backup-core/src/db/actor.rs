use crate::{BackupError, Result};
use chrono::NaiveDate;
use duckdb::{Connection, params};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::DbMessage;
use super::models::{AnalysisAssignment, CompletedJob, JobPersonnel, NewCompletedJob};

/// DuckDB Actor - 确保单线程访问DuckDB
pub struct DuckDbActor {
    connection: Connection,
}

impl DuckDbActor {
    /// 创建新的DuckDB Actor
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let connection = Connection::open(db_path)?;
        Ok(Self { connection })
    }

    /// 创建内存DuckDB Actor
    pub fn new_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self { connection })
    }

    /// 运行Actor消息循环
    pub async fn run(mut self, mut receiver: mpsc::Receiver<DbMessage>) {
        info!("DuckDB Actor 已启动");

        while let Some(message) = receiver.recv().await {
            self.handle_message(message);
        }

        info!("DuckDB Actor 已关闭");
    }

    /// 处理数据库消息
    fn handle_message(&mut self, message: DbMessage) {
        match message {
            DbMessage::InitTables { respond_to } => {
                let result = self.init_tables();
                let _ = respond_to.send(result);
            }
            DbMessage::GetState { key, respond_to } => {
                let result = self.get_state(&key);
                let _ = respond_to.send(result);
            }
            DbMessage::SetState {
                key,
                value,
                respond_to,
            } => {
                let result = self.set_state(&key, &value);
                let _ = respond_to.send(result);
            }
            DbMessage::ListCompletedJobs { respond_to } => {
                let result = self.list_completed_jobs();
                let _ = respond_to.send(result);
            }
            DbMessage::InsertCompletedJob { job, respond_to } => {
                let result = self.insert_completed_job(&job);
                let _ = respond_to.send(result);
            }
            DbMessage::Checkpoint { respond_to } => {
                let result = self.checkpoint();
                let _ = respond_to.send(result);
            }
        }
    }

    /// 初始化数据库表
    fn init_tables(&mut self) -> Result<()> {
        debug!("正在初始化DuckDB表...");

        // 读取并执行SQL初始化脚本
        let sql_content = include_str!("../../migrations/init_duckdb.sql");

        // 按分号分割SQL语句并执行
        for statement in sql_content.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                self.connection.execute(trimmed, [])?;
            }
        }

        info!("DuckDB表初始化完成");
        Ok(())
    }

    /// 获取状态值
    fn get_state(&mut self, key: &str) -> Result<Option<Value>> {
        let mut stmt = self
            .connection
            .prepare("SELECT state_value FROM app_state WHERE state_key = ?")?;
        let mut rows = stmt.query(params![key])?;

        if let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            match serde_json::from_str::<Value>(&raw) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    // 损坏的值按字符串返回，交给上层规范化回退
                    warn!(key, error = %e, "状态值不是合法JSON");
                    Ok(Some(Value::String(raw)))
                }
            }
        } else {
            Ok(None)
        }
    }

    /// 设置状态值
    fn set_state(&mut self, key: &str, value: &Value) -> Result<()> {
        let serialized = serde_json::to_string(value)?;

        // 首先尝试更新现有状态
        let updated = self.connection.execute(
            "UPDATE app_state SET state_value = ?, updated_at = CURRENT_TIMESTAMP WHERE state_key = ?",
            params![serialized, key],
        )?;

        // 如果没有更新任何行，则插入新状态
        if updated == 0 {
            self.connection.execute(
                "INSERT INTO app_state (state_key, state_value) VALUES (?, ?)",
                params![key, serialized],
            )?;
        }
        Ok(())
    }

    /// 查询全部已完成工作，按日期、ID倒序
    fn list_completed_jobs(&mut self) -> Result<Vec<CompletedJob>> {
        let mut personnel_by_job: HashMap<i64, Vec<JobPersonnel>> = HashMap::new();
        {
            let mut stmt = self.connection.prepare(
                "SELECT job_id, full_name, personnel_no, department
                 FROM completed_job_personnel ORDER BY job_id, sort_order, id",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    JobPersonnel {
                        full_name: row.get(1)?,
                        personnel_no: row.get(2)?,
                        department: row.get(3)?,
                    },
                ))
            })?;
            for row in rows {
                let (job_id, person) = row?;
                personnel_by_job.entry(job_id).or_default().push(person);
            }
        }

        let mut stmt = self.connection.prepare(
            "SELECT id, CAST(job_date AS VARCHAR), shift, equipment, intervention_type,
                    start_time, end_time, duration_minutes, description, materials_used,
                    analysis_assignee_name, analysis_assignee_id, analysis_work_order_no
             FROM completed_jobs ORDER BY job_date DESC, id DESC",
        )?;

        let job_iter = stmt.query_map([], |row| {
            let assignee_name: Option<String> = row.get(10)?;
            let assignee_id: Option<String> = row.get(11)?;
            let work_order_no: Option<String> = row.get(12)?;
            let analysis = match (assignee_name, assignee_id) {
                (Some(assignee_name), Some(assignee_id)) => Some(AnalysisAssignment {
                    assignee_name,
                    assignee_id,
                    work_order_no,
                }),
                _ => None,
            };

            Ok((
                row.get::<_, String>(1)?,
                CompletedJob {
                    id: row.get(0)?,
                    date: NaiveDate::MIN,
                    shift: row.get(2)?,
                    equipment: row.get(3)?,
                    intervention_type: row.get(4)?,
                    start_time: row.get(5)?,
                    end_time: row.get(6)?,
                    duration_minutes: row.get(7)?,
                    description: row.get(8)?,
                    materials_used: row.get(9)?,
                    analysis,
                    personnel: Vec::new(),
                },
            ))
        })?;

        let mut jobs = Vec::new();
        for job in job_iter {
            let (raw_date, mut job) = job?;
            job.date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|e| {
                BackupError::custom(format!("工作记录 {} 日期无效 '{}': {}", job.id, raw_date, e))
            })?;
            job.personnel = personnel_by_job.remove(&job.id).unwrap_or_default();
            jobs.push(job);
        }

        Ok(jobs)
    }

    /// 新增已完成工作及其人员
    fn insert_completed_job(&mut self, job: &NewCompletedJob) -> Result<i64> {
        let (assignee_name, assignee_id, work_order_no) = match &job.analysis {
            Some(analysis) => (
                Some(analysis.assignee_name.clone()),
                Some(analysis.assignee_id.clone()),
                analysis.work_order_no.clone(),
            ),
            None => (None, None, None),
        };

        let tx = self.connection.transaction()?;

        let id: i64 = tx.query_row(
            "INSERT INTO completed_jobs (job_date, shift, equipment, intervention_type, start_time,
                 end_time, duration_minutes, description, materials_used,
                 analysis_assignee_name, analysis_assignee_id, analysis_work_order_no)
             VALUES (CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
            params![
                job.date.format("%Y-%m-%d").to_string(),
                job.shift,
                job.equipment,
                job.intervention_type,
                job.start_time,
                job.end_time,
                job.duration_minutes,
                job.description,
                job.materials_used,
                assignee_name,
                assignee_id,
                work_order_no,
            ],
            |row| row.get(0),
        )?;

        for (index, person) in job.personnel.iter().enumerate() {
            tx.execute(
                "INSERT INTO completed_job_personnel (job_id, full_name, personnel_no, department, sort_order)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    id,
                    person.full_name,
                    person.personnel_no,
                    person.department,
                    index as i32,
                ],
            )?;
        }

        tx.commit()?;
        debug!(job_id = id, personnel = job.personnel.len(), "已写入已完成工作记录");
        Ok(id)
    }

    /// 执行CHECKPOINT，让主文件包含最新数据
    fn checkpoint(&mut self) -> Result<()> {
        self.connection.execute_batch("CHECKPOINT")?;
        Ok(())
    }
}
