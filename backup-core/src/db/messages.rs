use crate::Result;
use serde_json::Value;
use tokio::sync::oneshot;

use super::models::{CompletedJob, NewCompletedJob};

/// DuckDB数据库操作消息
#[derive(Debug)]
pub enum DbMessage {
    /// 初始化数据库表
    InitTables {
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 获取状态值
    GetState {
        key: String,
        respond_to: oneshot::Sender<Result<Option<Value>>>,
    },
    /// 写入状态值（存在则覆盖）
    SetState {
        key: String,
        value: Value,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 查询全部已完成工作
    ListCompletedJobs {
        respond_to: oneshot::Sender<Result<Vec<CompletedJob>>>,
    },
    /// 新增已完成工作
    InsertCompletedJob {
        job: NewCompletedJob,
        respond_to: oneshot::Sender<Result<i64>>,
    },
    /// 将WAL合并进主文件
    Checkpoint {
        respond_to: oneshot::Sender<Result<()>>,
    },
}
