use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 已完成工作记录（含参与人员）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedJob {
    pub id: i64,
    pub date: NaiveDate,
    pub shift: String,
    pub equipment: String,
    pub intervention_type: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub description: String,
    pub materials_used: Option<String>,
    pub analysis: Option<AnalysisAssignment>,
    pub personnel: Vec<JobPersonnel>,
}

/// 分析指派
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisAssignment {
    pub assignee_name: String,
    pub assignee_id: String,
    pub work_order_no: Option<String>,
}

/// 参与人员
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPersonnel {
    pub full_name: String,
    pub personnel_no: String,
    pub department: String,
}

/// 新建已完成工作记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCompletedJob {
    pub date: NaiveDate,
    pub shift: String,
    pub equipment: String,
    pub intervention_type: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub description: String,
    pub materials_used: Option<String>,
    pub analysis: Option<AnalysisAssignment>,
    pub personnel: Vec<JobPersonnel>,
}
