use super::xlsx::{CellValue, XlsxSheet};
use crate::constants::{backup, excel};
use crate::db::{CompletedJob, Database};
use crate::error::{BackupError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// 导出表格中的一行（工作 × 人员）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJobRow {
    pub record_id: i64,
    pub date: String,
    pub shift: String,
    pub person_name: String,
    pub person_no: String,
    pub department: String,
    pub equipment: String,
    pub intervention_type: String,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: i64,
    pub description: String,
    pub materials_used: String,
    pub analysis: String,
}

impl CompletedJobRow {
    fn into_cells(self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.record_id.to_string()),
            CellValue::Text(self.date),
            CellValue::Text(self.shift),
            CellValue::Text(self.person_name),
            CellValue::Text(self.person_no),
            CellValue::Text(self.department),
            CellValue::Text(self.equipment),
            CellValue::Text(self.intervention_type),
            CellValue::Text(self.start_time),
            CellValue::Text(self.end_time),
            CellValue::Integer(self.duration_minutes),
            CellValue::Text(self.description),
            CellValue::Text(self.materials_used),
            CellValue::Text(self.analysis),
        ]
    }
}

/// 分析指派列：`-` 或 `姓名 (编号)[ - 工单号]`
fn format_analysis(job: &CompletedJob) -> String {
    match &job.analysis {
        None => excel::PLACEHOLDER.to_string(),
        Some(analysis) => {
            let mut text = format!("{} ({})", analysis.assignee_name, analysis.assignee_id);
            if let Some(work_order) = analysis
                .work_order_no
                .as_deref()
                .filter(|no| !no.trim().is_empty())
            {
                text.push_str(" - ");
                text.push_str(work_order);
            }
            text
        }
    }
}

/// 展开为行：每个人员一行，无人员时输出一行占位
pub fn build_rows(jobs: &[CompletedJob]) -> Vec<CompletedJobRow> {
    let mut rows = Vec::new();

    for job in jobs {
        let date = job.date.format(excel::DATE_FORMAT).to_string();
        let analysis = format_analysis(job);
        let materials = job.materials_used.clone().unwrap_or_default();

        let make_row = |name: &str, no: &str, department: &str| CompletedJobRow {
            record_id: job.id,
            date: date.clone(),
            shift: job.shift.clone(),
            person_name: name.to_string(),
            person_no: no.to_string(),
            department: department.to_string(),
            equipment: job.equipment.clone(),
            intervention_type: job.intervention_type.clone(),
            start_time: job.start_time.clone(),
            end_time: job.end_time.clone(),
            duration_minutes: job.duration_minutes,
            description: job.description.clone(),
            materials_used: materials.clone(),
            analysis: analysis.clone(),
        };

        if job.personnel.is_empty() {
            rows.push(make_row(
                excel::PLACEHOLDER,
                excel::PLACEHOLDER,
                excel::PLACEHOLDER,
            ));
        } else {
            for person in &job.personnel {
                rows.push(make_row(
                    &person.full_name,
                    &person.personnel_no,
                    &person.department,
                ));
            }
        }
    }

    rows
}

/// 生成表格
pub fn build_sheet(rows: Vec<CompletedJobRow>) -> XlsxSheet {
    let mut sheet = XlsxSheet::new(excel::SHEET_NAME)
        .with_column_widths(&excel::COLUMN_WIDTHS)
        .with_header(&excel::HEADERS);
    for row in rows {
        sheet.push_row(row.into_cells());
    }
    sheet
}

/// 导出已完成工作表格，返回文件路径
pub async fn export_completed_jobs(db: &Database, backup_dir: &Path, token: &str) -> Result<PathBuf> {
    let jobs = db
        .list_completed_jobs()
        .await
        .map_err(|e| BackupError::export(format!("查询已完成工作失败: {e}")))?;

    let rows = build_rows(&jobs);
    let target = backup_dir.join(format!(
        "{}_{}.{}",
        backup::COMPLETED_EXCEL_PREFIX,
        token,
        backup::EXCEL_EXTENSION
    ));

    info!(
        jobs = jobs.len(),
        rows = rows.len(),
        "开始导出已完成工作表格: {}",
        target.display()
    );

    let sheet = build_sheet(rows);
    let target_for_write = target.clone();
    tokio::task::spawn_blocking(move || sheet.write_to(&target_for_write))
        .await
        .map_err(|e| BackupError::export(format!("表格导出任务失败: {e}")))?
        .map_err(|e| BackupError::export(format!("写入表格失败 {}: {e}", target.display())))?;

    info!("已完成工作表格导出完成: {}", target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{AnalysisAssignment, JobPersonnel, NewCompletedJob};
    use chrono::NaiveDate;
    use std::io::Read;
    use tempfile::TempDir;

    fn job(id: i64, personnel: Vec<JobPersonnel>) -> CompletedJob {
        CompletedJob {
            id,
            date: NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(),
            shift: "Gece".to_string(),
            equipment: "Kompresör 1".to_string(),
            intervention_type: "Periyodik Bakım".to_string(),
            start_time: "22:15".to_string(),
            end_time: "23:00".to_string(),
            duration_minutes: 45,
            description: "Filtre değişimi".to_string(),
            materials_used: None,
            analysis: None,
            personnel,
        }
    }

    fn person(name: &str, no: &str) -> JobPersonnel {
        JobPersonnel {
            full_name: name.to_string(),
            personnel_no: no.to_string(),
            department: "Elektrik".to_string(),
        }
    }

    #[test]
    fn test_rows_per_personnel_and_placeholder() {
        let a = job(7, vec![person("Ali Veli", "100"), person("Can Er", "101")]);
        let b = job(3, vec![]);

        let rows = build_rows(&[a, b]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().filter(|r| r.record_id == 7).count(), 2);

        let placeholder: Vec<&CompletedJobRow> = rows.iter().filter(|r| r.record_id == 3).collect();
        assert_eq!(placeholder.len(), 1);
        assert_eq!(placeholder[0].person_name, "-");
        assert_eq!(placeholder[0].person_no, "-");
        assert_eq!(placeholder[0].department, "-");
    }

    #[test]
    fn test_row_formatting() {
        let mut with_analysis = job(12, vec![person("Ali Veli", "100")]);
        with_analysis.materials_used = Some("2x rulman".to_string());
        with_analysis.analysis = Some(AnalysisAssignment {
            assignee_name: "Zeynep Ak".to_string(),
            assignee_id: "S-9".to_string(),
            work_order_no: Some("IE-42".to_string()),
        });
        let mut without_work_order = job(13, vec![]);
        without_work_order.analysis = Some(AnalysisAssignment {
            assignee_name: "Zeynep Ak".to_string(),
            assignee_id: "S-9".to_string(),
            work_order_no: None,
        });

        let rows = build_rows(&[with_analysis, without_work_order, job(14, vec![])]);
        assert_eq!(rows[0].date, "09.02.2024");
        assert_eq!(rows[0].materials_used, "2x rulman");
        assert_eq!(rows[0].analysis, "Zeynep Ak (S-9) - IE-42");
        assert_eq!(rows[1].analysis, "Zeynep Ak (S-9)");
        assert_eq!(rows[2].analysis, "-");
        assert_eq!(rows[2].materials_used, "");
    }

    #[test]
    fn test_cells_keep_duration_numeric() {
        let cells = build_rows(&[job(1, vec![])]).remove(0).into_cells();
        assert_eq!(cells.len(), excel::HEADERS.len());
        assert_eq!(cells[0], CellValue::Text("1".to_string()));
        assert_eq!(cells[1], CellValue::Text("09.02.2024".to_string()));
        assert_eq!(cells[10], CellValue::Integer(45));
    }

    #[tokio::test]
    async fn test_export_writes_workbook_from_database() {
        let db = Database::connect_memory().await.unwrap();
        db.insert_completed_job(NewCompletedJob {
            date: NaiveDate::from_ymd_opt(2024, 2, 9).unwrap(),
            shift: "Gündüz".to_string(),
            equipment: "Pres 3".to_string(),
            intervention_type: "Arıza".to_string(),
            start_time: "08:00".to_string(),
            end_time: "08:30".to_string(),
            duration_minutes: 30,
            description: "Sensör <değişti>".to_string(),
            materials_used: None,
            analysis: None,
            personnel: vec![person("Ali Veli", "100"), person("Can Er", "101")],
        })
        .await
        .unwrap();

        let temp_dir = TempDir::new().unwrap();
        let path = export_completed_jobs(&db, temp_dir.path(), "20240209_101500")
            .await
            .unwrap();
        assert_eq!(path, temp_dir.path().join("tamamlanan_isler_20240209_101500.xlsx"));

        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        let mut sheet = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet)
            .unwrap();

        // 表头 + 两名人员
        assert_eq!(sheet.matches("<row ").count(), 3);
        assert!(sheet.contains("Kayıt No"));
        assert!(sheet.contains("Analiz Ataması"));
        assert!(sheet.contains("Sensör &lt;değişti&gt;"));
        assert!(sheet.contains(r#"<c r="K2"><v>30</v></c>"#));
    }

    #[tokio::test]
    async fn test_export_into_missing_dir_fails() {
        let db = Database::connect_memory().await.unwrap();
        let temp_dir = TempDir::new().unwrap();
        let result = export_completed_jobs(&db, &temp_dir.path().join("missing"), "x").await;
        assert!(matches!(result, Err(BackupError::Export(_))));
    }
}
