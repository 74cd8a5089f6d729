use crate::app::CliApp;
use backup_core::db::{AnalysisAssignment, JobPersonnel, NewCompletedJob};
use backup_core::error::Result;
use chrono::{Days, Local, NaiveDate};
use tracing::{info, instrument};

const EQUIPMENT: [&str; 4] = ["Kompresör 1", "Pres 3", "Torna 2", "Konveyör B"];
const INTERVENTIONS: [&str; 3] = ["Arıza", "Periyodik Bakım", "Kalibrasyon"];
const PEOPLE: [(&str, &str, &str); 3] = [
    ("Ali Veli", "P-100", "Mekanik"),
    ("Ayşe Demir", "P-101", "Elektrik"),
    ("Can Er", "P-102", "Otomasyon"),
];

/// 生成第 `index` 条示例工作，人员数量在 0 到 2 之间循环
pub fn demo_job(index: usize, today: NaiveDate) -> NewCompletedJob {
    let date = today
        .checked_sub_days(Days::new(index as u64))
        .unwrap_or(today);
    let start_hour = 8 + (index % 8) as u32;
    let duration_minutes = 15 + (index as i64 % 6) * 15;
    let end_total = start_hour as i64 * 60 + duration_minutes;

    let personnel = PEOPLE
        .iter()
        .cycle()
        .skip(index)
        .take(index % 3)
        .map(|(name, no, department)| JobPersonnel {
            full_name: name.to_string(),
            personnel_no: no.to_string(),
            department: department.to_string(),
        })
        .collect();

    let analysis = (index % 2 == 1).then(|| AnalysisAssignment {
        assignee_name: "Zeynep Ak".to_string(),
        assignee_id: "S-9".to_string(),
        work_order_no: (index % 4 == 1).then(|| format!("IE-{}", 1000 + index)),
    });

    NewCompletedJob {
        date,
        shift: if start_hour < 16 { "Gündüz" } else { "Gece" }.to_string(),
        equipment: EQUIPMENT[index % EQUIPMENT.len()].to_string(),
        intervention_type: INTERVENTIONS[index % INTERVENTIONS.len()].to_string(),
        start_time: format!("{start_hour:02}:00"),
        end_time: format!("{:02}:{:02}", end_total / 60, end_total % 60),
        duration_minutes,
        description: format!("Örnek iş kaydı #{}", index + 1),
        materials_used: (index % 3 == 0).then(|| "Filtre, conta".to_string()),
        analysis,
        personnel,
    }
}

/// 写入示例已完成工作
#[instrument(skip(app))]
pub async fn run_seed_demo(app: &CliApp, count: usize) -> Result<()> {
    let today = Local::now().date_naive();
    for index in 0..count {
        let id = app.database.insert_completed_job(demo_job(index, today)).await?;
        info!("   ✅ 已写入示例工作 #{}", id);
    }
    info!("🎉 共写入 {} 条示例工作", count);
    Ok(())
}
