use super::runner::{BackupRunner, RunOutcome};
use super::runtime::RuntimeState;
use super::settings::BackupSettings;
use super::status::BackupTrigger;
use chrono::Utc;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 可取消的周期任务：每隔 `period` 执行一次 `tick`
///
/// 上一次 `tick` 结束后才开始下一个周期的计时。停止只阻止后续周期，
/// 不会中断正在执行的 `tick`。
#[derive(Debug)]
pub struct RepeatingTask {
    cancel_token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    pub fn start<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel_token = CancellationToken::new();
        let token = cancel_token.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(period) => {}
                }
                tick(token.clone()).await;
            }
            debug!("周期任务已停止");
        });

        Self {
            cancel_token,
            handle,
        }
    }

    pub fn stop(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel_token.is_cancelled() || self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// 自动备份调度器，进程内只维护一个定时器
#[derive(Debug)]
pub struct BackupScheduler {
    runner: Arc<BackupRunner>,
    runtime: Arc<RuntimeState>,
    task: Mutex<Option<RepeatingTask>>,
}

impl BackupScheduler {
    pub fn new(runner: Arc<BackupRunner>, runtime: Arc<RuntimeState>) -> Self {
        Self {
            runner,
            runtime,
            task: Mutex::new(None),
        }
    }

    /// 按设置重新调度，总是替换已有定时器
    pub fn arm(&self, settings: &BackupSettings) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.stop();
        }

        if !settings.enabled {
            self.runtime.set_next_run_at(None);
            info!("自动备份已禁用");
            return;
        }

        let interval_minutes = settings.interval_minutes;
        let period = Duration::from_secs(interval_minutes.max(1) as u64 * 60);
        let next_run_at = Utc::now() + chrono::Duration::minutes(interval_minutes);
        self.runtime.set_next_run_at(Some(next_run_at));

        let runner = self.runner.clone();
        let runtime = self.runtime.clone();
        *slot = Some(RepeatingTask::start(period, move |token| {
            let runner = runner.clone();
            let runtime = runtime.clone();
            async move {
                run_scheduled_backup(&runner).await;
                if !token.is_cancelled() {
                    runtime.set_next_run_at(Some(
                        Utc::now() + chrono::Duration::minutes(interval_minutes),
                    ));
                }
            }
        }));

        info!(
            interval_minutes,
            next_run_at = %next_run_at.to_rfc3339(),
            "自动备份已调度"
        );
    }

    /// 取消定时器并清除下次运行时间
    pub fn disarm(&self) {
        let mut slot = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.stop();
            info!("自动备份定时器已取消");
        }
        self.runtime.set_next_run_at(None);
    }

    pub fn is_armed(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_stopped())
    }
}

/// 定时触发的备份，所有错误只记录日志
async fn run_scheduled_backup(runner: &BackupRunner) {
    match runner.run_backup_now(BackupTrigger::Auto).await {
        Ok(RunOutcome::Success { files, .. }) => {
            info!(files = files.len(), "定时备份完成");
        }
        Ok(RunOutcome::Rejected { .. }) => {
            warn!("定时备份跳过：已有备份正在运行");
        }
        Ok(RunOutcome::Failed { message, .. }) => {
            warn!(error = %message, "定时备份失败，等待下一个周期");
        }
        Err(e) => {
            error!(error = %e, "定时备份无法记录状态");
        }
    }
}
