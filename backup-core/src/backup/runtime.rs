use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// 进程内运行时状态：运行互斥标志与下次计划运行时间
///
/// 由 `BackupService` 创建一次，注入调度器、执行器与状态仓库。
#[derive(Debug, Default)]
pub struct RuntimeState {
    running: AtomicBool,
    next_run_at: Mutex<Option<DateTime<Utc>>>,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试获取运行租约；已有运行时返回 `None`
    pub fn try_begin_run(&self) -> Option<RunLease<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunLease { state: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        *self
            .next_run_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_next_run_at(&self, next: Option<DateTime<Utc>>) {
        *self
            .next_run_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = next;
    }
}

/// 运行租约，释放时清除运行标志（包括 panic 与提前返回）
#[derive(Debug)]
pub struct RunLease<'a> {
    state: &'a RuntimeState,
}

impl Drop for RunLease<'_> {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}
