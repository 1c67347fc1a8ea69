//! Daily notification scheduler: timer loop, manual trigger, status.

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use {
    anyhow::Result,
    chrono::{DateTime, Utc},
    serde::Serialize,
    tidings_common::time::now_ms,
    tidings_streams::DispatchReport,
    tokio::{
        sync::{Mutex, Notify, RwLock},
        task::JoinHandle,
    },
    tracing::{debug, error, info},
};

use crate::schedule::DailySchedule;

/// Callback performing one dispatch run over a fresh store snapshot.
pub type DispatchFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<DispatchReport>> + Send>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunTrigger {
    Scheduled,
    Manual,
}

/// Outcome of the most recent run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunRecord {
    pub trigger: RunTrigger,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
    pub total_sent: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub next_run_at_ms: Option<u64>,
    pub last_run: Option<RunRecord>,
}

/// Runs the dispatch callback once a day.
///
/// Manual runs go through [`Self::run_now`] and are not coordinated with the
/// timer: a manual run overlapping a scheduled one polls every source twice.
pub struct NotificationScheduler {
    schedule: DailySchedule,
    on_dispatch: DispatchFn,
    timer_handle: Mutex<Option<JoinHandle<()>>>,
    wake_notify: Arc<Notify>,
    running: RwLock<bool>,
    next_run_at_ms: RwLock<Option<u64>>,
    last_run: RwLock<Option<RunRecord>>,
}

impl NotificationScheduler {
    pub fn new(schedule: DailySchedule, on_dispatch: DispatchFn) -> Arc<Self> {
        Arc::new(Self {
            schedule,
            on_dispatch,
            timer_handle: Mutex::new(None),
            wake_notify: Arc::new(Notify::new()),
            running: RwLock::new(false),
            next_run_at_ms: RwLock::new(None),
            last_run: RwLock::new(None),
        })
    }

    pub fn schedule(&self) -> &DailySchedule {
        &self.schedule
    }

    /// Start the timer loop. Returns `false` without doing anything when the
    /// loop is already running.
    pub async fn start(self: &Arc<Self>) -> bool {
        {
            let mut running = self.running.write().await;
            if *running {
                debug!("scheduler already running");
                return false;
            }
            *running = true;
        }

        let next = self.schedule.next_after_ms(now_ms());
        *self.next_run_at_ms.write().await = Some(next);

        let svc = Arc::clone(self);
        let handle = tokio::spawn(async move {
            svc.timer_loop().await;
        });
        *self.timer_handle.lock().await = Some(handle);

        info!(
            time = %self.schedule.time,
            tz = %self.schedule.tz,
            next_run_at = %format_ms(next),
            "notification scheduler started"
        );
        true
    }

    /// Stop the timer loop. A run already in progress is aborted.
    pub async fn stop(&self) {
        *self.running.write().await = false;
        self.wake_notify.notify_one();

        if let Some(handle) = self.timer_handle.lock().await.take() {
            handle.abort();
        }
        *self.next_run_at_ms.write().await = None;
        info!("notification scheduler stopped");
    }

    /// Dispatch immediately and return the report.
    pub async fn run_now(&self) -> Result<DispatchReport> {
        self.execute(RunTrigger::Manual).await
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: *self.running.read().await,
            next_run_at_ms: *self.next_run_at_ms.read().await,
            last_run: self.last_run.read().await.clone(),
        }
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn timer_loop(self: &Arc<Self>) {
        loop {
            if !*self.running.read().await {
                break;
            }

            let Some(target) = *self.next_run_at_ms.read().await else {
                break;
            };
            let sleep_ms = target.saturating_sub(now_ms());

            if sleep_ms > 0 {
                let notify = Arc::clone(&self.wake_notify);
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_millis(sleep_ms)) => {},
                    () = notify.notified() => {
                        debug!("timer loop woken by notify");
                        continue;
                    },
                }
            }

            if !*self.running.read().await {
                break;
            }

            if let Err(e) = self.execute(RunTrigger::Scheduled).await {
                error!(error = %e, "scheduled notification run failed");
            }

            // Advance from the fired target as well as the clock, so an early
            // wake-up cannot fire the same day twice.
            let next = self.schedule.next_after_ms(now_ms().max(target));
            *self.next_run_at_ms.write().await = Some(next);
            debug!(next_run_at = %format_ms(next), "next notification run scheduled");
        }
    }

    async fn execute(&self, trigger: RunTrigger) -> Result<DispatchReport> {
        let started_at_ms = now_ms();
        info!(?trigger, "notification run starting");

        let result = (self.on_dispatch)().await;

        let finished_at_ms = now_ms();
        let record = match &result {
            Ok(report) => {
                info!(
                    ?trigger,
                    sent = report.total(),
                    diagnostics = report.diagnostics.len(),
                    duration_ms = finished_at_ms.saturating_sub(started_at_ms),
                    "notification run finished"
                );
                RunRecord {
                    trigger,
                    started_at_ms,
                    finished_at_ms,
                    total_sent: report.total(),
                    error: None,
                }
            },
            Err(e) => RunRecord {
                trigger,
                started_at_ms,
                finished_at_ms,
                total_sent: 0,
                error: Some(e.to_string()),
            },
        };
        *self.last_run.write().await = Some(record);
        result
    }
}

fn format_ms(ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms as i64)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ms.to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        chrono::NaiveTime,
        std::sync::atomic::{AtomicUsize, Ordering},
    };

    fn schedule() -> DailySchedule {
        DailySchedule::new(
            NaiveTime::from_hms_opt(12, 5, 0).unwrap(),
            "Etc/GMT+8".parse().unwrap(),
        )
    }

    fn counting_dispatch(counter: Arc<AtomicUsize>) -> DispatchFn {
        Arc::new(move || {
            let c = Arc::clone(&counter);
            Box::pin(async move {
                c.fetch_add(1, Ordering::SeqCst);
                let mut report = DispatchReport::default();
                report.sent.insert("news".into(), 2);
                Ok(report)
            })
        })
    }

    fn failing_dispatch() -> DispatchFn {
        Arc::new(|| Box::pin(async { Err(anyhow::anyhow!("store unreadable")) }))
    }

    #[tokio::test]
    async fn start_is_idempotent() {
        let svc = NotificationScheduler::new(schedule(), counting_dispatch(Arc::default()));

        assert!(svc.start().await);
        assert!(!svc.start().await);

        let status = svc.status().await;
        assert!(status.running);
        let next = status.next_run_at_ms.unwrap();
        assert!(next > now_ms());
        assert!(next <= now_ms() + 86_400_000);

        svc.stop().await;
        let status = svc.status().await;
        assert!(!status.running);
        assert!(status.next_run_at_ms.is_none());

        // Startable again after stop.
        assert!(svc.start().await);
        svc.stop().await;
    }

    #[tokio::test]
    async fn run_now_records_last_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let svc = NotificationScheduler::new(schedule(), counting_dispatch(Arc::clone(&counter)));

        let report = svc.run_now().await.unwrap();
        assert_eq!(report.total(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        let last = svc.status().await.last_run.unwrap();
        assert_eq!(last.trigger, RunTrigger::Manual);
        assert_eq!(last.total_sent, 2);
        assert!(last.error.is_none());
        assert!(last.finished_at_ms >= last.started_at_ms);
    }

    #[tokio::test]
    async fn run_now_works_without_start() {
        let svc = NotificationScheduler::new(schedule(), counting_dispatch(Arc::default()));
        assert!(svc.run_now().await.is_ok());
        assert!(!svc.status().await.running);
    }

    #[tokio::test]
    async fn failed_run_is_recorded() {
        let svc = NotificationScheduler::new(schedule(), failing_dispatch());

        assert!(svc.run_now().await.is_err());
        let last = svc.status().await.last_run.unwrap();
        assert_eq!(last.error.as_deref(), Some("store unreadable"));
        assert_eq!(last.total_sent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_per_day() {
        let counter = Arc::new(AtomicUsize::new(0));
        let svc = NotificationScheduler::new(schedule(), counting_dispatch(Arc::clone(&counter)));
        svc.start().await;

        // Virtual time only; the wall clock stays put, so each run must be
        // followed by the next day's target rather than the same one.
        tokio::time::sleep(Duration::from_secs(3 * 86_400)).await;
        let runs = counter.load(Ordering::SeqCst);
        assert!((2..=3).contains(&runs), "runs = {runs}");

        let last = svc.status().await.last_run.unwrap();
        assert_eq!(last.trigger, RunTrigger::Scheduled);
        svc.stop().await;
    }
}
