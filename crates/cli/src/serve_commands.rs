//! `tidings serve` — run the daily scheduler until interrupted.

use std::sync::Arc;

use {
    anyhow::{Result, bail},
    chrono::DateTime,
    tidings_cron::{DispatchFn, NotificationScheduler},
    tracing::{info, warn},
};

use crate::app::App;

pub async fn serve(app: &App, run_now: bool) -> Result<()> {
    if !app.config.schedule.enabled {
        bail!("schedule.enabled is false; use `tidings run` for one-shot dispatch");
    }

    let schedule = app.daily_schedule()?;
    let service = Arc::clone(&app.service);
    let on_dispatch: DispatchFn = Arc::new(move || {
        let service = Arc::clone(&service);
        Box::pin(async move { service.dispatch().await.map_err(anyhow::Error::from) })
    });

    info!(
        config = %app.config_path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| "defaults".into()),
        store = %app.store.path().display(),
        "starting notification scheduler"
    );
    let scheduler = NotificationScheduler::new(schedule, on_dispatch);
    scheduler.start().await;

    if let Some(next) = scheduler.status().await.next_run_at_ms
        && let Some(at) = DateTime::from_timestamp_millis(next as i64)
    {
        eprintln!(
            "Next notification run at {} ({} in {}).",
            at.to_rfc3339(),
            schedule.time.format("%H:%M"),
            schedule.tz
        );
    }

    if run_now && let Err(e) = scheduler.run_now().await {
        warn!(error = %e, "startup notification run failed");
    }

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, shutting down");
    scheduler.stop().await;

    if let Some(last) = scheduler.status().await.last_run {
        info!(
            sent = last.total_sent,
            error = last.error.as_deref().unwrap_or(""),
            "last notification run"
        );
    }
    Ok(())
}
