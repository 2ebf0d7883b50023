//! Scan triggering and the daily schedule
//!
//! One scan at a time: manual and scheduled triggers share a mutex and
//! a trigger that finds it held is skipped, not queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, Utc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::scan_log::{LogKind, ScanLogger};
use crate::scanner::{CancelToken, ScanOrchestrator};

/// Daily scan time (UTC)
pub const SCAN_HOUR_UTC: u32 = 8;
/// Delay before the warm-up scan after startup
pub const WARMUP_DELAY: Duration = Duration::from_secs(5);

/// Shared handle for starting scans from the scheduler and the API
#[derive(Clone)]
pub struct ScanService {
    orchestrator: Arc<ScanOrchestrator>,
    logger: Arc<ScanLogger>,
    catalog: Arc<Vec<String>>,
    cancel: CancelToken,
    running: Arc<tokio::sync::Mutex<()>>,
}

impl ScanService {
    pub fn new(
        orchestrator: Arc<ScanOrchestrator>,
        logger: Arc<ScanLogger>,
        catalog: Vec<String>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            orchestrator,
            logger,
            catalog: Arc::new(catalog),
            cancel,
            running: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Start a scan in the background. Returns false (and logs the
    /// skip) when a scan is already in flight.
    pub fn trigger(&self, label: &'static str) -> bool {
        let Ok(guard) = Arc::clone(&self.running).try_lock_owned() else {
            warn!("scan already in progress; skipping {} trigger", label);
            self.logger.log(
                LogKind::Checks,
                &format!("Проверка уже выполняется, запуск ({}) пропущен", label),
            );
            return false;
        };

        let orchestrator = Arc::clone(&self.orchestrator);
        let catalog = Arc::clone(&self.catalog);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let _guard = guard;
            info!("starting {} scan over {} symbols", label, catalog.len());
            let run = orchestrator.run(&catalog, &cancel).await;
            info!(
                success = run.success_count,
                errors = run.error_count,
                signals = run.signal_count,
                "{} scan finished",
                label
            );
        });
        true
    }
}

/// Seconds until the next 08:00:00 UTC boundary.
fn duration_until_next_run(now: DateTime<Utc>) -> Duration {
    let today = now
        .date_naive()
        .and_hms_opt(SCAN_HOUR_UTC, 0, 0)
        .unwrap_or(now.naive_utc())
        .and_utc();
    let next = if now < today {
        today
    } else {
        today
            .checked_add_days(Days::new(1))
            .unwrap_or(today)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

/// Run the warm-up scan shortly after startup, then a scan every day
/// at 08:00 UTC, until the token is cancelled.
pub fn spawn(service: ScanService, cancel: CancelToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(WARMUP_DELAY) => {}
        }
        service.trigger("warm-up");

        loop {
            let wait = duration_until_next_run(Utc::now());
            info!("next scheduled scan in {} s", wait.as_secs());
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(wait) => {}
            }
            service.trigger("scheduled");
        }
    })
}
