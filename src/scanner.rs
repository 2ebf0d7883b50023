//! Scan orchestrator - one full pass over the symbol catalog
//!
//! Symbols are processed in fixed batches of five; the batch members
//! run in parallel, batches run in order with a two-second pause
//! between them to stay polite to the upstream API. A per-symbol
//! failure never aborts the run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Notify;
use tracing::{debug, info};

use crate::indicators::{bollinger_lower, BollingerConfig};
use crate::notifier::TelegramNotifier;
use crate::scan_log::{LogKind, ScanLogger};
use crate::signals::{evaluate, Evaluation, NoSignalReason};
use crate::sources::MarketData;
use crate::types::ScanRun;

/// Symbols fetched in parallel per batch
pub const BATCH_SIZE: usize = 5;
/// Pause between batches
pub const BATCH_PAUSE: Duration = Duration::from_secs(2);

/// Cooperative cancellation flag, observed at batch boundaries.
/// In-flight per-symbol tasks are allowed to complete.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Default)]
struct CancelInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        loop {
            // Register interest before checking the flag so a concurrent
            // cancel cannot slip between the check and the await.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Outcome of one symbol's check, for run accounting
enum CheckOutcome {
    Signal,
    NoSignal,
    Error,
}

/// Drives the fetch → aggregate → indicator → evaluate → notify
/// pipeline over a symbol catalog.
pub struct ScanOrchestrator {
    market: Arc<dyn MarketData>,
    notifier: Arc<TelegramNotifier>,
    logger: Arc<ScanLogger>,
    bollinger: BollingerConfig,
    require_daily_confluence: bool,
}

impl ScanOrchestrator {
    pub fn new(
        market: Arc<dyn MarketData>,
        notifier: Arc<TelegramNotifier>,
        logger: Arc<ScanLogger>,
        bollinger: BollingerConfig,
        require_daily_confluence: bool,
    ) -> Self {
        Self {
            market,
            notifier,
            logger,
            bollinger,
            require_daily_confluence,
        }
    }

    /// Run one complete scan. Always completes with a summary; the
    /// cancel token only prevents further batches from starting.
    pub async fn run(&self, catalog: &[String], cancel: &CancelToken) -> ScanRun {
        let started_at = Utc::now();
        self.logger.log(
            LogKind::Checks,
            &format!(
                "Проверка сигналов на покупку для {} криптовалют на недельном таймфрейме...",
                catalog.len()
            ),
        );

        let mut success_count = 0;
        let mut error_count = 0;
        let mut signal_count = 0;

        let total_batches = catalog.len().div_ceil(BATCH_SIZE);
        for (index, batch) in catalog.chunks(BATCH_SIZE).enumerate() {
            if cancel.is_cancelled() {
                self.logger.log(
                    LogKind::Checks,
                    &format!(
                        "Проверка остановлена: отменено перед батчем {}/{}",
                        index + 1,
                        total_batches
                    ),
                );
                break;
            }

            let outcomes = join_all(batch.iter().map(|symbol| self.scan_symbol(symbol))).await;
            for outcome in outcomes {
                match outcome {
                    CheckOutcome::Signal => {
                        success_count += 1;
                        signal_count += 1;
                    }
                    CheckOutcome::NoSignal => success_count += 1,
                    CheckOutcome::Error => error_count += 1,
                }
            }

            if index + 1 < total_batches {
                tokio::time::sleep(BATCH_PAUSE).await;
            }
        }

        self.logger
            .log_summary(success_count, error_count, signal_count);

        ScanRun {
            started_at,
            ended_at: Utc::now(),
            success_count,
            error_count,
            signal_count,
        }
    }

    async fn scan_symbol(&self, symbol: &str) -> CheckOutcome {
        debug!(symbol, "fetching weekly series");
        let weekly = match self.market.fetch_weekly(symbol).await {
            Ok(weekly) => weekly,
            Err(e) => {
                self.logger.log_error(symbol, &e.to_string());
                return CheckOutcome::Error;
            }
        };

        debug!(symbol, bars = weekly.len(), "computing indicator");
        let indicators = bollinger_lower(&weekly, &self.bollinger);

        debug!(symbol, "evaluating entry predicate");
        match evaluate(symbol, &weekly, &indicators) {
            Evaluation::Signal(event) => {
                if self.require_daily_confluence {
                    match self.daily_confirms(symbol, event.price).await {
                        Ok(true) => {}
                        Ok(false) => {
                            self.logger.log(
                                LogKind::Checks,
                                &format!("{}: недельный сигнал без дневного подтверждения", symbol),
                            );
                            return CheckOutcome::NoSignal;
                        }
                        Err(e) => {
                            self.logger.log_error(symbol, &e.to_string());
                            return CheckOutcome::Error;
                        }
                    }
                }

                self.logger
                    .log_check(symbol, event.price, event.bb_lower_weekly, true);
                self.logger.log(
                    LogKind::Signals,
                    &format!("⚠️ Найден сигнал на покупку для {}!", symbol),
                );

                // Delivery failures are recovered here: logged, no retry.
                if let Err(e) = self.notifier.send_signal(&event).await {
                    self.logger.log(
                        LogKind::Errors,
                        &format!("❌ Ошибка при отправке сигнала для {}: {}", symbol, e),
                    );
                }
                CheckOutcome::Signal
            }
            Evaluation::NoSignal { reason } => {
                match reason {
                    NoSignalReason::AboveBand => {
                        // The indicator point exists whenever the series
                        // passed the length filter.
                        if let (Some(bar), Some(point)) = (weekly.last(), indicators.last()) {
                            self.logger.log_check(symbol, bar.close, point.lower, false);
                        }
                    }
                    NoSignalReason::Excluded | NoSignalReason::FilteredPattern => {
                        self.logger.log(
                            LogKind::Checks,
                            &format!("{}: исключен из проверки ({})", symbol, reason.as_str()),
                        );
                    }
                    NoSignalReason::InsufficientData => {
                        self.logger.log(
                            LogKind::Checks,
                            &format!(
                                "{}: недостаточно данных для расчета полос Боллинджера",
                                symbol
                            ),
                        );
                    }
                    NoSignalReason::DataError => {
                        self.logger.log_error(symbol, "data error during evaluation");
                        return CheckOutcome::Error;
                    }
                }
                CheckOutcome::NoSignal
            }
        }
    }

    /// Optional second gate: the daily close must also sit at or below
    /// the daily lower band.
    async fn daily_confirms(&self, symbol: &str, _weekly_close: f64) -> crate::types::Result<bool> {
        let daily = self.market.fetch_daily(symbol, 2000).await?;
        let indicators = bollinger_lower(&daily, &self.bollinger);
        let (Some(bar), Some(point)) = (daily.last(), indicators.last()) else {
            return Ok(false);
        };
        let confirmed = bar.close <= point.lower;
        if confirmed {
            info!(symbol, "daily confluence confirmed");
        }
        Ok(confirmed)
    }
}
