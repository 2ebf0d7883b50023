//! Append-only scan logs partitioned by severity
//!
//! These files are a domain feature (served back over the API), not
//! process diagnostics; every line is mirrored to `tracing` as well.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::types::{Result, ScanError};

/// Lines returned by the tail reader
const TAIL_LINES: usize = 1000;

/// Log categories and their backing files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Signals,
    Checks,
    Errors,
}

impl LogKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            LogKind::Signals => "signals.log",
            LogKind::Checks => "checks.log",
            LogKind::Errors => "errors.log",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Signals => "signals",
            LogKind::Checks => "checks",
            LogKind::Errors => "errors",
        }
    }
}

impl FromStr for LogKind {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "signals" => Ok(LogKind::Signals),
            "checks" => Ok(LogKind::Checks),
            "errors" => Ok(LogKind::Errors),
            other => Err(ScanError::BadRequest(format!(
                "Invalid log type '{}'. Valid values are: signals, checks, errors",
                other
            ))),
        }
    }
}

/// Append-only writer for the three scan-log files
pub struct ScanLogger {
    dir: PathBuf,
    // One write per line keeps lines atomic under concurrent checks.
    lock: Mutex<()>,
}

impl ScanLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| ScanError::ConfigMissing(format!("cannot create log dir: {}", e)))?;
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    /// Append one timestamped line to the given category.
    pub fn log(&self, kind: LogKind, message: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format!("[{}] {}\n", timestamp, message);

        let guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.dir.join(kind.file_name());
        let write = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        drop(guard);

        if let Err(e) = write {
            warn!("Failed to append to {}: {}", path.display(), e);
        }
        info!("{}", message);
    }

    /// Per-symbol check outcome; confirmed signals go to the signals log.
    pub fn log_check(&self, symbol: &str, price: f64, bb_lower: f64, is_signal: bool) {
        if is_signal {
            self.log(
                LogKind::Signals,
                &format!(
                    "⚠️ {}: Цена {} <= BB {:.2} - СИГНАЛ НА ПОКУПКУ!",
                    symbol, price, bb_lower
                ),
            );
        } else {
            self.log(
                LogKind::Checks,
                &format!("{}: Цена {} > BB {:.2}", symbol, price, bb_lower),
            );
        }
    }

    /// Per-symbol failure
    pub fn log_error(&self, symbol: &str, error: &str) {
        self.log(
            LogKind::Errors,
            &format!("❌ Ошибка при проверке {}: {}", symbol, error),
        );
    }

    /// Final scan summary; routed to signals when any were found.
    pub fn log_summary(&self, successful: usize, errors: usize, signals: usize) {
        let kind = if signals > 0 {
            LogKind::Signals
        } else {
            LogKind::Checks
        };
        self.log(
            kind,
            &format!(
                "✅ Проверка завершена! Успешно: {}, с ошибками: {}, найдено сигналов: {}",
                successful, errors, signals
            ),
        );
    }

    /// Last 1000 lines of a category, or a placeholder when empty.
    pub fn tail(&self, kind: LogKind) -> String {
        let path = self.dir.join(kind.file_name());
        match fs::read_to_string(&path) {
            Ok(content) => {
                let lines: Vec<&str> = content.lines().collect();
                let start = lines.len().saturating_sub(TAIL_LINES);
                lines[start..].join("\n")
            }
            Err(_) => "Лог-файл пуст или не существует".to_string(),
        }
    }
}
