use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// OHLCV candle for one instrument at one timeframe.
///
/// `time` is epoch seconds (UTC) of the bar open. Within a series,
/// `time` is strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Supported chart timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeFrame {
    Hour1,
    Hour4,
    Day1,
    Week1,
}

impl TimeFrame {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::Hour1 => "1h",
            TimeFrame::Hour4 => "4h",
            TimeFrame::Day1 => "1d",
            TimeFrame::Week1 => "1w",
        }
    }
}

impl FromStr for TimeFrame {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1h" => Ok(TimeFrame::Hour1),
            "4h" => Ok(TimeFrame::Hour4),
            "1d" => Ok(TimeFrame::Day1),
            "1w" => Ok(TimeFrame::Week1),
            other => Err(ScanError::BadRequest(format!(
                "Invalid timeframe '{}'. Valid values are: 1h, 4h, 1d, 1w",
                other
            ))),
        }
    }
}

/// One Bollinger point for one bar. Defined only for bars with a full
/// lookback window behind them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub time: i64,
    pub sma: f64,
    pub stdev: f64,
    pub lower: f64,
    /// Effective stdev when the degenerate-band clamp fired; absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamped_stdev: Option<f64>,
}

/// Volume bar for the chart payload, colored by candle direction.
#[derive(Debug, Clone, Serialize)]
pub struct VolumePoint {
    pub time: i64,
    pub value: f64,
    pub color: &'static str,
}

/// A confirmed buy signal on the last closed weekly bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub bar_time: i64,
    pub price: f64,
    pub bb_lower_weekly: f64,
    pub detected_at: DateTime<Utc>,
}

/// Summary of one full pass over the symbol catalog.
#[derive(Debug, Clone, Serialize)]
pub struct ScanRun {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub success_count: usize,
    pub error_count: usize,
    pub signal_count: usize,
}

/// Error types for the scan pipeline and query API
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(String),

    #[error("Upstream request failed: {0}")]
    Transport(String),

    #[error("Invalid response format: {0}")]
    MalformedResponse(String),

    #[error("No data for {0}")]
    NoData(String),

    #[error("Insufficient history for {symbol}: have {have} bars, need {need}")]
    InsufficientHistory {
        symbol: String,
        have: usize,
        need: usize,
    },

    #[error("Data unavailable for {0}")]
    Unavailable(String),

    #[error("Notification delivery failed: {0}")]
    NotificationFailed(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type for scan pipeline operations
pub type Result<T> = std::result::Result<T, ScanError>;
