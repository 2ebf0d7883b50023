//! Entry-signal evaluation and symbol eligibility filters

use chrono::Utc;
use phf::phf_set;
use serde::Serialize;

use crate::indicators::BOLLINGER_PERIOD;
use crate::types::{Candle, IndicatorPoint, SignalEvent};

/// Stablecoins never produce buy signals
static STABLECOINS: phf::Set<&'static str> = phf_set! {
    "USDT", "USDC", "DAI", "BUSD", "TUSD", "GUSD", "USDD", "USDP", "FRAX", "LUSD",
};

/// Wrapped tokens track their underlying and are excluded as well
static WRAPPED_TOKENS: phf::Set<&'static str> = phf_set! {
    "WBTC", "WETH", "WBNB", "WAVAX", "WMATIC", "WFTM", "WSOL", "WTRX", "WONE", "WRUNE",
};

/// Case-insensitive substrings that mark pegged/synthetic assets
const EXCLUDED_PATTERNS: [&str; 5] = ["USD", "WRAPPED", "PEGGED", "STABLE", "CASH"];

/// Why a check did not produce a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoSignalReason {
    AboveBand,
    InsufficientData,
    Excluded,
    FilteredPattern,
    DataError,
}

impl NoSignalReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoSignalReason::AboveBand => "above_band",
            NoSignalReason::InsufficientData => "insufficient_data",
            NoSignalReason::Excluded => "excluded",
            NoSignalReason::FilteredPattern => "filtered_pattern",
            NoSignalReason::DataError => "data_error",
        }
    }
}

/// Outcome of evaluating one symbol's weekly series
#[derive(Debug, Clone)]
pub enum Evaluation {
    Signal(SignalEvent),
    NoSignal { reason: NoSignalReason },
}

/// Check the exclusion set and name patterns for a symbol.
pub fn exclusion_reason(symbol: &str) -> Option<NoSignalReason> {
    let upper = symbol.to_uppercase();
    if STABLECOINS.contains(upper.as_str()) || WRAPPED_TOKENS.contains(upper.as_str()) {
        return Some(NoSignalReason::Excluded);
    }
    if EXCLUDED_PATTERNS.iter().any(|p| upper.contains(p)) {
        return Some(NoSignalReason::FilteredPattern);
    }
    None
}

/// Entry predicate: close at or below the lower band.
pub fn is_entry(bar: &Candle, indicator: &IndicatorPoint) -> bool {
    bar.close <= indicator.lower
}

/// Evaluate the most recent closed weekly bar for a buy signal.
///
/// Filters run in order: exclusion set, name pattern, data sufficiency.
/// A filtered symbol is still a completed check; only the notification
/// is suppressed.
pub fn evaluate(symbol: &str, weekly: &[Candle], indicators: &[IndicatorPoint]) -> Evaluation {
    if let Some(reason) = exclusion_reason(symbol) {
        return Evaluation::NoSignal { reason };
    }

    if weekly.len() < BOLLINGER_PERIOD {
        return Evaluation::NoSignal {
            reason: NoSignalReason::InsufficientData,
        };
    }
    let (Some(last_bar), Some(last_indicator)) = (weekly.last(), indicators.last()) else {
        return Evaluation::NoSignal {
            reason: NoSignalReason::InsufficientData,
        };
    };

    if is_entry(last_bar, last_indicator) {
        Evaluation::Signal(SignalEvent {
            symbol: symbol.to_string(),
            bar_time: last_bar.time,
            price: last_bar.close,
            bb_lower_weekly: last_indicator.lower,
            detected_at: Utc::now(),
        })
    } else {
        Evaluation::NoSignal {
            reason: NoSignalReason::AboveBand,
        }
    }
}
