//! Weekly candle aggregation
//!
//! Pure, deterministic conversion of daily series into weekly bars
//! aligned to Monday 00:00:00 UTC, matching how TradingView bins weeks.

use chrono::{DateTime, Datelike, Duration};

use crate::types::{Candle, VolumePoint};

const VOLUME_UP_COLOR: &str = "#26A69A";
const VOLUME_DOWN_COLOR: &str = "#EF5350";

/// Epoch seconds of Monday 00:00:00 UTC of the week containing `time`.
fn week_start(time: i64) -> i64 {
    let Some(dt) = DateTime::from_timestamp(time, 0) else {
        // Out-of-range timestamps keep their own key rather than panic.
        return time;
    };
    let date = dt.date_naive();
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    monday
        .and_hms_opt(0, 0, 0)
        .map(|d| d.and_utc().timestamp())
        .unwrap_or(time)
}

/// Aggregate daily candles into weekly candles.
///
/// Input should already be ascending by time; a defensive sort is
/// applied anyway. Missing days inside a week do not split it, and an
/// input starting mid-week yields a first bar covering only the days
/// present. Callers that need an exact 20-week window should supply
/// history with headroom beyond the first, possibly partial, week.
pub fn aggregate_weekly(daily: &[Candle]) -> Vec<Candle> {
    let mut sorted: Vec<Candle> = daily.to_vec();
    sorted.sort_by_key(|c| c.time);

    let mut weekly: Vec<Candle> = Vec::new();
    for day in sorted {
        let start = week_start(day.time);
        match weekly.last_mut() {
            Some(current) if current.time == start => {
                current.high = current.high.max(day.high);
                current.low = current.low.min(day.low);
                current.close = day.close;
                current.volume += day.volume;
            }
            _ => {
                weekly.push(Candle {
                    time: start,
                    open: day.open,
                    high: day.high,
                    low: day.low,
                    close: day.close,
                    volume: day.volume,
                });
            }
        }
    }
    weekly
}

/// Chart volume series for a candle series, colored by bar direction.
pub fn volume_points(candles: &[Candle]) -> Vec<VolumePoint> {
    candles
        .iter()
        .map(|c| VolumePoint {
            time: c.time,
            value: c.volume,
            color: if c.close >= c.open {
                VOLUME_UP_COLOR
            } else {
                VOLUME_DOWN_COLOR
            },
        })
        .collect()
}
