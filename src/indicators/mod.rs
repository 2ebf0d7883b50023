//! Bollinger band computation
//!
//! Single implementation shared by the scan pipeline and the query API.
//! Uses close as the source and population variance (divisor = period),
//! computed in one pass after the mean so results stay bit-identical to
//! the reference formula.

use crate::types::{Candle, IndicatorPoint};

/// Default rolling window length
pub const BOLLINGER_PERIOD: usize = 20;
/// Default standard-deviation multiplier
pub const BOLLINGER_MULTIPLIER: f64 = 2.0;

/// Relative stdev floor, as a fraction of |sma|
const CLAMP_RELATIVE_EPSILON: f64 = 1e-4;
/// Absolute stdev floor in currency units
const CLAMP_ABSOLUTE_FLOOR: f64 = 1e-3;

/// Bollinger parameters
#[derive(Debug, Clone, Copy)]
pub struct BollingerConfig {
    pub period: usize,
    pub multiplier: f64,
    /// Raise near-zero stdev to a small floor so flat data does not
    /// produce a degenerate band. Off by default.
    pub clamp_stdev: bool,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            period: BOLLINGER_PERIOD,
            multiplier: BOLLINGER_MULTIPLIER,
            clamp_stdev: false,
        }
    }
}

/// Compute the Bollinger lower band over a candle series.
///
/// Returns one point per bar with a full window behind it, i.e.
/// `max(0, len - period + 1)` points; empty when the series is shorter
/// than the period.
pub fn bollinger_lower(candles: &[Candle], config: &BollingerConfig) -> Vec<IndicatorPoint> {
    let period = config.period;
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    let mut points = Vec::with_capacity(candles.len() - period + 1);
    for i in (period - 1)..candles.len() {
        let window = &candles[i + 1 - period..=i];

        let sum: f64 = window.iter().map(|c| c.close).sum();
        let sma = sum / period as f64;

        let variance: f64 = window
            .iter()
            .map(|c| {
                let diff = c.close - sma;
                diff * diff
            })
            .sum::<f64>()
            / period as f64;
        let stdev = variance.sqrt();

        let mut effective = stdev;
        let mut clamped = None;
        if config.clamp_stdev {
            let floor = (sma.abs() * CLAMP_RELATIVE_EPSILON).max(CLAMP_ABSOLUTE_FLOOR);
            if stdev < floor {
                effective = floor;
                clamped = Some(floor);
            }
        }

        points.push(IndicatorPoint {
            time: candles[i].time,
            sma,
            stdev,
            lower: sma - config.multiplier * effective,
            clamped_stdev: clamped,
        });
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closes(values: &[f64]) -> Vec<Candle> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Candle {
                time: i as i64 * 604_800,
                open: v,
                high: v,
                low: v,
                close: v,
                volume: 0.0,
            })
            .collect()
    }

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = 1e-9 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn short_series_yields_no_points() {
        let series = closes(&[1.0; 19]);
        assert!(bollinger_lower(&series, &BollingerConfig::default()).is_empty());
    }

    #[test]
    fn point_count_and_times_match_the_window_domain() {
        let series = closes(&(1..=25).map(f64::from).collect::<Vec<_>>());
        let points = bollinger_lower(&series, &BollingerConfig::default());
        assert_eq!(points.len(), 6);
        for (offset, point) in points.iter().enumerate() {
            assert_eq!(point.time, series[19 + offset].time);
        }
    }

    #[test]
    fn constant_closes_give_zero_stdev_and_lower_equal_to_sma() {
        let series = closes(&[100.0; 25]);
        let points = bollinger_lower(&series, &BollingerConfig::default());
        assert_eq!(points.len(), 6);
        for point in points {
            assert_eq!(point.sma, 100.0);
            assert_eq!(point.stdev, 0.0);
            assert_eq!(point.lower, 100.0);
            assert!(point.clamped_stdev.is_none());
        }
    }

    #[test]
    fn linear_ramp_matches_hand_computed_values() {
        // closes 1..20: sma = 10.5, population variance = 33.25
        let series = closes(&(1..=20).map(f64::from).collect::<Vec<_>>());
        let points = bollinger_lower(&series, &BollingerConfig::default());
        assert_eq!(points.len(), 1);

        let point = points[0];
        assert_close(point.sma, 10.5);
        assert_close(point.stdev, 33.25_f64.sqrt());
        assert_close(point.lower, 10.5 - 2.0 * 33.25_f64.sqrt());
    }

    #[test]
    fn clamp_raises_stdev_on_flat_data_and_records_it() {
        let config = BollingerConfig {
            clamp_stdev: true,
            ..BollingerConfig::default()
        };
        let series = closes(&[100.0; 20]);
        let points = bollinger_lower(&series, &config);
        assert_eq!(points.len(), 1);

        let point = points[0];
        // floor = max(100 * 1e-4, 1e-3) = 0.01
        assert_eq!(point.stdev, 0.0);
        assert_eq!(point.clamped_stdev, Some(0.01));
        assert_close(point.lower, 100.0 - 2.0 * 0.01);
    }

    #[test]
    fn clamp_does_not_touch_non_degenerate_windows() {
        let config = BollingerConfig {
            clamp_stdev: true,
            ..BollingerConfig::default()
        };
        let series = closes(&(1..=20).map(f64::from).collect::<Vec<_>>());
        let points = bollinger_lower(&series, &config);
        assert!(points[0].clamped_stdev.is_none());
        assert_close(points[0].lower, 10.5 - 2.0 * 33.25_f64.sqrt());
    }
}
