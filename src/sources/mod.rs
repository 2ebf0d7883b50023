//! Upstream market-data sources

pub mod cryptocompare;

use crate::types::{Candle, Result};

/// Trait for candle providers, so the scan orchestrator can be driven
/// by a stub in tests.
#[async_trait::async_trait]
pub trait MarketData: Send + Sync {
    /// Weekly candles aligned to Monday 00:00 UTC, ascending by time
    async fn fetch_weekly(&self, symbol: &str) -> Result<Vec<Candle>>;

    /// Up to `limit` most recent daily candles, ascending by time
    async fn fetch_daily(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>>;
}
