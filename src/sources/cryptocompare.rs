use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::MarketData;
use crate::aggregators::aggregate_weekly;
use crate::indicators::BOLLINGER_PERIOD;
use crate::types::{Candle, Result, ScanError, TimeFrame};

/// Upstream cap on history length per request
const HISTORY_LIMIT: usize = 2000;

/// CryptoCompare min-api client
///
/// Does not pace itself between calls; the scan orchestrator batches
/// and sleeps, and the query API goes through the cache.
pub struct CryptoCompareClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CryptoCompareClient {
    /// Per-request timeout for upstream calls
    const REQUEST_TIMEOUT_SECS: u64 = 15;

    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(Self::REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(10)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: "https://min-api.cryptocompare.com".to_string(),
            api_key,
        }
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let mut url = format!("{}{}", self.base_url, endpoint);
        if let Some(key) = &self.api_key {
            url.push_str("&api_key=");
            url.push_str(key);
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ScanError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScanError::Transport(format!(
                "CryptoCompare API error ({}): {}",
                status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ScanError::MalformedResponse(e.to_string()))
    }

    /// Fetch one history page (`histoday` / `histohour`) and unwrap the
    /// nested `Data.Data` envelope.
    async fn fetch_history(
        &self,
        symbol: &str,
        kind: &str,
        aggregate: u32,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let endpoint = format!(
            "/data/v2/histo{}?fsym={}&tsym=USD&limit={}&aggregate={}",
            kind, symbol, limit, aggregate
        );

        let envelope: HistoryEnvelope = self.get_json(&endpoint).await?;
        let bars = envelope
            .data
            .and_then(|d| d.data)
            .ok_or_else(|| {
                ScanError::MalformedResponse(format!(
                    "missing Data.Data envelope in histo{} response for {}",
                    kind, symbol
                ))
            })?;

        if bars.is_empty() {
            return Err(ScanError::NoData(symbol.to_string()));
        }

        let mut candles: Vec<Candle> = bars
            .into_iter()
            .map(|bar| Candle {
                time: bar.time,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volumefrom,
            })
            .collect();
        candles.sort_by_key(|c| c.time);

        debug!("Received {} {} bars for {}", candles.len(), kind, symbol);
        Ok(candles)
    }

    /// Candles for a chart timeframe. Weekly is always built from
    /// daily bars and aggregated locally so the chart's week boundary
    /// is Monday 00:00 UTC regardless of how the provider bins weeks.
    pub async fn fetch_bars(&self, symbol: &str, timeframe: TimeFrame) -> Result<Vec<Candle>> {
        match timeframe {
            TimeFrame::Hour1 => self.fetch_history(symbol, "hour", 1, HISTORY_LIMIT).await,
            TimeFrame::Hour4 => self.fetch_history(symbol, "hour", 4, HISTORY_LIMIT).await,
            TimeFrame::Day1 => self.fetch_history(symbol, "day", 1, HISTORY_LIMIT).await,
            TimeFrame::Week1 => {
                let daily = self.fetch_daily(symbol, HISTORY_LIMIT).await?;
                Ok(aggregate_weekly(&daily))
            }
        }
    }

    /// Current price / market-cap snapshot for many symbols at once
    /// (`pricemultifull`). Symbols missing from the response are simply
    /// absent from the map.
    pub async fn fetch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, AssetQuote>> {
        let endpoint = format!("/data/pricemultifull?fsyms={}&tsyms=USD", symbols.join(","));

        let envelope: SnapshotEnvelope = self.get_json(&endpoint).await?;
        let raw = envelope.raw.ok_or_else(|| {
            ScanError::MalformedResponse("missing RAW envelope in pricemultifull response".into())
        })?;

        let mut quotes = HashMap::new();
        for (symbol, by_currency) in raw {
            if let Some(quote) = by_currency.get("USD") {
                quotes.insert(
                    symbol,
                    AssetQuote {
                        price: quote.price,
                        market_cap: quote.market_cap,
                        image_url: quote.image_url.clone(),
                    },
                );
            }
        }
        Ok(quotes)
    }
}

#[async_trait::async_trait]
impl MarketData for CryptoCompareClient {
    async fn fetch_daily(&self, symbol: &str, limit: usize) -> Result<Vec<Candle>> {
        self.fetch_history(symbol, "day", 1, limit.min(HISTORY_LIMIT))
            .await
    }

    /// Preferred path: the provider's own weekly series (daily bars
    /// aggregated upstream by 7). Usable only with a full Bollinger
    /// lookback; otherwise fall back to fetching daily history and
    /// aggregating to Monday-aligned weeks locally. If the fallback
    /// fails too, the symbol is reported unavailable.
    async fn fetch_weekly(&self, symbol: &str) -> Result<Vec<Candle>> {
        match self.fetch_history(symbol, "day", 7, HISTORY_LIMIT).await {
            Ok(bars) if bars.len() >= BOLLINGER_PERIOD => return Ok(bars),
            Ok(bars) => {
                warn!(
                    "Weekly series for {} too short ({} bars), falling back to daily aggregation",
                    symbol,
                    bars.len()
                );
            }
            // Only transport and response-shape failures are
            // recoverable via the fallback; an empty series for an
            // unknown symbol propagates as-is.
            Err(e @ (ScanError::Transport(_) | ScanError::MalformedResponse(_))) => {
                warn!(
                    "Weekly fetch for {} failed ({}), falling back to daily aggregation",
                    symbol, e
                );
            }
            Err(e) => return Err(e),
        }

        let daily = self
            .fetch_daily(symbol, HISTORY_LIMIT)
            .await
            .map_err(|_| ScanError::Unavailable(symbol.to_string()))?;
        Ok(aggregate_weekly(&daily))
    }
}

/// Price / market-cap snapshot entry for one symbol
#[derive(Debug, Clone)]
pub struct AssetQuote {
    pub price: f64,
    pub market_cap: f64,
    pub image_url: Option<String>,
}

// Response envelopes for the CryptoCompare API. Shapes differ between
// the two endpoints; each gets its own boundary parser.

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(rename = "Data")]
    data: Option<HistoryData>,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    #[serde(rename = "Data")]
    data: Option<Vec<RawBar>>,
}

#[derive(Debug, Deserialize)]
struct RawBar {
    time: i64,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volumefrom: f64,
    #[serde(default)]
    #[allow(dead_code)]
    volumeto: f64,
}

#[derive(Debug, Deserialize)]
struct SnapshotEnvelope {
    #[serde(rename = "RAW")]
    raw: Option<HashMap<String, HashMap<String, RawQuote>>>,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(rename = "PRICE", default)]
    price: f64,
    #[serde(rename = "MKTCAP", default)]
    market_cap: f64,
    #[serde(rename = "IMAGEURL", default)]
    image_url: Option<String>,
}
