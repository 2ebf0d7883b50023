//! HTTP API: chart data, catalog snapshot, scan controls, log access

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregators::volume_points;
use crate::cache::{CacheKey, MemoryCache, DEFAULT_TTL};
use crate::config::{COIN_NAMES, SYMBOL_CATALOG};
use crate::indicators::{bollinger_lower, BollingerConfig};
use crate::notifier::TelegramNotifier;
use crate::scan_log::{LogKind, ScanLogger};
use crate::scheduler::ScanService;
use crate::sources::cryptocompare::CryptoCompareClient;
use crate::types::{ScanError, TimeFrame};

/// Upper bound on the catalog snapshot size
const TOP_LIMIT_MAX: usize = 100;

/// Shared state behind every route
pub struct AppState {
    pub market: Arc<CryptoCompareClient>,
    pub cache: Arc<MemoryCache>,
    pub logger: Arc<ScanLogger>,
    pub notifier: Arc<TelegramNotifier>,
    pub scans: ScanService,
    pub bollinger: BollingerConfig,
}

/// Error payload shared by all routes
#[derive(Debug, serde::Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

type ApiError = (StatusCode, Json<ErrorMessage>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorMessage {
            message: message.into(),
        }),
    )
}

fn upstream_error(e: ScanError) -> ApiError {
    // Any upstream failure is a plain server error to API clients.
    let status = match e {
        ScanError::BadRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, e.to_string())
}

/// Query params for the catalog snapshot
#[derive(Debug, serde::Deserialize)]
pub struct TopQuery {
    pub limit: Option<usize>,
}

/// One row of the catalog snapshot
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEntry {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub market_cap: f64,
    pub image_url: Option<String>,
    pub rank: usize,
}

/// GET /api/crypto/top - current snapshot of the catalog, rank order
pub async fn get_top(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(TOP_LIMIT_MAX)
        .min(TOP_LIMIT_MAX)
        .min(SYMBOL_CATALOG.len());

    let key = CacheKey::Top { limit };
    if let Some(cached) = state.cache.get(&key).await {
        return Ok(Json(cached));
    }

    info!("Fetching catalog snapshot (limit {})", limit);
    let symbols: Vec<String> = SYMBOL_CATALOG
        .iter()
        .take(limit)
        .map(|s| s.to_string())
        .collect();
    let quotes = state
        .market
        .fetch_quotes(&symbols)
        .await
        .map_err(upstream_error)?;

    // Rank comes from catalog position; symbols the provider does not
    // quote are dropped without renumbering the rest.
    let entries: Vec<TopEntry> = symbols
        .iter()
        .enumerate()
        .filter_map(|(index, symbol)| {
            quotes.get(symbol.as_str()).map(|quote| TopEntry {
                symbol: symbol.clone(),
                name: COIN_NAMES
                    .get(symbol.as_str())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| symbol.clone()),
                price: quote.price,
                market_cap: quote.market_cap,
                image_url: quote
                    .image_url
                    .as_ref()
                    .map(|path| format!("https://www.cryptocompare.com{}", path)),
                rank: index + 1,
            })
        })
        .collect();

    let payload = serde_json::to_value(&entries)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    state.cache.set(key, payload.clone(), DEFAULT_TTL).await;
    Ok(Json(payload))
}

/// GET /api/crypto/:symbol/:timeframe - candles, volumes and the lower
/// Bollinger band for one symbol
pub async fn get_chart_data(
    State(state): State<Arc<AppState>>,
    Path((symbol, timeframe)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let symbol = symbol.to_uppercase();
    let timeframe: TimeFrame = timeframe
        .parse()
        .map_err(|e: ScanError| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let price_key = CacheKey::price(&symbol, timeframe);
    let indicator_key = CacheKey::indicators(
        &symbol,
        timeframe,
        state.bollinger.period,
        state.bollinger.multiplier,
    );

    if let (Some(prices), Some(indicators)) = (
        state.cache.get(&price_key).await,
        state.cache.get(&indicator_key).await,
    ) {
        let mut payload = prices;
        if let Some(map) = payload.as_object_mut() {
            map.insert("indicators".to_string(), indicators);
        }
        return Ok(Json(payload));
    }

    info!("Fetching {} chart data for {}", timeframe.as_str(), symbol);
    let candles = match state.market.fetch_bars(&symbol, timeframe).await {
        Ok(candles) => candles,
        Err(e) => {
            warn!("Chart fetch failed for {}: {}", symbol, e);
            return Err(upstream_error(e));
        }
    };

    let volumes = volume_points(&candles);
    let indicators = bollinger_lower(&candles, &state.bollinger);

    let prices = serde_json::json!({
        "candles": candles,
        "volumes": volumes,
    });
    let indicator_payload = serde_json::to_value(&indicators)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    state
        .cache
        .set(price_key, prices.clone(), DEFAULT_TTL)
        .await;
    state
        .cache
        .set(indicator_key, indicator_payload.clone(), DEFAULT_TTL)
        .await;

    let mut payload = prices;
    if let Some(map) = payload.as_object_mut() {
        map.insert("indicators".to_string(), indicator_payload);
    }
    Ok(Json(payload))
}

/// Outcome envelope for the trigger and self-test routes
#[derive(Debug, serde::Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/signals/check - kick off a scan out of schedule
pub async fn trigger_scan(State(state): State<Arc<AppState>>) -> Json<ActionResponse> {
    if state.scans.trigger("manual") {
        Json(ActionResponse {
            success: true,
            message: "Проверка сигналов запущена".to_string(),
        })
    } else {
        Json(ActionResponse {
            success: false,
            message: "Проверка уже выполняется".to_string(),
        })
    }
}

/// GET /api/telegram/test - send the example signal to the chat
pub async fn telegram_test(State(state): State<Arc<AppState>>) -> Json<ActionResponse> {
    match state.notifier.send_test().await {
        Ok(()) => Json(ActionResponse {
            success: true,
            message: "Тестовое сообщение отправлено".to_string(),
        }),
        Err(e) => {
            warn!("Telegram self-test failed: {}", e);
            Json(ActionResponse {
                success: false,
                message: e.to_string(),
            })
        }
    }
}

/// Log tail payload
#[derive(Debug, serde::Serialize)]
pub struct LogsResponse {
    pub success: bool,
    pub data: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// GET /api/logs/:type - last lines of one scan-log category
pub async fn get_logs(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> Result<Json<LogsResponse>, ApiError> {
    let kind: LogKind = kind
        .parse()
        .map_err(|e: ScanError| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(LogsResponse {
        success: true,
        data: state.logger.tail(kind),
        kind: kind.as_str(),
    }))
}
