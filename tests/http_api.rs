//! HTTP API tests against a real listener
//!
//! The router is served on an ephemeral port with the market client
//! pointed at a wiremock upstream, then exercised over real HTTP.

use std::sync::Arc;

use axum::{routing::get, Router};
use signal_scanner::cache::MemoryCache;
use signal_scanner::handlers::{self, AppState};
use signal_scanner::indicators::BollingerConfig;
use signal_scanner::notifier::{NotifierConfig, TelegramNotifier};
use signal_scanner::scan_log::ScanLogger;
use signal_scanner::scanner::{CancelToken, ScanOrchestrator};
use signal_scanner::scheduler::ScanService;
use signal_scanner::CryptoCompareClient;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Serve the full router against the given upstream; returns the local
/// base URL. The TempDir must outlive the server.
async fn serve(upstream: &MockServer, logs: &TempDir) -> String {
    let market = Arc::new(CryptoCompareClient::new(None).with_base_url(upstream.uri()));
    let logger = Arc::new(ScanLogger::new(logs.path()).unwrap());
    let notifier = Arc::new(TelegramNotifier::new(NotifierConfig {
        bot_token: None,
        chat_id: "@logicalplace".to_string(),
        app_url: "https://charts.example.com".to_string(),
        timeout_secs: 5,
    }));
    let bollinger = BollingerConfig::default();

    let orchestrator = Arc::new(ScanOrchestrator::new(
        market.clone(),
        notifier.clone(),
        logger.clone(),
        bollinger,
        false,
    ));
    let scans = ScanService::new(orchestrator, logger.clone(), Vec::new(), CancelToken::new());

    let state = Arc::new(AppState {
        market,
        cache: Arc::new(MemoryCache::new()),
        logger,
        notifier,
        scans,
        bollinger,
    });

    let app = Router::new()
        .route("/api/crypto/top", get(handlers::get_top))
        .route(
            "/api/crypto/:symbol/:timeframe",
            get(handlers::get_chart_data),
        )
        .route("/api/signals/check", get(handlers::trigger_scan))
        .route("/api/telegram/test", get(handlers::telegram_test))
        .route("/api/logs/:kind", get(handlers::get_logs))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn daily_history(closes: &[f64]) -> serde_json::Value {
    let bars: Vec<serde_json::Value> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            serde_json::json!({
                "time": 1_704_067_200 + i as i64 * 86_400,
                "open": close, "high": close + 1.0, "low": close - 1.0, "close": close,
                "volumefrom": 5.0, "volumeto": 5.0 * close,
            })
        })
        .collect();
    serde_json::json!({ "Response": "Success", "Data": { "Data": bars } })
}

#[tokio::test]
async fn chart_endpoint_returns_candles_volumes_and_indicators() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/v2/histoday"))
        .and(query_param("fsym", "BTC"))
        .and(query_param("aggregate", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(daily_history(&vec![100.0; 25])))
        .expect(1)
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = serve(&upstream, &logs).await;

    let body: serde_json::Value = reqwest::get(format!("{}/api/crypto/btc/1d", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["candles"].as_array().unwrap().len(), 25);
    assert_eq!(body["volumes"].as_array().unwrap().len(), 25);
    // 25 bars, 20-bar window: 6 indicator points
    assert_eq!(body["indicators"].as_array().unwrap().len(), 6);
    assert_eq!(body["indicators"][0]["sma"], 100.0);

    // Second request must be served from the cache (expect(1) above).
    let again: serde_json::Value = reqwest::get(format!("{}/api/crypto/BTC/1d", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again, body);
}

#[tokio::test]
async fn weekly_chart_bars_are_monday_aligned() {
    use chrono::{DateTime, Datelike, Timelike, Weekday};

    let upstream = MockServer::start().await;
    // Provider-binned weekly bars, anchored on a Thursday. The chart
    // path must never serve these.
    let thursday = 1_704_326_400; // 2024-01-04 00:00:00 UTC
    let binned: Vec<serde_json::Value> = (0..30)
        .map(|i| {
            serde_json::json!({
                "time": thursday + i * 7 * 86_400,
                "open": 100.0, "high": 101.0, "low": 99.0, "close": 100.0,
                "volumefrom": 5.0, "volumeto": 500.0,
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/data/v2/histoday"))
        .and(query_param("aggregate", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "Response": "Success", "Data": { "Data": binned } }),
        ))
        .expect(0)
        .mount(&upstream)
        .await;
    // Daily history also starting on the Thursday.
    let days: Vec<serde_json::Value> = (0..175)
        .map(|i| {
            serde_json::json!({
                "time": thursday + i * 86_400,
                "open": 100.0, "high": 101.0, "low": 99.0, "close": 100.0,
                "volumefrom": 5.0, "volumeto": 500.0,
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/data/v2/histoday"))
        .and(query_param("fsym", "BTC"))
        .and(query_param("aggregate", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            serde_json::json!({ "Response": "Success", "Data": { "Data": days } }),
        ))
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = serve(&upstream, &logs).await;

    let body: serde_json::Value = reqwest::get(format!("{}/api/crypto/BTC/1w", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let candles = body["candles"].as_array().unwrap();
    assert!(candles.len() >= 20, "got {} weekly bars", candles.len());
    for candle in candles {
        let dt = DateTime::from_timestamp(candle["time"].as_i64().unwrap(), 0).unwrap();
        assert_eq!(dt.weekday(), Weekday::Mon, "bar at {} is not Monday-aligned", dt);
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (0, 0, 0));
    }
}

#[tokio::test]
async fn upstream_failure_is_a_server_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = serve(&upstream, &logs).await;

    let response = reqwest::get(format!("{}/api/crypto/BTC/1d", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn invalid_timeframe_is_a_bad_request() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    let base = serve(&upstream, &logs).await;

    let response = reqwest::get(format!("{}/api/crypto/BTC/2w", base))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["message"].as_str().unwrap().contains("2w"));
}

#[tokio::test]
async fn top_endpoint_ranks_by_catalog_order() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/pricemultifull"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "RAW": {
                "BTC": { "USD": { "PRICE": 64000.0, "MKTCAP": 1.2e12, "IMAGEURL": "/media/btc.png" } },
                "ETH": { "USD": { "PRICE": 3000.0, "MKTCAP": 4.0e11, "IMAGEURL": "/media/eth.png" } },
            }
        })))
        .mount(&upstream)
        .await;

    let logs = TempDir::new().unwrap();
    let base = serve(&upstream, &logs).await;

    let body: serde_json::Value = reqwest::get(format!("{}/api/crypto/top?limit=3", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // XRP is rank 3 in the catalog but unquoted, so only two rows.
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["symbol"], "BTC");
    assert_eq!(rows[0]["name"], "Bitcoin");
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(
        rows[0]["imageUrl"],
        "https://www.cryptocompare.com/media/btc.png"
    );
    assert_eq!(rows[1]["symbol"], "ETH");
    assert_eq!(rows[1]["rank"], 2);
}

#[tokio::test]
async fn logs_endpoint_validates_the_category() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    let base = serve(&upstream, &logs).await;

    let response = reqwest::get(format!("{}/api/logs/bogus", base)).await.unwrap();
    assert_eq!(response.status(), 400);

    let body: serde_json::Value = reqwest::get(format!("{}/api/logs/signals", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["type"], "signals");
    assert_eq!(body["data"], "Лог-файл пуст или не существует");
}

#[tokio::test]
async fn telegram_self_test_reports_missing_configuration() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    let base = serve(&upstream, &logs).await;

    let body: serde_json::Value = reqwest::get(format!("{}/api/telegram/test", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn manual_scan_trigger_reports_started() {
    let upstream = MockServer::start().await;
    let logs = TempDir::new().unwrap();
    let base = serve(&upstream, &logs).await;

    let body: serde_json::Value = reqwest::get(format!("{}/api/signals/check", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["success"], true);
}
