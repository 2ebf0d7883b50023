use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

use signal_scanner::cache::MemoryCache;
use signal_scanner::handlers::{self, AppState};
use signal_scanner::indicators::BollingerConfig;
use signal_scanner::notifier::{NotifierConfig, TelegramNotifier};
use signal_scanner::scan_log::ScanLogger;
use signal_scanner::scanner::{CancelToken, ScanOrchestrator};
use signal_scanner::scheduler::{self, ScanService};
use signal_scanner::{Config, CryptoCompareClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    // .env is optional; real deployments set the environment directly
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    info!("Starting signal scanner...");

    let market = Arc::new(CryptoCompareClient::new(config.api_key.clone()));
    info!("✓ CryptoCompare client initialized");

    let logger = Arc::new(ScanLogger::new(&config.logs_dir)?);
    info!("✓ Scan logs in {}", config.logs_dir);

    let notifier = Arc::new(TelegramNotifier::new(NotifierConfig::from_config(&config)));
    if notifier.is_configured() {
        info!("✓ Telegram notifier targeting {}", config.telegram_target_group);
    } else {
        warn!("⚠ TELEGRAM_BOT_TOKEN not set, buy signals will not be delivered");
    }

    let bollinger = BollingerConfig {
        clamp_stdev: config.clamp_stdev,
        ..BollingerConfig::default()
    };

    let orchestrator = Arc::new(ScanOrchestrator::new(
        market.clone(),
        notifier.clone(),
        logger.clone(),
        bollinger,
        config.require_daily_confluence,
    ));

    let cancel = CancelToken::new();
    let scans = ScanService::new(
        orchestrator,
        logger.clone(),
        config.catalog(),
        cancel.clone(),
    );
    let scheduler_handle = scheduler::spawn(scans.clone(), cancel.clone());
    info!("✓ Daily scan scheduled for 08:00 UTC");

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
        .route("/api/crypto/:symbol/:timeframe", get(handlers::get_chart_data))
        .route("/api/signals/check", get(handlers::trigger_scan))
        .route("/api/telegram/test", get(handlers::telegram_test))
        .route("/api/logs/:kind", get(handlers::get_logs))
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("🚀 Signal scanner listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;

    scheduler_handle.abort();
    Ok(())
}

async fn shutdown_signal(cancel: CancelToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested, stopping scheduler");
    }
    cancel.cancel();
}
