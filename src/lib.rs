pub mod types;
pub mod config;
pub mod sources;
pub mod aggregators;
pub mod indicators;
pub mod signals;
pub mod cache;
pub mod scan_log;
pub mod notifier;
pub mod scanner;
pub mod scheduler;
pub mod handlers;

pub use config::Config;
pub use sources::cryptocompare::CryptoCompareClient;
pub use sources::MarketData;
pub use types::*;
