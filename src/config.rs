//! Process configuration and the fixed symbol catalog
//!
//! Everything is read from the environment once at startup; services
//! receive an owned copy. There is no global mutable state.

use phf::phf_map;

/// Fixed catalog of symbols scanned on the weekly timeframe, in rank
/// order. Stablecoins and wrapped tokens are additionally filtered by
/// the signal evaluator, so a list edit cannot silently re-enable them.
pub const SYMBOL_CATALOG: [&str; 69] = [
    "BTC", "ETH", "XRP", "BNB", "SOL", "DOGE", "ADA", "TRX", "SUI", "LINK",
    "AVAX", "XLM", "LEO", "TON", "SHIB", "HBAR", "BCH", "LTC", "DOT", "HYPE",
    "BGB", "PI", "XMR", "CBBTC", "PEPE", "UNI", "APT", "OKB", "NEAR", "TAO",
    "ONDO", "TRUMP", "GT", "ICP", "ETC", "AAVE", "KAS", "CRO", "MNT", "VET",
    "RENDER", "POL", "ATOM", "ENA", "FET", "ALGO", "FTN", "FIL", "TIA", "ARB",
    "WLD", "BONK", "STX", "JUP", "KCS", "OP", "MKR", "NEXO", "QNT", "FARTCOIN",
    "IMX", "IP", "FLR", "SEI", "EOS", "INJ", "GRT", "CRV", "RAY",
];

/// Full names for catalog symbols. Symbols without an entry fall back
/// to the ticker itself in API responses.
pub static COIN_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "BTC" => "Bitcoin",
    "ETH" => "Ethereum",
    "XRP" => "XRP",
    "BNB" => "Binance Coin",
    "SOL" => "Solana",
    "DOGE" => "Dogecoin",
    "ADA" => "Cardano",
    "TRX" => "TRON",
    "SUI" => "Sui",
    "LINK" => "Chainlink",
    "AVAX" => "Avalanche",
    "XLM" => "Stellar",
    "LEO" => "LEO Token",
    "TON" => "Toncoin",
    "SHIB" => "Shiba Inu",
    "HBAR" => "Hedera",
    "BCH" => "Bitcoin Cash",
    "LTC" => "Litecoin",
    "DOT" => "Polkadot",
    "XMR" => "Monero",
    "UNI" => "Uniswap",
    "APT" => "Aptos",
    "NEAR" => "NEAR Protocol",
    "AAVE" => "Aave",
    "VET" => "VeChain",
    "ATOM" => "Cosmos",
    "FET" => "Fetch.ai",
    "ALGO" => "Algorand",
    "FIL" => "Filecoin",
    "STX" => "Stacks",
    "KCS" => "KuCoin Token",
    "OP" => "Optimism",
    "QNT" => "Quant",
    "IMX" => "Immutable X",
    "EOS" => "EOS",
    "GRT" => "The Graph",
};

/// Configuration loaded from environment
#[derive(Debug, Clone)]
pub struct Config {
    /// CryptoCompare API key; requests go out unauthenticated without it
    pub api_key: Option<String>,
    /// Telegram bot token; signal delivery is skipped without it
    pub telegram_bot_token: Option<String>,
    /// Destination chat for buy signals
    pub telegram_target_group: String,
    /// Base URL embedded in chart links inside notifications
    pub app_url: String,
    /// Directory for the append-only scan logs
    pub logs_dir: String,
    /// HTTP listen port
    pub port: u16,
    /// Require the daily close below the daily lower band as well
    pub require_daily_confluence: bool,
    /// Clamp stdev upward on near-flat data to avoid degenerate bands
    pub clamp_stdev: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("CRYPTOCOMPARE_API_KEY").ok(),
            telegram_bot_token: std::env::var("TELEGRAM_BOT_TOKEN").ok(),
            telegram_target_group: std::env::var("TELEGRAM_TARGET_GROUP_ID")
                .unwrap_or_else(|_| "@logicalplace".to_string()),
            app_url: std::env::var("APP_URL")
                .unwrap_or_else(|_| "https://your-app-url.com".to_string()),
            logs_dir: std::env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            require_daily_confluence: env_flag("REQUIRE_DAILY_CONFLUENCE"),
            clamp_stdev: env_flag("CLAMP_STDEV"),
        }
    }

    /// The scan catalog as owned strings, preserving rank order.
    pub fn catalog(&self) -> Vec<String> {
        SYMBOL_CATALOG.iter().map(|s| s.to_string()).collect()
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for symbol in SYMBOL_CATALOG {
            assert!(seen.insert(symbol), "duplicate catalog entry: {}", symbol);
        }
    }

    #[test]
    fn coin_names_only_cover_catalog_symbols() {
        for key in COIN_NAMES.keys() {
            assert!(
                SYMBOL_CATALOG.contains(key),
                "name map entry {} is not in the catalog",
                key
            );
        }
    }
}
