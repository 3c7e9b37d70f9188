use serde::Deserialize;
use std::time::Duration;

/// Global application settings loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Etherscan API key. The API server answers 500 on every explorer route while unset.
    pub etherscan_api_key: Option<String>,

    /// Etherscan v2 endpoint.
    pub etherscan_api_url: String,

    /// Chain queried through the Etherscan v2 `chainid` parameter.
    pub chain_id: u64,

    /// CoinGecko v3 base URL.
    pub coingecko_api_url: String,

    /// Timeout for explorer requests, in seconds.
    pub upstream_timeout_secs: u64,

    /// Timeout for price requests, in seconds.
    pub price_timeout_secs: u64,

    /// Port for the API server.
    pub api_port: u16,

    /// Base URL the dashboard session uses to reach the API server.
    pub api_base_url: String,

    /// Websocket RPC endpoint for live log subscriptions (polling only when unset).
    pub ws_url: Option<String>,

    /// Seconds between full refreshes of the loaded contract.
    pub refresh_interval_secs: u64,

    /// Items requested per transaction/transfer page.
    pub page_size: u32,
}

impl Settings {
    /// Load settings from environment variables (with optional `.env` file).
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            etherscan_api_key: optional_var("ETHERSCAN_API_KEY"),
            etherscan_api_url: std::env::var("ETHERSCAN_API_URL")
                .unwrap_or_else(|_| "https://api.etherscan.io/v2/api".into()),
            chain_id: std::env::var("CHAIN_ID")
                .unwrap_or_else(|_| "1".into())
                .parse()?,
            coingecko_api_url: std::env::var("COINGECKO_API_URL")
                .unwrap_or_else(|_| "https://api.coingecko.com/api/v3".into()),
            upstream_timeout_secs: std::env::var("UPSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".into())
                .parse()?,
            price_timeout_secs: std::env::var("PRICE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".into())
                .parse()?,
            api_base_url: std::env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            ws_url: optional_var("WS_URL"),
            refresh_interval_secs: std::env::var("REFRESH_INTERVAL_SECS")
                .unwrap_or_else(|_| "60".into())
                .parse()?,
            page_size: std::env::var("PAGE_SIZE")
                .unwrap_or_else(|_| "20".into())
                .parse()?,
        })
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }

    pub fn price_timeout(&self) -> Duration {
        Duration::from_secs(self.price_timeout_secs)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            etherscan_api_key: None,
            etherscan_api_url: "https://api.etherscan.io/v2/api".into(),
            chain_id: 1,
            coingecko_api_url: "https://api.coingecko.com/api/v3".into(),
            upstream_timeout_secs: 15,
            price_timeout_secs: 10,
            api_port: 3000,
            api_base_url: "http://localhost:3000".into(),
            ws_url: None,
            refresh_interval_secs: 60,
            page_size: 20,
        }
    }
}

/// Read a variable, treating an empty value the same as an unset one.
fn optional_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
