//! CoinGecko price lookups keyed by token contract address.

use contractscope_core::{AppError, ContractAddress, Settings, models::PriceInfo};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::http;

pub const PRICE_UNAVAILABLE: &str = "Price data not available for this token";
pub const PRICE_NOT_FOUND: &str = "Price data not found";

/// Well-known mainnet tokens and their CoinGecko ids.
const KNOWN_TOKENS: &[(&str, &str)] = &[
    ("0xdac17f958d2ee523a2206206994597c13d831ec7", "tether"),
    ("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "usd-coin"),
    ("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", "weth"),
    ("0x2260fac5e5542a773aa44fbcfedf7c193bc2c599", "wrapped-bitcoin"),
    ("0x6b175474e89094c44da98b954eedeac495271d0f", "dai"),
    ("0x514910771af9ca656af840dff83e8264ecf986ca", "chainlink"),
    ("0x7d1afa7b718fb893db30a3abc0cfc608aacfebb0", "matic-network"),
    ("0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", "uniswap"),
    ("0x7fc66500c84a76ad7e9c93437bfc5ac33e2ddae9", "aave"),
    ("0x95ad61b0a150d79219dcf64e1e6cc01f0b64c4ce", "shiba-inu"),
];

/// CoinGecko id for a well-known token, if any.
pub fn coin_id(address: &ContractAddress) -> Option<&'static str> {
    KNOWN_TOKENS
        .iter()
        .find(|(known, _)| *known == address.as_str())
        .map(|(_, id)| *id)
}

#[derive(Debug, Clone)]
pub struct PriceClient {
    http: Client,
    base_url: String,
}

impl PriceClient {
    pub fn new(settings: &Settings) -> eyre::Result<Self> {
        Ok(Self {
            http: http::build_client(settings.price_timeout())?,
            base_url: settings.coingecko_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Price for a token: the `simple/price` endpoint for well-known tokens,
    /// the contract-address lookup for everything else.
    pub async fn price(&self, address: &ContractAddress) -> Result<PriceInfo, AppError> {
        match coin_id(address) {
            Some(id) => self.simple_price(id).await,
            None => self.contract_price(address).await,
        }
    }

    async fn simple_price(&self, id: &str) -> Result<PriceInfo, AppError> {
        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(&[
                ("ids", id),
                ("vs_currencies", "usd"),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await
            .map_err(http::request_error)?;
        let response = http::check_status(response)?;

        let mut body: HashMap<String, SimplePrice> = response
            .json()
            .await
            .map_err(|e| AppError::Decode(format!("malformed CoinGecko response: {e}")))?;
        let quote = body
            .remove(id)
            .ok_or_else(|| AppError::NotFound(PRICE_NOT_FOUND.into()))?;

        Ok(quote.into())
    }

    async fn contract_price(&self, address: &ContractAddress) -> Result<PriceInfo, AppError> {
        let url = format!("{}/coins/ethereum/contract/{}", self.base_url, address);
        let result = async {
            let response = self
                .http
                .get(&url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(http::request_error)?;
            let response = http::check_status(response)?;
            response
                .json::<CoinDetail>()
                .await
                .map_err(|e| AppError::Decode(format!("malformed CoinGecko response: {e}")))
        }
        .await;

        match result {
            Ok(detail) => Ok(detail.into()),
            Err(AppError::RateLimited(msg)) => Err(AppError::RateLimited(msg)),
            Err(e) => {
                tracing::info!(address = %address, error = %e, "Token not found on CoinGecko by contract address");
                Err(AppError::NotFound(PRICE_UNAVAILABLE.into()))
            }
        }
    }
}

// ─── Wire types ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct SimplePrice {
    #[serde(default)]
    usd: Option<f64>,
    #[serde(default)]
    usd_market_cap: Option<f64>,
    #[serde(default)]
    usd_24h_vol: Option<f64>,
    #[serde(default)]
    usd_24h_change: Option<f64>,
}

impl From<SimplePrice> for PriceInfo {
    fn from(quote: SimplePrice) -> Self {
        PriceInfo {
            price: quote.usd.unwrap_or_default(),
            price_change_24h: quote.usd_24h_change.unwrap_or_default(),
            market_cap: quote.usd_market_cap.unwrap_or_default(),
            volume_24h: quote.usd_24h_vol.unwrap_or_default(),
            symbol: None,
            name: None,
            image: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UsdAmount {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct MarketData {
    #[serde(default)]
    current_price: UsdAmount,
    #[serde(default)]
    price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    market_cap: UsdAmount,
    #[serde(default)]
    total_volume: UsdAmount,
}

#[derive(Debug, Default, Deserialize)]
struct CoinImage {
    #[serde(default)]
    small: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CoinDetail {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    image: CoinImage,
    #[serde(default)]
    market_data: MarketData,
}

impl From<CoinDetail> for PriceInfo {
    fn from(detail: CoinDetail) -> Self {
        let market = detail.market_data;
        PriceInfo {
            price: market.current_price.usd.unwrap_or_default(),
            price_change_24h: market.price_change_percentage_24h.unwrap_or_default(),
            market_cap: market.market_cap.usd.unwrap_or_default(),
            volume_24h: market.total_volume.usd.unwrap_or_default(),
            symbol: detail.symbol.map(|s| s.to_uppercase()),
            name: detail.name,
            image: detail.image.small,
        }
    }
}
