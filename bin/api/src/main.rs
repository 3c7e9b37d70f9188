//! Contractscope API Server: proxies Etherscan and CoinGecko for one contract at a time.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use contractscope_core::{
    AppError, ContractAddress, Settings,
    models::{ContractSummary, PriceInfo, TransactionPage, TransferPage},
    telemetry,
};
use contractscope_explorer::{EtherscanClient, PriceClient};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};

/// Shared application state.
struct AppState {
    etherscan: EtherscanClient,
    prices: PriceClient,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    telemetry::init();
    let settings = Settings::from_env()?;

    tracing::info!("Starting Contractscope API Server");
    if settings.etherscan_api_key.is_none() {
        tracing::warn!("ETHERSCAN_API_KEY is not set, explorer routes will answer 500");
    }

    let state = Arc::new(AppState {
        etherscan: EtherscanClient::new(&settings)?,
        prices: PriceClient::new(&settings)?,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.api_port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/contract/:address", get(get_contract))
        .route("/api/transactions/:address", get(get_transactions))
        .route("/api/transfers/:address", get(get_transfers))
        .route("/api/price/:address", get(get_price))
        .route("/health", get(health))
        .with_state(state)
}

// ─── Query Params ───────────────────────────────────────────────────────────

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_OFFSET: u32 = 20;
const MAX_OFFSET: u32 = 10_000;

/// Raw `page`/`offset`; parsed by hand so bad values get our own 400 body.
#[derive(Debug, Default, Deserialize)]
struct PaginationParams {
    page: Option<String>,
    offset: Option<String>,
}

impl PaginationParams {
    fn resolve(&self) -> Result<(u32, u32), ApiError> {
        let page = parse_or(self.page.as_deref(), DEFAULT_PAGE)
            .filter(|page| *page >= 1)
            .ok_or_else(|| ApiError::bad_request("Invalid page number"))?;
        let offset = parse_or(self.offset.as_deref(), DEFAULT_OFFSET)
            .filter(|offset| (1..=MAX_OFFSET).contains(offset))
            .ok_or_else(|| ApiError::bad_request("Invalid offset (1-10000)"))?;
        Ok((page, offset))
    }
}

fn parse_or(raw: Option<&str>, default: u32) -> Option<u32> {
    match raw {
        None => Some(default),
        Some(raw) => raw.trim().parse().ok(),
    }
}

// ─── Response Types ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                details,
            },
        }
    }

    fn bad_request(error: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, None)
    }

    /// Map a failure onto its status; `context` names the operation for 500s.
    fn from_app(err: AppError, context: &str) -> Self {
        match err {
            AppError::Validation(msg) => Self::new(StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFound(msg) => Self::new(StatusCode::NOT_FOUND, msg, None),
            AppError::RateLimited(msg) => Self::new(
                StatusCode::TOO_MANY_REQUESTS,
                msg,
                Some("Too many requests to upstream API".into()),
            ),
            AppError::Config(msg) => {
                tracing::error!(reason = %msg, "Missing configuration");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "API key not configured", None)
            }
            other => {
                tracing::error!(error = %other, "{}", context);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    context,
                    Some(other.to_string()),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_address(raw: &str) -> Result<ContractAddress, ApiError> {
    ContractAddress::parse(raw).map_err(|e| ApiError::from_app(e, "Invalid address"))
}

// ─── Handlers ───────────────────────────────────────────────────────────────

async fn health() -> &'static str {
    "ok"
}

/// GET /api/contract/:address: verified source metadata and token type.
async fn get_contract(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<ContractSummary> {
    let address = parse_address(&address)?;
    let summary = state
        .etherscan
        .contract(&address)
        .await
        .map_err(|e| ApiError::from_app(e, "Failed to fetch contract data"))?;
    Ok(Json(summary))
}

/// GET /api/transactions/:address?page&offset: one page of normal transactions.
async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<TransactionPage> {
    let address = parse_address(&address)?;
    let (page, offset) = params.resolve()?;
    let transactions = state
        .etherscan
        .transactions(&address, page, offset)
        .await
        .map_err(|e| ApiError::from_app(e, "Failed to fetch transactions"))?;
    Ok(Json(TransactionPage::new(transactions, page)))
}

/// GET /api/transfers/:address?page&offset: one page of ERC-20/721 transfers.
async fn get_transfers(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<TransferPage> {
    let address = parse_address(&address)?;
    let (page, offset) = params.resolve()?;
    let transfers = state
        .etherscan
        .transfers(&address, page, offset)
        .await
        .map_err(|e| ApiError::from_app(e, "Failed to fetch token transfers"))?;
    Ok(Json(TransferPage::new(transfers, page)))
}

/// GET /api/price/:address: USD market data for a token.
async fn get_price(
    State(state): State<Arc<AppState>>,
    Path(address): Path<String>,
) -> ApiResult<PriceInfo> {
    let address = parse_address(&address)?;
    let price = state
        .prices
        .price(&address)
        .await
        .map_err(|e| ApiError::from_app(e, "Failed to fetch price data"))?;
    Ok(Json(price))
}
