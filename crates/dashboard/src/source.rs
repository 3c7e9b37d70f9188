use async_trait::async_trait;
use contractscope_core::{
    AppError, ContractAddress, Settings,
    models::{ContractSummary, PriceInfo, TransactionPage, TransferPage},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use std::sync::Arc;

/// Where a session gets its contract data from.
#[async_trait]
pub trait ContractDataSource: Send + Sync {
    async fn contract(&self, address: &ContractAddress) -> Result<ContractSummary, AppError>;

    async fn transactions(
        &self,
        address: &ContractAddress,
        page: u32,
        offset: u32,
    ) -> Result<TransactionPage, AppError>;

    async fn transfers(
        &self,
        address: &ContractAddress,
        page: u32,
        offset: u32,
    ) -> Result<TransferPage, AppError>;

    async fn price(&self, address: &ContractAddress) -> Result<PriceInfo, AppError>;
}

#[async_trait]
impl<T: ContractDataSource + ?Sized> ContractDataSource for Arc<T> {
    async fn contract(&self, address: &ContractAddress) -> Result<ContractSummary, AppError> {
        (**self).contract(address).await
    }

    async fn transactions(
        &self,
        address: &ContractAddress,
        page: u32,
        offset: u32,
    ) -> Result<TransactionPage, AppError> {
        (**self).transactions(address, page, offset).await
    }

    async fn transfers(
        &self,
        address: &ContractAddress,
        page: u32,
        offset: u32,
    ) -> Result<TransferPage, AppError> {
        (**self).transfers(address, page, offset).await
    }

    async fn price(&self, address: &ContractAddress) -> Result<PriceInfo, AppError> {
        (**self).price(address).await
    }
}

/// [`ContractDataSource`] backed by the Contractscope API server.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> eyre::Result<Self> {
        let http = Client::builder()
            .timeout(settings.upstream_timeout() * 2)
            .build()?;
        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `path` and decode the body; on failure surface the server's `error`
    /// message, or `fallback` when it sent none.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, u32)],
        fallback: &str,
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Upstream(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| AppError::Decode(e.to_string()));
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| fallback.to_string());
        tracing::debug!(%status, url = %url, message = %message, "API request failed");
        Err(status_error(status, message))
    }
}

/// Map an API status code back onto the error taxonomy. The server's message
/// always survives unprefixed.
fn status_error(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::BAD_REQUEST => AppError::Validation(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited(message),
        _ => AppError::Server(message),
    }
}

#[async_trait]
impl ContractDataSource for ApiClient {
    async fn contract(&self, address: &ContractAddress) -> Result<ContractSummary, AppError> {
        self.get_json(&format!("/api/contract/{address}"), &[], "Contract not found")
            .await
    }

    async fn transactions(
        &self,
        address: &ContractAddress,
        page: u32,
        offset: u32,
    ) -> Result<TransactionPage, AppError> {
        self.get_json(
            &format!("/api/transactions/{address}"),
            &[("page", page), ("offset", offset)],
            "Failed to fetch transactions",
        )
        .await
    }

    async fn transfers(
        &self,
        address: &ContractAddress,
        page: u32,
        offset: u32,
    ) -> Result<TransferPage, AppError> {
        self.get_json(
            &format!("/api/transfers/{address}"),
            &[("page", page), ("offset", offset)],
            "Failed to fetch token transfers",
        )
        .await
    }

    async fn price(&self, address: &ContractAddress) -> Result<PriceInfo, AppError> {
        self.get_json(&format!("/api/price/{address}"), &[], "Price data not available")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_back_to_error_kinds() {
        let msg = || "boom".to_string();
        assert!(matches!(status_error(StatusCode::BAD_REQUEST, msg()), AppError::Validation(_)));
        assert!(matches!(status_error(StatusCode::NOT_FOUND, msg()), AppError::NotFound(_)));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, msg()),
            AppError::RateLimited(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, msg()),
            AppError::Server(_)
        ));
    }

    #[test]
    fn server_errors_keep_the_message_as_sent() {
        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "API key not configured".into(),
        );
        assert_eq!(err.to_string(), "API key not configured");

        let err = status_error(StatusCode::BAD_GATEWAY, "Failed to fetch transactions".into());
        assert_eq!(err.to_string(), "Failed to fetch transactions");
    }

    #[test]
    fn rate_limit_message_is_surfaced_verbatim() {
        let err = status_error(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.".into(),
        );
        assert_eq!(err.to_string(), "Rate limit exceeded. Please try again later.");
    }
}
