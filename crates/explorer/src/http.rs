use contractscope_core::AppError;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// User agent sent to every upstream API.
pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; Contractscope/0.1)";

/// Message surfaced for any upstream 429.
pub const RATE_LIMITED: &str = "Rate limit exceeded. Please try again later.";

/// Build an HTTP client with the shared user agent and a request timeout.
pub fn build_client(timeout: Duration) -> eyre::Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Map a transport failure onto the error taxonomy.
pub fn request_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::Upstream("upstream request timed out".into())
    } else if err.status() == Some(StatusCode::TOO_MANY_REQUESTS) {
        AppError::RateLimited(RATE_LIMITED.into())
    } else {
        AppError::Upstream(err.to_string())
    }
}

/// Reject non-success responses: 429 as rate limited, 404 as not found, the rest as upstream failures.
pub fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    tracing::warn!(%status, url = %response.url(), "Upstream returned an error status");
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited(RATE_LIMITED.into()),
        StatusCode::NOT_FOUND => AppError::NotFound(format!("upstream returned {status}")),
        _ => AppError::Upstream(format!("upstream returned {status}")),
    })
}

/// Whether an upstream message reports throttling.
pub fn mentions_rate_limit(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("rate limit") || lower.contains("too many requests")
}
