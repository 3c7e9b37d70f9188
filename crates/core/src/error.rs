use thiserror::Error;

/// Shared error type used across all Contractscope crates.
///
/// `Validation`, `NotFound`, `RateLimited` and `Server` carry a message meant
/// for the end user and display it verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    RateLimited(String),

    /// Failure reported by the Contractscope API server in its `error` field.
    #[error("{0}")]
    Server(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error(transparent)]
    Other(#[from] eyre::Error),
}

impl AppError {
    /// True for failures a later retry may resolve.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::RateLimited(_) | AppError::Upstream(_) | AppError::Server(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_messages_display_verbatim() {
        let msg = "API key not configured";
        assert_eq!(AppError::Server(msg.into()).to_string(), msg);
        assert_eq!(AppError::NotFound(msg.into()).to_string(), msg);
        assert_eq!(AppError::Upstream(msg.into()).to_string(), "Upstream error: API key not configured");
    }
}
