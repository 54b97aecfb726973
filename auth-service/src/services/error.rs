use service_core::error::AppError;
use thiserror::Error;

use crate::models::AuthProvider;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    AuthenticationFailed,

    #[error("Invalid refresh token")]
    RefreshInvalid,

    #[error("Refresh token is not recognized")]
    RefreshUnknown,

    #[error("Refresh token does not belong to this session")]
    RefreshIdentityMismatch,

    #[error("Account is registered with {existing}, not {attempted}")]
    ProviderConflict {
        existing: AuthProvider,
        attempted: AuthProvider,
    },

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream returned unusable data: {0}")]
    UpstreamDataError(String),

    #[error("Identity resolution failed: {0}")]
    IdentityResolutionFailed(String),

    #[error("Session store unavailable: {0}")]
    SessionStoreUnavailable(anyhow::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthenticationFailed => {
                AppError::AuthError(anyhow::anyhow!("Invalid credentials"))
            }
            // Refresh failures share one message so callers cannot probe the store.
            AuthError::RefreshInvalid
            | AuthError::RefreshUnknown
            | AuthError::RefreshIdentityMismatch => {
                tracing::debug!(reason = %err, "Refresh rejected");
                AppError::Unauthorized(anyhow::anyhow!("Invalid refresh token"))
            }
            AuthError::ProviderConflict { .. } => AppError::Conflict(anyhow::anyhow!(err.to_string())),
            AuthError::UpstreamUnavailable(msg) => AppError::ServiceUnavailable(msg),
            AuthError::SessionStoreUnavailable(e) => {
                tracing::error!(error = ?e, "Session store unavailable");
                AppError::ServiceUnavailable("session store".to_string())
            }
            AuthError::UpstreamDataError(msg) | AuthError::IdentityResolutionFailed(msg) => {
                AppError::BadGateway(msg)
            }
            AuthError::Internal(e) => AppError::InternalError(e),
        }
    }
}
