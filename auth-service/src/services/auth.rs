use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

use super::credentials::CredentialVerifier;
use super::identity::IdentityResolver;
use super::session_store::SessionStore;
use super::token::{IssuedToken, TokenCodec, TokenError, TokenKind};
use super::AuthError;
use crate::models::{FederatedProfile, Identity, Session};
use crate::utils::Password;

/// Access and refresh token issued by a login.
#[derive(Debug, Clone)]
pub struct LoginTokens {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Login, refresh and logout over the token codec and the session store.
#[derive(Clone)]
pub struct AuthSessionService {
    tokens: TokenCodec,
    sessions: Arc<dyn SessionStore>,
    credentials: Arc<dyn CredentialVerifier>,
    identities: IdentityResolver,
}

impl AuthSessionService {
    pub fn new(
        tokens: TokenCodec,
        sessions: Arc<dyn SessionStore>,
        credentials: Arc<dyn CredentialVerifier>,
        identities: IdentityResolver,
    ) -> Self {
        Self {
            tokens,
            sessions,
            credentials,
            identities,
        }
    }

    #[instrument(skip(self, password), fields(user = %email))]
    pub async fn login(&self, email: &str, password: &Password) -> Result<LoginTokens, AuthError> {
        let identity = self.credentials.verify(email, password).await?;
        self.open_session(&identity).await
    }

    #[instrument(skip(self, profile), fields(provider = %profile.provider, user = %profile.email))]
    pub async fn login_federated(&self, profile: &FederatedProfile) -> Result<LoginTokens, AuthError> {
        let identity = self.identities.resolve(profile).await?;
        self.open_session(&identity).await
    }

    /// Mint a new access token for a live session. The session is left as is.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<IssuedToken, AuthError> {
        let claims = self.tokens.verify(refresh_token).map_err(|e| {
            tracing::debug!(error = %e, "Refresh token failed verification");
            AuthError::RefreshInvalid
        })?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::RefreshInvalid);
        }

        let session = self
            .sessions
            .get(refresh_token)
            .await
            .map_err(AuthError::SessionStoreUnavailable)?
            .ok_or(AuthError::RefreshUnknown)?;

        if session.identity_key != claims.sub {
            tracing::warn!(subject = %claims.sub, "Refresh token subject does not match session");
            return Err(AuthError::RefreshIdentityMismatch);
        }

        let access = self
            .tokens
            .mint(&session.identity_key, session.role, TokenKind::Access)
            .map_err(token_failure)?;

        tracing::debug!(user = %session.identity_key, "Access token refreshed");
        Ok(access)
    }

    /// Drop the session behind a refresh token. Returns whether one existed.
    ///
    /// Never fails for the caller; store errors are only logged.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh_token: &str) -> bool {
        match self.sessions.delete(refresh_token).await {
            Ok(removed) => {
                tracing::info!(removed, "Logout");
                removed
            }
            Err(e) => {
                tracing::error!(error = ?e, "Failed to delete session on logout");
                false
            }
        }
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    /// Both tokens are minted before anything is written.
    async fn open_session(&self, identity: &Identity) -> Result<LoginTokens, AuthError> {
        let access = self
            .tokens
            .mint(identity.key(), identity.role, TokenKind::Access)
            .map_err(token_failure)?;
        let refresh = self
            .tokens
            .mint(identity.key(), identity.role, TokenKind::Refresh)
            .map_err(token_failure)?;

        let session = Session::new(
            refresh.token.clone(),
            identity.key().to_string(),
            identity.role,
            Utc::now(),
            refresh.expires_at(),
        );
        self.sessions
            .put(session)
            .await
            .map_err(AuthError::SessionStoreUnavailable)?;

        tracing::info!(user = %identity.key(), role = %identity.role, "Session opened");
        Ok(LoginTokens { access, refresh })
    }
}

fn token_failure(err: TokenError) -> AuthError {
    AuthError::Internal(anyhow::anyhow!(err))
}
