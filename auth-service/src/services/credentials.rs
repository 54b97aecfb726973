use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

use super::profile::ProfileService;
use super::AuthError;
use crate::models::{AuthProvider, Identity, Role};
use crate::utils::{verify_password, Password, PasswordHashString};

/// Checks an (identifier, secret) pair and yields the matching identity.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, email: &str, password: &Password) -> Result<Identity, AuthError>;
}

/// Verifies local accounts held by the profile services against their
/// stored Argon2 hash. Trainer accounts take precedence over user accounts.
pub struct ProfileCredentialVerifier {
    trainer: Arc<dyn ProfileService>,
    user: Arc<dyn ProfileService>,
}

impl ProfileCredentialVerifier {
    pub fn new(trainer: Arc<dyn ProfileService>, user: Arc<dyn ProfileService>) -> Self {
        Self { trainer, user }
    }
}

#[async_trait]
impl CredentialVerifier for ProfileCredentialVerifier {
    #[instrument(skip(self, password), fields(user = %email))]
    async fn verify(&self, email: &str, password: &Password) -> Result<Identity, AuthError> {
        let record = match self.trainer.find_by_email(email).await? {
            Some(record) => Some((record, Role::Trainer)),
            None => self
                .user
                .find_by_email(email)
                .await?
                .map(|record| (record, Role::User)),
        };

        let Some((mut record, default_role)) = record else {
            tracing::debug!("No account for email");
            return Err(AuthError::AuthenticationFailed);
        };

        if record.provider() != AuthProvider::Local {
            tracing::debug!(provider = %record.provider(), "Password login for federated account");
            return Err(AuthError::AuthenticationFailed);
        }

        let Some(hash) = record.password.take() else {
            return Err(AuthError::AuthenticationFailed);
        };

        match verify_password(password, &PasswordHashString::new(hash)) {
            Ok(true) => Ok(record.into_identity(default_role)),
            Ok(false) => Err(AuthError::AuthenticationFailed),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is unusable");
                Err(AuthError::AuthenticationFailed)
            }
        }
    }
}
