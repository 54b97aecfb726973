use std::sync::Arc;
use tracing::instrument;

use super::profile::ProfileService;
use super::AuthError;
use crate::models::{FederatedProfile, Identity, ProfileRecord, ProfileUpdate, Role, SignupRequest};

/// Resolves a federated login to a local identity, provisioning one when
/// neither profile service knows the email.
///
/// Precedence is fixed: trainer service, then user service, then signup.
#[derive(Clone)]
pub struct IdentityResolver {
    trainer: Arc<dyn ProfileService>,
    user: Arc<dyn ProfileService>,
}

impl IdentityResolver {
    pub fn new(trainer: Arc<dyn ProfileService>, user: Arc<dyn ProfileService>) -> Self {
        Self { trainer, user }
    }

    #[instrument(skip(self, profile), fields(provider = %profile.provider, email = %profile.email))]
    pub async fn resolve(&self, profile: &FederatedProfile) -> Result<Identity, AuthError> {
        let sources = [(&self.trainer, Role::Trainer), (&self.user, Role::User)];

        for (service, default_role) in sources {
            let Some(record) = service.find_by_email(&profile.email).await? else {
                continue;
            };

            let existing = record.provider();
            if existing != profile.provider {
                tracing::warn!(
                    source = %service.name(),
                    existing = %existing,
                    "Federated login conflicts with existing account"
                );
                return Err(AuthError::ProviderConflict {
                    existing,
                    attempted: profile.provider,
                });
            }

            tracing::debug!(source = %service.name(), "Resolved existing account");
            return self.apply_update(record, profile, default_role).await;
        }

        self.provision(profile).await
    }

    /// Push the provider's latest profile data. The user service owns updates
    /// for every account, trainer accounts included.
    async fn apply_update(
        &self,
        record: ProfileRecord,
        profile: &FederatedProfile,
        default_role: Role,
    ) -> Result<Identity, AuthError> {
        let update = ProfileUpdate {
            email: record.email,
            name: Some(profile.display_name.clone()),
            image_url: profile.image_url.clone(),
        };

        let updated = self.user.update(&update).await?;
        Ok(updated.into_identity(default_role))
    }

    async fn provision(&self, profile: &FederatedProfile) -> Result<Identity, AuthError> {
        let request = SignupRequest {
            name: profile.display_name.clone(),
            email: profile.email.clone(),
            password: profile.placeholder_credential(),
            provider: profile.provider,
        };

        let created = self.user.signup(&request).await?;
        tracing::info!(email = %created.email, "Provisioned federated account");
        Ok(created.into_identity(Role::User))
    }
}
