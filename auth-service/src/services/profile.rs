//! HTTP client for the trainer and user profile services.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use service_core::observability::TracedClientExt;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

use super::AuthError;
use crate::models::{ProfileLookup, ProfileRecord, ProfileUpdate, SignupRequest};

#[derive(Debug, Error)]
pub enum ProfileError {
    /// Transport failure, timeout or 5xx.
    #[error("{0}")]
    Unavailable(String),

    #[error("request rejected with status {0}")]
    Rejected(u16),

    #[error("{0}")]
    InvalidBody(String),
}

impl From<ProfileError> for AuthError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::Unavailable(msg) => AuthError::UpstreamUnavailable(msg),
            ProfileError::InvalidBody(msg) => AuthError::UpstreamDataError(msg),
            ProfileError::Rejected(status) => AuthError::IdentityResolutionFailed(format!(
                "profile service rejected the request with status {}",
                status
            )),
        }
    }
}

/// Contract of a remote profile service.
#[async_trait]
pub trait ProfileService: Send + Sync {
    fn name(&self) -> &str;

    /// `POST /login`. A 4xx answer means the account does not exist here.
    async fn find_by_email(&self, email: &str) -> Result<Option<ProfileRecord>, ProfileError>;

    /// `POST /update`
    async fn update(&self, update: &ProfileUpdate) -> Result<ProfileRecord, ProfileError>;

    /// `POST /signup`
    async fn signup(&self, request: &SignupRequest) -> Result<ProfileRecord, ProfileError>;
}

pub fn build_http_client(timeout: Duration) -> Result<Client, anyhow::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("auth-session-service/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))
}

#[derive(Clone)]
pub struct HttpProfileService {
    name: String,
    base_url: String,
    client: Client,
}

impl HttpProfileService {
    pub fn new(name: &str, base_url: &str, client: Client) -> Self {
        tracing::info!(service = %name, base_url = %base_url, "Profile service client configured");
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response, ProfileError> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .traced_post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(service = %self.name, error = %e, "Profile service request failed");
                ProfileError::Unavailable(format!("{} service: {}", self.name, describe(&e)))
            })
    }

    async fn read_record(&self, response: Response) -> Result<ProfileRecord, ProfileError> {
        let body = response.bytes().await.map_err(|e| {
            ProfileError::Unavailable(format!("{} service: {}", self.name, describe(&e)))
        })?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ProfileError::InvalidBody(format!(
                "{} service returned an empty body",
                self.name
            )));
        }
        serde_json::from_slice(&body).map_err(|e| {
            ProfileError::InvalidBody(format!("{} service returned a malformed record: {}", self.name, e))
        })
    }

    async fn expect_record(&self, response: Response) -> Result<ProfileRecord, ProfileError> {
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(service = %self.name, status = %status, "Profile service rejected request");
            return Err(ProfileError::Rejected(status.as_u16()));
        }
        self.read_record(response).await
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        "connection failed".to_string()
    } else {
        err.to_string()
    }
}

#[async_trait]
impl ProfileService for HttpProfileService {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self), fields(service = %self.name))]
    async fn find_by_email(&self, email: &str) -> Result<Option<ProfileRecord>, ProfileError> {
        let response = self.post("/login", &ProfileLookup { email }).await?;
        let status = response.status();

        if status.is_client_error() {
            tracing::debug!(status = %status, "No profile for email");
            return Ok(None);
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProfileError::Unavailable(format!(
                "{} service answered {}",
                self.name, status
            )));
        }
        if !status.is_success() {
            return Err(ProfileError::InvalidBody(format!(
                "{} service answered unexpected status {}",
                self.name, status
            )));
        }

        self.read_record(response).await.map(Some)
    }

    #[instrument(skip(self, update), fields(service = %self.name, email = %update.email))]
    async fn update(&self, update: &ProfileUpdate) -> Result<ProfileRecord, ProfileError> {
        let response = self.post("/update", update).await?;
        self.expect_record(response).await
    }

    #[instrument(skip(self, request), fields(service = %self.name, email = %request.email))]
    async fn signup(&self, request: &SignupRequest) -> Result<ProfileRecord, ProfileError> {
        let response = self.post("/signup", request).await?;
        self.expect_record(response).await
    }
}
