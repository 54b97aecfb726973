//! Token lifecycle, session storage and identity resolution.

mod auth;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod oauth;
pub mod profile;
pub mod redis;
pub mod session_store;
pub mod token;

pub use auth::{AuthSessionService, LoginTokens};
pub use credentials::{CredentialVerifier, ProfileCredentialVerifier};
pub use error::AuthError;
pub use identity::IdentityResolver;
pub use oauth::{AuthorizationRequest, OAuthClient};
pub use profile::{build_http_client, HttpProfileService, ProfileError, ProfileService};
pub use redis::RedisSessionStore;
pub use session_store::{InMemorySessionStore, SessionStore};
pub use token::{IssuedToken, TokenClaims, TokenCodec, TokenError, TokenKind};
