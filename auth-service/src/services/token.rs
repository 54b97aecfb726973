use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::models::Role;

const ALGORITHM: Algorithm = Algorithm::HS512;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both access and refresh tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (identity key, the account email)
    pub sub: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub kind: TokenKind,
    /// Random token ID, keeps same-second tokens distinct
    pub jti: String,
}

impl TokenClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// A freshly minted token together with the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token signature is invalid")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Token is malformed: {0}")]
    Malformed(String),

    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(err.to_string()),
        }
    }
}

/// Mints and verifies HS512-signed tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, anyhow::Error> {
        if secret.is_empty() {
            anyhow::bail!("JWT secret must not be empty");
        }
        if access_ttl <= Duration::zero() {
            anyhow::bail!("Access token lifetime must be positive");
        }
        if access_ttl >= refresh_ttl {
            anyhow::bail!(
                "Access token lifetime ({}s) must be shorter than refresh token lifetime ({}s)",
                access_ttl.num_seconds(),
                refresh_ttl.num_seconds()
            );
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn from_config(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let access_ttl = config.access_ttl().ok_or_else(|| {
            anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_EXPIRY_MINUTES out of range: {}",
                config.access_token_expiry_minutes
            )
        })?;
        let refresh_ttl = config.refresh_ttl().ok_or_else(|| {
            anyhow::anyhow!(
                "JWT_REFRESH_TOKEN_EXPIRY_DAYS out of range: {}",
                config.refresh_token_expiry_days
            )
        })?;
        let codec = Self::new(config.secret.expose_secret(), access_ttl, refresh_ttl)?;

        tracing::info!(
            access_minutes = config.access_token_expiry_minutes,
            refresh_days = config.refresh_token_expiry_days,
            "Token codec initialized with HS512"
        );

        Ok(codec)
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    pub fn mint(&self, subject: &str, role: Role, kind: TokenKind) -> Result<IssuedToken, TokenError> {
        self.mint_at(subject, role, kind, Utc::now())
    }

    /// Mint with an explicit issue time.
    pub fn mint_at(
        &self,
        subject: &str,
        role: Role,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now
            .checked_add_signed(self.ttl(kind))
            .ok_or_else(|| TokenError::Encoding("Token expiry out of range".to_string()))?;
        let claims = TokenClaims {
            sub: subject.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            kind,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Signature first, then expiry, then claim decoding.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        if has_split_signature(token) {
            return Err(TokenError::InvalidSignature);
        }
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    pub fn extract_subject(&self, token: &str) -> Result<String, TokenError> {
        self.verify(token).map(|claims| claims.sub)
    }
}

/// A well-formed header and payload followed by a signature that itself
/// contains a `.`. The decoder would otherwise misread the segments and
/// report a parse error instead of a bad signature.
fn has_split_signature(token: &str) -> bool {
    let mut parts = token.splitn(3, '.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature)) => {
            signature.contains('.') && decode_header(&format!("{}.{}.", header, payload)).is_ok()
        }
        _ => false,
    }
}
