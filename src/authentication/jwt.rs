use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::configuration::AuthSettings;
use crate::domain::{Member, Role};

/// Claims carried by an access token. The subject is the member id.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh tokens carry nothing but the member id and their validity window.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum TokenError {
    #[error("the token has expired.")]
    Expired,
    #[error("the token is not valid.")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Issues and validates the HS256 tokens used for authentication.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: std::time::Duration,
    refresh_token_ttl: std::time::Duration,
}

impl TokenIssuer {
    pub fn new(settings: &AuthSettings) -> Result<Self, anyhow::Error> {
        let secret = settings.jwt_secret.expose_secret();
        Ok(Self {
            encoding_key: EncodingKey::from_base64_secret(secret)?,
            decoding_key: DecodingKey::from_base64_secret(secret)?,
            access_token_ttl: std::time::Duration::from_secs(settings.access_token_ttl_seconds),
            refresh_token_ttl: std::time::Duration::from_secs(settings.refresh_token_ttl_seconds),
        })
    }

    pub fn issue_access_token(&self, member: &Member) -> Result<String, anyhow::Error> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: member.id,
            email: member.email.clone(),
            role: member.role,
            iat: now,
            exp: now + self.access_token_ttl.as_secs() as i64,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn issue_refresh_token(&self, member_id: Uuid) -> Result<String, anyhow::Error> {
        let now = Utc::now().timestamp();
        let claims = RefreshClaims {
            sub: member_id,
            iat: now,
            exp: now + self.refresh_token_ttl.as_secs() as i64,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn decode_access_token(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let data = decode::<AccessClaims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(categorize_error)?;
        Ok(data.claims)
    }

    pub fn decode_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let data = decode::<RefreshClaims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(categorize_error)?;
        Ok(data.claims)
    }

    pub fn refresh_token_ttl(&self) -> std::time::Duration {
        self.refresh_token_ttl
    }
}

fn categorize_error(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e),
    }
}

/// SHA-256 hex digest of a token. Used as the denylist key so raw tokens are
/// never stored in Redis.
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}
