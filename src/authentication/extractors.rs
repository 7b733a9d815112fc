use std::future::Future;
use std::pin::Pin;

use actix_web::dev::Payload;
use actix_web::error::InternalError;
use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest};
use anyhow::Context;
use redis::aio::ConnectionManager;
use uuid::Uuid;

use crate::authentication::jwt::{token_fingerprint, TokenIssuer};
use crate::domain::Role;
use crate::error_handling::{e500, error_response};
use crate::redis_store;

/// The member authenticated by the `Authorization: Bearer` access token of
/// the current request. Extraction fails with a 401 for missing, malformed,
/// expired or denylisted tokens.
#[derive(Debug, Clone)]
pub struct AuthenticatedMember {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Like [`AuthenticatedMember`], but resolves to `None` when the request
/// carries no `Authorization` header at all. A header that is present but
/// invalid is still rejected.
pub struct MaybeAuthenticated(pub Option<AuthenticatedMember>);

/// Pulls the token out of a `Bearer` authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, anyhow::Error> {
    let header_value = headers
        .get("Authorization")
        .context("The `Authorization` header is missing.")?
        .to_str()
        .context("The `Authorization` header was not a valid UTF8 string.")?;
    header_value
        .strip_prefix("Bearer ")
        .context("The authorization scheme was not `Bearer`.")
}

async fn authenticate(req: &HttpRequest) -> Result<AuthenticatedMember, actix_web::Error> {
    let token_issuer = req
        .app_data::<web::Data<TokenIssuer>>()
        .ok_or_else(|| e500("Token issuer is not configured."))?;
    let redis = req
        .app_data::<web::Data<ConnectionManager>>()
        .ok_or_else(|| e500("Redis connection is not configured."))?;

    let token = bearer_token(req.headers()).map_err(e401)?;
    let claims = token_issuer.decode_access_token(token).map_err(e401)?;

    let denylisted = redis_store::is_access_token_denylisted(redis, &token_fingerprint(token))
        .await
        .map_err(e500)?;
    if denylisted {
        return Err(e401("The token has been logged out."));
    }

    Ok(AuthenticatedMember {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

fn e401(e: impl std::fmt::Display) -> actix_web::Error {
    let message = e.to_string();
    InternalError::from_response(
        message.clone(),
        error_response(StatusCode::UNAUTHORIZED, message),
    )
    .into()
}

impl FromRequest for AuthenticatedMember {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { authenticate(&req).await })
    }
}

impl FromRequest for MaybeAuthenticated {
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            if req.headers().get("Authorization").is_none() {
                return Ok(MaybeAuthenticated(None));
            }
            authenticate(&req).await.map(|m| MaybeAuthenticated(Some(m)))
        })
    }
}

impl MaybeAuthenticated {
    pub fn member_id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|member| member.id)
    }
}
