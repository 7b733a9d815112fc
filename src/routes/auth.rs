use std::fmt::{Debug, Formatter};

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;
use redis::aio::ConnectionManager;
use secrecy::Secret;
use sqlx::PgPool;

use crate::authentication::{
    bearer_token, token_fingerprint, validate_credentials, AuthError, TokenError, TokenIssuer,
};
use crate::domain::Activation;
use crate::error_handling::{error_chain_fmt, error_response};
use crate::redis_store;
use crate::repository::members;
use crate::response::SuccessBody;

pub const REFRESH_COOKIE_NAME: &str = "refresh_token";
const REFRESH_COOKIE_PATH: &str = "/api/auth/reissue";

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    #[schema(value_type = String)]
    pub password: Secret<String>,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(thiserror::Error)]
pub enum LoginError {
    #[error("check your email or password.")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error("this account has been suspended.")]
    Suspended,
    #[error("this account is awaiting deletion.")]
    PendingDeletion,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for LoginError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for LoginError {
    fn status_code(&self) -> StatusCode {
        match self {
            LoginError::InvalidCredentials(_)
            | LoginError::Suspended
            | LoginError::PendingDeletion => StatusCode::UNAUTHORIZED,
            LoginError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Verifies the credentials, issues the token pair and pins the refresh token
/// both in Redis and in a cookie scoped to the reissue endpoint.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; tokens issued"),
        (status = 401, description = "Bad credentials, suspended or deleted account"),
    )
)]
#[tracing::instrument(
    name = "Log a member in",
    skip(request, pool, redis, token_issuer),
    fields(member_email = %request.email)
)]
pub async fn login(
    request: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
    token_issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, LoginError> {
    let member = members::find_member_by_email(&pool, &request.email).await?;

    if let Some(member) = &member {
        match member.activation {
            Activation::Suspended => return Err(LoginError::Suspended),
            Activation::WaitingDeleted => return Err(LoginError::PendingDeletion),
            Activation::Active => {}
        }
    }

    validate_credentials(member.as_ref(), request.0.password)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials(e) => LoginError::InvalidCredentials(e),
            AuthError::UnexpectedError(e) => LoginError::UnexpectedError(e),
        })?;
    // validate_credentials only succeeds for an existing member
    let member = member
        .ok_or_else(|| LoginError::InvalidCredentials(anyhow::anyhow!("Unknown email.")))?;

    let access_token = token_issuer.issue_access_token(&member)?;
    let refresh_token = token_issuer.issue_refresh_token(member.id)?;
    redis_store::save_refresh_token(
        &redis,
        member.id,
        &refresh_token,
        token_issuer.refresh_token_ttl(),
    )
    .await?;

    let cookie = Cookie::build(REFRESH_COOKIE_NAME, refresh_token.clone())
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .max_age(CookieDuration::seconds(
            token_issuer.refresh_token_ttl().as_secs() as i64,
        ))
        .finish();

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(SuccessBody::ok(TokenResponse {
            access_token,
            refresh_token: Some(refresh_token),
        })))
}

#[derive(thiserror::Error)]
pub enum LogoutError {
    #[error("the token is not valid.")]
    InvalidToken(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for LogoutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for LogoutError {
    fn status_code(&self) -> StatusCode {
        match self {
            LogoutError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            LogoutError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Denylists the presented access token for the rest of its lifetime and
/// drops the refresh cookie.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out"),
        (status = 401, description = "Missing or invalid access token"),
    )
)]
#[tracing::instrument(name = "Log a member out", skip(request, redis, token_issuer))]
pub async fn logout(
    request: HttpRequest,
    redis: web::Data<ConnectionManager>,
    token_issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, LogoutError> {
    let token = bearer_token(request.headers()).map_err(LogoutError::InvalidToken)?;
    let claims = token_issuer
        .decode_access_token(token)
        .map_err(|e| LogoutError::InvalidToken(e.into()))?;

    let remaining = claims.exp - Utc::now().timestamp();
    if remaining > 0 {
        redis_store::denylist_access_token(
            &redis,
            &token_fingerprint(token),
            std::time::Duration::from_secs(remaining as u64),
        )
        .await?;
    }

    let removal_cookie = Cookie::build(REFRESH_COOKIE_NAME, "")
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .max_age(CookieDuration::seconds(0))
        .finish();

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie)
        .json(SuccessBody::empty(StatusCode::OK)))
}

#[derive(thiserror::Error)]
pub enum TokenRefreshError {
    #[error("the refresh token cookie is missing.")]
    MissingCookie,
    #[error("the token is not valid.")]
    InvalidToken(#[source] anyhow::Error),
    #[error("the member does not exist.")]
    MemberNotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for TokenRefreshError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for TokenRefreshError {
    fn status_code(&self) -> StatusCode {
        match self {
            TokenRefreshError::MissingCookie => StatusCode::BAD_REQUEST,
            TokenRefreshError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            TokenRefreshError::MemberNotFound => StatusCode::NOT_FOUND,
            TokenRefreshError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Exchanges a valid refresh token for a fresh access token. The presented
/// token must match the one most recently stored for the member, so rotating
/// the Redis entry is enough to revoke a session.
#[utoipa::path(
    post,
    path = "/api/auth/reissue",
    tag = "auth",
    responses(
        (status = 200, description = "New access token issued"),
        (status = 400, description = "Refresh cookie missing"),
        (status = 401, description = "Invalid or superseded refresh token"),
        (status = 404, description = "Member no longer active"),
    )
)]
#[tracing::instrument(name = "Reissue an access token", skip(request, pool, redis, token_issuer))]
pub async fn reissue(
    request: HttpRequest,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
    token_issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, TokenRefreshError> {
    let cookie = request
        .cookie(REFRESH_COOKIE_NAME)
        .ok_or(TokenRefreshError::MissingCookie)?;
    let presented = cookie.value();

    let claims = token_issuer
        .decode_refresh_token(presented)
        .map_err(|e: TokenError| TokenRefreshError::InvalidToken(e.into()))?;

    let member = members::find_active_member_by_id(&pool, claims.sub)
        .await?
        .ok_or(TokenRefreshError::MemberNotFound)?;

    let stored = redis_store::get_refresh_token(&redis, member.id).await?;
    if stored.as_deref() != Some(presented) {
        return Err(TokenRefreshError::InvalidToken(anyhow::anyhow!(
            "The refresh token has been superseded or revoked."
        )));
    }

    let access_token = token_issuer.issue_access_token(&member)?;

    Ok(HttpResponse::Ok().json(SuccessBody::ok(TokenResponse {
        access_token,
        refresh_token: None,
    })))
}
