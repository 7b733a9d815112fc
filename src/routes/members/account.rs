use std::fmt::{Debug, Formatter};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::NaiveDate;
use secrecy::Secret;
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::{
    compute_password_hash, verify_password_hash, AuthenticatedMember, AuthError,
};
use crate::domain::{Activation, MemberEmail, NewPassword, Nickname, Visibility};
use crate::email_client::EmailClient;
use crate::error_handling::{error_chain_fmt, error_response};
use crate::repository::members;
use crate::response::SuccessBody;
use crate::routes::members::generate_one_time_code;
use crate::telemetry::spawn_blocking_with_tracing;

#[derive(serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberIdResponse {
    pub member_id: Uuid,
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct NicknameUpdateRequest {
    pub nickname: String,
}

#[derive(thiserror::Error)]
pub enum NicknameUpdateError {
    #[error("{0}")]
    ValidationError(String),
    #[error("the nickname is already taken.")]
    DuplicateNickname,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for NicknameUpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for NicknameUpdateError {
    fn status_code(&self) -> StatusCode {
        match self {
            NicknameUpdateError::ValidationError(_) => StatusCode::BAD_REQUEST,
            NicknameUpdateError::DuplicateNickname => StatusCode::CONFLICT,
            NicknameUpdateError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

#[utoipa::path(
    patch,
    path = "/api/members/me/nickname",
    tag = "members",
    request_body = NicknameUpdateRequest,
    responses(
        (status = 200, description = "Nickname updated", body = MemberIdResponse),
        (status = 401, description = "Not logged in"),
        (status = 409, description = "Duplicate nickname"),
    )
)]
#[tracing::instrument(name = "Update nickname", skip(request, pool), fields(member_id = %member.id))]
pub async fn update_nickname(
    member: AuthenticatedMember,
    request: web::Json<NicknameUpdateRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, NicknameUpdateError> {
    let nickname = Nickname::parse(request.0.nickname)
        .map_err(NicknameUpdateError::ValidationError)?;

    if members::nickname_exists(&pool, nickname.as_ref()).await? {
        return Err(NicknameUpdateError::DuplicateNickname);
    }

    members::update_nickname(&pool, member.id, nickname.as_ref()).await?;

    Ok(HttpResponse::Ok().json(SuccessBody::ok(MemberIdResponse {
        member_id: member.id,
    })))
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct PasswordUpdateRequest {
    #[schema(value_type = String)]
    pub password: Secret<String>,
}

#[derive(thiserror::Error)]
pub enum AccountUpdateError {
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for AccountUpdateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AccountUpdateError {
    fn status_code(&self) -> StatusCode {
        match self {
            AccountUpdateError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AccountUpdateError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

#[utoipa::path(
    patch,
    path = "/api/members/me/password",
    tag = "members",
    request_body = PasswordUpdateRequest,
    responses(
        (status = 200, description = "Password updated", body = MemberIdResponse),
        (status = 400, description = "Password fails the length rules"),
        (status = 401, description = "Not logged in"),
    )
)]
#[tracing::instrument(name = "Update password", skip(request, pool), fields(member_id = %member.id))]
pub async fn update_password(
    member: AuthenticatedMember,
    request: web::Json<PasswordUpdateRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AccountUpdateError> {
    let password = NewPassword::parse(request.0.password)
        .map_err(AccountUpdateError::ValidationError)?;

    let password = Secret::new(password.expose_secret().to_string());
    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task.")??;
    members::update_password_hash(&pool, member.id, password_hash).await?;

    Ok(HttpResponse::Ok().json(SuccessBody::ok(MemberIdResponse {
        member_id: member.id,
    })))
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct PrivacyUpdateRequest {
    pub visibility: Visibility,
}

#[utoipa::path(
    patch,
    path = "/api/members/me/privacy",
    tag = "members",
    request_body = PrivacyUpdateRequest,
    responses(
        (status = 200, description = "Visibility updated", body = MemberIdResponse),
        (status = 401, description = "Not logged in"),
    )
)]
#[tracing::instrument(name = "Update privacy", skip(request, pool), fields(member_id = %member.id))]
pub async fn update_privacy(
    member: AuthenticatedMember,
    request: web::Json<PrivacyUpdateRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AccountUpdateError> {
    members::update_visibility(&pool, member.id, request.0.visibility).await?;

    Ok(HttpResponse::Ok().json(SuccessBody::ok(MemberIdResponse {
        member_id: member.id,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/members/me",
    tag = "members",
    responses(
        (status = 200, description = "Deletion scheduled"),
        (status = 401, description = "Not logged in"),
    )
)]
#[tracing::instrument(name = "Delete member", skip(pool), fields(member_id = %member.id))]
pub async fn delete_member(
    member: AuthenticatedMember,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AccountUpdateError> {
    members::mark_waiting_deleted(&pool, member.id).await?;

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct CancelDeleteRequest {
    pub email: String,
    pub name: String,
    pub birth: NaiveDate,
    #[schema(value_type = String)]
    pub password: Secret<String>,
}

#[derive(thiserror::Error)]
pub enum CancelDeleteError {
    #[error("the member does not exist.")]
    MemberNotFound,
    #[error("the account is not awaiting deletion.")]
    NotPendingDeletion,
    #[error("check your email or password.")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for CancelDeleteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for CancelDeleteError {
    fn status_code(&self) -> StatusCode {
        match self {
            CancelDeleteError::MemberNotFound => StatusCode::NOT_FOUND,
            CancelDeleteError::NotPendingDeletion => StatusCode::BAD_REQUEST,
            CancelDeleteError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            CancelDeleteError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Cancels a pending deletion. Every identity field has to line up: email,
/// name (case-insensitive), birth date and password.
#[utoipa::path(
    patch,
    path = "/api/members/me",
    tag = "members",
    request_body = CancelDeleteRequest,
    responses(
        (status = 200, description = "Deletion cancelled; account active again"),
        (status = 400, description = "Account is not awaiting deletion"),
        (status = 401, description = "Password mismatch"),
        (status = 404, description = "No matching member"),
    )
)]
#[tracing::instrument(name = "Cancel member deletion", skip(request, pool), fields(member_email = %request.email))]
pub async fn cancel_delete(
    request: web::Json<CancelDeleteRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, CancelDeleteError> {
    let member = members::find_member_by_email(&pool, &request.email)
        .await?
        .ok_or(CancelDeleteError::MemberNotFound)?;

    if member.activation != Activation::WaitingDeleted {
        return Err(CancelDeleteError::NotPendingDeletion);
    }
    if member.birth != request.birth {
        return Err(CancelDeleteError::MemberNotFound);
    }
    if !member.name.eq_ignore_ascii_case(&request.name) {
        return Err(CancelDeleteError::MemberNotFound);
    }

    let expected_password_hash = member.password_hash.clone();
    let password = request.0.password;
    spawn_blocking_with_tracing(move || verify_password_hash(expected_password_hash, password))
        .await
        .context("Failed to spawn blocking task.")?
        .map_err(|e| match e {
            AuthError::InvalidCredentials(e) => CancelDeleteError::InvalidCredentials(e),
            AuthError::UnexpectedError(e) => CancelDeleteError::UnexpectedError(e),
        })?;

    members::reactivate(&pool, member.id).await?;

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
    pub name: String,
    pub birth: NaiveDate,
}

#[derive(thiserror::Error)]
pub enum PasswordResetError {
    #[error("the member does not exist.")]
    MemberNotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for PasswordResetError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PasswordResetError {
    fn status_code(&self) -> StatusCode {
        match self {
            PasswordResetError::MemberNotFound => StatusCode::NOT_FOUND,
            PasswordResetError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Resets a forgotten password. On an email/name/birth match the member gets
/// a hashed temporary password and the plain one by email.
#[utoipa::path(
    post,
    path = "/api/members/reset-password",
    tag = "members",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Temporary password emailed"),
        (status = 404, description = "No matching member"),
    )
)]
#[tracing::instrument(name = "Reset password", skip(request, pool, email_client), fields(member_email = %request.email))]
pub async fn reset_password(
    request: web::Json<PasswordResetRequest>,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, PasswordResetError> {
    let member = members::find_active_member_by_email(&pool, &request.email)
        .await?
        .ok_or(PasswordResetError::MemberNotFound)?;

    if member.birth != request.birth {
        return Err(PasswordResetError::MemberNotFound);
    }
    if !member.name.eq_ignore_ascii_case(&request.name) {
        return Err(PasswordResetError::MemberNotFound);
    }

    let temporary_password = generate_one_time_code();
    let to_hash = Secret::new(temporary_password.clone());
    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(to_hash))
        .await
        .context("Failed to spawn blocking task.")??;
    members::update_password_hash(&pool, member.id, password_hash).await?;

    let email = MemberEmail::parse(member.email.clone())
        .map_err(|e| anyhow::anyhow!("Stored member email is invalid: {}", e))?;
    email_client
        .send_email(
            &email,
            "Temporary password",
            &format!(
                "Your temporary password is <strong>{}</strong>. Please change it after logging in.",
                temporary_password
            ),
            &format!(
                "Your temporary password is {}. Please change it after logging in.",
                temporary_password
            ),
        )
        .await
        .context("Failed to send the temporary password email.")?;

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}
