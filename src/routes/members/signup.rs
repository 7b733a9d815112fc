use std::fmt::{Debug, Formatter};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::NaiveDate;
use redis::aio::ConnectionManager;
use secrecy::Secret;
use sqlx::PgPool;

use crate::authentication::compute_password_hash;
use crate::domain::{Gender, MemberEmail, NewMember, Nickname, Role};
use crate::email_client::EmailClient;
use crate::error_handling::{error_chain_fmt, error_response};
use crate::redis_store;
use crate::repository::members::{self, InsertMemberError};
use crate::response::SuccessBody;
use crate::routes::members::generate_one_time_code;
use crate::telemetry::spawn_blocking_with_tracing;

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    pub name: String,
    #[schema(value_type = String)]
    pub password: Secret<String>,
    pub nickname: String,
    pub email: String,
    pub birth: NaiveDate,
    pub gender: Gender,
}

#[derive(thiserror::Error)]
pub enum SignupError {
    #[error("{0}")]
    ValidationError(String),
    #[error("the email is already registered.")]
    DuplicateEmail,
    #[error("the nickname is already taken.")]
    DuplicateNickname,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for SignupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SignupError {
    fn status_code(&self) -> StatusCode {
        match self {
            SignupError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SignupError::DuplicateEmail | SignupError::DuplicateNickname => StatusCode::CONFLICT,
            SignupError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Registers a new member in `GUEST` role and emails a verification code.
/// Duplicates are rejected up front, with the unique constraints as the
/// backstop for concurrent sign-ups.
#[utoipa::path(
    post,
    path = "/api/members",
    tag = "members",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Member registered; verification code sent"),
        (status = 400, description = "A field failed validation"),
        (status = 409, description = "Duplicate email or nickname"),
    )
)]
#[tracing::instrument(
    name = "Sign up a new member",
    skip(request, pool, redis, email_client),
    fields(member_email = %request.email, member_nickname = %request.nickname)
)]
pub async fn signup(
    request: web::Json<SignupRequest>,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, SignupError> {
    let new_member: NewMember = request
        .0
        .try_into()
        .map_err(SignupError::ValidationError)?;

    if members::email_exists(&pool, new_member.email.as_ref()).await? {
        return Err(SignupError::DuplicateEmail);
    }
    if members::nickname_exists(&pool, new_member.nickname.as_ref()).await? {
        return Err(SignupError::DuplicateNickname);
    }

    let password = Secret::new(new_member.password.expose_secret().to_string());
    let password_hash = spawn_blocking_with_tracing(move || compute_password_hash(password))
        .await
        .context("Failed to spawn blocking task.")??;

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool.")?;
    members::insert_member(&mut transaction, &new_member, password_hash)
        .await
        .map_err(|e| match e {
            InsertMemberError::DuplicateEmail => SignupError::DuplicateEmail,
            InsertMemberError::DuplicateNickname => SignupError::DuplicateNickname,
            InsertMemberError::UnexpectedError(e) => SignupError::UnexpectedError(e),
        })?;
    transaction
        .commit()
        .await
        .context("Failed to commit the new member.")?;

    send_verification_code(&redis, &email_client, &new_member.email).await?;

    Ok(HttpResponse::Created().json(SuccessBody::empty(StatusCode::CREATED)))
}

/// Stores a fresh code under the member's email and sends it out.
#[tracing::instrument(name = "Send a verification code", skip(redis, email_client))]
async fn send_verification_code(
    redis: &ConnectionManager,
    email_client: &EmailClient,
    email: &MemberEmail,
) -> Result<(), anyhow::Error> {
    let code = generate_one_time_code();
    redis_store::save_verification_code(redis, email.as_ref(), &code).await?;
    email_client
        .send_email(
            email,
            "Sign-up verification code",
            &format!("Your verification code is <strong>{}</strong>.", code),
            &format!("Your verification code is {}.", code),
        )
        .await
        .context("Failed to send the verification code email.")
}

#[derive(serde::Deserialize, utoipa::IntoParams)]
pub struct NicknameCheckQuery {
    pub nickname: String,
}

#[derive(serde::Deserialize, utoipa::IntoParams)]
pub struct EmailCheckQuery {
    pub email: String,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct DuplicateCheckResponse {
    pub duplicated: bool,
}

#[derive(thiserror::Error)]
pub enum DuplicateCheckError {
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for DuplicateCheckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for DuplicateCheckError {
    fn status_code(&self) -> StatusCode {
        match self {
            DuplicateCheckError::ValidationError(_) => StatusCode::BAD_REQUEST,
            DuplicateCheckError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

#[utoipa::path(
    get,
    path = "/api/members/check-nickname",
    tag = "members",
    params(NicknameCheckQuery),
    responses((status = 200, description = "Whether the nickname is taken", body = DuplicateCheckResponse))
)]
#[tracing::instrument(name = "Check nickname duplication", skip(query, pool))]
pub async fn check_nickname(
    query: web::Query<NicknameCheckQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, DuplicateCheckError> {
    let nickname = Nickname::parse(query.0.nickname)
        .map_err(DuplicateCheckError::ValidationError)?;
    let duplicated = members::nickname_exists(&pool, nickname.as_ref()).await?;
    Ok(HttpResponse::Ok().json(SuccessBody::ok(DuplicateCheckResponse { duplicated })))
}

#[utoipa::path(
    get,
    path = "/api/members/check-email",
    tag = "members",
    params(EmailCheckQuery),
    responses((status = 200, description = "Whether the email is taken", body = DuplicateCheckResponse))
)]
#[tracing::instrument(name = "Check email duplication", skip(query, pool))]
pub async fn check_email(
    query: web::Query<EmailCheckQuery>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, DuplicateCheckError> {
    let email =
        MemberEmail::parse(query.0.email).map_err(DuplicateCheckError::ValidationError)?;
    let duplicated = members::email_exists(&pool, email.as_ref()).await?;
    Ok(HttpResponse::Ok().json(SuccessBody::ok(DuplicateCheckResponse { duplicated })))
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct CodeVerificationRequest {
    pub email: String,
    pub code: String,
}

#[derive(thiserror::Error)]
pub enum CodeVerificationError {
    #[error("the email or verification code is wrong.")]
    InvalidCode,
    #[error("the member is already verified.")]
    AlreadyVerified,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for CodeVerificationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for CodeVerificationError {
    fn status_code(&self) -> StatusCode {
        match self {
            CodeVerificationError::InvalidCode => StatusCode::UNAUTHORIZED,
            CodeVerificationError::AlreadyVerified => StatusCode::CONFLICT,
            CodeVerificationError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Confirms the emailed code and promotes the member from `GUEST` to
/// `MEMBER`. Wrong emails and wrong codes are indistinguishable on the wire.
#[utoipa::path(
    post,
    path = "/api/members/code-verification",
    tag = "members",
    request_body = CodeVerificationRequest,
    responses(
        (status = 200, description = "Code confirmed; member promoted"),
        (status = 401, description = "Wrong email or code"),
        (status = 409, description = "Already verified"),
    )
)]
#[tracing::instrument(name = "Verify a sign-up code", skip(request, pool, redis), fields(member_email = %request.email))]
pub async fn verify_code(
    request: web::Json<CodeVerificationRequest>,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
) -> Result<HttpResponse, CodeVerificationError> {
    let member = members::find_member_by_email(&pool, &request.email)
        .await?
        .ok_or(CodeVerificationError::InvalidCode)?;

    if member.role != Role::Guest {
        return Err(CodeVerificationError::AlreadyVerified);
    }

    let saved_code = redis_store::get_verification_code(&redis, &request.email).await?;
    match saved_code {
        Some(code) if !code.is_empty() && code == request.code => {}
        _ => return Err(CodeVerificationError::InvalidCode),
    }

    members::update_role(&pool, member.id, Role::Member).await?;

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct CodeResendRequest {
    pub email: String,
}

/// Resends a verification code. Responds 200 whether or not the email maps
/// to a pending member, so the endpoint cannot be used to probe accounts.
#[utoipa::path(
    post,
    path = "/api/members/code-resend",
    tag = "members",
    request_body = CodeResendRequest,
    responses((status = 200, description = "Acknowledged"))
)]
#[tracing::instrument(name = "Resend a sign-up code", skip(request, pool, redis, email_client), fields(member_email = %request.email))]
pub async fn resend_code(
    request: web::Json<CodeResendRequest>,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, SignupError> {
    let member = members::find_active_member_by_email(&pool, &request.email).await?;

    if let Some(member) = member {
        if member.role == Role::Guest {
            let email = MemberEmail::parse(member.email.clone())
                .map_err(|e| anyhow::anyhow!("Stored member email is invalid: {}", e))?;
            send_verification_code(&redis, &email_client, &email).await?;
        }
    }

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}
