use std::fmt::{Debug, Formatter};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use chrono::NaiveDate;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use uuid::Uuid;

use crate::access_policy::{check_profile_access, AccessPolicyError};
use crate::authentication::MaybeAuthenticated;
use crate::domain::Member;
use crate::error_handling::{error_chain_fmt, error_response};
use crate::redis_store;
use crate::repository::profile_images::RepresentImage;
use crate::repository::{follows, members, profile_images};
use crate::response::SuccessBody;

#[derive(serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfoResponse {
    pub id: Uuid,
    pub name: String,
    pub nickname: String,
    pub birth: NaiveDate,
    pub gender_code: String,
    pub gender_value: String,
    pub follower_count: i64,
    pub following_count: i64,
    pub profile_image_id: Option<Uuid>,
    pub image_url: Option<String>,
    pub origin_name: Option<String>,
    pub file_name: Option<String>,
}

#[derive(thiserror::Error)]
pub enum MemberInfoError {
    #[error("the member does not exist.")]
    MemberNotFound,
    #[error("{0}")]
    AccessDenied(AccessPolicyError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for MemberInfoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<AccessPolicyError> for MemberInfoError {
    fn from(e: AccessPolicyError) -> Self {
        match e {
            AccessPolicyError::UnexpectedError(e) => MemberInfoError::UnexpectedError(e),
            denied => MemberInfoError::AccessDenied(denied),
        }
    }
}

impl ResponseError for MemberInfoError {
    fn status_code(&self) -> StatusCode {
        match self {
            MemberInfoError::MemberNotFound => StatusCode::NOT_FOUND,
            MemberInfoError::AccessDenied(_) => StatusCode::FORBIDDEN,
            MemberInfoError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Member profile lookup. Viewing yourself skips the access policy and also
/// works while the account is not ACTIVE; everyone else only sees ACTIVE
/// members they are allowed to see.
#[utoipa::path(
    get,
    path = "/api/members/{member_id}",
    tag = "members",
    params(("member_id" = Uuid, Path, description = "Member to look up")),
    responses(
        (status = 200, description = "Member profile", body = MemberInfoResponse),
        (status = 403, description = "Blocked, private, or followers-only"),
        (status = 404, description = "No such member"),
    )
)]
#[tracing::instrument(name = "Fetch member info", skip(pool, redis, viewer))]
pub async fn member_info(
    path: web::Path<Uuid>,
    viewer: MaybeAuthenticated,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
) -> Result<HttpResponse, MemberInfoError> {
    let member_id = path.into_inner();
    let viewer_id = viewer.member_id();
    let is_me = viewer_id == Some(member_id);

    let member = if is_me {
        members::find_member_by_id(&pool, member_id).await?
    } else {
        members::find_active_member_by_id(&pool, member_id).await?
    }
    .ok_or(MemberInfoError::MemberNotFound)?;

    if !is_me {
        check_profile_access(&pool, viewer_id, &member).await?;
    }

    let response = assemble_member_info(&pool, &redis, &member).await?;
    Ok(HttpResponse::Ok().json(SuccessBody::ok(response)))
}

async fn assemble_member_info(
    pool: &PgPool,
    redis: &ConnectionManager,
    member: &Member,
) -> Result<MemberInfoResponse, anyhow::Error> {
    let follower_count = follows::follower_count(pool, member.id).await?;
    let following_count = follows::following_count(pool, member.id).await?;
    let represent_image = resolve_represent_image(pool, redis, member.id).await?;

    let (profile_image_id, image_url, origin_name, file_name) = match represent_image {
        Some(image) => (
            Some(image.profile_image_id),
            Some(image.image_url),
            Some(image.origin_name),
            Some(image.file_name),
        ),
        None => (None, None, None, None),
    };

    Ok(MemberInfoResponse {
        id: member.id,
        name: member.name.clone(),
        nickname: member.nickname.clone(),
        birth: member.birth,
        gender_code: member.gender.as_str().to_string(),
        gender_value: member.gender.label().to_string(),
        follower_count,
        following_count,
        profile_image_id,
        image_url,
        origin_name,
        file_name,
    })
}

/// Cache-through lookup of the representative image. A cache failure never
/// fails the request; the database remains the source of truth.
async fn resolve_represent_image(
    pool: &PgPool,
    redis: &ConnectionManager,
    member_id: Uuid,
) -> Result<Option<RepresentImage>, anyhow::Error> {
    match redis_store::get_cached_represent_image(redis, member_id).await {
        Ok(Some(cached)) => return Ok(Some(cached)),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(
                error.cause_chain = ?e,
                "Failed to read the representative image cache"
            );
        }
    }

    let image = profile_images::find_represent_or_latest(pool, member_id).await?;
    if let Some(image) = &image {
        if let Err(e) = redis_store::cache_represent_image(redis, member_id, image).await {
            tracing::warn!(
                error.cause_chain = ?e,
                "Failed to populate the representative image cache"
            );
        }
    }
    Ok(image)
}
