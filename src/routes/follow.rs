use std::fmt::{Debug, Formatter};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use sqlx::PgPool;
use uuid::Uuid;

use crate::access_policy::{check_profile_access, AccessPolicyError};
use crate::authentication::{AuthenticatedMember, MaybeAuthenticated};
use crate::error_handling::{error_chain_fmt, error_response};
use crate::repository::follows::{self, InsertFollowError};
use crate::repository::members;
use crate::response::SuccessBody;
use crate::routes::MemberSummaryDto;

#[derive(thiserror::Error)]
pub enum FollowError {
    #[error("you cannot follow yourself.")]
    SelfFollow,
    #[error("access is restricted because of a block.")]
    Blocked,
    #[error("the member is already followed.")]
    DuplicateFollow,
    #[error("the member is not followed.")]
    NotFollowing,
    #[error("the member does not exist.")]
    MemberNotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for FollowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for FollowError {
    fn status_code(&self) -> StatusCode {
        match self {
            FollowError::SelfFollow | FollowError::NotFollowing => StatusCode::BAD_REQUEST,
            FollowError::Blocked => StatusCode::FORBIDDEN,
            FollowError::DuplicateFollow => StatusCode::CONFLICT,
            FollowError::MemberNotFound => StatusCode::NOT_FOUND,
            FollowError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Follows another member. Blocked pairs cannot follow in either direction.
#[utoipa::path(
    post,
    path = "/api/members/{member_id}/follow",
    tag = "follow",
    params(("member_id" = Uuid, Path, description = "Member to follow")),
    responses(
        (status = 200, description = "Now following"),
        (status = 400, description = "Cannot follow yourself"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "A block exists between the members"),
        (status = 404, description = "No such active member"),
        (status = 409, description = "Already followed"),
    )
)]
#[tracing::instrument(name = "Follow a member", skip(pool), fields(follower_id = %member.id))]
pub async fn follow(
    member: AuthenticatedMember,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, FollowError> {
    let target_id = path.into_inner();
    if member.id == target_id {
        return Err(FollowError::SelfFollow);
    }

    if crate::repository::blocks::block_exists_either(&pool, member.id, target_id).await? {
        return Err(FollowError::Blocked);
    }
    if follows::follow_exists(&pool, member.id, target_id).await? {
        return Err(FollowError::DuplicateFollow);
    }

    members::find_active_member_by_id(&pool, member.id)
        .await?
        .ok_or(FollowError::MemberNotFound)?;
    members::find_active_member_by_id(&pool, target_id)
        .await?
        .ok_or(FollowError::MemberNotFound)?;

    follows::insert_follow(&pool, member.id, target_id)
        .await
        .map_err(|e| match e {
            InsertFollowError::Duplicate => FollowError::DuplicateFollow,
            InsertFollowError::UnexpectedError(e) => FollowError::UnexpectedError(e),
        })?;

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

#[utoipa::path(
    delete,
    path = "/api/members/{member_id}/follow",
    tag = "follow",
    params(("member_id" = Uuid, Path, description = "Member to unfollow")),
    responses(
        (status = 200, description = "No longer following"),
        (status = 400, description = "Not followed, or yourself"),
        (status = 401, description = "Not logged in"),
    )
)]
#[tracing::instrument(name = "Unfollow a member", skip(pool), fields(follower_id = %member.id))]
pub async fn unfollow(
    member: AuthenticatedMember,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, FollowError> {
    let target_id = path.into_inner();
    if member.id == target_id {
        return Err(FollowError::SelfFollow);
    }

    let deleted = follows::delete_follow(&pool, member.id, target_id).await?;
    if deleted == 0 {
        return Err(FollowError::NotFollowing);
    }

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct MemberListResponse {
    pub members: Vec<MemberSummaryDto>,
}

#[derive(thiserror::Error)]
pub enum FollowListError {
    #[error("the member does not exist.")]
    MemberNotFound,
    #[error("{0}")]
    AccessDenied(AccessPolicyError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for FollowListError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<AccessPolicyError> for FollowListError {
    fn from(e: AccessPolicyError) -> Self {
        match e {
            AccessPolicyError::UnexpectedError(e) => FollowListError::UnexpectedError(e),
            denied => FollowListError::AccessDenied(denied),
        }
    }
}

impl ResponseError for FollowListError {
    fn status_code(&self) -> StatusCode {
        match self {
            FollowListError::MemberNotFound => StatusCode::NOT_FOUND,
            FollowListError::AccessDenied(_) => StatusCode::FORBIDDEN,
            FollowListError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Runs the access policy unless the viewer is reading their own list, then
/// hands back the members found by `fetch`.
async fn guarded_member_list<F, Fut>(
    viewer: MaybeAuthenticated,
    target_id: Uuid,
    pool: &PgPool,
    fetch: F,
) -> Result<HttpResponse, FollowListError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<Vec<follows::MemberSummary>, anyhow::Error>>,
{
    let viewer_id = viewer.member_id();
    if viewer_id != Some(target_id) {
        let target = members::find_active_member_by_id(pool, target_id)
            .await?
            .ok_or(FollowListError::MemberNotFound)?;
        check_profile_access(pool, viewer_id, &target).await?;
    }

    let summaries = fetch().await?;
    let members = summaries.into_iter().map(MemberSummaryDto::from).collect();
    Ok(HttpResponse::Ok().json(SuccessBody::ok(MemberListResponse { members })))
}

#[utoipa::path(
    get,
    path = "/api/members/{member_id}/follower",
    tag = "follow",
    params(("member_id" = Uuid, Path, description = "Whose followers to list")),
    responses(
        (status = 200, description = "Follower list", body = MemberListResponse),
        (status = 403, description = "Blocked, private, or followers-only"),
        (status = 404, description = "No such member"),
    )
)]
#[tracing::instrument(name = "List followers", skip(viewer, pool))]
pub async fn follower_list(
    viewer: MaybeAuthenticated,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, FollowListError> {
    let target_id = path.into_inner();
    guarded_member_list(viewer, target_id, &pool, || {
        follows::follower_list(&pool, target_id)
    })
    .await
}

#[utoipa::path(
    get,
    path = "/api/members/{member_id}/following",
    tag = "follow",
    params(("member_id" = Uuid, Path, description = "Whose followings to list")),
    responses(
        (status = 200, description = "Following list", body = MemberListResponse),
        (status = 403, description = "Blocked, private, or followers-only"),
        (status = 404, description = "No such member"),
    )
)]
#[tracing::instrument(name = "List followings", skip(viewer, pool))]
pub async fn following_list(
    viewer: MaybeAuthenticated,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, FollowListError> {
    let target_id = path.into_inner();
    guarded_member_list(viewer, target_id, &pool, || {
        follows::following_list(&pool, target_id)
    })
    .await
}
