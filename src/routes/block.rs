use std::fmt::{Debug, Formatter};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use crate::authentication::AuthenticatedMember;
use crate::error_handling::{error_chain_fmt, error_response};
use crate::repository::blocks::{self, InsertBlockError};
use crate::repository::{follows, members};
use crate::response::SuccessBody;
use crate::routes::follow::MemberListResponse;
use crate::routes::MemberSummaryDto;

#[derive(thiserror::Error)]
pub enum BlockError {
    #[error("you cannot block yourself.")]
    SelfBlock,
    #[error("the member is already blocked.")]
    DuplicateBlock,
    #[error("the member is not blocked.")]
    NotBlocked,
    #[error("the member does not exist.")]
    MemberNotFound,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for BlockError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for BlockError {
    fn status_code(&self) -> StatusCode {
        match self {
            BlockError::SelfBlock | BlockError::NotBlocked => StatusCode::BAD_REQUEST,
            BlockError::DuplicateBlock => StatusCode::CONFLICT,
            BlockError::MemberNotFound => StatusCode::NOT_FOUND,
            BlockError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Blocks another member. Any follow relation between the two is severed in
/// the same transaction as the block itself.
#[utoipa::path(
    post,
    path = "/api/block/{member_id}",
    tag = "block",
    params(("member_id" = Uuid, Path, description = "Member to block")),
    responses(
        (status = 200, description = "Blocked"),
        (status = 400, description = "Cannot block yourself"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "No such active member"),
        (status = 409, description = "Already blocked"),
    )
)]
#[tracing::instrument(name = "Block a member", skip(pool), fields(blocker_id = %member.id))]
pub async fn block_member(
    member: AuthenticatedMember,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, BlockError> {
    let target_id = path.into_inner();
    if member.id == target_id {
        return Err(BlockError::SelfBlock);
    }

    if blocks::block_exists(&pool, member.id, target_id).await? {
        return Err(BlockError::DuplicateBlock);
    }

    members::find_active_member_by_id(&pool, member.id)
        .await?
        .ok_or(BlockError::MemberNotFound)?;
    members::find_active_member_by_id(&pool, target_id)
        .await?
        .ok_or(BlockError::MemberNotFound)?;

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool.")?;
    follows::delete_follow_pair(&mut transaction, member.id, target_id).await?;
    blocks::insert_block(&mut transaction, member.id, target_id)
        .await
        .map_err(|e| match e {
            InsertBlockError::Duplicate => BlockError::DuplicateBlock,
            InsertBlockError::UnexpectedError(e) => BlockError::UnexpectedError(e),
        })?;
    transaction
        .commit()
        .await
        .context("Failed to commit the block.")?;

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

#[utoipa::path(
    delete,
    path = "/api/block/{member_id}",
    tag = "block",
    params(("member_id" = Uuid, Path, description = "Member to unblock")),
    responses(
        (status = 200, description = "Unblocked"),
        (status = 400, description = "Not blocked, or yourself"),
        (status = 401, description = "Not logged in"),
    )
)]
#[tracing::instrument(name = "Unblock a member", skip(pool), fields(blocker_id = %member.id))]
pub async fn unblock_member(
    member: AuthenticatedMember,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, BlockError> {
    let target_id = path.into_inner();
    if member.id == target_id {
        return Err(BlockError::SelfBlock);
    }

    let deleted = blocks::delete_block(&pool, member.id, target_id).await?;
    if deleted == 0 {
        return Err(BlockError::NotBlocked);
    }

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

#[utoipa::path(
    get,
    path = "/api/block",
    tag = "block",
    responses(
        (status = 200, description = "Blocked member list", body = MemberListResponse),
        (status = 401, description = "Not logged in"),
    )
)]
#[tracing::instrument(name = "List blocked members", skip(pool), fields(blocker_id = %member.id))]
pub async fn block_list(
    member: AuthenticatedMember,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, BlockError> {
    let summaries = blocks::blocked_list(&pool, member.id).await?;
    let members = summaries.into_iter().map(MemberSummaryDto::from).collect();
    Ok(HttpResponse::Ok().json(SuccessBody::ok(MemberListResponse { members })))
}
