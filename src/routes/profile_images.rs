use std::fmt::{Debug, Formatter};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use uuid::Uuid;

use crate::access_policy::{check_profile_access, AccessPolicyError};
use crate::authentication::{AuthenticatedMember, MaybeAuthenticated};
use crate::error_handling::{error_chain_fmt, error_response};
use crate::redis_store;
use crate::repository::members;
use crate::repository::profile_images::{self, NewProfileImage};
use crate::response::SuccessBody;

#[derive(serde::Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImageRequest {
    pub image_url: String,
    pub origin_name: String,
    pub file_name: String,
    pub represent: bool,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileImageDto {
    pub profile_image_id: Uuid,
    pub image_url: String,
    pub origin_name: String,
    pub file_name: String,
    pub represent: bool,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ProfileImageListResponse {
    pub images: Vec<ProfileImageDto>,
}

#[derive(thiserror::Error)]
pub enum ProfileImageError {
    #[error("the profile image does not exist.")]
    ImageNotFound,
    #[error("the member does not exist.")]
    MemberNotFound,
    #[error("{0}")]
    AccessDenied(AccessPolicyError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl Debug for ProfileImageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<AccessPolicyError> for ProfileImageError {
    fn from(e: AccessPolicyError) -> Self {
        match e {
            AccessPolicyError::UnexpectedError(e) => ProfileImageError::UnexpectedError(e),
            denied => ProfileImageError::AccessDenied(denied),
        }
    }
}

impl ResponseError for ProfileImageError {
    fn status_code(&self) -> StatusCode {
        match self {
            ProfileImageError::ImageNotFound | ProfileImageError::MemberNotFound => {
                StatusCode::NOT_FOUND
            }
            ProfileImageError::AccessDenied(_) => StatusCode::FORBIDDEN,
            ProfileImageError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self.status_code(), self)
    }
}

/// Registers an uploaded image's metadata. A new representative image demotes
/// the previous one inside the same transaction.
#[utoipa::path(
    post,
    path = "/api/members/me/profile-images",
    tag = "profile-images",
    request_body = ProfileImageRequest,
    responses(
        (status = 201, description = "Profile image registered"),
        (status = 401, description = "Not logged in"),
    )
)]
#[tracing::instrument(name = "Add profile image", skip(request, pool, redis), fields(member_id = %member.id))]
pub async fn add_profile_image(
    member: AuthenticatedMember,
    request: web::Json<ProfileImageRequest>,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
) -> Result<HttpResponse, ProfileImageError> {
    let request = request.0;
    let new_image = NewProfileImage {
        image_url: request.image_url,
        origin_name: request.origin_name,
        file_name: request.file_name,
        represent: request.represent,
    };

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool.")?;
    if new_image.represent {
        profile_images::clear_represent_flag(&mut transaction, member.id).await?;
    }
    profile_images::insert_profile_image(&mut transaction, member.id, &new_image).await?;
    transaction
        .commit()
        .await
        .context("Failed to commit the profile image.")?;

    evict_cache(&redis, member.id).await;

    Ok(HttpResponse::Created().json(SuccessBody::empty(StatusCode::CREATED)))
}

/// Lists a member's profile images, newest first. Looking at someone else's
/// images goes through the access policy.
#[utoipa::path(
    get,
    path = "/api/members/{member_id}/profile-images",
    tag = "profile-images",
    params(("member_id" = Uuid, Path, description = "Whose images to list")),
    responses(
        (status = 200, description = "Profile image list", body = ProfileImageListResponse),
        (status = 403, description = "Blocked, private, or followers-only"),
        (status = 404, description = "No such member"),
    )
)]
#[tracing::instrument(name = "List profile images", skip(viewer, pool))]
pub async fn profile_image_list(
    viewer: MaybeAuthenticated,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ProfileImageError> {
    let target_id = path.into_inner();
    let viewer_id = viewer.member_id();

    if viewer_id != Some(target_id) {
        let target = members::find_active_member_by_id(&pool, target_id)
            .await?
            .ok_or(ProfileImageError::MemberNotFound)?;
        check_profile_access(&pool, viewer_id, &target).await?;
    }

    let images = profile_images::list_profile_images(&pool, target_id)
        .await?
        .into_iter()
        .map(|image| ProfileImageDto {
            profile_image_id: image.id,
            image_url: image.image_url,
            origin_name: image.origin_name,
            file_name: image.file_name,
            represent: image.represent,
        })
        .collect();

    Ok(HttpResponse::Ok().json(SuccessBody::ok(ProfileImageListResponse { images })))
}

#[utoipa::path(
    delete,
    path = "/api/members/me/profile-images/{image_id}",
    tag = "profile-images",
    params(("image_id" = Uuid, Path, description = "Image to delete")),
    responses(
        (status = 200, description = "Profile image deleted"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Not one of the caller's images"),
    )
)]
#[tracing::instrument(name = "Delete profile image", skip(pool, redis), fields(member_id = %member.id))]
pub async fn delete_profile_image(
    member: AuthenticatedMember,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
) -> Result<HttpResponse, ProfileImageError> {
    let image_id = path.into_inner();

    let deleted = profile_images::delete_profile_image(&pool, member.id, image_id).await?;
    if deleted == 0 {
        return Err(ProfileImageError::ImageNotFound);
    }

    evict_cache(&redis, member.id).await;

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

/// Promotes one of the caller's images to representative, demoting the
/// current one.
#[utoipa::path(
    patch,
    path = "/api/members/me/profile-images/{image_id}",
    tag = "profile-images",
    params(("image_id" = Uuid, Path, description = "Image to promote")),
    responses(
        (status = 200, description = "Representative image updated"),
        (status = 401, description = "Not logged in"),
        (status = 404, description = "Not one of the caller's images"),
    )
)]
#[tracing::instrument(name = "Set representative image", skip(pool, redis), fields(member_id = %member.id))]
pub async fn set_represent_image(
    member: AuthenticatedMember,
    path: web::Path<Uuid>,
    pool: web::Data<PgPool>,
    redis: web::Data<ConnectionManager>,
) -> Result<HttpResponse, ProfileImageError> {
    let image_id = path.into_inner();

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool.")?;
    profile_images::clear_represent_flag(&mut transaction, member.id).await?;
    let updated = profile_images::set_represent_flag(&mut transaction, member.id, image_id).await?;
    if updated == 0 {
        // dropping the transaction rolls the demotion back
        return Err(ProfileImageError::ImageNotFound);
    }
    transaction
        .commit()
        .await
        .context("Failed to commit the representative image change.")?;

    evict_cache(&redis, member.id).await;

    Ok(HttpResponse::Ok().json(SuccessBody::empty(StatusCode::OK)))
}

/// Cache eviction is best effort: a Redis hiccup must not fail a mutation
/// that already committed.
async fn evict_cache(redis: &ConnectionManager, member_id: Uuid) {
    if let Err(e) = redis_store::evict_represent_image(redis, member_id).await {
        tracing::warn!(
            error.cause_chain = ?e,
            "Failed to evict the representative image cache"
        );
    }
}
