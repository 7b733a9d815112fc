use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Member, Visibility};
use crate::repository::{blocks, follows};

#[derive(thiserror::Error, Debug)]
pub enum AccessPolicyError {
    #[error("access is restricted because of a block.")]
    Blocked,
    #[error("this profile is private.")]
    Private,
    #[error("this profile is visible to followers only.")]
    FollowersOnly,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

/// Gate for reading another member's profile surface (info, follower and
/// following lists, profile images).
///
/// A block in either direction wins over everything else; after that the
/// target's visibility decides. Callers are expected to skip the check when
/// the viewer is looking at their own profile.
#[tracing::instrument(name = "Check profile access", skip(pool, target), fields(target_id = %target.id))]
pub async fn check_profile_access(
    pool: &PgPool,
    viewer_id: Option<Uuid>,
    target: &Member,
) -> Result<(), AccessPolicyError> {
    if let Some(viewer_id) = viewer_id {
        if blocks::block_exists_either(pool, viewer_id, target.id).await? {
            return Err(AccessPolicyError::Blocked);
        }
    }

    match target.visibility {
        Visibility::Public => Ok(()),
        Visibility::Private => Err(AccessPolicyError::Private),
        Visibility::FollowerOnly => match viewer_id {
            Some(viewer_id) if follows::follow_exists(pool, viewer_id, target.id).await? => Ok(()),
            _ => Err(AccessPolicyError::FollowersOnly),
        },
    }
}
