pub mod auth;
pub mod block;
pub mod docs;
pub mod follow;
pub mod health_check;
pub mod members;
pub mod profile_images;

pub use auth::*;
pub use block::*;
pub use follow::*;
pub use health_check::*;
pub use members::*;
pub use profile_images::*;

use uuid::Uuid;

use crate::repository::follows::MemberSummary;

/// One entry in follower/following/block listings.
#[derive(serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummaryDto {
    pub member_id: Uuid,
    pub nickname: String,
}

impl From<MemberSummary> for MemberSummaryDto {
    fn from(summary: MemberSummary) -> Self {
        Self {
            member_id: summary.member_id,
            nickname: summary.nickname,
        }
    }
}
