use anyhow::Context;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct ProfileImage {
    pub id: Uuid,
    pub image_url: String,
    pub origin_name: String,
    pub file_name: String,
    pub represent: bool,
}

/// The image shown on a member's profile: the one flagged as representative,
/// or the newest upload when none is flagged. Cached in Redis.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RepresentImage {
    pub profile_image_id: Uuid,
    pub image_url: String,
    pub origin_name: String,
    pub file_name: String,
}

pub struct NewProfileImage {
    pub image_url: String,
    pub origin_name: String,
    pub file_name: String,
    pub represent: bool,
}

#[tracing::instrument(name = "Insert profile image", skip(transaction, image))]
pub async fn insert_profile_image(
    transaction: &mut Transaction<'_, Postgres>,
    member_id: Uuid,
    image: &NewProfileImage,
) -> Result<Uuid, anyhow::Error> {
    let image_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO profile_images
            (id, member_id, image_url, origin_name, file_name, represent, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(image_id)
    .bind(member_id)
    .bind(&image.image_url)
    .bind(&image.origin_name)
    .bind(&image.file_name)
    .bind(image.represent)
    .bind(Utc::now())
    .execute(transaction)
    .await
    .context("Failed to insert the profile image.")?;
    Ok(image_id)
}

#[tracing::instrument(name = "List profile images", skip(pool))]
pub async fn list_profile_images(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<Vec<ProfileImage>, anyhow::Error> {
    sqlx::query_as::<_, ProfileImage>(
        r#"
        SELECT id, image_url, origin_name, file_name, represent
        FROM profile_images
        WHERE member_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await
    .context("Failed to list profile images.")
}

/// Demotes whichever image currently carries the representative flag.
#[tracing::instrument(name = "Clear representative flag", skip(transaction))]
pub async fn clear_represent_flag(
    transaction: &mut Transaction<'_, Postgres>,
    member_id: Uuid,
) -> Result<(), anyhow::Error> {
    sqlx::query("UPDATE profile_images SET represent = FALSE WHERE member_id = $1 AND represent")
        .bind(member_id)
        .execute(transaction)
        .await
        .context("Failed to clear the representative flag.")?;
    Ok(())
}

/// Flags one of the member's own images as representative. Returns the number
/// of rows touched; zero means the image does not exist or belongs to someone
/// else.
#[tracing::instrument(name = "Set representative flag", skip(transaction))]
pub async fn set_represent_flag(
    transaction: &mut Transaction<'_, Postgres>,
    member_id: Uuid,
    image_id: Uuid,
) -> Result<u64, anyhow::Error> {
    let result = sqlx::query(
        "UPDATE profile_images SET represent = TRUE WHERE id = $1 AND member_id = $2",
    )
    .bind(image_id)
    .bind(member_id)
    .execute(transaction)
    .await
    .context("Failed to set the representative flag.")?;
    Ok(result.rows_affected())
}

/// Deletes one of the member's own images. Returns zero rows when the image
/// is missing or owned by another member.
#[tracing::instrument(name = "Delete profile image", skip(pool))]
pub async fn delete_profile_image(
    pool: &PgPool,
    member_id: Uuid,
    image_id: Uuid,
) -> Result<u64, anyhow::Error> {
    let result = sqlx::query("DELETE FROM profile_images WHERE id = $1 AND member_id = $2")
        .bind(image_id)
        .bind(member_id)
        .execute(pool)
        .await
        .context("Failed to delete the profile image.")?;
    Ok(result.rows_affected())
}

#[tracing::instrument(name = "Fetch representative image", skip(pool))]
pub async fn find_represent_or_latest(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<Option<RepresentImage>, anyhow::Error> {
    let row = sqlx::query(
        r#"
        SELECT id, image_url, origin_name, file_name
        FROM profile_images
        WHERE member_id = $1
        ORDER BY represent DESC, created_at DESC
        LIMIT 1
        "#,
    )
    .bind(member_id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch the representative image.")?;
    Ok(row.map(|r| RepresentImage {
        profile_image_id: r.get("id"),
        image_url: r.get("image_url"),
        origin_name: r.get("origin_name"),
        file_name: r.get("file_name"),
    }))
}
