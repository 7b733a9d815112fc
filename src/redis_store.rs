use anyhow::Context;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use crate::repository::profile_images::RepresentImage;

/// TTL for emailed sign-up verification codes.
pub const VERIFICATION_CODE_TTL_SECONDS: u64 = 300;
/// TTL for the cached representative profile image.
const REPRESENT_IMAGE_TTL_SECONDS: u64 = 1800;

fn code_key(email: &str) -> String {
    format!("code:{}", email)
}

fn refresh_key(member_id: Uuid) -> String {
    format!("refresh:{}", member_id)
}

fn denylist_key(fingerprint: &str) -> String {
    format!("denylist:{}", fingerprint)
}

fn represent_image_key(member_id: Uuid) -> String {
    format!("represent-image:{}", member_id)
}

#[tracing::instrument(name = "Store verification code", skip(redis, code))]
pub async fn save_verification_code(
    redis: &ConnectionManager,
    email: &str,
    code: &str,
) -> Result<(), anyhow::Error> {
    let mut conn = redis.clone();
    conn.set_ex::<_, _, ()>(code_key(email), code, VERIFICATION_CODE_TTL_SECONDS)
        .await
        .context("Failed to store the verification code in Redis.")
}

#[tracing::instrument(name = "Fetch verification code", skip(redis))]
pub async fn get_verification_code(
    redis: &ConnectionManager,
    email: &str,
) -> Result<Option<String>, anyhow::Error> {
    let mut conn = redis.clone();
    conn.get(code_key(email))
        .await
        .context("Failed to read the verification code from Redis.")
}

#[tracing::instrument(name = "Store refresh token", skip(redis, token))]
pub async fn save_refresh_token(
    redis: &ConnectionManager,
    member_id: Uuid,
    token: &str,
    ttl: std::time::Duration,
) -> Result<(), anyhow::Error> {
    let mut conn = redis.clone();
    conn.set_ex::<_, _, ()>(refresh_key(member_id), token, ttl.as_secs())
        .await
        .context("Failed to store the refresh token in Redis.")
}

#[tracing::instrument(name = "Fetch refresh token", skip(redis))]
pub async fn get_refresh_token(
    redis: &ConnectionManager,
    member_id: Uuid,
) -> Result<Option<String>, anyhow::Error> {
    let mut conn = redis.clone();
    conn.get(refresh_key(member_id))
        .await
        .context("Failed to read the refresh token from Redis.")
}

/// Records a logged-out access token until its own expiry. The key is a
/// fingerprint, so the raw token never reaches Redis.
#[tracing::instrument(name = "Denylist access token", skip(redis, fingerprint))]
pub async fn denylist_access_token(
    redis: &ConnectionManager,
    fingerprint: &str,
    remaining: std::time::Duration,
) -> Result<(), anyhow::Error> {
    let mut conn = redis.clone();
    conn.set_ex::<_, _, ()>(denylist_key(fingerprint), "logout", remaining.as_secs())
        .await
        .context("Failed to denylist the access token in Redis.")
}

#[tracing::instrument(name = "Check access token denylist", skip(redis, fingerprint))]
pub async fn is_access_token_denylisted(
    redis: &ConnectionManager,
    fingerprint: &str,
) -> Result<bool, anyhow::Error> {
    let mut conn = redis.clone();
    let entry: Option<String> = conn
        .get(denylist_key(fingerprint))
        .await
        .context("Failed to read the access token denylist from Redis.")?;
    Ok(entry.is_some())
}

#[tracing::instrument(name = "Cache representative image", skip(redis, image))]
pub async fn cache_represent_image(
    redis: &ConnectionManager,
    member_id: Uuid,
    image: &RepresentImage,
) -> Result<(), anyhow::Error> {
    let payload =
        serde_json::to_string(image).context("Failed to serialize the representative image.")?;
    let mut conn = redis.clone();
    conn.set_ex::<_, _, ()>(
        represent_image_key(member_id),
        payload,
        REPRESENT_IMAGE_TTL_SECONDS,
    )
    .await
    .context("Failed to cache the representative image in Redis.")
}

#[tracing::instrument(name = "Fetch cached representative image", skip(redis))]
pub async fn get_cached_represent_image(
    redis: &ConnectionManager,
    member_id: Uuid,
) -> Result<Option<RepresentImage>, anyhow::Error> {
    let mut conn = redis.clone();
    let payload: Option<String> = conn
        .get(represent_image_key(member_id))
        .await
        .context("Failed to read the cached representative image from Redis.")?;
    payload
        .map(|p| serde_json::from_str(&p))
        .transpose()
        .context("Failed to deserialize the cached representative image.")
}

/// Dropped whenever a member's profile images change in any way.
#[tracing::instrument(name = "Evict representative image cache", skip(redis))]
pub async fn evict_represent_image(
    redis: &ConnectionManager,
    member_id: Uuid,
) -> Result<(), anyhow::Error> {
    let mut conn = redis.clone();
    conn.del::<_, ()>(represent_image_key(member_id))
        .await
        .context("Failed to evict the representative image cache.")
}
