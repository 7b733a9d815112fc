use anyhow::Context;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

/// A member as listed in follower/following/block listings.
#[derive(Debug, sqlx::FromRow)]
pub struct MemberSummary {
    pub member_id: Uuid,
    pub nickname: String,
}

#[derive(thiserror::Error, Debug)]
pub enum InsertFollowError {
    #[error("the member is already followed.")]
    Duplicate,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

#[tracing::instrument(name = "Check follow relation", skip(pool))]
pub async fn follow_exists(
    pool: &PgPool,
    follower_id: Uuid,
    following_id: Uuid,
) -> Result<bool, anyhow::Error> {
    let row = sqlx::query(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
    )
    .bind(follower_id)
    .bind(following_id)
    .fetch_one(pool)
    .await
    .context("Failed to check the follow relation.")?;
    Ok(row.get::<bool, _>(0))
}

#[tracing::instrument(name = "Insert follow", skip(pool))]
pub async fn insert_follow(
    pool: &PgPool,
    follower_id: Uuid,
    following_id: Uuid,
) -> Result<(), InsertFollowError> {
    sqlx::query(
        r#"
        INSERT INTO follows (id, follower_id, following_id, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(follower_id)
    .bind(following_id)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| {
        let constraint = e
            .as_database_error()
            .and_then(|db| db.constraint())
            .map(str::to_string);
        match constraint.as_deref() {
            Some("follows_pair_key") => InsertFollowError::Duplicate,
            _ => InsertFollowError::UnexpectedError(
                anyhow::Error::from(e).context("Failed to insert a follow relation."),
            ),
        }
    })?;
    Ok(())
}

/// Removes a single directed follow edge. Returns how many rows went away so
/// callers can tell "was not following" apart from success.
#[tracing::instrument(name = "Delete follow", skip(pool))]
pub async fn delete_follow(
    pool: &PgPool,
    follower_id: Uuid,
    following_id: Uuid,
) -> Result<u64, anyhow::Error> {
    let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
        .bind(follower_id)
        .bind(following_id)
        .execute(pool)
        .await
        .context("Failed to delete the follow relation.")?;
    Ok(result.rows_affected())
}

/// Severs the follow relation in both directions, as happens on block.
#[tracing::instrument(name = "Delete follow pair", skip(transaction))]
pub async fn delete_follow_pair(
    transaction: &mut Transaction<'_, Postgres>,
    member_a: Uuid,
    member_b: Uuid,
) -> Result<(), anyhow::Error> {
    sqlx::query(
        r#"
        DELETE FROM follows
        WHERE (follower_id = $1 AND following_id = $2)
           OR (follower_id = $2 AND following_id = $1)
        "#,
    )
    .bind(member_a)
    .bind(member_b)
    .execute(transaction)
    .await
    .context("Failed to sever the follow relations.")?;
    Ok(())
}

#[tracing::instrument(name = "List followers", skip(pool))]
pub async fn follower_list(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<Vec<MemberSummary>, anyhow::Error> {
    sqlx::query_as::<_, MemberSummary>(
        r#"
        SELECT m.id AS member_id, m.nickname
        FROM follows f
        JOIN members m ON m.id = f.follower_id
        WHERE f.following_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await
    .context("Failed to list followers.")
}

#[tracing::instrument(name = "List followings", skip(pool))]
pub async fn following_list(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<Vec<MemberSummary>, anyhow::Error> {
    sqlx::query_as::<_, MemberSummary>(
        r#"
        SELECT m.id AS member_id, m.nickname
        FROM follows f
        JOIN members m ON m.id = f.following_id
        WHERE f.follower_id = $1
        ORDER BY f.created_at DESC
        "#,
    )
    .bind(member_id)
    .fetch_all(pool)
    .await
    .context("Failed to list followings.")
}

#[tracing::instrument(name = "Count followers", skip(pool))]
pub async fn follower_count(pool: &PgPool, member_id: Uuid) -> Result<i64, anyhow::Error> {
    let row = sqlx::query("SELECT COUNT(*) FROM follows WHERE following_id = $1")
        .bind(member_id)
        .fetch_one(pool)
        .await
        .context("Failed to count followers.")?;
    Ok(row.get::<i64, _>(0))
}

#[tracing::instrument(name = "Count followings", skip(pool))]
pub async fn following_count(pool: &PgPool, member_id: Uuid) -> Result<i64, anyhow::Error> {
    let row = sqlx::query("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
        .bind(member_id)
        .fetch_one(pool)
        .await
        .context("Failed to count followings.")?;
    Ok(row.get::<i64, _>(0))
}
