use anyhow::Context;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::repository::follows::MemberSummary;

#[derive(thiserror::Error, Debug)]
pub enum InsertBlockError {
    #[error("the member is already blocked.")]
    Duplicate,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

#[tracing::instrument(name = "Check block relation", skip(pool))]
pub async fn block_exists(
    pool: &PgPool,
    blocker_id: Uuid,
    blocked_id: Uuid,
) -> Result<bool, anyhow::Error> {
    let row = sqlx::query(
        "SELECT EXISTS(SELECT 1 FROM blocks WHERE blocker_id = $1 AND blocked_id = $2)",
    )
    .bind(blocker_id)
    .bind(blocked_id)
    .fetch_one(pool)
    .await
    .context("Failed to check the block relation.")?;
    Ok(row.get::<bool, _>(0))
}

/// True when either of the two members has blocked the other.
#[tracing::instrument(name = "Check block in either direction", skip(pool))]
pub async fn block_exists_either(
    pool: &PgPool,
    member_a: Uuid,
    member_b: Uuid,
) -> Result<bool, anyhow::Error> {
    let row = sqlx::query(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM blocks
            WHERE (blocker_id = $1 AND blocked_id = $2)
               OR (blocker_id = $2 AND blocked_id = $1)
        )
        "#,
    )
    .bind(member_a)
    .bind(member_b)
    .fetch_one(pool)
    .await
    .context("Failed to check blocks in either direction.")?;
    Ok(row.get::<bool, _>(0))
}

#[tracing::instrument(name = "Insert block", skip(transaction))]
pub async fn insert_block(
    transaction: &mut Transaction<'_, Postgres>,
    blocker_id: Uuid,
    blocked_id: Uuid,
) -> Result<(), InsertBlockError> {
    sqlx::query(
        r#"
        INSERT INTO blocks (id, blocker_id, blocked_id, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(blocker_id)
    .bind(blocked_id)
    .bind(Utc::now())
    .execute(transaction)
    .await
    .map_err(|e| {
        let constraint = e
            .as_database_error()
            .and_then(|db| db.constraint())
            .map(str::to_string);
        match constraint.as_deref() {
            Some("blocks_pair_key") => InsertBlockError::Duplicate,
            _ => InsertBlockError::UnexpectedError(
                anyhow::Error::from(e).context("Failed to insert a block relation."),
            ),
        }
    })?;
    Ok(())
}

#[tracing::instrument(name = "Delete block", skip(pool))]
pub async fn delete_block(
    pool: &PgPool,
    blocker_id: Uuid,
    blocked_id: Uuid,
) -> Result<u64, anyhow::Error> {
    let result = sqlx::query("DELETE FROM blocks WHERE blocker_id = $1 AND blocked_id = $2")
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(pool)
        .await
        .context("Failed to delete the block relation.")?;
    Ok(result.rows_affected())
}

#[tracing::instrument(name = "List blocked members", skip(pool))]
pub async fn blocked_list(
    pool: &PgPool,
    blocker_id: Uuid,
) -> Result<Vec<MemberSummary>, anyhow::Error> {
    sqlx::query_as::<_, MemberSummary>(
        r#"
        SELECT m.id AS member_id, m.nickname
        FROM blocks b
        JOIN members m ON m.id = b.blocked_id
        WHERE b.blocker_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(blocker_id)
    .fetch_all(pool)
    .await
    .context("Failed to list blocked members.")
}
