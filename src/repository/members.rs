use std::str::FromStr;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use secrecy::{ExposeSecret, Secret};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::domain::{Activation, Gender, Member, NewMember, Role, Visibility};

const MEMBER_COLUMNS: &str =
    "id, name, nickname, email, password_hash, birth, gender, role, activation, visibility";

#[derive(sqlx::FromRow)]
struct MemberRow {
    id: Uuid,
    name: String,
    nickname: String,
    email: String,
    password_hash: String,
    birth: NaiveDate,
    gender: String,
    role: String,
    activation: String,
    visibility: String,
}

impl TryFrom<MemberRow> for Member {
    type Error = anyhow::Error;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(Member {
            id: row.id,
            name: row.name,
            nickname: row.nickname,
            email: row.email,
            password_hash: Secret::new(row.password_hash),
            birth: row.birth,
            gender: Gender::from_str(&row.gender).map_err(anyhow::Error::msg)?,
            role: Role::from_str(&row.role).map_err(anyhow::Error::msg)?,
            activation: Activation::from_str(&row.activation).map_err(anyhow::Error::msg)?,
            visibility: Visibility::from_str(&row.visibility).map_err(anyhow::Error::msg)?,
        })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InsertMemberError {
    #[error("the email is already registered.")]
    DuplicateEmail,
    #[error("the nickname is already taken.")]
    DuplicateNickname,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

#[tracing::instrument(name = "Fetch member by id", skip(pool))]
pub async fn find_member_by_id(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<Option<Member>, anyhow::Error> {
    let row = sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {} FROM members WHERE id = $1",
        MEMBER_COLUMNS
    ))
    .bind(member_id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch a member by id.")?;
    row.map(Member::try_from).transpose()
}

#[tracing::instrument(name = "Fetch active member by id", skip(pool))]
pub async fn find_active_member_by_id(
    pool: &PgPool,
    member_id: Uuid,
) -> Result<Option<Member>, anyhow::Error> {
    let row = sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {} FROM members WHERE id = $1 AND activation = 'ACTIVE'",
        MEMBER_COLUMNS
    ))
    .bind(member_id)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch an active member by id.")?;
    row.map(Member::try_from).transpose()
}

#[tracing::instrument(name = "Fetch member by email", skip(pool, email))]
pub async fn find_member_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Member>, anyhow::Error> {
    let row = sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {} FROM members WHERE email = $1",
        MEMBER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch a member by email.")?;
    row.map(Member::try_from).transpose()
}

#[tracing::instrument(name = "Fetch active member by email", skip(pool, email))]
pub async fn find_active_member_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<Member>, anyhow::Error> {
    let row = sqlx::query_as::<_, MemberRow>(&format!(
        "SELECT {} FROM members WHERE email = $1 AND activation = 'ACTIVE'",
        MEMBER_COLUMNS
    ))
    .bind(email)
    .fetch_optional(pool)
    .await
    .context("Failed to fetch an active member by email.")?;
    row.map(Member::try_from).transpose()
}

#[tracing::instrument(name = "Check email uniqueness", skip(pool, email))]
pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, anyhow::Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM members WHERE email = $1)")
        .bind(email)
        .fetch_one(pool)
        .await
        .context("Failed to check whether the email exists.")?;
    Ok(row.get::<bool, _>(0))
}

#[tracing::instrument(name = "Check nickname uniqueness", skip(pool, nickname))]
pub async fn nickname_exists(pool: &PgPool, nickname: &str) -> Result<bool, anyhow::Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM members WHERE nickname = $1)")
        .bind(nickname)
        .fetch_one(pool)
        .await
        .context("Failed to check whether the nickname exists.")?;
    Ok(row.get::<bool, _>(0))
}

/// Inserts a new member in `GUEST` role. Unique-constraint races with the
/// pre-insert duplicate checks surface as the matching duplicate error.
#[tracing::instrument(name = "Insert new member", skip(transaction, new_member, password_hash))]
pub async fn insert_member(
    transaction: &mut Transaction<'_, Postgres>,
    new_member: &NewMember,
    password_hash: Secret<String>,
) -> Result<Uuid, InsertMemberError> {
    let member_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO members
            (id, name, password_hash, nickname, email, birth, gender, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(member_id)
    .bind(new_member.name.as_ref())
    .bind(password_hash.expose_secret())
    .bind(new_member.nickname.as_ref())
    .bind(new_member.email.as_ref())
    .bind(new_member.birth)
    .bind(new_member.gender.as_str())
    .bind(Utc::now())
    .execute(transaction)
    .await
    .map_err(|e| {
        let constraint = e
            .as_database_error()
            .and_then(|db| db.constraint())
            .map(str::to_string);
        match constraint.as_deref() {
            Some("members_email_key") => InsertMemberError::DuplicateEmail,
            Some("members_nickname_key") => InsertMemberError::DuplicateNickname,
            _ => InsertMemberError::UnexpectedError(
                anyhow::Error::from(e).context("Failed to insert a new member."),
            ),
        }
    })?;
    Ok(member_id)
}

#[tracing::instrument(name = "Update nickname", skip(pool, nickname))]
pub async fn update_nickname(
    pool: &PgPool,
    member_id: Uuid,
    nickname: &str,
) -> Result<(), anyhow::Error> {
    sqlx::query("UPDATE members SET nickname = $1 WHERE id = $2")
        .bind(nickname)
        .bind(member_id)
        .execute(pool)
        .await
        .context("Failed to update the nickname.")?;
    Ok(())
}

#[tracing::instrument(name = "Update password hash", skip(pool, password_hash))]
pub async fn update_password_hash(
    pool: &PgPool,
    member_id: Uuid,
    password_hash: Secret<String>,
) -> Result<(), anyhow::Error> {
    sqlx::query("UPDATE members SET password_hash = $1 WHERE id = $2")
        .bind(password_hash.expose_secret())
        .bind(member_id)
        .execute(pool)
        .await
        .context("Failed to update the password hash.")?;
    Ok(())
}

#[tracing::instrument(name = "Update visibility", skip(pool))]
pub async fn update_visibility(
    pool: &PgPool,
    member_id: Uuid,
    visibility: Visibility,
) -> Result<(), anyhow::Error> {
    sqlx::query("UPDATE members SET visibility = $1 WHERE id = $2")
        .bind(visibility.as_str())
        .bind(member_id)
        .execute(pool)
        .await
        .context("Failed to update the visibility.")?;
    Ok(())
}

#[tracing::instrument(name = "Update role", skip(pool))]
pub async fn update_role(pool: &PgPool, member_id: Uuid, role: Role) -> Result<(), anyhow::Error> {
    sqlx::query("UPDATE members SET role = $1 WHERE id = $2")
        .bind(role.as_str())
        .bind(member_id)
        .execute(pool)
        .await
        .context("Failed to update the role.")?;
    Ok(())
}

/// Soft delete: the account stops being visible and is purged for good once
/// the grace period has elapsed.
#[tracing::instrument(name = "Mark member for deletion", skip(pool))]
pub async fn mark_waiting_deleted(pool: &PgPool, member_id: Uuid) -> Result<(), anyhow::Error> {
    sqlx::query(
        "UPDATE members SET activation = 'WAITING_DELETED', deleted_at = $1 WHERE id = $2",
    )
    .bind(Utc::now())
    .bind(member_id)
    .execute(pool)
    .await
    .context("Failed to mark the member for deletion.")?;
    Ok(())
}

#[tracing::instrument(name = "Reactivate member", skip(pool))]
pub async fn reactivate(pool: &PgPool, member_id: Uuid) -> Result<(), anyhow::Error> {
    sqlx::query("UPDATE members SET activation = 'ACTIVE', deleted_at = NULL WHERE id = $1")
        .bind(member_id)
        .execute(pool)
        .await
        .context("Failed to reactivate the member.")?;
    Ok(())
}

/// Permanently removes accounts whose deletion grace period has elapsed.
/// Dependent rows go with them via `ON DELETE CASCADE`.
#[tracing::instrument(name = "Purge expired members", skip(pool))]
pub async fn purge_expired_members(
    pool: &PgPool,
    grace_period_days: i64,
) -> Result<u64, anyhow::Error> {
    let cutoff = Utc::now() - chrono::Duration::days(grace_period_days);
    let result = sqlx::query(
        "DELETE FROM members WHERE activation = 'WAITING_DELETED' AND deleted_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await
    .context("Failed to purge expired members.")?;
    Ok(result.rows_affected())
}
