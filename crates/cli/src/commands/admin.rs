//! Back-office role management.
//!
//! Profiles are created by the backend when a user signs up; these commands
//! only change the `role` column. The back office reads the role on every
//! request, so changes apply without restarting anything.

use rhema_core::ProfileRole;
use sqlx::Row;
use thiserror::Error;
use uuid::Uuid;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid role: {0}. Valid roles: admin, secretary")]
    InvalidRole(String),

    #[error("No profile with email: {0}")]
    ProfileNotFound(String),
}

fn staff_role(role: &str) -> Result<ProfileRole, AdminError> {
    role.parse::<ProfileRole>()
        .ok()
        .filter(ProfileRole::is_staff)
        .ok_or_else(|| AdminError::InvalidRole(role.to_owned()))
}

async fn set_role(email: &str, role: ProfileRole) -> Result<Uuid, AdminError> {
    let pool = connect().await?;

    let id: Option<Uuid> = sqlx::query_scalar(
        r#"
        UPDATE profiles
        SET role = $2, updated_at = NOW()
        WHERE lower(email) = lower($1)
        RETURNING id
        "#,
    )
    .bind(email.trim())
    .bind(role.to_string())
    .fetch_optional(&pool)
    .await?;

    id.ok_or_else(|| AdminError::ProfileNotFound(email.to_owned()))
}

/// Give an existing profile a staff role.
pub async fn grant(email: &str, role: &str) -> Result<(), AdminError> {
    let role = staff_role(role)?;
    let id = set_role(email, role).await?;
    tracing::info!("Granted {} to {} (profile {})", role, email, id);
    Ok(())
}

/// Demote a profile to `customer`.
pub async fn revoke(email: &str) -> Result<(), AdminError> {
    let id = set_role(email, ProfileRole::Customer).await?;
    tracing::info!("Revoked back-office access from {} (profile {})", email, id);
    Ok(())
}

/// Print every staff profile.
pub async fn list() -> Result<(), AdminError> {
    let pool = connect().await?;

    let rows = sqlx::query(
        r#"
        SELECT email, role
        FROM profiles
        WHERE role IN ('admin', 'secretary')
        ORDER BY role, email
        "#,
    )
    .fetch_all(&pool)
    .await?;

    if rows.is_empty() {
        tracing::info!("No staff profiles");
    }
    for row in rows {
        let email: String = row.try_get("email")?;
        let role: String = row.try_get("role")?;
        tracing::info!("  {:<10} {}", role, email);
    }
    Ok(())
}
