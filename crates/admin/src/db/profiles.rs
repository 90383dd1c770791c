//! Profile role lookup.

use async_trait::async_trait;
use rhema_core::{ProfileRole, UserId};
use sqlx::PgPool;

use super::RepositoryError;
use crate::services::RoleLookup;

#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleLookup for ProfileRepository {
    async fn role_of(&self, user_id: UserId) -> Result<Option<ProfileRole>, RepositoryError> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM profiles WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        role.map(|r| r.parse::<ProfileRole>())
            .transpose()
            .map_err(RepositoryError::DataCorruption)
    }
}
