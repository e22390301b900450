use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::DatabaseError;
use crate::auth::Identity;

/// Read-only view over the identity provider's `auth.users` table.
///
/// Identities are owned by the provider; this surface exists so the
/// diagnostic CLI can resolve configured admin emails to user ids without
/// going through a session.
#[async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, DatabaseError>;
}

pub struct PgIdentityDirectory {
    pool: PgPool,
}

impl PgIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityDirectory for PgIdentityDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, DatabaseError> {
        let row = sqlx::query("SELECT id, email FROM auth.users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        // email is nullable in auth.users; fall back to the queried address
        let stored: Option<String> = row.try_get("email")?;
        Ok(Some(Identity {
            id: row.try_get("id")?,
            email: stored.unwrap_or_else(|| email.to_string()),
        }))
    }
}
