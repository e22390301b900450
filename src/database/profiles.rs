use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::models::{NewProfile, Profile, Role};
use super::DatabaseError;

/// Query surface over the `profiles` table: at most one row per identity id.
///
/// The trait seam keeps the verification and reconciliation procedures
/// testable without a live database.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, DatabaseError>;
    async fn insert(&self, profile: NewProfile) -> Result<Profile, DatabaseError>;
    async fn update_role(&self, id: Uuid, role: Role) -> Result<Profile, DatabaseError>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROFILE_COLUMNS: &str = "id, email, full_name, role, created_at, updated_at";

fn profile_from_row(row: &PgRow) -> Result<Profile, DatabaseError> {
    let role_raw: String = row.try_get("role")?;
    let role = Role::parse(&role_raw)
        .ok_or_else(|| DatabaseError::Corrupt(format!("unknown role '{}'", role_raw)))?;

    Ok(Profile {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Profile>, DatabaseError> {
        let query = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Profile>, DatabaseError> {
        let query = format!("SELECT {} FROM profiles WHERE email = $1", PROFILE_COLUMNS);

        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn insert(&self, profile: NewProfile) -> Result<Profile, DatabaseError> {
        let query = format!(
            "INSERT INTO profiles (id, email, full_name, role) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {}",
            PROFILE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(profile.id)
            .bind(&profile.email)
            .bind(&profile.full_name)
            .bind(profile.role.as_str())
            .fetch_one(&self.pool)
            .await?;

        profile_from_row(&row)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Profile, DatabaseError> {
        let query = format!(
            "UPDATE profiles SET role = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING {}",
            PROFILE_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;

        profile_from_row(&row)
    }
}
