//! Postgres-backed identity directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::auth::HashRecord;
use crate::models::Identity;
use crate::repositories::{Directory, StoreError};

#[derive(Debug, FromRow)]
struct IdentityRow {
    id: Uuid,
    identifier: String,
    credential: String,
    display_name: Option<String>,
    email: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity {
            id: row.id,
            identifier: row.identifier,
            credential: HashRecord::from_stored(row.credential),
            display_name: row.display_name,
            email: row.email,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgDirectory {
    pool: DbPool,
}

impl PgDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn find_by_id(&self, identifier: &str) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            "SELECT id, identifier, credential, display_name, email, created_at FROM identities WHERE identifier = $1",
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Identity::from))
    }

    async fn insert_if_absent(&self, identity: Identity) -> Result<bool, StoreError> {
        let r = sqlx::query(
            r#"
            INSERT INTO identities (id, identifier, credential, display_name, email, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (identifier) DO NOTHING
            "#,
        )
        .bind(identity.id)
        .bind(&identity.identifier)
        .bind(identity.credential.as_str())
        .bind(&identity.display_name)
        .bind(&identity.email)
        .bind(identity.created_at)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected() == 1)
    }
}
