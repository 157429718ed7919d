//! Postgres user directory

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use innotaxi_shared::{AccountId, UserStatus};
use sqlx::PgPool;

use super::{
    NewUser, RepositoryError, RepositoryResult, UpdateProfile, UserCredentials, UserDirectory,
    UserRecord, DEFAULT_RATING,
};
use crate::auth::Credential;

/// User row as stored
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    phone_number: String,
    email: String,
    rating: f64,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserRecord {
            id: account_id(row.id)?,
            name: row.name,
            phone_number: row.phone_number,
            email: row.email,
            rating: row.rating,
            status: row.status.parse::<UserStatus>().map_err(|e| anyhow!(e))?,
            created_at: row.created_at,
        })
    }
}

fn account_id(id: i64) -> RepositoryResult<AccountId> {
    AccountId::try_from(id).map_err(|_| RepositoryError::Backend(anyhow!("negative user id {}", id)))
}

/// Ids above `i64::MAX` cannot exist in the table
fn row_id(id: AccountId) -> Option<i64> {
    i64::try_from(id).ok()
}

fn map_unique_violation(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::UserAlreadyExists,
        _ => RepositoryError::Database(err),
    }
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Whether a live user other than `except` uses this phone or email
    async fn contact_taken(
        &self,
        phone_number: Option<&str>,
        email: Option<&str>,
        except: Option<i64>,
    ) -> RepositoryResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE status <> 'deleted'
                  AND ($3::BIGINT IS NULL OR id <> $3)
                  AND (phone_number = $1 OR email = $2)
            )
            "#,
        )
        .bind(phone_number)
        .bind(email)
        .bind(except)
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn create_user(&self, user: NewUser) -> RepositoryResult<AccountId> {
        if self
            .contact_taken(Some(&user.phone_number), Some(&user.email), None)
            .await?
        {
            return Err(RepositoryError::UserAlreadyExists);
        }

        // The partial unique indexes catch a concurrent insert that passed the check
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO users (name, phone_number, email, password, rating, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&user.name)
        .bind(&user.phone_number)
        .bind(&user.email)
        .bind(user.credential.as_bytes())
        .bind(DEFAULT_RATING)
        .bind(UserStatus::Created.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        account_id(id)
    }

    async fn find_active_by_phone(&self, phone_number: &str) -> RepositoryResult<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, (i64, Vec<u8>)>(
            r#"
            SELECT id, password
            FROM users
            WHERE phone_number = $1 AND status <> 'deleted'
            "#,
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((id, password)) => Ok(Some(UserCredentials {
                id: account_id(id)?,
                credential: Credential::from_bytes(password),
            })),
            None => Ok(None),
        }
    }

    async fn find_profile(&self, id: AccountId) -> RepositoryResult<Option<UserRecord>> {
        let Some(id) = row_id(id) else {
            return Ok(None);
        };

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, phone_number, email, rating, status, created_at
            FROM users
            WHERE id = $1 AND status <> 'deleted'
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn update_profile(&self, id: AccountId, update: UpdateProfile) -> RepositoryResult<Option<UserRecord>> {
        let Some(id) = row_id(id) else {
            return Ok(None);
        };

        if (update.phone_number.is_some() || update.email.is_some())
            && self
                .contact_taken(update.phone_number.as_deref(), update.email.as_deref(), Some(id))
                .await?
        {
            return Err(RepositoryError::UserAlreadyExists);
        }

        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                phone_number = COALESCE($3, phone_number),
                email = COALESCE($4, email)
            WHERE id = $1 AND status <> 'deleted'
            RETURNING id, name, phone_number, email, rating, status, created_at
            "#,
        )
        .bind(id)
        .bind(update.name)
        .bind(update.phone_number)
        .bind(update.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        row.map(UserRecord::try_from).transpose()
    }

    async fn delete_user(&self, id: AccountId) -> RepositoryResult<bool> {
        let Some(id) = row_id(id) else {
            return Ok(false);
        };

        let result = sqlx::query(
            r#"
            UPDATE users SET status = $2
            WHERE id = $1 AND status <> 'deleted'
            "#,
        )
        .bind(id)
        .bind(UserStatus::Deleted.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> RepositoryResult<()> {
        crate::db::health_check(&self.pool).await.map_err(RepositoryError::Backend)
    }
}
