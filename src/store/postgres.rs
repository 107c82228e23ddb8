//! PostgreSQL store implementations.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{Account, ProfileData, ProfileRecord, RefreshSession, Role};

use super::{CredentialStore, SessionStore, StoreError};

/// Create a PostgreSQL connection pool.
pub async fn connect_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.url)
        .await?;

    tracing::info!("Successfully connected to PostgreSQL");

    Ok(pool)
}

/// Run database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow::anyhow!(e))
}

#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ACCOUNT_COLUMNS: &str = "account_id, email, password_hash, display_name, role_id, \
     is_active, is_email_verified, is_verified, last_login_ip, otp_hash, otp_expires_utc, \
     email_verification_hash, reset_token_hash, reset_expires_utc, agency_id, \
     profile_kind_code, profile_id, monthly_listing_limit, monthly_listing_count, \
     created_utc, updated_utc";

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)
    }

    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn find_account_by_verification_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE email_verification_hash = $1 AND is_email_verified = false",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)
    }

    async fn find_account_by_reset_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE reset_token_hash = $1")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE accounts SET
                email = $2, password_hash = $3, display_name = $4, role_id = $5,
                is_active = $6, is_email_verified = $7, is_verified = $8,
                last_login_ip = $9, otp_hash = $10, otp_expires_utc = $11,
                email_verification_hash = $12, reset_token_hash = $13,
                reset_expires_utc = $14, agency_id = $15, profile_kind_code = $16,
                profile_id = $17, monthly_listing_limit = $18,
                monthly_listing_count = $19, updated_utc = NOW()
            WHERE account_id = $1
            "#,
        )
        .bind(account.account_id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.display_name)
        .bind(account.role_id)
        .bind(account.is_active)
        .bind(account.is_email_verified)
        .bind(account.is_verified)
        .bind(&account.last_login_ip)
        .bind(&account.otp_hash)
        .bind(account.otp_expires_utc)
        .bind(&account.email_verification_hash)
        .bind(&account.reset_token_hash)
        .bind(account.reset_expires_utc)
        .bind(account.agency_id)
        .bind(&account.profile_kind_code)
        .bind(account.profile_id)
        .bind(account.monthly_listing_limit)
        .bind(account.monthly_listing_count)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn create_account_with_profile(
        &self,
        account: &Account,
        profile: &ProfileRecord,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_value(&profile.data)
            .map_err(|e| StoreError::Backend(anyhow::anyhow!(e)))?;

        let mut tx = self.pool.begin().await.map_err(backend)?;

        let insert_result = sqlx::query(&format!(
            r#"
            INSERT INTO accounts ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20, $21)
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(account.account_id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.display_name)
        .bind(account.role_id)
        .bind(account.is_active)
        .bind(account.is_email_verified)
        .bind(account.is_verified)
        .bind(&account.last_login_ip)
        .bind(&account.otp_hash)
        .bind(account.otp_expires_utc)
        .bind(&account.email_verification_hash)
        .bind(&account.reset_token_hash)
        .bind(account.reset_expires_utc)
        .bind(account.agency_id)
        .bind(&account.profile_kind_code)
        .bind(account.profile_id)
        .bind(account.monthly_listing_limit)
        .bind(account.monthly_listing_count)
        .bind(account.created_utc)
        .bind(account.updated_utc)
        .execute(&mut *tx)
        .await;

        if let Err(e) = insert_result {
            // Rollback happens on drop; map the unique-email race distinctly.
            if e.as_database_error()
                .map_or(false, |d| d.is_unique_violation())
            {
                return Err(StoreError::DuplicateEmail);
            }
            return Err(backend(e));
        }

        sqlx::query(
            r#"
            INSERT INTO profiles (profile_id, account_id, kind_code, payload, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(profile.profile_id)
        .bind(profile.account_id)
        .bind(&profile.kind_code)
        .bind(payload)
        .bind(profile.created_utc)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn find_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<ProfileRecord>, StoreError> {
        let row: Option<(Uuid, Uuid, String, serde_json::Value, DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT profile_id, account_id, kind_code, payload, created_utc FROM profiles WHERE profile_id = $1",
            )
            .bind(profile_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.map(|(profile_id, account_id, kind_code, payload, created_utc)| {
            let data: ProfileData = serde_json::from_value(payload)
                .map_err(|e| StoreError::Backend(anyhow::anyhow!(e)))?;
            Ok(ProfileRecord {
                profile_id,
                account_id,
                kind_code,
                data,
                created_utc,
            })
        })
        .transpose()
    }

    async fn find_role_by_name(&self, role_name: &str) -> Result<Option<Role>, StoreError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE role_name = $1")
            .bind(role_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>, StoreError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE role_id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO roles (role_id, role_name, permissions, description)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (role_name) DO NOTHING
            "#,
        )
        .bind(role.role_id)
        .bind(&role.role_name)
        .bind(&role.permissions)
        .bind(&role.description)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: &RefreshSession) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_sessions
                (session_id, account_id, token_hash, ip, user_agent, expires_utc, is_valid, remember_me, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.session_id)
        .bind(session.account_id)
        .bind(&session.token_hash)
        .bind(&session.ip)
        .bind(&session.user_agent)
        .bind(session.expires_utc)
        .bind(session.is_valid)
        .bind(session.remember_me)
        .bind(session.created_utc)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSession>, StoreError> {
        sqlx::query_as::<_, RefreshSession>(
            "SELECT * FROM refresh_sessions WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)
    }

    async fn invalidate_if_valid(&self, token_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET is_valid = false WHERE token_hash = $1 AND is_valid = true",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected() == 1)
    }

    async fn invalidate_all_for_account(&self, account_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_sessions SET is_valid = false WHERE account_id = $1 AND is_valid = true",
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }

    async fn count_active_for_account(&self, account_id: Uuid) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM refresh_sessions WHERE account_id = $1 AND is_valid = true",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(row.0)
    }

    async fn invalidate_oldest_for_account(&self, account_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE refresh_sessions SET is_valid = false
            WHERE session_id = (
                SELECT session_id FROM refresh_sessions
                WHERE account_id = $1 AND is_valid = true
                ORDER BY created_utc, token_hash
                LIMIT 1
            )
            "#,
        )
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}
