//! Store capabilities.
//!
//! The engines never talk to a database directly; they hold
//! `Arc<dyn CredentialStore>` / `Arc<dyn SessionStore>` seams. The Postgres
//! implementations back production, the in-memory implementations back
//! tests. All mutual exclusion is delegated to the store's own atomic
//! update primitives; the engines hold no locks across requests.

mod memory;
mod postgres;

pub use memory::{MemoryCredentialStore, MemorySessionStore};
pub use postgres::{connect_pool, run_migrations, PgCredentialStore, PgSessionStore};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Account, ProfileRecord, RefreshSession, Role};

#[derive(Error, Debug)]
pub enum StoreError {
    /// Unique-email violation on the transactional account create.
    #[error("email already exists")]
    DuplicateEmail,

    #[error("store backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Account, role and profile persistence.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-insensitive exact-match lookup by email.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Lookup by hashed email-verification token, restricted to accounts
    /// whose email is not yet verified. A consumed token therefore misses
    /// exactly like a bogus one.
    async fn find_account_by_verification_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Lookup by hashed password-reset token. Expiry is checked by the
    /// caller so that wrong and expired collapse into one error there.
    async fn find_account_by_reset_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, StoreError>;

    /// Persist the full account record (read-modify-write save).
    async fn update_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Create an account and its profile record atomically: both land or
    /// neither does.
    async fn create_account_with_profile(
        &self,
        account: &Account,
        profile: &ProfileRecord,
    ) -> Result<(), StoreError>;

    async fn find_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<ProfileRecord>, StoreError>;

    async fn find_role_by_name(&self, role_name: &str) -> Result<Option<Role>, StoreError>;

    async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>, StoreError>;

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError>;
}

/// Refresh session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &RefreshSession) -> Result<(), StoreError>;

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSession>, StoreError>;

    /// Atomically flip `is_valid` to false if it is still true. Returns
    /// whether this call performed the transition; a false return means
    /// another presentation won the race and the caller must treat the
    /// token as not found.
    async fn invalidate_if_valid(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Bulk revocation of every valid session for an account. Returns the
    /// number of sessions invalidated.
    async fn invalidate_all_for_account(&self, account_id: Uuid) -> Result<u64, StoreError>;

    async fn count_active_for_account(&self, account_id: Uuid) -> Result<i64, StoreError>;

    /// Invalidate the single oldest valid session for an account, by
    /// creation time with token hash as the deterministic tie-break.
    async fn invalidate_oldest_for_account(&self, account_id: Uuid) -> Result<(), StoreError>;
}

/// Insert the default role set into a fresh store, skipping roles that
/// already exist.
pub async fn seed_roles(store: &dyn CredentialStore) -> Result<(), StoreError> {
    for role in crate::models::role::default_roles() {
        if store.find_role_by_name(&role.role_name).await?.is_none() {
            store.insert_role(&role).await?;
            tracing::info!(role = %role.role_name, "Seeded role");
        }
    }
    Ok(())
}
