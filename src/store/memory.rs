//! In-memory store implementations.
//!
//! Back the test suites and local development. Each method takes its lock
//! for the duration of one operation only, so the conditional-update and
//! transactional guarantees of the traits hold here the same way they do
//! for the Postgres implementations.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Account, ProfileRecord, RefreshSession, Role};

use super::{CredentialStore, SessionStore, StoreError};

#[derive(Default)]
pub struct MemoryCredentialStore {
    // Accounts and profiles share one lock so the two-record create is a
    // single critical section.
    records: RwLock<Records>,
    roles: RwLock<HashMap<Uuid, Role>>,
}

#[derive(Default)]
struct Records {
    accounts: HashMap<Uuid, Account>,
    profiles: HashMap<Uuid, ProfileRecord>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(anyhow::anyhow!("lock poisoned: {}", e))
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .accounts
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_account_by_id(&self, account_id: Uuid) -> Result<Option<Account>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.accounts.get(&account_id).cloned())
    }

    async fn find_account_by_verification_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .accounts
            .values()
            .find(|a| {
                !a.is_email_verified && a.email_verification_hash.as_deref() == Some(token_hash)
            })
            .cloned())
    }

    async fn find_account_by_reset_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Account>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .accounts
            .values()
            .find(|a| a.reset_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn update_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .accounts
            .insert(account.account_id, account.clone());
        Ok(())
    }

    async fn create_account_with_profile(
        &self,
        account: &Account,
        profile: &ProfileRecord,
    ) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if records
            .accounts
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(StoreError::DuplicateEmail);
        }
        records
            .accounts
            .insert(account.account_id, account.clone());
        records
            .profiles
            .insert(profile.profile_id, profile.clone());
        Ok(())
    }

    async fn find_profile_by_id(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<ProfileRecord>, StoreError> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.profiles.get(&profile_id).cloned())
    }

    async fn find_role_by_name(&self, role_name: &str) -> Result<Option<Role>, StoreError> {
        let roles = self.roles.read().map_err(poisoned)?;
        Ok(roles.values().find(|r| r.role_name == role_name).cloned())
    }

    async fn find_role_by_id(&self, role_id: Uuid) -> Result<Option<Role>, StoreError> {
        let roles = self.roles.read().map_err(poisoned)?;
        Ok(roles.get(&role_id).cloned())
    }

    async fn insert_role(&self, role: &Role) -> Result<(), StoreError> {
        let mut roles = self.roles.write().map_err(poisoned)?;
        roles.insert(role.role_id, role.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    // Keyed by token hash.
    sessions: RwLock<HashMap<String, RefreshSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &RefreshSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.token_hash.clone(), session.clone());
        Ok(())
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshSession>, StoreError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(token_hash).cloned())
    }

    async fn invalidate_if_valid(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        match sessions.get_mut(token_hash) {
            Some(session) if session.is_valid => {
                session.is_valid = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn invalidate_all_for_account(&self, account_id: Uuid) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let mut revoked = 0;
        for session in sessions.values_mut() {
            if session.account_id == account_id && session.is_valid {
                session.is_valid = false;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn count_active_for_account(&self, account_id: Uuid) -> Result<i64, StoreError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions
            .values()
            .filter(|s| s.account_id == account_id && s.is_valid)
            .count() as i64)
    }

    async fn invalidate_oldest_for_account(&self, account_id: Uuid) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let oldest_hash = sessions
            .values()
            .filter(|s| s.account_id == account_id && s.is_valid)
            .min_by(|a, b| {
                a.created_utc
                    .cmp(&b.created_utc)
                    .then_with(|| a.token_hash.cmp(&b.token_hash))
            })
            .map(|s| s.token_hash.clone());
        if let Some(hash) = oldest_hash {
            if let Some(session) = sessions.get_mut(&hash) {
                session.is_valid = false;
            }
        }
        Ok(())
    }
}
