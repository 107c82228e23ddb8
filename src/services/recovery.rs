//! Password recovery: forgot-password and reset.

use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::services::email::Notifier;
use crate::services::error::ServiceError;
use crate::store::{CredentialStore, SessionStore};
use crate::utils::password::{hash_password, Password};
use crate::utils::token::{generate_random_token, sha256_hex};

/// Reset tokens are valid for one hour.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub struct RecoveryEngine {
    store: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    frontend_base_url: String,
}

impl RecoveryEngine {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        frontend_base_url: String,
    ) -> Self {
        Self {
            store,
            sessions,
            notifier,
            frontend_base_url,
        }
    }

    /// Start a password reset. Succeeds whether or not the email is
    /// known, so the endpoint cannot be used to probe for accounts.
    pub async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let mut account = match self.store.find_account_by_email(email).await? {
            Some(account) => account,
            None => {
                tracing::info!("Password reset requested for unknown email");
                return Ok(());
            }
        };

        let reset_token = generate_random_token();
        account.reset_token_hash = Some(sha256_hex(&reset_token));
        account.reset_expires_utc = Some(Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES));
        account.updated_utc = Utc::now();
        self.store.update_account(&account).await?;

        let reset_url = format!("{}/reset-password/{}", self.frontend_base_url, reset_token);
        if let Err(e) = self
            .notifier
            .send_password_reset_email(&account.email, &reset_url)
            .await
        {
            tracing::error!(error = %e, account_id = %account.account_id, "Failed to send password reset email");
        }

        tracing::info!(account_id = %account.account_id, "Password reset token issued");
        Ok(())
    }

    /// Complete a password reset. Unknown, consumed and expired tokens
    /// are rejected identically. All refresh sessions are revoked so
    /// stolen sessions do not outlive the reset.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let token_hash = sha256_hex(token);

        let mut account = self
            .store
            .find_account_by_reset_hash(&token_hash)
            .await?
            .ok_or(ServiceError::InvalidOrExpiredToken)?;

        match account.reset_expires_utc {
            Some(expires) if expires > Utc::now() => {}
            _ => return Err(ServiceError::InvalidOrExpiredToken),
        }

        let password_hash = hash_password(&Password::new(new_password.to_string()))?;
        account.password_hash = password_hash.into_string();
        account.reset_token_hash = None;
        account.reset_expires_utc = None;
        account.updated_utc = Utc::now();
        self.store.update_account(&account).await?;

        let revoked = self
            .sessions
            .invalidate_all_for_account(account.account_id)
            .await?;

        tracing::info!(account_id = %account.account_id, revoked, "Password reset completed");
        Ok(())
    }
}
