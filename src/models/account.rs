//! Account model - identity records with transient credential state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::profile::ProfileKind;

/// Account entity.
///
/// Carries the durable identity fields plus the transient hashed-secret
/// state (OTP, email-verification token, reset token). Raw secrets are
/// never stored; only one-way hashes land here.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub account_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role_id: Uuid,
    pub is_active: bool,
    pub is_email_verified: bool,
    /// Manual-approval flag for roles that are not self-service.
    pub is_verified: bool,
    pub last_login_ip: Option<String>,
    pub otp_hash: Option<String>,
    pub otp_expires_utc: Option<DateTime<Utc>>,
    pub email_verification_hash: Option<String>,
    pub reset_token_hash: Option<String>,
    pub reset_expires_utc: Option<DateTime<Utc>>,
    /// Owning agency account, set for agents only.
    pub agency_id: Option<Uuid>,
    /// Discriminator naming which profile kind `profile_id` refers to.
    pub profile_kind_code: String,
    pub profile_id: Uuid,
    pub monthly_listing_limit: i32,
    pub monthly_listing_count: i32,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Account {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        email: String,
        password_hash: String,
        display_name: String,
        role_id: Uuid,
        profile_kind: ProfileKind,
        profile_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            account_id: Uuid::new_v4(),
            email,
            password_hash,
            display_name,
            role_id,
            is_active: true,
            is_email_verified: false,
            is_verified: false,
            last_login_ip: None,
            otp_hash: None,
            otp_expires_utc: None,
            email_verification_hash: None,
            reset_token_hash: None,
            reset_expires_utc: None,
            agency_id: None,
            profile_kind_code: profile_kind.as_str().to_string(),
            profile_id,
            monthly_listing_limit: 5,
            monthly_listing_count: 0,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn profile_kind(&self) -> Option<ProfileKind> {
        self.profile_kind_code.parse().ok()
    }

    /// Clear transient OTP state after use.
    pub fn clear_otp(&mut self) {
        self.otp_hash = None;
        self.otp_expires_utc = None;
    }

    /// Convert to a response shape with every secret-bearing field scrubbed.
    pub fn sanitized(&self) -> SanitizedAccount {
        SanitizedAccount {
            account_id: self.account_id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            role_id: self.role_id,
            is_active: self.is_active,
            is_email_verified: self.is_email_verified,
            is_verified: self.is_verified,
            agency_id: self.agency_id,
            profile_kind_code: self.profile_kind_code.clone(),
            profile_id: self.profile_id,
            monthly_listing_limit: self.monthly_listing_limit,
            monthly_listing_count: self.monthly_listing_count,
            created_utc: self.created_utc,
        }
    }
}

/// Account projection for API responses (no hashes, no transient secrets).
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAccount {
    pub account_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role_id: Uuid,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub is_verified: bool,
    pub agency_id: Option<Uuid>,
    pub profile_kind_code: String,
    pub profile_id: Uuid,
    pub monthly_listing_limit: i32,
    pub monthly_listing_count: i32,
    pub created_utc: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_starts_unverified() {
        let account = Account::new(
            "a@x.com".to_string(),
            "hash".to_string(),
            "A".to_string(),
            Uuid::new_v4(),
            ProfileKind::User,
            Uuid::new_v4(),
        );
        assert!(account.is_active);
        assert!(!account.is_email_verified);
        assert!(!account.is_verified);
        assert!(account.last_login_ip.is_none());
    }

    #[test]
    fn clear_otp_drops_both_fields() {
        let mut account = Account::new(
            "a@x.com".to_string(),
            "hash".to_string(),
            "A".to_string(),
            Uuid::new_v4(),
            ProfileKind::User,
            Uuid::new_v4(),
        );
        account.otp_hash = Some("abc".to_string());
        account.otp_expires_utc = Some(Utc::now());
        account.clear_otp();
        assert!(account.otp_hash.is_none());
        assert!(account.otp_expires_utc.is_none());
    }
}
