//! Account provisioning: registration and email verification.

use std::sync::Arc;

use crate::models::{Account, ProfileData, ProfileKind, ProfileRecord, RoleName, SanitizedAccount};
use crate::services::email::Notifier;
use crate::services::error::ServiceError;
use crate::store::{CredentialStore, StoreError};
use crate::utils::password::{hash_password, Password};
use crate::utils::token::{generate_random_token, sha256_hex};
use uuid::Uuid;

/// Registration input.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role_name: RoleName,
    /// Required when registering an agent.
    pub agency_id: Option<Uuid>,
    pub profile: Option<ProfileData>,
}

pub struct ProvisioningEngine {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    frontend_base_url: String,
}

impl ProvisioningEngine {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        frontend_base_url: String,
    ) -> Self {
        Self {
            store,
            notifier,
            frontend_base_url,
        }
    }

    /// Register a new account with its role-specific profile.
    ///
    /// The account and profile records are created in one transaction.
    /// A verification email is sent only after the commit, and a send
    /// failure never rolls the registration back.
    pub async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<SanitizedAccount, ServiceError> {
        let profile = request.profile.ok_or(ServiceError::ProfileDataRequired)?;

        // Checked before the role is even looked at, so a taken email is
        // reported as such regardless of what else is wrong.
        if self
            .store
            .find_account_by_email(&request.email)
            .await?
            .is_some()
        {
            return Err(ServiceError::EmailAlreadyExists);
        }

        let (expected_kind, monthly_listing_limit, auto_approved) = match request.role_name {
            RoleName::User => (ProfileKind::User, 5, true),
            RoleName::Agency => (ProfileKind::Agency, 30, false),
            RoleName::Agent => (ProfileKind::Agent, 15, false),
            _ => return Err(ServiceError::InvalidRoleForRegistration),
        };

        if profile.kind() != expected_kind {
            return Err(ServiceError::ProfileDataRequired);
        }

        let agency_id = if request.role_name == RoleName::Agent {
            let agency_id = request.agency_id.ok_or(ServiceError::AgencyIdRequired)?;
            let agency = self
                .store
                .find_account_by_id(agency_id)
                .await?
                .ok_or(ServiceError::InvalidAgency)?;
            let agency_role = self
                .store
                .find_role_by_id(agency.role_id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("role {} not found", agency.role_id))?;
            if agency_role.name() != Some(RoleName::Agency) {
                return Err(ServiceError::InvalidAgency);
            }
            Some(agency_id)
        } else {
            None
        };

        let role = self
            .store
            .find_role_by_name(request.role_name.as_str())
            .await?
            .ok_or_else(|| anyhow::anyhow!("role {} not seeded", request.role_name.as_str()))?;

        let password_hash = hash_password(&Password::new(request.password))?;

        let verification_token = generate_random_token();

        let profile_id = Uuid::new_v4();
        let mut account = Account::new(
            request.email,
            password_hash.into_string(),
            request.display_name,
            role.role_id,
            expected_kind,
            profile_id,
        );
        account.agency_id = agency_id;
        account.monthly_listing_limit = monthly_listing_limit;
        account.is_verified = auto_approved;
        account.email_verification_hash = Some(sha256_hex(&verification_token));

        let profile_record = ProfileRecord::new(profile_id, account.account_id, profile);

        self.store
            .create_account_with_profile(&account, &profile_record)
            .await
            .map_err(|e| match e {
                StoreError::DuplicateEmail => ServiceError::EmailAlreadyExists,
                other => ServiceError::Store(other),
            })?;

        tracing::info!(
            account_id = %account.account_id,
            role = %role.role_name,
            "Account registered"
        );

        let verification_url = format!(
            "{}/verify-email/{}",
            self.frontend_base_url, verification_token
        );
        if let Err(e) = self
            .notifier
            .send_verification_email(&account.email, &verification_url)
            .await
        {
            tracing::error!(error = %e, account_id = %account.account_id, "Failed to send verification email");
        }

        Ok(account.sanitized())
    }

    /// Consume an email-verification token. A consumed or unknown token
    /// is rejected identically.
    pub async fn verify_email(&self, token: &str) -> Result<SanitizedAccount, ServiceError> {
        let token_hash = sha256_hex(token);

        let mut account = self
            .store
            .find_account_by_verification_hash(&token_hash)
            .await?
            .ok_or(ServiceError::InvalidVerificationToken)?;

        account.is_email_verified = true;
        account.email_verification_hash = None;
        account.updated_utc = chrono::Utc::now();
        self.store.update_account(&account).await?;

        tracing::info!(account_id = %account.account_id, "Email verified");

        Ok(account.sanitized())
    }
}
