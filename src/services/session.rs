//! Session engine: login, OTP step-up, token refresh and logout.

use chrono::{Duration, Utc};
use std::sync::{Arc, OnceLock};

use crate::config::{AuthConfig, OtpConfig, SessionConfig};
use crate::models::{Account, RefreshSession, SanitizedAccount};
use crate::services::email::Notifier;
use crate::services::error::ServiceError;
use crate::services::otp::generate_otp;
use crate::services::token::{AccessClaims, TokenSigner};
use crate::store::{CredentialStore, SessionStore};
use crate::utils::password::{verify_password, Password, PasswordHashString};
use crate::utils::token::{generate_random_token, sha256_hex};

/// Client context a login or refresh arrives with.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub ip: String,
    pub user_agent: String,
}

/// Issued token pair plus the sanitized account it belongs to.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub remember_me: bool,
    pub account: SanitizedAccount,
}

/// Result of a password login: either a full token pair or an OTP
/// challenge that must be answered first.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success(AuthTokens),
    OtpRequired { email: String, remember_me: bool },
}

pub struct SessionEngine {
    store: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    signer: TokenSigner,
    notifier: Arc<dyn Notifier>,
    session_config: SessionConfig,
    otp_config: OtpConfig,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            signer: TokenSigner::new(&config.jwt),
            notifier,
            session_config: config.session.clone(),
            otp_config: config.otp.clone(),
        }
    }

    /// Password login.
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller; a dummy hash verification keeps the timing of the two
    /// paths comparable. A login from an IP other than the last
    /// recorded one is answered with an OTP challenge instead of tokens.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
        ctx: &ClientContext,
    ) -> Result<LoginOutcome, ServiceError> {
        let account = match self.store.find_account_by_email(email).await? {
            Some(account) => account,
            None => {
                let _ = verify_password(
                    &Password::new(password.to_string()),
                    &PasswordHashString::new(dummy_hash().to_string()),
                );
                return Err(ServiceError::InvalidCredentials);
            }
        };

        let stored_hash = PasswordHashString::new(account.password_hash.clone());
        if verify_password(&Password::new(password.to_string()), &stored_hash).is_err() {
            return Err(ServiceError::InvalidCredentials);
        }

        if !account.is_active {
            return Err(ServiceError::AccountDisabled);
        }
        if !account.is_email_verified {
            return Err(ServiceError::EmailNotVerified);
        }

        let role = self
            .store
            .find_role_by_id(account.role_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("role {} not found", account.role_id))?;

        if !role.is_self_service() && !account.is_verified {
            return Err(ServiceError::AccountNotApproved);
        }

        let known_ip = account.last_login_ip.as_deref() == Some(ctx.ip.as_str());
        if !known_ip {
            let mut account = account;
            let code = generate_otp();
            account.otp_hash = Some(sha256_hex(&code));
            account.otp_expires_utc =
                Some(Utc::now() + Duration::minutes(self.otp_config.expiry_minutes));
            self.store.update_account(&account).await?;

            if let Err(e) = self
                .notifier
                .send_otp_email(&account.email, &code, self.otp_config.expiry_minutes)
                .await
            {
                tracing::error!(error = %e, account_id = %account.account_id, "Failed to send OTP email");
            }

            tracing::info!(account_id = %account.account_id, ip = %ctx.ip, "Login from new IP, OTP challenge issued");

            return Ok(LoginOutcome::OtpRequired {
                email: account.email,
                remember_me,
            });
        }

        let tokens = self
            .issue_tokens(account, &role.role_name, &role.permissions, remember_me, ctx)
            .await?;
        Ok(LoginOutcome::Success(tokens))
    }

    /// Answer an OTP challenge and complete the login.
    ///
    /// Missing account, wrong code and expired code all collapse into
    /// the same rejection.
    pub async fn verify_otp_and_login(
        &self,
        email: &str,
        code: &str,
        remember_me: bool,
        ctx: &ClientContext,
    ) -> Result<AuthTokens, ServiceError> {
        let account = self
            .store
            .find_account_by_email(email)
            .await?
            .ok_or(ServiceError::InvalidOtp)?;

        let stored_hash = account.otp_hash.as_deref().ok_or(ServiceError::InvalidOtp)?;
        if stored_hash != sha256_hex(code) {
            return Err(ServiceError::InvalidOtp);
        }

        match account.otp_expires_utc {
            Some(expires) if expires > Utc::now() => {}
            _ => return Err(ServiceError::InvalidOtp),
        }

        let role = self
            .store
            .find_role_by_id(account.role_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("role {} not found", account.role_id))?;

        self.issue_tokens(account, &role.role_name, &role.permissions, remember_me, ctx)
            .await
    }

    /// Rotate a refresh token for a fresh pair.
    ///
    /// A presentation whose (ip, user_agent) does not match the
    /// issuance binding is treated as theft: every session for the
    /// account is revoked and the owner is warned.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        ctx: &ClientContext,
    ) -> Result<AuthTokens, ServiceError> {
        let token_hash = sha256_hex(refresh_token);

        let session = self
            .sessions
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or(ServiceError::InvalidRefreshToken)?;

        if !session.is_active() {
            return Err(ServiceError::InvalidRefreshToken);
        }

        if !session.matches_context(&ctx.ip, &ctx.user_agent) {
            let revoked = self
                .sessions
                .invalidate_all_for_account(session.account_id)
                .await?;
            tracing::warn!(
                account_id = %session.account_id,
                ip = %ctx.ip,
                revoked,
                "Refresh context mismatch, all sessions revoked"
            );

            if let Some(account) = self.store.find_account_by_id(session.account_id).await? {
                if let Err(e) = self
                    .notifier
                    .send_warning_email(&account.email, &ctx.ip, &ctx.user_agent)
                    .await
                {
                    tracing::error!(error = %e, account_id = %account.account_id, "Failed to send warning email");
                }
            }

            return Err(ServiceError::TokenReuseDetected);
        }

        // Single-use rotation: losing this race means another
        // presentation of the same token already consumed it.
        if !self.sessions.invalidate_if_valid(&token_hash).await? {
            return Err(ServiceError::InvalidRefreshToken);
        }

        let account = self
            .store
            .find_account_by_id(session.account_id)
            .await?
            .ok_or(ServiceError::UserNotFoundForToken)?;

        let role = self
            .store
            .find_role_by_id(account.role_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("role {} not found", account.role_id))?;

        // Rotation replaces one session with another. Login bookkeeping
        // (IP recording, OTP state, cap eviction) stays untouched, so a
        // pending OTP challenge elsewhere survives this call.
        let tokens = self
            .mint_pair(
                &account,
                &role.role_name,
                &role.permissions,
                session.remember_me,
                ctx,
            )
            .await?;

        tracing::info!(account_id = %account.account_id, "Refresh token rotated");

        Ok(tokens)
    }

    /// Invalidate the presented refresh token. Idempotent: absent or
    /// already-invalid tokens succeed silently.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), ServiceError> {
        if let Some(token) = refresh_token {
            let token_hash = sha256_hex(token);
            let invalidated = self.sessions.invalidate_if_valid(&token_hash).await?;
            if invalidated {
                tracing::info!("Session invalidated on logout");
            }
        }
        Ok(())
    }

    /// Validate an access token and return its claims.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, ServiceError> {
        self.signer
            .verify(token)
            .map_err(|_| ServiceError::InvalidCredentials)
    }

    /// Shared tail of login and OTP verification, and used nowhere
    /// else: enforce the session cap, record the login IP, clear OTP
    /// state and mint the token pair.
    async fn issue_tokens(
        &self,
        mut account: Account,
        role_name: &str,
        permissions: &[String],
        remember_me: bool,
        ctx: &ClientContext,
    ) -> Result<AuthTokens, ServiceError> {
        let active = self
            .sessions
            .count_active_for_account(account.account_id)
            .await?;
        if active >= self.session_config.max_active_sessions {
            self.sessions
                .invalidate_oldest_for_account(account.account_id)
                .await?;
            tracing::info!(account_id = %account.account_id, "Session cap reached, oldest session evicted");
        }

        account.last_login_ip = Some(ctx.ip.clone());
        account.clear_otp();
        account.updated_utc = Utc::now();
        self.store.update_account(&account).await?;

        let tokens = self
            .mint_pair(&account, role_name, permissions, remember_me, ctx)
            .await?;

        tracing::info!(account_id = %account.account_id, remember_me, "Tokens issued");

        Ok(tokens)
    }

    /// Sign an access token and create the backing refresh session.
    async fn mint_pair(
        &self,
        account: &Account,
        role_name: &str,
        permissions: &[String],
        remember_me: bool,
        ctx: &ClientContext,
    ) -> Result<AuthTokens, ServiceError> {
        let access_token = self.signer.sign(account.account_id, role_name, permissions)?;

        let refresh_token = generate_random_token();
        let expiry_days = if remember_me {
            self.session_config.remember_me_expiry_days
        } else {
            self.session_config.refresh_expiry_days
        };
        let session = RefreshSession::new(
            account.account_id,
            sha256_hex(&refresh_token),
            ctx.ip.clone(),
            ctx.user_agent.clone(),
            remember_me,
            expiry_days,
        );
        self.sessions.insert(&session).await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            remember_me,
            account: account.sanitized(),
        })
    }
}

/// Argon2 hash of a throwaway password, computed once. Verified against
/// when the email does not resolve so both failure paths do comparable
/// work.
fn dummy_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| {
        crate::utils::password::hash_password(&Password::new(
            "dummy-password-for-timing".to_string(),
        ))
        .map(|h| h.into_string())
        .unwrap_or_default()
    })
}
