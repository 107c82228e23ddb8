//! Refresh session model - one record per authenticated device session.

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Refresh session entity.
///
/// The opaque refresh token itself is never stored; the record is keyed by
/// its one-way hash. The (ip, user_agent) pair recorded at issuance is the
/// binding later presentations are checked against.
#[derive(Debug, Clone, FromRow)]
pub struct RefreshSession {
    pub session_id: Uuid,
    pub account_id: Uuid,
    pub token_hash: String,
    pub ip: String,
    pub user_agent: String,
    pub expires_utc: DateTime<Utc>,
    pub is_valid: bool,
    pub remember_me: bool,
    pub created_utc: DateTime<Utc>,
}

impl RefreshSession {
    pub fn new(
        account_id: Uuid,
        token_hash: String,
        ip: String,
        user_agent: String,
        remember_me: bool,
        expiry_days: i64,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            account_id,
            token_hash,
            ip,
            user_agent,
            expires_utc: Utc::now() + Duration::days(expiry_days),
            is_valid: true,
            remember_me,
            created_utc: Utc::now(),
        }
    }

    /// Check if the session can still back a refresh (valid flag set and
    /// not past expiry).
    pub fn is_active(&self) -> bool {
        self.is_valid && self.expires_utc > Utc::now()
    }

    /// Check whether a presentation context matches the issuance binding.
    pub fn matches_context(&self, ip: &str, user_agent: &str) -> bool {
        self.ip == ip && self.user_agent == user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(expiry_days: i64) -> RefreshSession {
        RefreshSession::new(
            Uuid::new_v4(),
            "hash".to_string(),
            "1.2.3.4".to_string(),
            "agent".to_string(),
            false,
            expiry_days,
        )
    }

    #[test]
    fn fresh_session_is_active() {
        assert!(session(7).is_active());
    }

    #[test]
    fn expired_session_is_not_active() {
        assert!(!session(-1).is_active());
    }

    #[test]
    fn invalidated_session_is_not_active() {
        let mut s = session(7);
        s.is_valid = false;
        assert!(!s.is_active());
    }

    #[test]
    fn context_match_requires_both_fields() {
        let s = session(7);
        assert!(s.matches_context("1.2.3.4", "agent"));
        assert!(!s.matches_context("5.6.7.8", "agent"));
        assert!(!s.matches_context("1.2.3.4", "other"));
    }
}
