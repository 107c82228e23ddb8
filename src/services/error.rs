use thiserror::Error;

use crate::store::StoreError;

/// Internal service error. Variants stay strongly typed for logging; the
/// boundary mapping below is what callers are allowed to see.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account disabled")]
    AccountDisabled,

    #[error("email not verified")]
    EmailNotVerified,

    #[error("account not approved")]
    AccountNotApproved,

    #[error("invalid otp")]
    InvalidOtp,

    #[error("invalid refresh token")]
    InvalidRefreshToken,

    #[error("token reuse detected")]
    TokenReuseDetected,

    /// A live refresh session pointed at a missing account. Never surfaced
    /// in detail; maps to the generic internal kind.
    #[error("no account found for refresh token")]
    UserNotFoundForToken,

    #[error("profile data required")]
    ProfileDataRequired,

    #[error("email already exists")]
    EmailAlreadyExists,

    #[error("agency id required")]
    AgencyIdRequired,

    #[error("invalid agency")]
    InvalidAgency,

    #[error("invalid role for registration")]
    InvalidRoleForRegistration,

    #[error("invalid verification token")]
    InvalidVerificationToken,

    #[error("invalid or expired reset token")]
    InvalidOrExpiredToken,
}

/// Caller-visible error classes. Callers distinguish these, never the
/// internal variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credentials or tokens rejected outright.
    Authentication,
    /// Identity accepted, access denied by account state.
    Authorization,
    /// Well-formed request violating a business rule.
    BusinessRule,
    /// Everything else; logged with detail, surfaced opaquely.
    Internal,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::InvalidCredentials | ServiceError::InvalidRefreshToken => {
                ErrorKind::Authentication
            }
            ServiceError::AccountDisabled
            | ServiceError::EmailNotVerified
            | ServiceError::AccountNotApproved
            | ServiceError::TokenReuseDetected => ErrorKind::Authorization,
            ServiceError::InvalidOtp
            | ServiceError::ProfileDataRequired
            | ServiceError::EmailAlreadyExists
            | ServiceError::AgencyIdRequired
            | ServiceError::InvalidAgency
            | ServiceError::InvalidRoleForRegistration
            | ServiceError::InvalidVerificationToken
            | ServiceError::InvalidOrExpiredToken => ErrorKind::BusinessRule,
            ServiceError::Store(_)
            | ServiceError::Internal(_)
            | ServiceError::UserNotFoundForToken => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code. Internal causes deliberately collapse
    /// into one opaque code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidCredentials => "INVALID_CREDENTIALS",
            ServiceError::AccountDisabled => "ACCOUNT_DISABLED",
            ServiceError::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            ServiceError::AccountNotApproved => "ACCOUNT_NOT_APPROVED",
            ServiceError::InvalidOtp => "INVALID_OTP",
            ServiceError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            ServiceError::TokenReuseDetected => "TOKEN_REUSE_DETECTED",
            ServiceError::ProfileDataRequired => "PROFILE_DATA_REQUIRED",
            ServiceError::EmailAlreadyExists => "EMAIL_ALREADY_EXISTS",
            ServiceError::AgencyIdRequired => "AGENCY_ID_REQUIRED",
            ServiceError::InvalidAgency => "INVALID_AGENCY",
            ServiceError::InvalidRoleForRegistration => "INVALID_ROLE_FOR_REGISTRATION",
            ServiceError::InvalidVerificationToken => "INVALID_VERIFICATION_TOKEN",
            ServiceError::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            ServiceError::Store(_)
            | ServiceError::Internal(_)
            | ServiceError::UserNotFoundForToken => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_causes_collapse_to_one_code() {
        let store_err = ServiceError::Store(StoreError::Backend(anyhow::anyhow!("boom")));
        assert_eq!(store_err.code(), "INTERNAL_ERROR");
        assert_eq!(store_err.kind(), ErrorKind::Internal);

        assert_eq!(ServiceError::UserNotFoundForToken.code(), "INTERNAL_ERROR");
        assert_eq!(
            ServiceError::UserNotFoundForToken.kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn reuse_detection_is_authorization_failure() {
        assert_eq!(
            ServiceError::TokenReuseDetected.kind(),
            ErrorKind::Authorization
        );
    }

    #[test]
    fn otp_rejection_is_business_failure() {
        assert_eq!(ServiceError::InvalidOtp.kind(), ErrorKind::BusinessRule);
    }
}
