pub mod email;
pub mod error;
pub mod otp;
pub mod provisioning;
pub mod recovery;
pub mod session;
pub mod token;

pub use email::{Notifier, OutboundEmail, RecordingNotifier, SmtpNotifier};
pub use error::{ErrorKind, ServiceError};
pub use provisioning::{ProvisioningEngine, RegistrationRequest};
pub use recovery::RecoveryEngine;
pub use session::{AuthTokens, ClientContext, LoginOutcome, SessionEngine};
pub use token::{AccessClaims, TokenSigner};
