pub mod account;
pub mod profile;
pub mod role;
pub mod session;

pub use account::{Account, SanitizedAccount};
pub use profile::{
    AgencyProfileData, AgentProfileData, ContactInfo, ProfileData, ProfileKind, ProfileRecord,
    UserProfileData,
};
pub use role::{Role, RoleName};
pub use session::RefreshSession;
