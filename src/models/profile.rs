//! Profile models - role-specific profile records linked from accounts.
//!
//! An account points at exactly one profile through a kind discriminator
//! plus an opaque id; the payload itself is a tagged union resolved at
//! read time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Profile kind discriminator stored on the account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileKind {
    User,
    Agent,
    Agency,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::User => "user_profile",
            ProfileKind::Agent => "agent_profile",
            ProfileKind::Agency => "agency_profile",
        }
    }
}

impl std::str::FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user_profile" => Ok(ProfileKind::User),
            "agent_profile" => Ok(ProfileKind::Agent),
            "agency_profile" => Ok(ProfileKind::Agency),
            _ => Err(format!("unknown profile kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    pub address: Option<String>,
    pub website: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileData {
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub contact_info: ContactInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfileData {
    pub first_name: String,
    pub last_name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub specialties: Vec<String>,
    pub years_of_experience: Option<i32>,
    pub certification_ids: Vec<String>,
    pub contact_info: ContactInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgencyProfileData {
    pub company_name: String,
    pub tax_code: String,
    pub business_license_number: Option<String>,
    pub logo_url: Option<String>,
    pub cover_image_url: Option<String>,
    pub description: Option<String>,
    pub founding_date: Option<DateTime<Utc>>,
    pub contact_info: ContactInfo,
}

/// Registration profile payload. The variant must match the profile kind
/// the requested role prescribes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileData {
    User(UserProfileData),
    Agent(AgentProfileData),
    Agency(AgencyProfileData),
}

impl ProfileData {
    pub fn kind(&self) -> ProfileKind {
        match self {
            ProfileData::User(_) => ProfileKind::User,
            ProfileData::Agent(_) => ProfileKind::Agent,
            ProfileData::Agency(_) => ProfileKind::Agency,
        }
    }
}

/// Persisted profile record. Created together with its owning account in
/// one transaction, never on its own.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub profile_id: Uuid,
    pub account_id: Uuid,
    pub kind_code: String,
    pub data: ProfileData,
    pub created_utc: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn new(profile_id: Uuid, account_id: Uuid, data: ProfileData) -> Self {
        Self {
            profile_id,
            account_id,
            kind_code: data.kind().as_str().to_string(),
            data,
            created_utc: Utc::now(),
        }
    }
}
