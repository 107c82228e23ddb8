mod common;

use common::{harness, token_from_url, user_profile, user_registration, Harness};
use estate_auth::models::{
    AgencyProfileData, AgentProfileData, ContactInfo, ProfileData, RoleName,
};
use estate_auth::services::RegistrationRequest;
use estate_auth::store::CredentialStore;
use uuid::Uuid;

fn agency_profile(company: &str) -> ProfileData {
    ProfileData::Agency(AgencyProfileData {
        company_name: company.to_string(),
        tax_code: "TX-001".to_string(),
        business_license_number: None,
        logo_url: None,
        cover_image_url: None,
        description: None,
        founding_date: None,
        contact_info: ContactInfo::default(),
    })
}

fn agent_profile(first: &str) -> ProfileData {
    ProfileData::Agent(AgentProfileData {
        first_name: first.to_string(),
        last_name: "Agent".to_string(),
        avatar_url: None,
        bio: None,
        specialties: vec!["residential".to_string()],
        years_of_experience: Some(3),
        certification_ids: vec![],
        contact_info: ContactInfo::default(),
    })
}

/// Register an agency account and return its id.
async fn provision_agency(h: &Harness, email: &str) -> Uuid {
    let account = h
        .provisioning
        .register(RegistrationRequest {
            email: email.to_string(),
            password: "Agency-P4ss!".to_string(),
            display_name: "Acme Realty".to_string(),
            role_name: RoleName::Agency,
            agency_id: None,
            profile: Some(agency_profile("Acme Realty")),
        })
        .await
        .unwrap();
    account.account_id
}

#[tokio::test]
async fn end_user_registration_defaults() {
    let h = harness().await;
    let account = h
        .provisioning
        .register(user_registration("user@example.com", "S3cure-Pass!"))
        .await
        .unwrap();

    assert_eq!(account.monthly_listing_limit, 5);
    assert!(account.is_verified);
    assert!(!account.is_email_verified);
    assert_eq!(account.profile_kind_code, "user_profile");

    // The profile landed with the account.
    let profile = h
        .store
        .find_profile_by_id(account.profile_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.account_id, account.account_id);

    assert!(h.notifier.last_verification_url().is_some());
}

#[tokio::test]
async fn agency_registration_awaits_approval() {
    let h = harness().await;
    let account_id = provision_agency(&h, "agency@example.com").await;

    let account = h.store.find_account_by_id(account_id).await.unwrap().unwrap();
    assert_eq!(account.monthly_listing_limit, 30);
    assert!(!account.is_verified);
    assert_eq!(account.profile_kind_code, "agency_profile");
}

#[tokio::test]
async fn agent_requires_agency_id() {
    let h = harness().await;
    let err = h
        .provisioning
        .register(RegistrationRequest {
            email: "agent@example.com".to_string(),
            password: "Agent-P4ss!".to_string(),
            display_name: "Alex Agent".to_string(),
            role_name: RoleName::Agent,
            agency_id: None,
            profile: Some(agent_profile("Alex")),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "AGENCY_ID_REQUIRED");
}

#[tokio::test]
async fn agent_rejects_non_agency_parent() {
    let h = harness().await;
    let user = h
        .provisioning
        .register(user_registration("user@example.com", "S3cure-Pass!"))
        .await
        .unwrap();

    let err = h
        .provisioning
        .register(RegistrationRequest {
            email: "agent@example.com".to_string(),
            password: "Agent-P4ss!".to_string(),
            display_name: "Alex Agent".to_string(),
            role_name: RoleName::Agent,
            agency_id: Some(user.account_id),
            profile: Some(agent_profile("Alex")),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_AGENCY");
}

#[tokio::test]
async fn agent_rejects_unknown_parent() {
    let h = harness().await;
    let err = h
        .provisioning
        .register(RegistrationRequest {
            email: "agent@example.com".to_string(),
            password: "Agent-P4ss!".to_string(),
            display_name: "Alex Agent".to_string(),
            role_name: RoleName::Agent,
            agency_id: Some(Uuid::new_v4()),
            profile: Some(agent_profile("Alex")),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_AGENCY");
}

#[tokio::test]
async fn agent_under_real_agency_registers() {
    let h = harness().await;
    let agency_id = provision_agency(&h, "agency@example.com").await;

    let agent = h
        .provisioning
        .register(RegistrationRequest {
            email: "agent@example.com".to_string(),
            password: "Agent-P4ss!".to_string(),
            display_name: "Alex Agent".to_string(),
            role_name: RoleName::Agent,
            agency_id: Some(agency_id),
            profile: Some(agent_profile("Alex")),
        })
        .await
        .unwrap();

    assert_eq!(agent.agency_id, Some(agency_id));
    assert_eq!(agent.monthly_listing_limit, 15);
    assert!(!agent.is_verified);
}

#[tokio::test]
async fn staff_roles_cannot_self_register() {
    let h = harness().await;
    for role in [RoleName::Admin, RoleName::Manager, RoleName::Employee] {
        let err = h
            .provisioning
            .register(RegistrationRequest {
                email: "staff@example.com".to_string(),
                password: "Staff-P4ss!".to_string(),
                display_name: "Staff".to_string(),
                role_name: role,
                agency_id: None,
                profile: Some(user_profile("Staff", "Member")),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ROLE_FOR_REGISTRATION");
    }
}

#[tokio::test]
async fn missing_profile_rejected() {
    let h = harness().await;
    let err = h
        .provisioning
        .register(RegistrationRequest {
            email: "user@example.com".to_string(),
            password: "S3cure-Pass!".to_string(),
            display_name: "No Profile".to_string(),
            role_name: RoleName::User,
            agency_id: None,
            profile: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PROFILE_DATA_REQUIRED");
}

#[tokio::test]
async fn mismatched_profile_kind_rejected() {
    let h = harness().await;
    let err = h
        .provisioning
        .register(RegistrationRequest {
            email: "user@example.com".to_string(),
            password: "S3cure-Pass!".to_string(),
            display_name: "Wrong Kind".to_string(),
            role_name: RoleName::User,
            agency_id: None,
            profile: Some(agency_profile("Not A User")),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "PROFILE_DATA_REQUIRED");
}

#[tokio::test]
async fn duplicate_email_rejected_case_insensitively() {
    let h = harness().await;
    h.provisioning
        .register(user_registration("user@example.com", "S3cure-Pass!"))
        .await
        .unwrap();

    let err = h
        .provisioning
        .register(user_registration("USER@EXAMPLE.COM", "Other-P4ss!"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EMAIL_ALREADY_EXISTS");
}

#[tokio::test]
async fn duplicate_email_reported_before_role_problems() {
    let h = harness().await;
    h.provisioning
        .register(user_registration("user@example.com", "S3cure-Pass!"))
        .await
        .unwrap();

    // Even with a role that cannot self-register, the taken email wins.
    let err = h
        .provisioning
        .register(RegistrationRequest {
            email: "user@example.com".to_string(),
            password: "Other-P4ss!".to_string(),
            display_name: "Second".to_string(),
            role_name: RoleName::Admin,
            agency_id: None,
            profile: Some(user_profile("Second", "Try")),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "EMAIL_ALREADY_EXISTS");
}

#[tokio::test]
async fn email_verification_is_single_use() {
    let h = harness().await;
    h.provisioning
        .register(user_registration("user@example.com", "S3cure-Pass!"))
        .await
        .unwrap();
    let token = token_from_url(&h.notifier.last_verification_url().unwrap());

    let account = h.provisioning.verify_email(&token).await.unwrap();
    assert!(account.is_email_verified);

    let err = h.provisioning.verify_email(&token).await.unwrap_err();
    assert_eq!(err.code(), "INVALID_VERIFICATION_TOKEN");
}

#[tokio::test]
async fn bogus_verification_token_rejected() {
    let h = harness().await;
    let err = h.provisioning.verify_email("bogus-token").await.unwrap_err();
    assert_eq!(err.code(), "INVALID_VERIFICATION_TOKEN");
}
