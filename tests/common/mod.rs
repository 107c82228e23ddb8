//! Shared test harness: engines wired to in-memory stores and a
//! recording notifier, with the default role set seeded.
#![allow(dead_code)]

use std::sync::Arc;

use estate_auth::config::{
    AuthConfig, DatabaseConfig, Environment, JwtConfig, OtpConfig, SessionConfig, SmtpConfig,
};
use estate_auth::models::{ContactInfo, ProfileData, RoleName, UserProfileData};
use estate_auth::services::{
    ClientContext, ProvisioningEngine, RecordingNotifier, RecoveryEngine, RegistrationRequest,
    SessionEngine,
};
use estate_auth::store::{
    seed_roles, CredentialStore, MemoryCredentialStore, MemorySessionStore, SessionStore,
};

pub struct Harness {
    pub store: Arc<MemoryCredentialStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub session_engine: SessionEngine,
    pub provisioning: ProvisioningEngine,
    pub recovery: RecoveryEngine,
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        environment: Environment::Dev,
        service_name: "estate-auth-test".to_string(),
        log_level: "warn".to_string(),
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        jwt: JwtConfig {
            access_secret: "test-secret-not-for-production".to_string(),
            access_expiry_minutes: 15,
        },
        session: SessionConfig {
            refresh_expiry_days: 7,
            remember_me_expiry_days: 30,
            max_active_sessions: 3,
        },
        otp: OtpConfig { expiry_minutes: 10 },
        smtp: SmtpConfig {
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from_address: "no-reply@localhost".to_string(),
        },
        frontend_base_url: "http://localhost:3000".to_string(),
    }
}

pub async fn harness() -> Harness {
    let config = test_config();

    let store = Arc::new(MemoryCredentialStore::new());
    let sessions = Arc::new(MemorySessionStore::new());
    let notifier = Arc::new(RecordingNotifier::new());

    seed_roles(store.as_ref()).await.unwrap();

    let cred: Arc<dyn CredentialStore> = store.clone();
    let sess: Arc<dyn SessionStore> = sessions.clone();

    let session_engine =
        SessionEngine::new(cred.clone(), sess.clone(), notifier.clone(), &config);
    let provisioning = ProvisioningEngine::new(
        cred.clone(),
        notifier.clone(),
        config.frontend_base_url.clone(),
    );
    let recovery = RecoveryEngine::new(
        cred.clone(),
        sess.clone(),
        notifier.clone(),
        config.frontend_base_url.clone(),
    );

    Harness {
        store,
        sessions,
        notifier,
        session_engine,
        provisioning,
        recovery,
    }
}

pub fn ctx(ip: &str, user_agent: &str) -> ClientContext {
    ClientContext {
        ip: ip.to_string(),
        user_agent: user_agent.to_string(),
    }
}

pub fn user_profile(first: &str, last: &str) -> ProfileData {
    ProfileData::User(UserProfileData {
        first_name: first.to_string(),
        last_name: last.to_string(),
        avatar_url: None,
        contact_info: ContactInfo::default(),
    })
}

pub fn user_registration(email: &str, password: &str) -> RegistrationRequest {
    RegistrationRequest {
        email: email.to_string(),
        password: password.to_string(),
        display_name: "Test User".to_string(),
        role_name: RoleName::User,
        agency_id: None,
        profile: Some(user_profile("Test", "User")),
    }
}

/// Strip the token off the tail of a verification or reset link.
pub fn token_from_url(url: &str) -> String {
    url.rsplit('/').next().unwrap().to_string()
}

/// Register an end-user account and complete email verification.
pub async fn provision_verified_user(h: &Harness, email: &str, password: &str) {
    h.provisioning
        .register(user_registration(email, password))
        .await
        .unwrap();
    let url = h.notifier.last_verification_url().unwrap();
    h.provisioning
        .verify_email(&token_from_url(&url))
        .await
        .unwrap();
}
