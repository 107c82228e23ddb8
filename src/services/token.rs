//! Access token signing and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// Signer for the short-lived access token.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_expiry_minutes: i64,
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (account ID)
    pub sub: String,
    /// Role name
    pub role: String,
    /// Flat permission strings for the role
    pub permissions: Vec<String>,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Token ID
    pub jti: String,
}

impl TokenSigner {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.access_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.access_secret.as_bytes()),
            access_expiry_minutes: config.access_expiry_minutes,
        }
    }

    /// Sign an access token embedding identity, role and permissions.
    pub fn sign(
        &self,
        account_id: Uuid,
        role: &str,
        permissions: &[String],
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.access_expiry_minutes);

        let claims = AccessClaims {
            sub: account_id.to_string(),
            role: role.to_string(),
            permissions: permissions.to_vec(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode access token: {}", e))
    }

    /// Verify a token. Expired and badly-signed tokens are rejected
    /// uniformly.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        let token_data = decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map_err(|_| anyhow::anyhow!("Invalid access token"))?;

        Ok(token_data.claims)
    }

    pub fn access_expiry_seconds(&self) -> i64 {
        self.access_expiry_minutes * 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(minutes: i64) -> TokenSigner {
        TokenSigner::new(&JwtConfig {
            access_secret: "test-secret-not-for-production".to_string(),
            access_expiry_minutes: minutes,
        })
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = signer(15);
        let account_id = Uuid::new_v4();
        let permissions = vec!["listings:create".to_string()];

        let token = signer.sign(account_id, "User", &permissions).unwrap();
        let claims = signer.verify(&token).unwrap();

        assert_eq!(claims.sub, account_id.to_string());
        assert_eq!(claims.role, "User");
        assert_eq!(claims.permissions, permissions);
    }

    #[test]
    fn tampered_token_rejected() {
        let signer = signer(15);
        let token = signer.sign(Uuid::new_v4(), "User", &[]).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

        assert!(signer.verify(&tampered).is_err());
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = signer(15).sign(Uuid::new_v4(), "User", &[]).unwrap();

        let other = TokenSigner::new(&JwtConfig {
            access_secret: "a-different-secret".to_string(),
            access_expiry_minutes: 15,
        });
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let signer = signer(-1);
        let token = signer.sign(Uuid::new_v4(), "User", &[]).unwrap();
        assert!(signer.verify(&token).is_err());
    }
}
