use anyhow::Result;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{AccountId, Principal, Role};

/// JWT Claims - data stored in the token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,           // Subject (account_id as string)
    pub account_id: AccountId, // Wallet / principal id
    pub role: Role,            // Buyer, seller or admin
    pub exp: i64,              // Expiration timestamp
    pub iat: i64,              // Issued at timestamp
    pub iss: String,           // Issuer
    pub jti: String,           // JWT ID (unique token identifier)
}

impl Claims {
    pub fn principal(&self) -> Principal {
        Principal::new(self.account_id, self.role)
    }
}

/// JWT Service - creates and verifies session tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl JwtService {
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
        }
    }

    /// Create a token for a principal
    ///
    /// Token expires after 24 hours
    pub fn create_token(&self, account_id: AccountId, role: Role) -> Result<String> {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::hours(24);

        let claims = Claims {
            sub: account_id.to_string(),
            account_id,
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(Into::into)
    }

    /// Verify and decode a token
    ///
    /// Returns claims if the token is valid, unexpired and from our issuer
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_verify_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let account_id = AccountId::new();

        let token = service.create_token(account_id, Role::Seller).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.account_id, account_id);
        assert_eq!(claims.role, Role::Seller);
        assert_eq!(claims.iss, "test_issuer");
        assert_eq!(claims.principal(), Principal::new(account_id, Role::Seller));
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        assert!(service.verify_token("invalid_token").is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", "test_issuer".to_string());
        let service2 = JwtService::new("secret2", "test_issuer".to_string());

        let token = service1.create_token(AccountId::new(), Role::Buyer).unwrap();
        assert!(service2.verify_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let ours = JwtService::new("secret", "domain-market".to_string());
        let theirs = JwtService::new("secret", "someone-else".to_string());

        let token = theirs.create_token(AccountId::new(), Role::Admin).unwrap();
        assert!(ours.verify_token(&token).is_err());
    }
}
