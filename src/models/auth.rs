//! JWT claims for authenticated callers

use serde::{Deserialize, Serialize};

use crate::models::analytics::Persona;

/// JWT claims carried by every authenticated request. Tokens are issued by
/// the identity service; this server only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaClaims {
    pub sub: String,
    pub persona: Persona,
    pub account_id: Option<String>,
    pub dn: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl PersonaClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_token_round_trip() {
        let claims = PersonaClaims {
            sub: "user-42".to_string(),
            persona: Persona::Consultant,
            account_id: None,
            dn: Some("DN100".to_string()),
            exp: (Utc::now().timestamp()) + 3600,
            iat: Utc::now().timestamp(),
        };
        let token = claims.create_token("secret").unwrap();
        let parsed = PersonaClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.sub, "user-42");
        assert_eq!(parsed.persona, Persona::Consultant);
        assert_eq!(parsed.dn.as_deref(), Some("DN100"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let claims = PersonaClaims {
            sub: "user-42".to_string(),
            persona: Persona::Tower,
            account_id: Some("acc-1".to_string()),
            dn: None,
            exp: (Utc::now().timestamp()) + 3600,
            iat: Utc::now().timestamp(),
        };
        let token = claims.create_token("secret").unwrap();
        assert!(PersonaClaims::from_token(&token, "other").is_err());
    }
}
