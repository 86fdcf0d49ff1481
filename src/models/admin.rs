//! Admin account model and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Admin account, as stored
#[derive(Debug, Clone, FromRow)]
pub struct Admin {
    pub id: i32,
    pub username: String,
    pub name: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public admin profile
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminInfo {
    pub username: String,
    pub name: String,
}

impl From<&Admin> for AdminInfo {
    fn from(admin: &Admin) -> Self {
        Self {
            username: admin.username.clone(),
            name: admin.name.clone(),
        }
    }
}

/// JWT claims issued at login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Username
    pub sub: String,
    /// Display name, recorded as approver by default
    pub name: String,
    pub exp: i64,
    pub iat: i64,
}

impl AdminClaims {
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

    /// Approver name for a decision: explicit override, else the admin's name
    pub fn approver(&self, admin_name: Option<String>) -> String {
        admin_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> AdminClaims {
        let now = Utc::now().timestamp();
        AdminClaims {
            sub: "labadmin".to_string(),
            name: "Lab Admin".to_string(),
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let token = claims().create_token("secret").unwrap();
        let parsed = AdminClaims::from_token(&token, "secret").unwrap();
        assert_eq!(parsed.sub, "labadmin");
        assert!(AdminClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_approver_defaults_to_admin_name() {
        let claims = claims();
        assert_eq!(claims.approver(None), "Lab Admin");
        assert_eq!(claims.approver(Some("  ".to_string())), "Lab Admin");
        assert_eq!(claims.approver(Some("Dr. Rao".to_string())), "Dr. Rao");
    }
}
