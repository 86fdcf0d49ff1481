//! Admin authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::admin::{Admin, AdminClaims},
    repository::Repository,
};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

/// Check a password against a stored Argon2 hash
pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Check credentials and return a JWT along with the admin
    pub async fn login(&self, username: &str, password: &str) -> AppResult<(String, Admin)> {
        let admin = self
            .repository
            .admins
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        if !verify_password(&admin.password_hash, password)? {
            tracing::warn!("Failed login for admin {}", username);
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let token = self.create_token(&admin)?;
        tracing::info!("Admin {} logged in", admin.username);
        Ok((token, admin))
    }

    pub fn create_token(&self, admin: &Admin) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = AdminClaims {
            sub: admin.username.clone(),
            name: admin.name.clone(),
            exp: now + (self.config.jwt_expiration_hours as i64 * 3600),
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Create or reset an admin account
    pub async fn provision_admin(&self, username: &str, name: &str, password: &str) -> AppResult<Admin> {
        if username.trim().is_empty() || password.len() < 8 {
            return Err(AppError::Validation(
                "Username is required and password must be at least 8 characters".to_string(),
            ));
        }
        let hash = hash_password(password)?;
        self.repository.admins.upsert(username.trim(), name.trim(), &hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("lab-secret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "lab-secret").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[test]
    fn test_garbage_hash_is_an_error() {
        assert!(verify_password("not-a-hash", "x").is_err());
    }
}
