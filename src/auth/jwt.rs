use crate::types::{AppError, Claims, Result, TokenResponse};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sha2::{Digest, Sha256};

const INVALID_CREDENTIALS: &str = "Incorrect username or password";
const INVALID_TOKEN: &str = "Could not validate credentials";

/// The single administrator allowed to use the API.
enum AdminSecret {
    /// Argon2 PHC hash taken verbatim from configuration
    Hashed(String),
    /// SHA-256 digest of a plain configured password
    Digest([u8; 32]),
}

/// Authentication service for the admin login and JWT handling.
///
/// Issues HS256 access tokens whose subject is the admin username. The admin
/// password may be configured either in plain text or as an Argon2 PHC hash.
pub struct AuthService {
    jwt_secret: String,
    access_expiry_minutes: i64,
    admin_user: String,
    admin_secret: AdminSecret,
}

impl AuthService {
    /// Creates a new AuthService with the given configuration.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for signing JWTs (should be at least 32 chars)
    /// * `access_expiry_minutes` - Access token validity in minutes
    /// * `admin_user` - The only accepted username
    /// * `admin_password` - Plain password, or a `$argon2...` hash
    pub fn new(
        jwt_secret: String,
        access_expiry_minutes: i64,
        admin_user: String,
        admin_password: &str,
    ) -> Self {
        let admin_secret = if admin_password.starts_with("$argon2") {
            AdminSecret::Hashed(admin_password.to_string())
        } else {
            AdminSecret::Digest(sha256(admin_password))
        };

        Self {
            jwt_secret,
            access_expiry_minutes,
            admin_user,
            admin_secret,
        }
    }

    /// Hashes a password using Argon2id.
    ///
    /// Returns a PHC-formatted hash string suitable for `ADMIN_PASSWORD`.
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Auth(format!("Failed to hash password: {}", e)))
    }

    /// Checks a username/password pair against the configured admin.
    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        if username != self.admin_user {
            return false;
        }

        match &self.admin_secret {
            AdminSecret::Hashed(hash) => match PasswordHash::new(hash) {
                Ok(parsed) => Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
                Err(e) => {
                    tracing::error!("Configured admin password hash is invalid: {}", e);
                    false
                }
            },
            AdminSecret::Digest(expected) => constant_time_eq(&sha256(password), expected),
        }
    }

    /// Validates the credentials and issues a bearer token.
    pub fn login(&self, username: &str, password: &str) -> Result<TokenResponse> {
        if !self.authenticate(username, password) {
            tracing::warn!(username, "Rejected login attempt");
            return Err(AppError::Auth(INVALID_CREDENTIALS.to_string()));
        }

        Ok(TokenResponse {
            access_token: self.create_access_token(username)?,
            token_type: "bearer".to_string(),
        })
    }

    /// Signs an access token for `username`.
    pub fn create_access_token(&self, username: &str) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            exp: (now + Duration::minutes(self.access_expiry_minutes)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Auth(format!("Failed to generate token: {}", e)))
    }

    /// Verifies a JWT token and returns the claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            AppError::Auth(INVALID_TOKEN.to_string())
        })
    }
}

fn sha256(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> AuthService {
        AuthService::new(
            "test-secret-key-that-is-at-least-32-chars".to_string(),
            30,
            "admin-gd".to_string(),
            "change-in-production",
        )
    }

    #[test]
    fn test_authenticate_plain_password() {
        let service = create_test_service();

        assert!(service.authenticate("admin-gd", "change-in-production"));
        assert!(!service.authenticate("admin-gd", "wrong"));
        assert!(!service.authenticate("someone-else", "change-in-production"));
    }

    #[test]
    fn test_authenticate_hashed_password() {
        let hash = AuthService::hash_password("s3cret").expect("should hash password");
        assert!(hash.starts_with("$argon2"), "hash should be in PHC format");

        let service = AuthService::new(
            "test-secret-key-that-is-at-least-32-chars".to_string(),
            30,
            "admin".to_string(),
            &hash,
        );

        assert!(service.authenticate("admin", "s3cret"));
        assert!(!service.authenticate("admin", "S3cret"));
    }

    #[test]
    fn test_login_success() {
        let service = create_test_service();

        let token = service
            .login("admin-gd", "change-in-production")
            .expect("should log in");

        assert_eq!(token.token_type, "bearer");
        assert!(!token.access_token.is_empty());

        let claims = service
            .verify_token(&token.access_token)
            .expect("should verify token");
        assert_eq!(claims.sub, "admin-gd");
    }

    #[test]
    fn test_login_failure_message() {
        let service = create_test_service();

        match service.login("admin-gd", "nope") {
            Err(AppError::Auth(msg)) => assert_eq!(msg, "Incorrect username or password"),
            other => panic!("expected auth error, got {:?}", other.map(|t| t.token_type)),
        }
    }

    #[test]
    fn test_token_verification_invalid_token() {
        let service = create_test_service();

        match service.verify_token("invalid.token.here") {
            Err(AppError::Auth(msg)) => assert_eq!(msg, "Could not validate credentials"),
            other => panic!("expected auth error, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn test_token_verification_wrong_secret() {
        let service1 = AuthService::new(
            "secret-one-that-is-32-chars-long".to_string(),
            30,
            "admin".to_string(),
            "pw",
        );
        let service2 = AuthService::new(
            "secret-two-that-is-32-chars-long".to_string(),
            30,
            "admin".to_string(),
            "pw",
        );

        let token = service1
            .create_access_token("admin")
            .expect("should generate");

        assert!(
            service2.verify_token(&token).is_err(),
            "token from different secret should fail"
        );
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let service = AuthService::new(
            "test-secret-key-that-is-at-least-32-chars".to_string(),
            -10,
            "admin".to_string(),
            "pw",
        );

        let token = service.create_access_token("admin").expect("should sign");
        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    fn test_claims_expiration() {
        let service = create_test_service();
        let token = service
            .create_access_token("admin-gd")
            .expect("should generate");
        let claims = service.verify_token(&token).expect("should verify");

        let now = chrono::Utc::now().timestamp() as usize;

        assert!(
            claims.iat <= now && claims.iat >= now - 5,
            "iat should be current timestamp"
        );

        // 30 minutes
        let expected_exp = claims.iat + 1800;
        assert!(
            claims.exp >= expected_exp - 5 && claims.exp <= expected_exp + 5,
            "exp should be iat + 30 minutes"
        );
    }
}
