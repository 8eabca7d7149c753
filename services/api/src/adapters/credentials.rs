//! services/api/src/adapters/credentials.rs
//!
//! Argon2 implementation of the `CredentialService` port. Hashing is CPU-bound,
//! so both operations run on the blocking thread pool.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chat_assistant_core::ports::{CredentialService, PortError, PortResult};

#[derive(Clone, Default)]
pub struct Argon2Credentials;

impl Argon2Credentials {
    pub fn new() -> Self {
        Self
    }
}

fn hash_blocking(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PortError::Unexpected(format!("Failed to hash password: {}", e)))
}

fn verify_blocking(password: &str, password_hash: &str) -> PortResult<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| PortError::Unexpected(format!("Failed to parse password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[async_trait]
impl CredentialService for Argon2Credentials {
    async fn hash_password(&self, password: &str) -> PortResult<String> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_blocking(&password))
            .await
            .map_err(|e| PortError::Unexpected(format!("Hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> PortResult<bool> {
        let password = password.to_string();
        let password_hash = password_hash.to_string();
        tokio::task::spawn_blocking(move || verify_blocking(&password, &password_hash))
            .await
            .map_err(|e| PortError::Unexpected(format!("Verification task failed: {}", e)))?
    }
}
