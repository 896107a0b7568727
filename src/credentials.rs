use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};

use crate::error::{AppError, AppResult};
use crate::models::UserCredentials;
use crate::repository::Repository;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Hashes `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AppError::Internal(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AppError::Internal(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// False for a wrong password and for a stored hash that does not parse.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// verify_credentials
///
/// Resolves an email/password pair to the stored account. An unknown email and a
/// wrong password produce the same `Unauthenticated` error.
pub async fn verify_credentials(
    repo: &dyn Repository,
    email: &str,
    password: &str,
) -> AppResult<UserCredentials> {
    let Some(account) = repo.find_credentials(email).await? else {
        tracing::warn!("login attempt for unknown account");
        return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    };

    if !verify_password(&account.password_hash, password) {
        tracing::warn!(user_id = account.id, "login attempt with wrong password");
        return Err(AppError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    Ok(account)
}
