//! Password policy and hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::{AppError, AppResult};

/// The set of characters that satisfy the "special character" requirement.
pub const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Accepts iff the password is at least 8 characters long and contains an
/// uppercase letter, a lowercase letter, a digit and one of
/// [`SPECIAL_CHARS`]. Returns the first missing requirement otherwise.
pub fn validate_policy(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < 8 {
        return Err("at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("a digit");
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err("a special character");
    }
    Ok(())
}

/// Shape check only: `local@domain.tld` with no whitespace.
pub fn validate_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };

    !local.is_empty()
        && !host.is_empty()
        && !tld.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
}

pub fn hash(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

pub fn verify(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .is_ok_and(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
