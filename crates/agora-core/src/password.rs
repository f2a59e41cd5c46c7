use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

use crate::error::{CoreError, CoreResult};

/// Hash a password with Argon2id and a fresh random salt. The PHC string
/// carries the salt and parameters.
pub fn hash_password(password: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CoreError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}

/// Constant-time comparison of `password` against a stored PHC hash.
/// A malformed stored hash is a store problem, not a wrong password.
pub fn verify_password(password: &str, stored_hash: &str) -> CoreResult<bool> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|e| CoreError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("battery staple", &hash).unwrap());
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn garbage_hash_is_internal() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(CoreError::Internal(_))
        ));
    }
}
