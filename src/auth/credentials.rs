use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(AppError::ErrorHashingPassword)?
        .to_string())
}

/// A stored credential that does not parse never verifies.
pub fn verify_password(raw_password: &str, db_password: &str) -> bool {
    let parsed_hash = match PasswordHash::new(db_password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(raw_password.as_bytes(), &parsed_hash)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_verifies_only_the_original_password() {
        let hash = hash_password("verysecurepass").unwrap();
        assert!(verify_password("verysecurepass", &hash));
        assert!(!verify_password("verysecurepasS", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("verysecurepass").unwrap();
        let second = hash_password("verysecurepass").unwrap();
        assert_ne!(first, second);
        assert!(!first.contains("verysecurepass"));
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
