//! Credentials for accounts created from invitation links.
//!
//! Stored as Argon2id PHC strings. Verification reads the cost parameters
//! back out of the stored string, so hashes written under older settings
//! keep verifying after `Params` change.

use argon2::password_hash::{
    self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

/// Credential failures. A wrong password is not one of them.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Argon2 could not derive a hash.
    #[error("could not derive password hash: {0}")]
    Derive(password_hash::Error),

    /// The stored credential is not an Argon2 PHC string.
    #[error("stored credential is not an argon2 hash")]
    NotArgon2,
}

fn argon2id() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// Derives the stored credential for a new account.
///
/// # Errors
///
/// Returns `PasswordError::Derive` if Argon2 rejects the input.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = argon2id()
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordError::Derive)?;
    Ok(phc.to_string())
}

/// Checks a login attempt against the stored credential.
///
/// `Ok(false)` means the password is wrong.
///
/// # Errors
///
/// Returns `PasswordError::NotArgon2` when `stored` was not written by
/// [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let phc = PasswordHash::new(stored).map_err(|_| PasswordError::NotArgon2)?;
    if !phc.algorithm.as_str().starts_with("argon2") {
        return Err(PasswordError::NotArgon2);
    }

    match argon2id().verify_password(password.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(other) => Err(PasswordError::Derive(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("join-me-please")]
    #[case("pässwörd with spaces")]
    #[case("")]
    fn test_stored_credential_verifies(#[case] password: &str) {
        let stored = hash_password(password).unwrap();
        assert!(stored.starts_with("$argon2id$v=19$"));
        assert!(verify_password(password, &stored).unwrap());
        assert!(!verify_password("someone-else", &stored).unwrap());
    }

    #[test]
    fn test_each_account_gets_its_own_salt() {
        assert_ne!(hash_password("shared").unwrap(), hash_password("shared").unwrap());
    }

    #[rstest]
    #[case("not-a-hash")]
    #[case("$argon2id$unused")]
    #[case("$pbkdf2-sha256$i=1000$c2FsdHNhbHQ$aGFzaGhhc2hoYXNo")]
    fn test_foreign_credentials_are_rejected(#[case] stored: &str) {
        assert!(matches!(
            verify_password("password", stored),
            Err(PasswordError::NotArgon2)
        ));
    }
}
