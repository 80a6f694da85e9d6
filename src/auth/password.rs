//! Credential Hasher
//!
//! PBKDF2-HMAC-SHA512 password hashing. Stored form is `salt:derivedKeyHex`
//! where the salt is 16 lowercase hex characters, so the first `:` always
//! separates the two parts.

use std::num::NonZeroU32;

use rand::Rng;
use ring::pbkdf2;

use crate::error::{AppError, Result};

// == Parameters ==
/// Number of hex characters in a generated salt.
pub const SALT_LENGTH: usize = 16;

/// PBKDF2 iteration count.
pub const ITERATIONS: u32 = 100_000;

/// Derived key length in bytes (128 hex characters once encoded).
pub const KEY_LENGTH: usize = 64;

const SEPARATOR: char = ':';
const HEX_ALPHABET: &[u8; 16] = b"0123456789abcdef";
static ALGORITHM: pbkdf2::Algorithm = pbkdf2::PBKDF2_HMAC_SHA512;

// == Async API ==
/// Hashes a password with a fresh random salt.
///
/// Key derivation runs on the blocking pool so request tasks are not stalled
/// for the duration of the 100k iterations.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash_with_salt(&password, &generate_salt()))
        .await
        .map_err(|e| AppError::Hashing(e.to_string()))
}

/// Checks a password against a stored `salt:key` string.
///
/// A wrong password or a malformed stored value yields `Ok(false)`. Only a
/// failure of the derivation task itself is reported as an error.
pub async fn verify_password(password: &str, stored_hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let stored_hash = stored_hash.to_owned();
    tokio::task::spawn_blocking(move || verify_blocking(&password, &stored_hash))
        .await
        .map_err(|e| AppError::Hashing(e.to_string()))
}

// == Blocking primitives ==
/// Returns `SALT_LENGTH` characters drawn from the hex alphabet.
pub fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    (0..SALT_LENGTH)
        .map(|_| HEX_ALPHABET[rng.gen_range(0..HEX_ALPHABET.len())] as char)
        .collect()
}

/// Derives the stored form for `password` under a given salt.
pub fn hash_with_salt(password: &str, salt: &str) -> String {
    format!("{}{}{}", salt, SEPARATOR, derive_key_hex(password, salt))
}

/// Synchronous verification used by [`verify_password`].
pub fn verify_blocking(password: &str, stored_hash: &str) -> bool {
    let Some((salt, key)) = stored_hash.split_once(SEPARATOR) else {
        return false;
    };
    if salt.is_empty() || key.is_empty() {
        return false;
    }

    let candidate = derive_key_hex(password, salt);
    constant_time_eq::constant_time_eq(candidate.as_bytes(), key.as_bytes())
}

fn derive_key_hex(password: &str, salt: &str) -> String {
    let iterations = NonZeroU32::new(ITERATIONS).unwrap_or(NonZeroU32::MIN);
    let mut derived = [0u8; KEY_LENGTH];
    pbkdf2::derive(
        ALGORITHM,
        iterations,
        salt.as_bytes(),
        password.as_bytes(),
        &mut derived,
    );
    hex::encode(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_shape() {
        let salt = generate_salt();
        assert_eq!(salt.len(), SALT_LENGTH);
        assert!(salt.bytes().all(|b| HEX_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_hash_format() {
        let stored = hash_with_salt("Secret1!", "0123456789abcdef");
        let (salt, key) = stored.split_once(':').unwrap();
        assert_eq!(salt, "0123456789abcdef");
        assert_eq!(key.len(), KEY_LENGTH * 2);
        assert!(key.bytes().all(|b| HEX_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_known_salt_is_deterministic() {
        let a = hash_with_salt("Secret1!", "aaaaaaaaaaaaaaaa");
        let b = hash_with_salt("Secret1!", "aaaaaaaaaaaaaaaa");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_hash_then_verify() {
        let stored = hash_password("Secret1!").await.unwrap();
        assert!(verify_password("Secret1!", &stored).await.unwrap());
        assert!(!verify_password("Secret2!", &stored).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_password_gets_different_hashes() {
        let first = hash_password("Secret1!").await.unwrap();
        let second = hash_password("Secret1!").await.unwrap();

        assert_ne!(first, second);
        assert!(verify_password("Secret1!", &first).await.unwrap());
        assert!(verify_password("Secret1!", &second).await.unwrap());
    }

    #[tokio::test]
    async fn test_truncated_hash_does_not_verify() {
        let stored = hash_password("Secret1!").await.unwrap();
        let tampered = stored.replace(':', "");
        assert!(!verify_password("Secret1!", &tampered).await.unwrap());
    }

    #[test]
    fn test_malformed_inputs() {
        assert!(!verify_blocking("Secret1!", ""));
        assert!(!verify_blocking("Secret1!", ":"));
        assert!(!verify_blocking("Secret1!", "0123456789abcdef:"));
        assert!(!verify_blocking("Secret1!", ":deadbeef"));
        assert!(!verify_blocking("Secret1!", "0123456789abcdef:not-hex"));
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let stored = hash_with_salt("Secret1!", "0123456789abcdef");
        assert!(verify_blocking("Secret1!", &stored));

        let (salt, key) = stored.split_once(':').unwrap();
        let shouted = format!("{}:{}", salt, key.to_uppercase());
        assert!(!verify_blocking("Secret1!", &shouted));
    }
}
