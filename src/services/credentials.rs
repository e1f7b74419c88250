//! Password hashing and random token generation.

use anyhow::Result;
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;

use crate::config::SecurityConfig;

/// Length of strings produced by [`CredentialService::random_string`].
pub const RANDOM_STRING_LENGTH: usize = 32;

const URL_SAFE_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Hashing and randomness used by account operations.
pub trait CredentialService: Send + Sync {
    /// Produces a salted, slow hash of `password`.
    fn hash_password(&self, password: &str) -> Result<String>;

    /// Checks `password` against a hash from [`Self::hash_password`].
    /// A hash that cannot be parsed never matches.
    fn verify_password(&self, password: &str, hash: &str) -> bool;

    /// A cryptographically random opaque string.
    fn random_string(&self) -> String;
}

/// Argon2id hashing with configurable cost.
#[derive(Clone)]
pub struct Argon2Credentials {
    params: Params,
}

impl Argon2Credentials {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl CredentialService for Argon2Credentials {
    fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        // Params are read from the PHC string, so hashes made with older
        // cost settings still verify.
        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    fn random_string(&self) -> String {
        generate_random_string(RANDOM_STRING_LENGTH)
    }
}

/// Random string over the URL-safe base64 alphabet.
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    let mut rng = rand::rng();

    (0..length)
        .map(|_| char::from(URL_SAFE_ALPHABET[rng.random_range(0..URL_SAFE_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn cheap_credentials() -> Argon2Credentials {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 64,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        };
        Argon2Credentials::new(&config).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let credentials = cheap_credentials();
        let hash = credentials.hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("correct horse"));
        assert!(credentials.verify_password("correct horse", &hash));
        assert!(!credentials.verify_password("correct horsex", &hash));
        assert!(!credentials.verify_password("", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let credentials = cheap_credentials();
        let a = credentials.hash_password("same").unwrap();
        let b = credentials.hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let credentials = cheap_credentials();
        assert!(!credentials.verify_password("anything", ""));
        assert!(!credentials.verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn test_verify_uses_params_from_hash() {
        let strong = Argon2Credentials::new(&SecurityConfig {
            argon2_memory_cost_kib: 128,
            argon2_time_cost: 2,
            argon2_parallelism: 1,
            ..SecurityConfig::default()
        })
        .unwrap();
        let hash = strong.hash_password("rotate me").unwrap();

        assert!(cheap_credentials().verify_password("rotate me", &hash));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let config = SecurityConfig {
            argon2_memory_cost_kib: 1,
            argon2_time_cost: 0,
            ..SecurityConfig::default()
        };
        assert!(Argon2Credentials::new(&config).is_err());
    }

    #[test]
    fn test_random_strings() {
        let credentials = cheap_credentials();
        let values: HashSet<String> = (0..100).map(|_| credentials.random_string()).collect();

        assert_eq!(values.len(), 100);
        for value in &values {
            assert_eq!(value.len(), RANDOM_STRING_LENGTH);
            assert!(value.bytes().all(|b| URL_SAFE_ALPHABET.contains(&b)));
        }
    }
}
