//! API key generation and salted one-way hashing.

use crate::account::validation::KEY_LEN;
use crate::error::Error;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::Rng;

const KEY_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz1234567890-_";

/// An Argon2id hash of nothing anyone knows, with the same cost parameters [`hash_key`]
/// produces. Verified against whenever there is no real hash to check so that every rejected
/// request pays for exactly one hash computation.
pub const DUMMY_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$3A+mAwXP7PVYsl4LJiognQ$A98CfQrBobaOjhQ92OOKRCfoZZQWgqljZkJd1i/EY3s";

/// Generate a random API key of [`KEY_LEN`] characters from the URL safe base64 alphabet.
#[must_use]
pub fn generate_key() -> String {
    let mut rng = OsRng;
    (0..KEY_LEN)
        .map(|_| char::from(KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())]))
        .collect()
}

/// Hash `key` with a fresh random salt, returning the PHC string form for storage.
///
/// # Errors
///
/// Returns [`Error::PasswordHash`] if hashing fails.
pub fn hash_key(key: &str) -> Result<String, Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(key.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Check `key` against a stored PHC hash. The final digest comparison is constant time.
///
/// Unparseable stored hashes never match.
#[must_use]
pub fn verify_key(key: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(key.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::error!("unparseable stored key hash: {err}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::validation::valid_key;

    #[test]
    fn generated_keys_are_valid_keys() {
        for _ in 0..16 {
            let key = generate_key();
            assert_eq!(key.len(), KEY_LEN);
            assert!(valid_key(&key), "{key}");
        }
        assert_ne!(generate_key(), generate_key());
    }

    #[test]
    fn hash_then_verify() {
        let key = generate_key();
        let hash = hash_key(&key).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_key(&key, &hash));
        assert!(!verify_key(&generate_key(), &hash));
        assert!(!verify_key(&key[..KEY_LEN - 1], &hash));

        // Salted: the same key never hashes the same way twice.
        assert_ne!(hash, hash_key(&key).unwrap());
    }

    #[test]
    fn garbage_hashes_never_verify() {
        assert!(!verify_key("", ""));
        assert!(!verify_key(&generate_key(), "not a hash"));
    }

    #[test]
    fn dummy_hash_is_well_formed() {
        // A malformed dummy would short-circuit the hash computation it exists to perform.
        assert!(PasswordHash::new(DUMMY_HASH).is_ok());
        assert!(!verify_key(&generate_key(), DUMMY_HASH));
    }
}
