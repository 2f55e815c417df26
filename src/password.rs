//! Password hashing.
//!
//! Digests are self-describing strings: `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`,
//! so the work factor can be raised without invalidating stored passwords.

use rand::RngCore;
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// The password-hashing collaborator used by signup and login.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> String;
    /// False for a wrong password and for any malformed digest.
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
    /// A valid digest of no real account, verified against when a login names an unknown
    /// email so that path costs as much as a wrong password.
    fn dummy_digest(&self) -> &str;
}

pub type HasherState = Arc<dyn PasswordHasher>;

/// PBKDF2-HMAC-SHA256 with a random per-password salt.
#[derive(Debug, Clone)]
pub struct Pbkdf2Hasher {
    iterations: u32,
    dummy_digest: String,
}

impl Pbkdf2Hasher {
    pub fn new(iterations: u32) -> Self {
        let iterations = iterations.max(1);
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let dummy_digest = encode_digest(iterations, &salt, &derive("", &salt, iterations));
        Self {
            iterations,
            dummy_digest,
        }
    }
}

fn encode_digest(iterations: u32, salt: &[u8], hash: &[u8]) -> String {
    format!("{SCHEME}${iterations}${}${}", hex::encode(salt), hex::encode(hash))
}

fn derive(plaintext: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(plaintext.as_bytes(), salt, iterations, &mut out);
    out
}

impl PasswordHasher for Pbkdf2Hasher {
    fn hash(&self, plaintext: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = derive(plaintext, &salt, self.iterations);
        encode_digest(self.iterations, &salt, &hash)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let mut parts = digest.split('$');
        let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };

        let Ok(iterations) = iterations.parse::<u32>() else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
            return false;
        };
        if iterations == 0 || expected.len() != HASH_LEN {
            return false;
        }

        let actual = derive(plaintext, &salt, iterations);
        actual.as_slice().ct_eq(expected.as_slice()).into()
    }

    fn dummy_digest(&self) -> &str {
        &self.dummy_digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = Pbkdf2Hasher::new(1_000);
        let digest = hasher.hash("correct horse battery");

        assert!(digest.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("correct horse battery", &digest));
        assert!(!hasher.verify("correct horse battery!", &digest));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let hasher = Pbkdf2Hasher::new(1_000);
        assert_ne!(hasher.hash("same password"), hasher.hash("same password"));
    }

    #[test]
    fn digest_records_its_own_work_factor() {
        let digest = Pbkdf2Hasher::new(1_000).hash("password123");
        assert!(Pbkdf2Hasher::new(5_000).verify("password123", &digest));
    }

    #[test]
    fn dummy_digest_is_well_formed_and_rejects_real_passwords() {
        let hasher = Pbkdf2Hasher::new(1_000);
        assert!(hasher.dummy_digest().starts_with("pbkdf2-sha256$1000$"));
        assert!(!hasher.verify("password123", hasher.dummy_digest()));
    }

    #[test]
    fn malformed_digests_never_verify() {
        let hasher = Pbkdf2Hasher::new(1_000);
        for digest in [
            "",
            "plaintext",
            "pbkdf2-sha256$1000$zz$zz",
            "pbkdf2-sha256$0$00$00",
            "bcrypt$1000$0011$0011",
            "pbkdf2-sha256$1000$0011$0011$extra",
        ] {
            assert!(!hasher.verify("anything", digest), "{digest}");
        }
    }
}
