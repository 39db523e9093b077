use anyhow::{Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString, rand_core::OsRng},
};
use rand::{Rng, distr::Alphanumeric};

/// Derived key length in bytes (256 bits).
const OUTPUT_LEN: usize = 32;

/// Argon2id work factors. The default is the argon2 crate's recommended
/// setting (19 MiB, 2 passes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
        }
    }
}

/// Hashes and verifies user secrets. Each hash gets its own random 16-byte
/// salt; the PHC string carries salt and parameters, so hashes produced
/// under an older cost still verify.
#[derive(Clone)]
pub struct SecretHasher {
    argon2: Argon2<'static>,
    /// Hash of a random throwaway secret, at this hasher's cost.
    decoy: String,
}

impl SecretHasher {
    pub fn new(cost: HashCost) -> Result<Self> {
        let params = Params::new(cost.memory_kib, cost.iterations, 1, Some(OUTPUT_LEN))
            .map_err(|e| anyhow!("Invalid hash cost: {}", e))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let decoy = hash_with(&argon2, &generate_code(32))?;
        Ok(Self { argon2, decoy })
    }

    pub fn hash(&self, secret: &str) -> Result<String> {
        hash_with(&self.argon2, secret)
    }

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
    pub fn verify(&self, secret: &str, stored: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(stored).map_err(|e| anyhow!("Stored hash unreadable: {}", e))?;
        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(anyhow!("Secret verification failed: {}", e)),
        }
    }

    /// Spend the same work as [`SecretHasher::verify`] when there is no
    /// stored hash to check, so a missing account is not faster to reject.
    pub fn verify_decoy(&self, secret: &str) -> Result<bool> {
        self.verify(secret, &self.decoy)
    }
}

fn hash_with(argon2: &Argon2<'_>, secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow!("Secret hashing failed: {}", e))?;
    Ok(hash.to_string())
}

/// Random alphanumeric string for invitation codes and one-time secrets.
pub fn generate_code(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
