//! Salted adaptive password hashing (bcrypt).

use thiserror::Error;

/// Cost factor used when nothing else is configured.
pub const DEFAULT_COST: u32 = 8;

/// bcrypt only reads this many bytes of input; longer passwords are refused
/// instead of silently truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Error)]
pub enum HashingError {
    #[error("password exceeds {MAX_PASSWORD_BYTES} bytes")]
    TooLong,
    #[error("bcrypt failure: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash with a fresh random salt. CPU-bound; call from a blocking task.
    pub fn hash(&self, plaintext: &str) -> Result<String, HashingError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(HashingError::TooLong);
        }
        Ok(bcrypt::hash(plaintext, self.cost)?)
    }

    /// Returns `Ok(false)` on mismatch. Errors only when `digest` is not a
    /// bcrypt hash.
    pub fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, HashingError> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Ok(false);
        }
        Ok(bcrypt::verify(plaintext, digest)?)
    }
}
