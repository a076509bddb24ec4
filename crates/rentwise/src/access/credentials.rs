use uuid::Uuid;

use crate::config::SecurityConfig;

/// One-time password handed to a newly created occupant.
#[derive(Debug, Clone)]
pub struct TemporaryCredential {
    pub plaintext: String,
    pub hash: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("unable to hash temporary password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// Generates temporary passwords and their bcrypt hashes.
#[derive(Debug, Clone, Copy)]
pub struct CredentialIssuer {
    cost: u32,
    length: usize,
}

impl CredentialIssuer {
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            cost: config.password_hash_cost.clamp(4, 31),
            length: config.temporary_password_length.clamp(8, 32),
        }
    }

    pub fn issue(&self) -> Result<TemporaryCredential, CredentialError> {
        let mut plaintext = Uuid::new_v4().simple().to_string();
        plaintext.truncate(self.length);
        let hash = bcrypt::hash(&plaintext, self.cost)?;
        Ok(TemporaryCredential { plaintext, hash })
    }
}
