use std::path::PathBuf;

use clap::Args;

use common::key_manager::{KeyManagerError, KeyPair};

#[derive(Args, Debug, Clone)]
pub struct GenerateKeys {
    /// Path stem for the key files; extensions are replaced
    pub stem: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateKeysError {
    #[error("key generation failed: {0}")]
    Keys(#[from] KeyManagerError),
}

impl GenerateKeys {
    pub fn execute(&self) -> Result<String, GenerateKeysError> {
        let pair = KeyPair::generate_files(&self.stem)?;
        Ok(format!(
            "Generated key pair\n\
             - Private key: {}\n\
             - Public key: {}\n\
             - Public key (hex): {}",
            self.stem.with_extension("key").display(),
            self.stem.with_extension("pub").display(),
            pair.public.to_hex(),
        ))
    }
}
