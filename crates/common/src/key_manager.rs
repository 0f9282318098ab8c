use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::crypto::{KeyError, PublicKey, SecretKey};

/// File extension for generated private key files
pub const PRIVATE_KEY_EXTENSION: &str = "key";
/// File extension for generated public key files
pub const PUBLIC_KEY_EXTENSION: &str = "pub";

#[derive(Debug, thiserror::Error)]
pub enum KeyManagerError {
    /// Key material could not be decoded into a fixed-length key
    #[error("malformed key material in {path:?}: {source}")]
    KeyFormat {
        path: PathBuf,
        #[source]
        source: KeyError,
    },
    /// The public key file does not belong to the private key file
    #[error("public key {public:?} does not correspond to private key {private:?}")]
    KeyMismatch { private: PathBuf, public: PathBuf },
    #[error("expected one public key file per private key file, got {private} private and {public} public")]
    UnpairedKeyFiles { private: usize, public: usize },
    #[error("no key pairs configured")]
    NoKeys,
    #[error("failed to generate key: {0}")]
    Generate(#[from] KeyError),
    #[error("key file i/o error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A local identity: public key plus the private key that opens its seals
#[derive(Debug, Clone)]
pub struct KeyPair {
    pub public: PublicKey,
    pub secret: SecretKey,
}

impl From<SecretKey> for KeyPair {
    fn from(secret: SecretKey) -> Self {
        Self {
            public: secret.public(),
            secret,
        }
    }
}

impl KeyPair {
    /// Produce a fresh keypair from the operating system RNG
    pub fn generate() -> Result<Self, KeyManagerError> {
        Ok(SecretKey::generate()?.into())
    }

    /// Read a keypair from a private and a public PEM file
    ///
    /// # Errors
    ///
    /// * `KeyFormat` if either file does not decode to a 32 byte key
    /// * `KeyMismatch` if the public key is not derived from the private key
    pub fn load(private_path: &Path, public_path: &Path) -> Result<Self, KeyManagerError> {
        let secret = SecretKey::from_pem(&read(private_path)?).map_err(|source| {
            KeyManagerError::KeyFormat {
                path: private_path.to_path_buf(),
                source,
            }
        })?;
        let public = PublicKey::from_pem(&read(public_path)?).map_err(|source| {
            KeyManagerError::KeyFormat {
                path: public_path.to_path_buf(),
                source,
            }
        })?;

        if secret.public() != public {
            return Err(KeyManagerError::KeyMismatch {
                private: private_path.to_path_buf(),
                public: public_path.to_path_buf(),
            });
        }

        Ok(Self { public, secret })
    }

    /// Generate a keypair and write it to `<stem>.key` and `<stem>.pub`
    pub fn generate_files(stem: &Path) -> Result<Self, KeyManagerError> {
        let pair = Self::generate()?;
        let private_path = stem.with_extension(PRIVATE_KEY_EXTENSION);
        let public_path = stem.with_extension(PUBLIC_KEY_EXTENSION);

        write(&private_path, pair.secret.to_pem())?;
        write(&public_path, pair.public.to_pem())?;

        Ok(pair)
    }
}

fn read(path: &Path) -> Result<String, KeyManagerError> {
    std::fs::read_to_string(path).map_err(|source| KeyManagerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, contents: String) -> Result<(), KeyManagerError> {
    std::fs::write(path, contents).map_err(|source| KeyManagerError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Owner of every keypair this node can decrypt for
///
/// Immutable once built, so it is shared across request handlers behind an
/// `Arc` without any locking.
#[derive(Debug, Clone)]
pub struct KeyManager {
    pairs: Vec<KeyPair>,
    index: HashMap<PublicKey, usize>,
}

impl KeyManager {
    /// Build a key manager over already-loaded keypairs
    ///
    /// The first pair is the default sender identity. Duplicate public keys
    /// are collapsed onto their first occurrence.
    pub fn new(pairs: Vec<KeyPair>) -> Result<Self, KeyManagerError> {
        if pairs.is_empty() {
            return Err(KeyManagerError::NoKeys);
        }

        let mut index = HashMap::with_capacity(pairs.len());
        let mut unique = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if index.contains_key(&pair.public) {
                continue;
            }
            index.insert(pair.public, unique.len());
            unique.push(pair);
        }

        Ok(Self {
            pairs: unique,
            index,
        })
    }

    /// Load parallel lists of private and public key files
    pub fn load_files(
        private_paths: &[PathBuf],
        public_paths: &[PathBuf],
    ) -> Result<Self, KeyManagerError> {
        if private_paths.len() != public_paths.len() {
            return Err(KeyManagerError::UnpairedKeyFiles {
                private: private_paths.len(),
                public: public_paths.len(),
            });
        }

        let pairs = private_paths
            .iter()
            .zip(public_paths)
            .map(|(private, public)| KeyPair::load(private, public))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(count = pairs.len(), "loaded node key pairs");
        Self::new(pairs)
    }

    /// All keys this node can decrypt for
    pub fn local_public_keys(&self) -> HashSet<PublicKey> {
        self.index.keys().copied().collect()
    }

    /// Local public keys in load order
    pub fn public_keys(&self) -> impl Iterator<Item = &PublicKey> {
        self.pairs.iter().map(|pair| &pair.public)
    }

    pub fn keypair(&self, public: &PublicKey) -> Option<&KeyPair> {
        self.index.get(public).map(|idx| &self.pairs[*idx])
    }

    pub fn is_local(&self, public: &PublicKey) -> bool {
        self.index.contains_key(public)
    }

    /// The first loaded keypair, used as sender when none is named
    pub fn default_key(&self) -> &KeyPair {
        // non-empty is enforced in `new`
        &self.pairs[0]
    }
}
