//! Cryptographic primitives for the veil enclave
//!
//! - **Identity**: X25519 keypairs (`SecretKey`/`PublicKey`); a node may hold several
//! - **Payload encryption**: ChaCha20-Poly1305 under a fresh per-payload `Secret`
//! - **Sealing**: the payload secret is wrapped once per recipient (`SealedKey`)
//!   under a key derived from an X25519 agreement between sender and recipient
//!
//! # Envelope Layout
//!
//! ```text
//! ciphertext   = ChaCha20Poly1305(secret, payload_nonce, payload)
//! sealed_key_i = ChaCha20Poly1305(kek(sender, recipient_i), nonce_i, secret)
//! ```
//!
//! Ciphertext size is independent of the number of recipients; each extra
//! recipient costs one fixed-size `SealedKey`.

mod keys;
mod seal;
mod secret;

pub use keys::{
    KeyError, PublicKey, SecretKey, PRIVATE_KEY_PEM_TAG, PRIVATE_KEY_SIZE, PUBLIC_KEY_PEM_TAG,
    PUBLIC_KEY_SIZE,
};
pub use seal::{SealError, SealedKey, SealedSecret, SEALED_SECRET_SIZE};
pub use secret::{Nonce, Secret, SecretError, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
