//! Cryptography module for warren
//!
//! Password → Argon2id → SHAKE256 stream → X25519 keypair.
//! A random AES-256-CTR key and HMAC-SHA256 key are sealed anonymously to the
//! public key; the payload is encrypted then MACed under those keys.

mod envelope;
mod kdf;
mod mac;
mod stream;

pub use envelope::{open, seal, CipherKey, MacKey, SealedSecret, SecretBundle};
pub use kdf::{derive_keypair, KdfMode, KdfParams, KeyPair, Password, XofRng, MAX_DIFFICULTY};
pub use mac::{verify_tag, PayloadMac};
pub use stream::Keystream;

/// Size of symmetric keys and X25519 keys in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the AES-CTR initialization vector
pub const IV_SIZE: usize = 16;

/// Size of the sealed SecretBundle: ephemeral key + Poly1305 tag + 64 bytes
pub const SEALED_SECRET_SIZE: usize = 112;

/// Size of the HMAC-SHA256 tag appended to every container
pub const MAC_TAG_SIZE: usize = 32;
