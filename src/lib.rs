//! warren - password-derived public-key file encryption
//!
//! A password deterministically yields an X25519 keypair. Only the public
//! half is ever written down, so encryption needs no password. Each container
//! carries a sealed, single-use AES-256-CTR key and HMAC-SHA256 key, the
//! ciphertext, and a MAC over the ciphertext. Decryption re-derives the
//! keypair, verifies the whole payload, and only then decrypts it.

pub mod bench;
pub mod config;
pub mod container;
pub mod crypto;
pub mod error;
pub mod keyfile;
pub mod ops;

pub use config::Config;
pub use error::{AuthFailure, Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::container::{decrypt, encrypt, Encryptor, OpenedContainer, VerifiedContainer};
    pub use crate::crypto::{derive_keypair, KdfMode, KdfParams, KeyPair, Password};
    pub use crate::error::{AuthFailure, Error, Result};
}
