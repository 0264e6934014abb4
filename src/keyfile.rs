//! Keyfile I/O
//!
//! A keyfile is the raw 32-byte X25519 public key. No header, no version.

use crate::crypto::KEY_SIZE;
use crate::error::{Error, Result};
use crypto_box::PublicKey;
use std::path::Path;
use tracing::info;

/// Write `public` to `path`, replacing any existing file
pub fn write_keyfile<P: AsRef<Path>>(path: P, public: &PublicKey) -> Result<()> {
    std::fs::write(path.as_ref(), public.as_bytes())?;
    info!(
        path = %path.as_ref().display(),
        public_key = %hex::encode(public.as_bytes()),
        "Wrote keyfile"
    );
    Ok(())
}

/// Read a public key from `path`
pub fn read_keyfile<P: AsRef<Path>>(path: P) -> Result<PublicKey> {
    let bytes = std::fs::read(path.as_ref())?;
    public_key_from_slice(&bytes)
}

/// Parse a raw public key
pub fn public_key_from_slice(bytes: &[u8]) -> Result<PublicKey> {
    let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| Error::InvalidKeyLength {
        expected: KEY_SIZE,
        got: bytes.len(),
    })?;
    Ok(PublicKey::from(bytes))
}
