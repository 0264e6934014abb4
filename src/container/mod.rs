//! Container format
//!
//! ```text
//! SealedSecret (112) ‖ Ciphertext (N) ‖ HMAC-SHA256 tag (32)
//! ```
//!
//! There is no length field. The ciphertext is exactly as long as the
//! plaintext, so its length is the container length minus the fixed overhead.

mod decrypt;
mod encrypt;

pub use decrypt::{decrypt, decrypt_from_slice, OpenedContainer, VerifiedContainer};
pub use encrypt::{encrypt, encrypt_to_vec, Encryptor};

use crate::crypto::{MAC_TAG_SIZE, SEALED_SECRET_SIZE};
use crate::error::{Error, Result};

/// Default read/write buffer for streaming, in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Bytes a container adds on top of the plaintext
pub const CONTAINER_OVERHEAD: u64 = (SEALED_SECRET_SIZE + MAC_TAG_SIZE) as u64;

/// Container length for a plaintext of `plaintext_len` bytes
pub fn container_len(plaintext_len: u64) -> u64 {
    plaintext_len + CONTAINER_OVERHEAD
}

/// Ciphertext length inside a container of `container_len` bytes
pub fn payload_len(container_len: u64) -> Result<u64> {
    container_len.checked_sub(CONTAINER_OVERHEAD).ok_or_else(|| {
        Error::MalformedContainer(format!(
            "{} bytes is shorter than the {} byte minimum",
            container_len, CONTAINER_OVERHEAD
        ))
    })
}

fn check_buffer_size(buffer_size: usize) -> Result<()> {
    if buffer_size == 0 {
        return Err(Error::InvalidConfig(
            "Buffer size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}
