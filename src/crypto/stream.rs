//! AES-256-CTR payload keystream

use crate::crypto::envelope::CipherKey;
use crate::crypto::IV_SIZE;
use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// All-zero IV. Sound only because every [`CipherKey`] is single-use.
const ZERO_IV: [u8; IV_SIZE] = [0u8; IV_SIZE];

/// Counter-mode keystream for one container.
///
/// The block counter carries across calls, so chunk boundaries have no effect
/// on the output. Encryption and decryption are the same operation.
pub struct Keystream {
    cipher: Aes256Ctr,
}

impl Keystream {
    /// Start a keystream at block zero. Takes the key by value.
    pub fn new(key: CipherKey) -> Self {
        let key = key.into_bytes();
        Keystream {
            cipher: Aes256Ctr::new(&(*key).into(), &ZERO_IV.into()),
        }
    }

    /// XOR the next `buf.len()` keystream bytes into `buf`
    pub fn apply(&mut self, buf: &mut [u8]) {
        self.cipher.apply_keystream(buf);
    }

    /// XOR `input` into `output`, which must be the same length
    pub fn apply_into(&mut self, input: &[u8], output: &mut [u8]) {
        output.copy_from_slice(input);
        self.cipher.apply_keystream(output);
    }
}
