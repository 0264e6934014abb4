//! Encryption path: seal → stream → finalize

use crate::container::{check_buffer_size, DEFAULT_BUFFER_SIZE};
use crate::crypto::{seal, Keystream, PayloadMac, SecretBundle};
use crate::error::Result;
use crypto_box::PublicKey;
use std::io::{ErrorKind, Read, Write};
use tracing::debug;

/// Streaming container writer.
///
/// Construction seals a fresh [`SecretBundle`] to the recipient and writes it
/// as the prefix. [`update`](Self::update) encrypts and MACs payload bytes.
/// [`finish`](Self::finish) appends the tag and consumes the writer, so no
/// bytes can follow the tag.
pub struct Encryptor<W: Write> {
    writer: W,
    keystream: Keystream,
    mac: PayloadMac,
    buffer: Vec<u8>,
    payload_len: u64,
}

impl<W: Write> Encryptor<W> {
    pub fn new(mut writer: W, recipient: &PublicKey, buffer_size: usize) -> Result<Self> {
        check_buffer_size(buffer_size)?;

        let bundle = SecretBundle::generate();
        let sealed = seal(&bundle, recipient)?;
        writer.write_all(sealed.as_bytes())?;
        debug!(
            recipient = %hex::encode(recipient.as_bytes()),
            "Wrote sealed secret"
        );

        let (cipher_key, mac_key) = bundle.into_parts();
        Ok(Encryptor {
            writer,
            keystream: Keystream::new(cipher_key),
            mac: PayloadMac::new(&mac_key),
            buffer: vec![0u8; buffer_size],
            payload_len: 0,
        })
    }

    /// Encrypt `plaintext`, write the ciphertext, and feed it to the MAC
    pub fn update(&mut self, plaintext: &[u8]) -> Result<()> {
        for piece in plaintext.chunks(self.buffer.len()) {
            let out = &mut self.buffer[..piece.len()];
            self.keystream.apply_into(piece, out);
            self.writer.write_all(out)?;
            self.mac.update(out);
        }
        self.payload_len += plaintext.len() as u64;
        Ok(())
    }

    /// Plaintext bytes processed so far
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Write the MAC tag, flush, and hand back the writer
    pub fn finish(mut self) -> Result<W> {
        let tag = self.mac.finish();
        self.writer.write_all(&tag)?;
        self.writer.flush()?;
        debug!(payload_len = self.payload_len, "Container finalized");
        Ok(self.writer)
    }
}

/// Encrypt everything from `reader` into a container written to `writer`.
///
/// Returns the number of plaintext bytes consumed.
pub fn encrypt<R: Read, W: Write>(
    mut reader: R,
    writer: W,
    recipient: &PublicKey,
    buffer_size: usize,
) -> Result<u64> {
    let mut encryptor = Encryptor::new(writer, recipient, buffer_size)?;
    let mut input = vec![0u8; buffer_size];

    loop {
        let n = match reader.read(&mut input) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        encryptor.update(&input[..n])?;
    }

    let total = encryptor.payload_len();
    encryptor.finish()?;
    Ok(total)
}

/// Encrypt an in-memory payload
pub fn encrypt_to_vec(plaintext: &[u8], recipient: &PublicKey) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(crate::container::container_len(plaintext.len() as u64) as usize);
    encrypt(plaintext, &mut out, recipient, DEFAULT_BUFFER_SIZE)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::container_len;
    use crate::crypto::{derive_keypair, Password, SEALED_SECRET_SIZE};
    use crate::testutil::fast_mode;

    #[test]
    fn test_prefix_written_on_construction() {
        let recipient = derive_keypair(&Password::new("pw"), &fast_mode()).unwrap();
        let mut out = Vec::new();

        let encryptor = Encryptor::new(&mut out, recipient.public(), 16).unwrap();
        drop(encryptor);

        assert_eq!(out.len(), SEALED_SECRET_SIZE);
    }

    #[test]
    fn test_ciphertext_hides_plaintext() {
        let recipient = derive_keypair(&Password::new("pw"), &fast_mode()).unwrap();
        let plaintext = [0u8; 256];

        let sealed = encrypt_to_vec(&plaintext, recipient.public()).unwrap();
        let ciphertext = &sealed[SEALED_SECRET_SIZE..SEALED_SECRET_SIZE + plaintext.len()];

        assert_ne!(ciphertext, &plaintext[..]);
    }

    #[test]
    fn test_two_encryptions_differ() {
        let recipient = derive_keypair(&Password::new("pw"), &fast_mode()).unwrap();

        let a = encrypt_to_vec(b"same input", recipient.public()).unwrap();
        let b = encrypt_to_vec(b"same input", recipient.public()).unwrap();

        assert_eq!(a.len(), b.len());
        // Fresh cipher key per container, so even the payload differs
        assert_ne!(a[SEALED_SECRET_SIZE..], b[SEALED_SECRET_SIZE..]);
    }

    #[test]
    fn test_update_tracks_length() {
        let recipient = derive_keypair(&Password::new("pw"), &fast_mode()).unwrap();
        let mut out = Vec::new();

        let mut encryptor = Encryptor::new(&mut out, recipient.public(), 4).unwrap();
        encryptor.update(b"hello").unwrap();
        encryptor.update(b"").unwrap();
        encryptor.update(b" world").unwrap();
        assert_eq!(encryptor.payload_len(), 11);
        encryptor.finish().unwrap();

        assert_eq!(out.len() as u64, container_len(11));
    }
}
