//! Decryption path: open → verify → decrypt
//!
//! Each stage is its own type. Plaintext can only be produced from a
//! [`VerifiedContainer`], which only exists once the whole ciphertext region
//! has been MACed and the tag compared, so no plaintext byte is released
//! before authentication completes.

use crate::container::{check_buffer_size, payload_len, DEFAULT_BUFFER_SIZE};
use crate::crypto::{
    open, verify_tag, CipherKey, KeyPair, Keystream, MacKey, PayloadMac, SealedSecret,
    MAC_TAG_SIZE, SEALED_SECRET_SIZE,
};
use crate::error::{AuthFailure, Error, Result};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

const PAYLOAD_START: u64 = SEALED_SECRET_SIZE as u64;

/// A container whose sealed secret opened under the caller's keypair.
///
/// The payload has not been checked yet.
pub struct OpenedContainer<R> {
    reader: R,
    cipher_key: CipherKey,
    mac_key: MacKey,
    payload_len: u64,
    buffer_size: usize,
}

impl<R: Read + Seek> OpenedContainer<R> {
    /// Read the prefix and open it with `keypair`.
    ///
    /// Fails with [`AuthFailure::Envelope`] for a wrong password or a damaged
    /// prefix; nothing past the prefix is read in that case.
    pub fn open(mut reader: R, keypair: &KeyPair, buffer_size: usize) -> Result<Self> {
        check_buffer_size(buffer_size)?;

        let total = reader.seek(SeekFrom::End(0))?;
        let payload_len = payload_len(total)?;

        reader.seek(SeekFrom::Start(0))?;
        let mut prefix = [0u8; SEALED_SECRET_SIZE];
        reader.read_exact(&mut prefix)?;

        let bundle = open(&SealedSecret::from_bytes(prefix), keypair).map_err(|e| {
            warn!("Sealed secret did not open");
            e
        })?;
        let (cipher_key, mac_key) = bundle.into_parts();
        debug!(payload_len, "Opened sealed secret");

        Ok(OpenedContainer {
            reader,
            cipher_key,
            mac_key,
            payload_len,
            buffer_size,
        })
    }

    /// Ciphertext length, derived from the container length
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// First pass: MAC the whole ciphertext region and compare with the tag
    pub fn verify(mut self) -> Result<VerifiedContainer<R>> {
        self.reader.seek(SeekFrom::Start(PAYLOAD_START))?;

        let mut mac = PayloadMac::new(&self.mac_key);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut remaining = self.payload_len;
        while remaining > 0 {
            let n = remaining.min(buffer.len() as u64) as usize;
            self.reader.read_exact(&mut buffer[..n])?;
            mac.update(&buffer[..n]);
            remaining -= n as u64;
        }

        let mut stored = [0u8; MAC_TAG_SIZE];
        self.reader.read_exact(&mut stored)?;

        if !verify_tag(&stored, &mac.finish()) {
            warn!(payload_len = self.payload_len, "Payload MAC mismatch");
            return Err(Error::Authentication(AuthFailure::Payload));
        }
        debug!("Payload MAC verified");

        Ok(VerifiedContainer {
            reader: self.reader,
            cipher_key: self.cipher_key,
            payload_len: self.payload_len,
            buffer_size: self.buffer_size,
        })
    }
}

/// A container whose payload MAC has been checked
pub struct VerifiedContainer<R> {
    reader: R,
    cipher_key: CipherKey,
    payload_len: u64,
    buffer_size: usize,
}

impl<R: Read + Seek> VerifiedContainer<R> {
    pub fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Second pass: re-read the ciphertext and write the plaintext
    pub fn decrypt_to<W: Write>(mut self, writer: &mut W) -> Result<u64> {
        self.reader.seek(SeekFrom::Start(PAYLOAD_START))?;

        let mut keystream = Keystream::new(self.cipher_key);
        let mut buffer = vec![0u8; self.buffer_size];
        let mut remaining = self.payload_len;
        while remaining > 0 {
            let n = remaining.min(buffer.len() as u64) as usize;
            self.reader.read_exact(&mut buffer[..n])?;
            keystream.apply(&mut buffer[..n]);
            writer.write_all(&buffer[..n])?;
            remaining -= n as u64;
        }
        writer.flush()?;

        Ok(self.payload_len)
    }
}

/// Open, verify, then decrypt `reader` into `writer`.
///
/// `writer` sees no bytes unless the payload MAC matched.
pub fn decrypt<R: Read + Seek, W: Write>(
    reader: R,
    writer: &mut W,
    keypair: &KeyPair,
    buffer_size: usize,
) -> Result<u64> {
    OpenedContainer::open(reader, keypair, buffer_size)?
        .verify()?
        .decrypt_to(writer)
}

/// Decrypt an in-memory container
pub fn decrypt_from_slice(container: &[u8], keypair: &KeyPair) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(container.len());
    decrypt(Cursor::new(container), &mut out, keypair, DEFAULT_BUFFER_SIZE)?;
    Ok(out)
}
