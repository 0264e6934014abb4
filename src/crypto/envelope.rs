//! Anonymous sealing of the per-file secrets
//!
//! Uses the NaCl sealed box: an ephemeral X25519 key agrees a shared secret
//! with the recipient, and XSalsa20-Poly1305 encrypts the bundle under it.
//! There is no sender identity; anyone with the public key can seal.

use crate::crypto::kdf::KeyPair;
use crate::crypto::{KEY_SIZE, SEALED_SECRET_SIZE};
use crate::error::{AuthFailure, Error, Result};
use crypto_box::PublicKey;
use rand::RngCore;
use std::fmt;
use zeroize::Zeroizing;

const BUNDLE_SIZE: usize = 2 * KEY_SIZE;

/// AES-256-CTR key for exactly one payload.
///
/// The payload cipher runs with an all-zero IV, which is only sound while a
/// key never encrypts two different plaintexts. `CipherKey` is therefore not
/// `Clone`, can only come out of a fresh [`SecretBundle`], and is consumed
/// when a [`Keystream`](crate::crypto::Keystream) is built from it.
pub struct CipherKey(Zeroizing<[u8; KEY_SIZE]>);

impl CipherKey {
    pub(crate) fn into_bytes(self) -> Zeroizing<[u8; KEY_SIZE]> {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_test_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        CipherKey(Zeroizing::new(bytes))
    }
}

/// HMAC-SHA256 key for the payload tag
pub struct MacKey(Zeroizing<[u8; KEY_SIZE]>);

impl MacKey {
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// The random secrets protecting one container
pub struct SecretBundle {
    cipher_key: CipherKey,
    mac_key: MacKey,
}

impl SecretBundle {
    /// Draw a fresh cipher key and MAC key from the system CSPRNG
    pub fn generate() -> Self {
        let mut cipher_key = Zeroizing::new([0u8; KEY_SIZE]);
        let mut mac_key = Zeroizing::new([0u8; KEY_SIZE]);
        let mut rng = rand::thread_rng();
        rng.fill_bytes(&mut cipher_key[..]);
        rng.fill_bytes(&mut mac_key[..]);

        SecretBundle {
            cipher_key: CipherKey(cipher_key),
            mac_key: MacKey(mac_key),
        }
    }

    /// Split into the two single-purpose keys
    pub fn into_parts(self) -> (CipherKey, MacKey) {
        (self.cipher_key, self.mac_key)
    }

    fn to_bytes(&self) -> Zeroizing<[u8; BUNDLE_SIZE]> {
        let mut bytes = Zeroizing::new([0u8; BUNDLE_SIZE]);
        bytes[..KEY_SIZE].copy_from_slice(&self.cipher_key.0[..]);
        bytes[KEY_SIZE..].copy_from_slice(&self.mac_key.0[..]);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BUNDLE_SIZE {
            return Err(Error::Encapsulation(format!(
                "opened secret has {} bytes, expected {}",
                bytes.len(),
                BUNDLE_SIZE
            )));
        }

        let mut cipher_key = Zeroizing::new([0u8; KEY_SIZE]);
        let mut mac_key = Zeroizing::new([0u8; KEY_SIZE]);
        cipher_key.copy_from_slice(&bytes[..KEY_SIZE]);
        mac_key.copy_from_slice(&bytes[KEY_SIZE..]);

        Ok(SecretBundle {
            cipher_key: CipherKey(cipher_key),
            mac_key: MacKey(mac_key),
        })
    }
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBundle([REDACTED])")
    }
}

/// A sealed [`SecretBundle`], the fixed-size container prefix
#[derive(Clone, PartialEq, Eq)]
pub struct SealedSecret([u8; SEALED_SECRET_SIZE]);

impl SealedSecret {
    pub fn from_bytes(bytes: [u8; SEALED_SECRET_SIZE]) -> Self {
        SealedSecret(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; SEALED_SECRET_SIZE] = bytes.try_into().map_err(|_| {
            Error::MalformedContainer(format!(
                "sealed secret must be {} bytes, got {}",
                SEALED_SECRET_SIZE,
                bytes.len()
            ))
        })?;
        Ok(SealedSecret(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SEALED_SECRET_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SealedSecret({})", hex::encode(&self.0[..8]))
    }
}

/// Seal `secret` so only the holder of `recipient`'s private key can open it
pub fn seal(secret: &SecretBundle, recipient: &PublicKey) -> Result<SealedSecret> {
    let plaintext = secret.to_bytes();
    let sealed = recipient
        .seal(&mut rand::thread_rng(), &plaintext[..])
        .map_err(|e| Error::Encapsulation(format!("sealed box failed: {}", e)))?;

    SealedSecret::from_slice(&sealed)
        .map_err(|_| Error::Encapsulation(format!("sealed box produced {} bytes", sealed.len())))
}

/// Open a sealed bundle with the recipient keypair.
///
/// A tag mismatch means the password was wrong or the prefix is damaged;
/// nothing recovered from a failed open is returned.
pub fn open(sealed: &SealedSecret, keypair: &KeyPair) -> Result<SecretBundle> {
    let opened = keypair
        .secret()
        .unseal(sealed.as_bytes())
        .map(Zeroizing::new)
        .map_err(|_| Error::Authentication(AuthFailure::Envelope))?;

    SecretBundle::from_bytes(&opened)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{derive_keypair, Password};
    use crate::testutil::fast_mode;

    fn keypair(password: &str) -> KeyPair {
        derive_keypair(&Password::new(password), &fast_mode()).unwrap()
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let recipient = keypair("correct horse");
        let bundle = SecretBundle::generate();
        let expected = bundle.to_bytes();

        let sealed = seal(&bundle, recipient.public()).unwrap();
        let opened = open(&sealed, &recipient).unwrap();

        assert_eq!(&opened.to_bytes()[..], &expected[..]);
    }

    #[test]
    fn test_sealed_size() {
        let recipient = keypair("correct horse");
        let sealed = seal(&SecretBundle::generate(), recipient.public()).unwrap();
        assert_eq!(sealed.as_bytes().len(), SEALED_SECRET_SIZE);
    }

    #[test]
    fn test_seal_is_randomized() {
        let recipient = keypair("correct horse");
        let bundle = SecretBundle::generate();

        let a = seal(&bundle, recipient.public()).unwrap();
        let b = seal(&bundle, recipient.public()).unwrap();

        // Fresh ephemeral key each time
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_keypair_fails() {
        let recipient = keypair("correct horse");
        let other = keypair("wrong horse");
        let sealed = seal(&SecretBundle::generate(), recipient.public()).unwrap();

        let err = open(&sealed, &other).unwrap_err();
        assert!(matches!(err, Error::Authentication(AuthFailure::Envelope)));
    }

    #[test]
    fn test_tampered_envelope_fails() {
        let recipient = keypair("correct horse");
        let sealed = seal(&SecretBundle::generate(), recipient.public()).unwrap();

        for index in [0, 40, SEALED_SECRET_SIZE - 1] {
            let mut bytes = *sealed.as_bytes();
            bytes[index] ^= 0x01;
            let result = open(&SealedSecret::from_bytes(bytes), &recipient);
            assert!(matches!(
                result,
                Err(Error::Authentication(AuthFailure::Envelope))
            ));
        }
    }

    #[test]
    fn test_bundles_are_fresh() {
        let a = SecretBundle::generate().to_bytes();
        let b = SecretBundle::generate().to_bytes();
        assert_ne!(&a[..], &b[..]);
    }

    #[test]
    fn test_sealed_from_slice_length() {
        assert!(matches!(
            SealedSecret::from_slice(&[0u8; 10]),
            Err(Error::MalformedContainer(_))
        ));
        assert!(SealedSecret::from_slice(&[0u8; SEALED_SECRET_SIZE]).is_ok());
    }
}
