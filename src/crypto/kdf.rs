//! Password → X25519 keypair derivation
//!
//! The keypair is never stored. It is a pure function of the password and the
//! derivation mode, so the same inputs yield the same keys on any machine.

use crate::crypto::KEY_SIZE;
use crate::error::{Error, Result};
use argon2::{Algorithm, Argon2, Params, Version};
use crypto_box::{PublicKey, SecretKey};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Shake256, Shake256Reader};
use std::fmt;
use std::io::{self, BufRead};
use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

/// Fixed, public Argon2 salt. Derivation must be reproducible from the
/// password alone, so there is nowhere to keep a random one.
const ARGON2_SALT: &[u8] = b"warren-x25519-keypair-v1";

/// SHAKE256 rate in bytes; one discarded block costs one Keccak permutation
const SHAKE256_BLOCK: usize = 136;

/// Largest accepted difficulty for the hash-and-discard mode
pub const MAX_DIFFICULTY: u8 = 32;

/// A user password with the line terminator removed
pub struct Password(Zeroizing<String>);

impl Password {
    /// Wrap a password verbatim
    pub fn new(password: impl Into<String>) -> Self {
        Password(Zeroizing::new(password.into()))
    }

    /// Build from a line as read from a terminal or pipe.
    ///
    /// Strips one trailing `\n`, then one trailing `\r`.
    pub fn from_line(line: impl Into<String>) -> Self {
        let mut line = line.into();
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        Password::new(line)
    }

    /// Read one line from `reader`.
    ///
    /// End of input before any byte is read is an error, not an empty
    /// password.
    pub fn read_line<R: BufRead>(mut reader: R) -> Result<Self> {
        let mut line = Zeroizing::new(String::new());
        if reader.read_line(&mut line)? == 0 {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no password on standard input",
            )));
        }
        Ok(Password::from_line(std::mem::take(&mut *line)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub memory_kib: u32,
    /// Time cost / iterations (default: 1)
    pub iterations: u32,
    /// Lanes (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        KdfParams {
            memory_kib: 64 * 1024,
            iterations: 1,
            parallelism: 4,
        }
    }
}

/// How the password is stretched before keypair generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfMode {
    /// Argon2id seed fed into SHAKE256. The default and the only
    /// memory-hard option.
    Argon2id(KdfParams),
    /// SHAKE256 over the raw password, discarding `2 * 2^difficulty` blocks
    /// of output. Burns CPU only; a GPU or ASIC attacker pays far less than
    /// under Argon2id, so this is weaker and kept for compatibility and
    /// benchmarking.
    Difficulty(u8),
}

impl Default for KdfMode {
    fn default() -> Self {
        KdfMode::Argon2id(KdfParams::default())
    }
}

/// Deterministic RNG backed by a SHAKE256 output stream.
///
/// Lets the standard keypair generator consume derived bytes in place of the
/// OS random source.
pub struct XofRng {
    reader: Shake256Reader,
}

impl XofRng {
    /// Absorb `seed` and start squeezing
    pub fn new(seed: &[u8]) -> Self {
        let mut hasher = Shake256::default();
        hasher.update(seed);
        XofRng {
            reader: hasher.finalize_xof(),
        }
    }

    /// Squeeze and drop `blocks` rate-sized blocks
    fn discard_blocks(&mut self, blocks: u64) {
        let mut sink = [0u8; SHAKE256_BLOCK];
        for _ in 0..blocks {
            self.reader.read(&mut sink);
        }
        sink.zeroize();
    }
}

impl RngCore for XofRng {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.reader.read(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for XofRng {}

/// An X25519 keypair derived from a password
pub struct KeyPair {
    public: PublicKey,
    secret: SecretKey,
}

impl KeyPair {
    /// Run the curve's keypair generator against an injected RNG
    pub fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        let secret = SecretKey::generate(rng);
        KeyPair {
            public: secret.public_key(),
            secret,
        }
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn secret(&self) -> &SecretKey {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(self.public.as_bytes()))
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Derive the keypair for `password` under `mode`
pub fn derive_keypair(password: &Password, mode: &KdfMode) -> Result<KeyPair> {
    let mut rng = match mode {
        KdfMode::Argon2id(params) => {
            let seed = argon2_seed(password, params)?;
            XofRng::new(&seed[..])
        }
        KdfMode::Difficulty(difficulty) => {
            if *difficulty > MAX_DIFFICULTY {
                return Err(Error::KeyDerivation(format!(
                    "difficulty {} exceeds maximum of {}",
                    difficulty, MAX_DIFFICULTY
                )));
            }
            let mut rng = XofRng::new(password.as_bytes());
            rng.discard_blocks(2u64 << difficulty);
            rng
        }
    };

    let keypair = KeyPair::generate(&mut rng);
    debug!(
        public_key = %hex::encode(keypair.public.as_bytes()),
        "Derived keypair"
    );
    Ok(keypair)
}

fn argon2_seed(password: &Password, params: &KdfParams) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| Error::KeyDerivation(format!("invalid Argon2id params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut seed = Zeroizing::new([0u8; KEY_SIZE]);
    argon2
        .hash_password_into(password.as_bytes(), ARGON2_SALT, &mut seed[..])
        .map_err(|e| Error::KeyDerivation(format!("Argon2id failed: {}", e)))?;

    Ok(seed)
}
