//! Key derivation timing
//!
//! Diagnostic only: shows how long each difficulty level of the
//! hash-and-discard mode takes on this machine. Not part of the protocol.

use crate::crypto::{derive_keypair, KdfMode, KdfParams, Password, MAX_DIFFICULTY};
use crate::error::{Error, Result};
use std::time::{Duration, Instant};
use tracing::info;

/// One timed derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchSample {
    pub mode: KdfMode,
    pub elapsed: Duration,
}

/// Time difficulty levels `0..=max_difficulty`
pub fn difficulty_benchmark(password: &Password, max_difficulty: u8) -> Result<Vec<BenchSample>> {
    if max_difficulty > MAX_DIFFICULTY {
        return Err(Error::KeyDerivation(format!(
            "difficulty {} exceeds maximum of {}",
            max_difficulty, MAX_DIFFICULTY
        )));
    }

    (0..=max_difficulty)
        .map(|difficulty| time_derivation(password, KdfMode::Difficulty(difficulty)))
        .collect()
}

/// Time a single Argon2id derivation with `params`
pub fn argon2_benchmark(password: &Password, params: KdfParams) -> Result<BenchSample> {
    time_derivation(password, KdfMode::Argon2id(params))
}

fn time_derivation(password: &Password, mode: KdfMode) -> Result<BenchSample> {
    let start = Instant::now();
    derive_keypair(password, &mode)?;
    let elapsed = start.elapsed();

    info!(?mode, elapsed_ms = elapsed.as_millis() as u64, "Derivation timed");
    Ok(BenchSample { mode, elapsed })
}
