//! File-level operations behind the CLI
//!
//! Every handle is scoped to the call; writers are flushed and files synced
//! before returning success.

use crate::container::{encrypt, OpenedContainer};
use crate::crypto::{derive_keypair, KdfMode, Password};
use crate::error::Result;
use crate::keyfile::{read_keyfile, write_keyfile};
use crypto_box::PublicKey;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

/// Derive the keypair for `password` and store its public half at `keyfile`
pub fn generate_keyfile(keyfile: &Path, password: &Password, mode: &KdfMode) -> Result<PublicKey> {
    let keypair = derive_keypair(password, mode)?;
    write_keyfile(keyfile, keypair.public())?;
    Ok(keypair.public().clone())
}

/// Encrypt `input` (stdin when `None`) to `output` (stdout when `None`)
/// under the public key stored in `keyfile`.
pub fn encrypt_file(
    keyfile: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
    buffer_size: usize,
) -> Result<u64> {
    let recipient = read_keyfile(keyfile)?;

    let reader: Box<dyn Read> = match input {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    };

    let written = match output {
        Some(path) => {
            let mut writer = BufWriter::with_capacity(buffer_size, File::create(path)?);
            let n = encrypt(reader, &mut writer, &recipient, buffer_size)?;
            finish_file(writer)?;
            n
        }
        None => {
            let mut writer = BufWriter::with_capacity(buffer_size, io::stdout().lock());
            let n = encrypt(reader, &mut writer, &recipient, buffer_size)?;
            writer.flush()?;
            n
        }
    };

    info!(bytes = written, "Encrypted payload");
    Ok(written)
}

/// Decrypt the container at `input` into a new file at `output`.
///
/// The output file is only created after the payload MAC has verified, so a
/// wrong password or a tampered container leaves nothing behind.
pub fn decrypt_file(
    input: &Path,
    output: &Path,
    password: &Password,
    mode: &KdfMode,
    buffer_size: usize,
) -> Result<u64> {
    let keypair = derive_keypair(password, mode)?;

    let reader = BufReader::with_capacity(buffer_size, File::open(input)?);
    let verified = OpenedContainer::open(reader, &keypair, buffer_size)?.verify()?;

    let mut writer = BufWriter::with_capacity(buffer_size, File::create(output)?);
    let written = verified.decrypt_to(&mut writer)?;
    finish_file(writer)?;

    info!(bytes = written, path = %output.display(), "Decrypted payload");
    Ok(written)
}

fn finish_file(writer: BufWriter<File>) -> Result<()> {
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::container_len;
    use crate::error::{AuthFailure, Error};
    use crate::testutil::fast_mode;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                dir: TempDir::new().unwrap(),
            }
        }

        fn path(&self, name: &str) -> std::path::PathBuf {
            self.dir.path().join(name)
        }
    }

    #[test]
    fn test_file_roundtrip() {
        let fx = Fixture::new();
        let plaintext: Vec<u8> = (0..10_000u32).map(|i| (i % 253) as u8).collect();
        std::fs::write(fx.path("plain"), &plaintext).unwrap();

        let password = Password::from_line("correct horse\n");
        generate_keyfile(&fx.path("key"), &password, &fast_mode()).unwrap();

        let n = encrypt_file(
            &fx.path("key"),
            Some(fx.path("plain").as_path()),
            Some(fx.path("sealed").as_path()),
            512,
        )
        .unwrap();
        assert_eq!(n, plaintext.len() as u64);
        assert_eq!(
            std::fs::metadata(fx.path("sealed")).unwrap().len(),
            container_len(plaintext.len() as u64)
        );

        decrypt_file(
            &fx.path("sealed"),
            &fx.path("out"),
            &Password::new("correct horse"),
            &fast_mode(),
            333,
        )
        .unwrap();
        assert_eq!(std::fs::read(fx.path("out")).unwrap(), plaintext);
    }

    #[test]
    fn test_wrong_password_creates_no_output() {
        let fx = Fixture::new();
        std::fs::write(fx.path("plain"), b"hello world").unwrap();
        generate_keyfile(&fx.path("key"), &Password::new("correct horse"), &fast_mode()).unwrap();
        encrypt_file(&fx.path("key"), Some(fx.path("plain").as_path()), Some(fx.path("sealed").as_path()), 4096)
            .unwrap();

        let err = decrypt_file(
            &fx.path("sealed"),
            &fx.path("out"),
            &Password::new("wrong horse"),
            &fast_mode(),
            4096,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Authentication(AuthFailure::Envelope)));
        assert!(!fx.path("out").exists());
    }

    #[test]
    fn test_tampered_file_creates_no_output() {
        let fx = Fixture::new();
        std::fs::write(fx.path("plain"), vec![9u8; 5000]).unwrap();
        generate_keyfile(&fx.path("key"), &Password::new("pw"), &fast_mode()).unwrap();
        encrypt_file(&fx.path("key"), Some(fx.path("plain").as_path()), Some(fx.path("sealed").as_path()), 4096)
            .unwrap();

        let mut sealed = std::fs::read(fx.path("sealed")).unwrap();
        sealed[3000] ^= 0x04;
        std::fs::write(fx.path("sealed"), &sealed).unwrap();

        let err = decrypt_file(
            &fx.path("sealed"),
            &fx.path("out"),
            &Password::new("pw"),
            &fast_mode(),
            4096,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Authentication(AuthFailure::Payload)));
        assert!(!fx.path("out").exists());
    }

    #[test]
    fn test_generate_is_deterministic() {
        let fx = Fixture::new();
        let password = Password::new("same");

        generate_keyfile(&fx.path("a"), &password, &fast_mode()).unwrap();
        generate_keyfile(&fx.path("b"), &password, &fast_mode()).unwrap();

        assert_eq!(std::fs::read(fx.path("a")).unwrap(), std::fs::read(fx.path("b")).unwrap());
    }

    #[test]
    fn test_missing_input() {
        let fx = Fixture::new();
        let err = decrypt_file(
            &fx.path("absent"),
            &fx.path("out"),
            &Password::new("pw"),
            &fast_mode(),
            4096,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
