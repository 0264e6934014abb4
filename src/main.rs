//! warren - password-derived public-key file encryption
//!
//! Usage:
//!   warren generate --keyfile key                       - Derive a keypair, store the public key
//!   warren encrypt --keyfile key < plain > sealed       - Encrypt stdin to stdout
//!   warren decrypt --input sealed --output plain        - Decrypt (prompts for the password)
//!   warren bench                                        - Time key derivation
//!   warren init                                         - Write a default config file

use clap::{Parser, Subcommand};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use warren::{
    bench::{argon2_benchmark, difficulty_benchmark},
    config::Config,
    crypto::{KdfMode, Password},
    ops::{decrypt_file, encrypt_file, generate_keyfile},
    Error, Result,
};

#[derive(Parser)]
#[command(name = "warren")]
#[command(author = "warren Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Password-derived public-key file encryption")]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a keypair from a password and write the public key
    Generate {
        /// File to store the public key in
        #[arg(long)]
        keyfile: PathBuf,

        /// Use the hash-and-discard derivation at this difficulty instead of
        /// Argon2id. Weaker against brute force.
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// Encrypt to a public key (no password needed)
    Encrypt {
        /// Public key written by `generate`
        #[arg(long)]
        keyfile: PathBuf,

        /// Plaintext to read (default: stdin)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Where to write the container (default: stdout)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Decrypt a container, re-deriving the keypair from the password
    Decrypt {
        /// Container to decrypt
        #[arg(long)]
        input: PathBuf,

        /// Where to write the plaintext
        #[arg(long)]
        output: PathBuf,

        /// Difficulty used at `generate` time, if the weaker derivation was used
        #[arg(long)]
        difficulty: Option<u8>,
    },

    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Time key derivation at increasing difficulty
    Bench {
        /// Highest difficulty level to time
        #[arg(long, default_value_t = 16)]
        max_difficulty: u8,
    },
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(expand_tilde)
        .unwrap_or_else(Config::default_path);

    let config = match Config::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Setup logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
    }

    if let Err(e) = run_command(cli.command, &config, &config_path) {
        error!("Error: {}", e);
        if e.is_authentication() {
            error!("Check the password and that the derivation settings match those used by `generate`");
        }
        std::process::exit(1);
    }
}

fn run_command(command: Commands, config: &Config, config_path: &Path) -> Result<()> {
    match command {
        Commands::Generate {
            keyfile,
            difficulty,
        } => cmd_generate(config, &keyfile, difficulty),

        Commands::Encrypt {
            keyfile,
            input,
            output,
        } => cmd_encrypt(config, &keyfile, input.as_deref(), output.as_deref()),

        Commands::Decrypt {
            input,
            output,
            difficulty,
        } => cmd_decrypt(config, &input, &output, difficulty),

        Commands::Init { force } => cmd_init(config, config_path, force),

        Commands::Bench { max_difficulty } => cmd_bench(config, max_difficulty),
    }
}

fn kdf_mode(config: &Config, difficulty: Option<u8>) -> KdfMode {
    match difficulty {
        Some(difficulty) => {
            warn!(
                difficulty,
                "Using hash-and-discard derivation; this is weaker than Argon2id"
            );
            KdfMode::Difficulty(difficulty)
        }
        None => KdfMode::Argon2id(config.kdf),
    }
}

fn cmd_generate(config: &Config, keyfile: &Path, difficulty: Option<u8>) -> Result<()> {
    let mode = kdf_mode(config, difficulty);
    let password = prompt_password("Enter password: ")?;

    info!("Deriving keypair...");
    let public = generate_keyfile(keyfile, &password, &mode)?;
    info!("Public key: {}", hex::encode(public.as_bytes()));

    Ok(())
}

fn cmd_encrypt(
    config: &Config,
    keyfile: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
) -> Result<()> {
    encrypt_file(keyfile, input, output, config.stream.buffer_size)?;
    Ok(())
}

fn cmd_decrypt(config: &Config, input: &Path, output: &Path, difficulty: Option<u8>) -> Result<()> {
    let mode = kdf_mode(config, difficulty);
    let password = prompt_password("Enter password: ")?;

    info!("Deriving keypair...");
    decrypt_file(input, output, &password, &mode, config.stream.buffer_size)?;

    Ok(())
}

fn cmd_init(config: &Config, config_path: &Path, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        return Err(Error::Config(format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    config.save(config_path)?;
    info!("Wrote config to {}", config_path.display());

    Ok(())
}

fn cmd_bench(config: &Config, max_difficulty: u8) -> Result<()> {
    let password = Password::new("warren benchmark password");

    println!("difficulty  elapsed");
    for sample in difficulty_benchmark(&password, max_difficulty)? {
        if let KdfMode::Difficulty(level) = sample.mode {
            println!("{:>10}  {:?}", level, sample.elapsed);
        }
    }

    let argon2 = argon2_benchmark(&password, config.kdf)?;
    println!(
        "argon2id (m={} KiB, t={}, p={}): {:?}",
        config.kdf.memory_kib, config.kdf.iterations, config.kdf.parallelism, argon2.elapsed
    );

    Ok(())
}

/// Prompt on stderr and read one line of password.
///
/// On a terminal the input is not echoed. Otherwise a line is read from
/// standard input so the password can be piped in.
fn prompt_password(prompt: &str) -> Result<Password> {
    if std::io::stdin().is_terminal() {
        let password = rpassword::prompt_password(prompt)?;
        return Ok(Password::from_line(password));
    }

    eprint!("{}", prompt);
    std::io::stderr().flush()?;

    Password::read_line(std::io::stdin().lock())
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
