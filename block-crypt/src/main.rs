//! Block cipher command-line tool
//!
//! Encrypts or decrypts a hex file with the dummy engine from `block-cipher`,
//! in CBC mode when an IV file is given and block by block otherwise.
//! Encryption adds PKCS#7 padding, decryption removes it.

use std::fs;
use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use block_cipher::{
    BlockCipher, CbcBlockCipher, CipherParameters, CipherSink, CipherSource, Direction,
    DummyEngine, KeyParameter, Padding, ParametersWithIv,
};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Command-line arguments for the block cipher program.
#[derive(Parser, Debug)]
struct Cli {
    /// Path to the input file.
    #[arg(short, long, help = "Path to the input file (hex)")]
    file: String,

    /// Key for the cipher.
    #[arg(short, long, help = "File contains the Key for the cipher (hex)")]
    key: String,

    /// Initialisation vector; switches to CBC mode.
    #[arg(short, long, help = "File contains the IV (hex), enables CBC mode")]
    iv: Option<String>,

    /// Path to the output file.
    #[arg(short, long, help = "Path to the output file")]
    output: String,

    /// Mode of operation (encrypt or decrypt).
    #[arg(short, long, help = "Mode of operation (encrypt/decrypt)")]
    mode: OperationMode,

    /// Block size of the dummy engine in bytes.
    #[arg(short, long, default_value_t = 16, help = "Block size in bytes (1-255)")]
    block_size: usize,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, default_value = "warn", help = "Log level (error/warn/info/debug/trace)")]
    log_level: String,
}

/// Enum representing the mode of operation for the cipher.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OperationMode {
    /// Encrypt mode.
    Encrypt,
    /// Decrypt mode.
    Decrypt,
}

impl From<OperationMode> for Direction {
    fn from(mode: OperationMode) -> Self {
        match mode {
            OperationMode::Encrypt => Direction::Encrypt,
            OperationMode::Decrypt => Direction::Decrypt,
        }
    }
}

/// Reads hex data from a file, ignoring whitespace and line breaks
fn read_hex_from_file(filename: &str) -> Result<Vec<u8>> {
    let content = fs::read_to_string(filename)
        .with_context(|| format!("failed to read {filename}"))?;

    let hex_string: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&hex_string).with_context(|| format!("{filename} is not valid hex"))
}

/// Writes bytes as space-separated hex
fn write_hex_to_file(filename: &str, data: &[u8]) -> Result<()> {
    let hex_string = data
        .chunks(1)
        .map(hex::encode)
        .collect::<Vec<String>>()
        .join(" ");

    fs::write(filename, hex_string).with_context(|| format!("failed to write {filename}"))
}

/// Build the engine for the requested mode, already initialised.
fn build_cipher(cli: &Cli, key: Vec<u8>) -> Result<Box<dyn BlockCipher>> {
    let engine = DummyEngine::new(cli.block_size)?;
    let key = KeyParameter::from(key);

    let (mut cipher, params): (Box<dyn BlockCipher>, CipherParameters) = match &cli.iv {
        Some(path) => {
            let iv = read_hex_from_file(path)?;
            let params = ParametersWithIv::new(key, &iv);
            (Box::new(CbcBlockCipher::new(engine)), params.into())
        }
        None => (Box::new(engine), key.into()),
    };

    cipher
        .init(cli.mode.into(), params)
        .context("failed to initialise cipher")?;
    Ok(cipher)
}

fn run(cli: &Cli) -> Result<Vec<u8>> {
    if cli.block_size == 0 || cli.block_size > 255 {
        bail!("block size must be between 1 and 255, got {}", cli.block_size);
    }

    let input = read_hex_from_file(&cli.file)?;
    let key = read_hex_from_file(&cli.key)?;
    let cipher = build_cipher(cli, key)?;

    info!(
        algorithm = %cipher.algorithm_name(),
        mode = ?cli.mode,
        bytes = input.len(),
        "processing input"
    );

    match cli.mode {
        OperationMode::Encrypt => {
            let output = Vec::with_capacity(input.len() + cli.block_size);
            let mut sink = CipherSink::new(output, cipher, Padding::Pkcs7)?;
            sink.write_all(&input)?;
            Ok(sink.finish()?)
        }
        OperationMode::Decrypt => {
            let mut source = CipherSource::decrypting(&input[..], cipher, Padding::Pkcs7)?;
            let mut output = Vec::with_capacity(input.len());
            source.read_to_end(&mut output)?;
            Ok(output)
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(&cli)?;
    write_hex_to_file(&cli.output, &result)?;

    debug!(output = %cli.output, bytes = result.len(), "wrote output");
    Ok(())
}
