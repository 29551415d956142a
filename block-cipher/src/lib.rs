//! # Block Cipher Library
//!
//! The contract every block cipher engine in this workspace conforms to, the
//! parameters used to initialise one, and the pieces built on top of that
//! contract.
//!
//! ## Contents
//!
//! - [`BlockCipher`] - engine trait: name, block size, init, process one block, reset
//! - [`KeyParameter`] / [`ParametersWithIv`] - key material, optionally bundled with an IV
//! - [`CbcBlockCipher`] - Cipher Block Chaining over any engine
//! - [`CipherSink`] - `std::io::Write` adapter with optional PKCS#7 padding
//! - [`CipherSource`] - `std::io::Read` adapter that adds or strips PKCS#7 padding
//! - [`DummyEngine`] - toy engine for tests and demos
//!
//! ## Usage
//!
//! ```rust
//! use block_cipher::{
//!     BlockCipher, CbcBlockCipher, Direction, DummyEngine, KeyParameter, ParametersWithIv,
//! };
//!
//! let key = KeyParameter::new(b"my-secret-key-16");
//! let params = ParametersWithIv::new(key, b"initialization16");
//!
//! let mut cipher = CbcBlockCipher::new(DummyEngine::new(16)?);
//! cipher.init(Direction::Encrypt, params.into())?;
//!
//! let plaintext = b"exactly 16 bytes";
//! let mut ciphertext = [0u8; 16];
//! assert_eq!(cipher.process_block(plaintext, 0, &mut ciphertext, 0)?, 16);
//! # Ok::<(), block_cipher::CipherError>(())
//! ```

// Public modules
pub mod cipher;
pub mod error;
pub mod modes;
pub mod params;
pub mod sink;
pub mod source;
pub mod utils;

// Re-exports for easy access
pub use cipher::{BlockCipher, Direction};
pub use error::{CipherError, Result};
pub use modes::CbcBlockCipher;
pub use params::{CipherParameters, KeyParameter, ParametersWithIv};
pub use sink::{CipherSink, Padding};
pub use source::CipherSource;

use tracing::debug;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Dummy engine for testing and demonstration
///
/// Each byte is XORed with the key and rotated left by three bits; decryption
/// undoes both. It should **never** be used in production. Its only purpose is
/// to exercise modes and sinks without a real cipher.
///
/// In-place processing is safe: every output byte depends only on the input byte
/// at the same position.
///
/// # Example
///
/// ```rust
/// use block_cipher::{BlockCipher, DummyEngine};
///
/// let engine = DummyEngine::new(16)?;
/// assert_eq!(engine.block_size(), 16);
/// # Ok::<(), block_cipher::CipherError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DummyEngine {
    block_size: usize,
    state: Option<EngineState>,
}

#[derive(Debug, Clone)]
struct EngineState {
    direction: Direction,
    round_key: Vec<u8>,
}

impl DummyEngine {
    /// Create an uninitialised engine with the given block size in bytes.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidBlockSize`] if `block_size` is zero.
    pub fn new(block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(CipherError::InvalidBlockSize);
        }
        Ok(Self {
            block_size,
            state: None,
        })
    }

    pub fn is_initialised(&self) -> bool {
        self.state.is_some()
    }
}

impl BlockCipher for DummyEngine {
    fn algorithm_name(&self) -> String {
        "Dummy".to_string()
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn init(&mut self, direction: Direction, params: CipherParameters) -> Result<()> {
        let key = match params {
            CipherParameters::Key(key) => key,
            CipherParameters::WithIv(_) => {
                return Err(CipherError::InvalidParameter(
                    "Dummy engine does not take an IV; wrap it in a mode".to_string(),
                ));
            }
        };

        if key.is_empty() {
            return Err(CipherError::InvalidParameter(
                "Key cannot be empty".to_string(),
            ));
        }

        // Repeating key pattern, copied out of the caller's key.
        let round_key = key.key().iter().cycle().take(self.block_size).copied().collect();
        self.state = Some(EngineState {
            direction,
            round_key,
        });

        debug!(block_size = self.block_size, %direction, "dummy engine initialised");
        Ok(())
    }

    fn process_block(
        &mut self,
        input: &[u8],
        in_off: usize,
        output: &mut [u8],
        out_off: usize,
    ) -> Result<usize> {
        utils::check_block_bounds(input.len(), in_off, output.len(), out_off, self.block_size)?;

        let state = self
            .state
            .as_ref()
            .ok_or_else(|| CipherError::IllegalState("Dummy engine not initialised".to_string()))?;

        let input = &input[in_off..in_off + self.block_size];
        let output = &mut output[out_off..out_off + self.block_size];
        let bytes = input.iter().zip(&state.round_key).zip(output.iter_mut());

        match state.direction {
            Direction::Encrypt => bytes.for_each(|((i, k), o)| *o = (i ^ k).rotate_left(3)),
            Direction::Decrypt => bytes.for_each(|((i, k), o)| *o = i.rotate_right(3) ^ k),
        }

        Ok(self.block_size)
    }

    fn reset(&mut self) {
        // No chaining state; the round key survives.
    }

    fn process_block_in_place(&mut self, buf: &mut [u8], off: usize) -> Result<usize> {
        let block_size = self.block_size;
        utils::check_block_bounds(buf.len(), off, buf.len(), off, block_size)?;

        let state = self
            .state
            .as_ref()
            .ok_or_else(|| CipherError::IllegalState("Dummy engine not initialised".to_string()))?;

        let block = &mut buf[off..off + block_size];
        let bytes = block.iter_mut().zip(&state.round_key);
        match state.direction {
            Direction::Encrypt => bytes.for_each(|(b, k)| *b = (*b ^ k).rotate_left(3)),
            Direction::Decrypt => bytes.for_each(|(b, k)| *b = b.rotate_right(3) ^ k),
        }

        Ok(block_size)
    }
}
