//! Generic block cipher trait

use std::fmt;

use crate::error::Result;
use crate::params::CipherParameters;

/// Which transform an engine applies after `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    pub fn is_encrypt(self) -> bool {
        self == Direction::Encrypt
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Encrypt => f.write_str("encrypt"),
            Direction::Decrypt => f.write_str("decrypt"),
        }
    }
}

/// Contract every block cipher engine conforms to.
///
/// An engine starts out uninitialised. [`init`](BlockCipher::init) gives it a key
/// and a direction, after which [`process_block`](BlockCipher::process_block)
/// transforms one block per call. Modes of operation are written against this
/// trait only, so any engine (or another mode) can sit underneath them.
///
/// Engines hold mutable state and take `&mut self`; share one across threads
/// behind a caller-owned lock, or give each worker its own instance.
pub trait BlockCipher {
    /// Name of the algorithm, e.g. `"AES"`. Answerable in any state.
    fn algorithm_name(&self) -> String;

    /// Bytes consumed and produced per block. Positive and fixed for the
    /// lifetime of the instance, answerable in any state.
    fn block_size(&self) -> usize;

    /// Derive the key schedule from `params` and fix the direction.
    ///
    /// Calling it again replaces both.
    fn init(&mut self, direction: Direction, params: CipherParameters) -> Result<()>;

    /// Transform `input[in_off..in_off + block_size]` into
    /// `output[out_off..out_off + block_size]`.
    ///
    /// Returns the number of bytes processed, which is always `block_size()`.
    ///
    /// # Errors
    ///
    /// - [`CipherError::DataLength`](crate::CipherError::DataLength) if either buffer
    ///   is too short at its offset. Buffer lengths are checked before the state,
    ///   so this is reported even on an uninitialised engine.
    /// - [`CipherError::IllegalState`](crate::CipherError::IllegalState) if `init`
    ///   has not succeeded yet.
    fn process_block(
        &mut self,
        input: &[u8],
        in_off: usize,
        output: &mut [u8],
        out_off: usize,
    ) -> Result<usize>;

    /// Return to the state right after the last successful `init`.
    ///
    /// Transient state such as a chaining value is cleared, the key schedule is
    /// kept. Does nothing on an engine that was never initialised.
    fn reset(&mut self);

    /// Transform the block at `buf[off..off + block_size]` in place.
    ///
    /// The default copies the block out first; engines that can work in place
    /// may override it.
    fn process_block_in_place(&mut self, buf: &mut [u8], off: usize) -> Result<usize> {
        let block_size = self.block_size();
        let input = crate::utils::block_at(buf, off, block_size, "input")?.to_vec();
        self.process_block(&input, 0, buf, off)
    }
}

impl<C: BlockCipher + ?Sized> BlockCipher for Box<C> {
    fn algorithm_name(&self) -> String {
        (**self).algorithm_name()
    }

    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn init(&mut self, direction: Direction, params: CipherParameters) -> Result<()> {
        (**self).init(direction, params)
    }

    fn process_block(
        &mut self,
        input: &[u8],
        in_off: usize,
        output: &mut [u8],
        out_off: usize,
    ) -> Result<usize> {
        (**self).process_block(input, in_off, output, out_off)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn process_block_in_place(&mut self, buf: &mut [u8], off: usize) -> Result<usize> {
        (**self).process_block_in_place(buf, off)
    }
}
