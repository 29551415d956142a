//! Streaming writer that runs everything written to it through a block cipher

use std::io::{self, Write};

use tracing::{debug, trace};

use crate::cipher::BlockCipher;
use crate::error::{CipherError, Result};

/// How the trailing partial block is treated at end of stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Padding {
    /// Input must be a whole number of blocks.
    None,
    /// PKCS#7: always adds 1 to `block_size` bytes, so aligned input gains a full block.
    #[default]
    Pkcs7,
}

impl Padding {
    pub(crate) fn check_block_size(self, block_size: usize) -> Result<()> {
        if block_size == 0 || (self == Padding::Pkcs7 && block_size > 255) {
            return Err(CipherError::InvalidBlockSize);
        }
        Ok(())
    }
}

/// A [`Write`] adapter that encrypts (or decrypts) block by block into `inner`.
///
/// Bytes that do not yet fill a block are held back until more data arrives or
/// [`finish`](CipherSink::finish) is called. Dropping the sink without calling
/// `finish` discards those bytes.
///
/// Every byte accepted by `write` is run through the cipher exactly once. If the
/// inner writer fails after that, the ciphertext stays queued in the sink and is
/// written out first on the next `write`, `flush` or `finish`. An `Err` from
/// `write` means none of the caller's bytes were taken.
///
/// # Example
///
/// ```rust
/// use std::io::Write;
/// use block_cipher::{BlockCipher, CipherSink, Direction, DummyEngine, KeyParameter, Padding};
///
/// let mut engine = DummyEngine::new(16)?;
/// engine.init(Direction::Encrypt, KeyParameter::new(b"my-secret-key-16").into())?;
///
/// let mut sink = CipherSink::new(Vec::new(), engine, Padding::Pkcs7)?;
/// sink.write_all(b"Hello, World!")?;
/// let ciphertext = sink.finish()?;
/// assert_eq!(ciphertext.len(), 16);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct CipherSink<W: Write, C: BlockCipher> {
    inner: W,
    cipher: C,
    padding: Padding,
    buffer: Vec<u8>,
    buffered: usize,
    scratch: Vec<u8>,
    queued: Vec<u8>,
}

impl<W: Write, C: BlockCipher> CipherSink<W, C> {
    /// Wrap `inner`. `cipher` must already be initialised.
    ///
    /// # Errors
    ///
    /// [`CipherError::InvalidBlockSize`] when PKCS#7 is requested for a block size
    /// it cannot express (above 255 bytes).
    pub fn new(inner: W, cipher: C, padding: Padding) -> Result<Self> {
        let block_size = cipher.block_size();
        padding.check_block_size(block_size)?;

        Ok(Self {
            inner,
            cipher,
            padding,
            buffer: vec![0u8; block_size],
            buffered: 0,
            scratch: vec![0u8; block_size],
            queued: Vec::new(),
        })
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Bytes held back waiting for a full block.
    pub fn pending(&self) -> usize {
        self.buffered
    }

    /// Processed bytes the inner writer has not accepted yet.
    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    /// Process the held-back bytes according to the padding rule, flush, and
    /// hand back the inner writer.
    pub fn finish(mut self) -> Result<W> {
        self.drain()?;
        let block_size = self.buffer.len();

        match self.padding {
            Padding::None if self.buffered != 0 => {
                return Err(CipherError::DataLength(format!(
                    "{} trailing bytes do not fill a {block_size}-byte block",
                    self.buffered
                )));
            }
            Padding::None => {}
            Padding::Pkcs7 => {
                let code = (block_size - self.buffered) as u8;
                self.buffer[self.buffered..].fill(code);

                let block = std::mem::take(&mut self.buffer);
                self.process(&block, 0)?;
                self.buffered = 0;
                self.drain()?;
            }
        }

        self.inner.flush()?;
        Ok(self.inner)
    }

    fn process(&mut self, input: &[u8], in_off: usize) -> Result<()> {
        let n = self.cipher.process_block(input, in_off, &mut self.scratch, 0)?;
        self.queued.extend_from_slice(&self.scratch[..n]);
        trace!(bytes = n, "cipher sink processed block");
        Ok(())
    }

    /// Hand queued output to the inner writer, keeping whatever it refuses.
    fn drain(&mut self) -> io::Result<()> {
        while !self.queued.is_empty() {
            match self.inner.write(&self.queued) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => {
                    self.queued.drain(..n);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Run as much of `data` as possible through the cipher.
    ///
    /// Returns how many bytes were taken, plus the error that stopped it early.
    /// The held-back block is only replaced once its completion was processed.
    fn absorb(&mut self, data: &[u8]) -> (usize, Result<()>) {
        let block_size = self.buffer.len();
        let mut consumed = 0;

        if self.buffered > 0 {
            let take = (block_size - self.buffered).min(data.len());
            if self.buffered + take < block_size {
                self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
                self.buffered += take;
                return (take, Ok(()));
            }

            let mut block = self.buffer.clone();
            block[self.buffered..].copy_from_slice(&data[..take]);
            if let Err(err) = self.process(&block, 0) {
                return (0, Err(err));
            }
            self.buffered = 0;
            consumed = take;
        }

        while data.len() - consumed >= block_size {
            if let Err(err) = self.process(data, consumed) {
                return (consumed, Err(err));
            }
            consumed += block_size;
        }

        let rest = &data[consumed..];
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffered = rest.len();
        (data.len(), Ok(()))
    }
}

impl<W: Write, C: BlockCipher> Write for CipherSink<W, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.drain()?;

        let (consumed, result) = self.absorb(buf);
        match result {
            Err(err) if consumed == 0 => return Err(err.into()),
            Err(err) => debug!(%err, consumed, "cipher sink stopped early"),
            Ok(()) => {}
        }

        // Output is queued now; a refusal here resurfaces on the next call.
        if let Err(err) = self.drain() {
            debug!(%err, queued = self.queued.len(), "inner writer deferred");
        }
        Ok(consumed)
    }

    /// Writes out queued output and flushes the inner writer. A partial block
    /// stays buffered.
    fn flush(&mut self) -> io::Result<()> {
        self.drain()?;
        self.inner.flush()
    }
}
