//! Streaming reader that runs everything read through it through a block cipher

use std::io::{self, Read};

use tracing::trace;

use crate::cipher::BlockCipher;
use crate::error::{CipherError, Result};
use crate::sink::Padding;
use crate::utils;

const READ_CHUNK: usize = 8192;

/// A [`Read`] adapter that encrypts or decrypts `inner` block by block.
///
/// Built with [`encrypting`](CipherSource::encrypting), PKCS#7 padding is added
/// at end of input. Built with [`decrypting`](CipherSource::decrypting), the last
/// block is held back until the inner reader reports end of input, then the
/// padding is checked and stripped. With [`Padding::None`] the input must be a
/// whole number of blocks either way.
///
/// # Example
///
/// ```rust
/// use std::io::Read;
/// use block_cipher::{BlockCipher, CipherSource, Direction, DummyEngine, KeyParameter, Padding};
///
/// let key = KeyParameter::new(b"my-secret-key-16");
/// let mut enc = DummyEngine::new(16)?;
/// enc.init(Direction::Encrypt, key.clone().into())?;
/// let mut dec = DummyEngine::new(16)?;
/// dec.init(Direction::Decrypt, key.into())?;
///
/// let mut ciphertext = Vec::new();
/// CipherSource::encrypting(&b"Hello, World!"[..], enc, Padding::Pkcs7)?
///     .read_to_end(&mut ciphertext)?;
/// assert_eq!(ciphertext.len(), 16);
///
/// let mut plaintext = Vec::new();
/// CipherSource::decrypting(&ciphertext[..], dec, Padding::Pkcs7)?
///     .read_to_end(&mut plaintext)?;
/// assert_eq!(plaintext, b"Hello, World!");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct CipherSource<R: Read, C: BlockCipher> {
    inner: R,
    cipher: C,
    padding: Padding,
    strip: bool,
    input: Vec<u8>,
    output: Vec<u8>,
    out_pos: usize,
    chunk: Vec<u8>,
    done: bool,
}

impl<R: Read, C: BlockCipher> CipherSource<R, C> {
    /// Read plaintext from `inner`; `cipher` must be initialised for encryption.
    pub fn encrypting(inner: R, cipher: C, padding: Padding) -> Result<Self> {
        Self::new(inner, cipher, padding, false)
    }

    /// Read ciphertext from `inner`; `cipher` must be initialised for decryption.
    pub fn decrypting(inner: R, cipher: C, padding: Padding) -> Result<Self> {
        Self::new(inner, cipher, padding, true)
    }

    fn new(inner: R, cipher: C, padding: Padding, strip: bool) -> Result<Self> {
        padding.check_block_size(cipher.block_size())?;

        Ok(Self {
            inner,
            cipher,
            padding,
            strip,
            input: Vec::new(),
            output: Vec::new(),
            out_pos: 0,
            chunk: vec![0u8; READ_CHUNK],
            done: false,
        })
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn block_size(&self) -> usize {
        self.cipher.block_size()
    }

    /// Process every complete block in `input` except `keep` trailing blocks.
    fn process_input(&mut self, keep: usize) -> Result<()> {
        let block_size = self.block_size();
        let blocks = (self.input.len() / block_size).saturating_sub(keep);

        let start = self.output.len();
        self.output.resize(start + blocks * block_size, 0);

        let mut processed = 0;
        let mut result = Ok(());
        while processed < blocks {
            let off = processed * block_size;
            if let Err(err) =
                self.cipher.process_block(&self.input, off, &mut self.output, start + off)
            {
                result = Err(err);
                break;
            }
            processed += 1;
        }

        self.output.truncate(start + processed * block_size);
        self.input.drain(..processed * block_size);
        trace!(blocks = processed, "cipher source processed blocks");
        result
    }

    fn finish_input(&mut self) -> Result<()> {
        let block_size = self.block_size();

        match (self.padding, self.strip) {
            (Padding::None, _) => {
                self.process_input(0)?;
                if !self.input.is_empty() {
                    return Err(CipherError::DataLength(format!(
                        "{} trailing bytes do not fill a {block_size}-byte block",
                        self.input.len()
                    )));
                }
            }
            (Padding::Pkcs7, false) => {
                self.process_input(0)?;
                self.input = utils::pkcs7_pad(&self.input, block_size)?;
                self.process_input(0)?;
            }
            (Padding::Pkcs7, true) => {
                if self.input.len() != block_size {
                    return Err(CipherError::DataLength(format!(
                        "ciphertext must end with a whole padded {block_size}-byte block, {} \
                         trailing bytes left",
                        self.input.len()
                    )));
                }
                let start = self.output.len();
                self.process_input(0)?;
                let last = utils::pkcs7_unpad(&self.output[start..], block_size)?;
                self.output.truncate(start);
                self.output.extend_from_slice(&last);
            }
        }
        Ok(())
    }

    /// Pull more bytes from `inner` and turn whatever is ready into output.
    fn fill(&mut self) -> Result<()> {
        self.output.clear();
        self.out_pos = 0;

        let n = self.inner.read(&mut self.chunk)?;
        if n == 0 {
            self.done = true;
            return self.finish_input();
        }

        self.input.extend_from_slice(&self.chunk[..n]);
        // Hold back one full block so its padding can be stripped at end of input.
        let keep = usize::from(self.strip && self.padding == Padding::Pkcs7);
        let keep = if self.input.len() % self.block_size() == 0 { keep } else { 0 };
        self.process_input(keep)
    }
}

impl<R: Read, C: BlockCipher> Read for CipherSource<R, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.out_pos < self.output.len() {
                let n = buf.len().min(self.output.len() - self.out_pos);
                buf[..n].copy_from_slice(&self.output[self.out_pos..self.out_pos + n]);
                self.out_pos += n;
                return Ok(n);
            }
            if self.done || buf.is_empty() {
                return Ok(0);
            }
            self.fill()?;
        }
    }
}
