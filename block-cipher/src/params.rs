//! Keying material handed to [`BlockCipher::init`](crate::BlockCipher::init)

use std::fmt;

use crate::error::{CipherError, Result};

/// Secret key bytes for an engine.
///
/// The bytes are opaque to this crate; each engine decides which lengths it accepts.
/// `Debug` never prints them.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyParameter {
    key: Vec<u8>,
}

impl KeyParameter {
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl From<Vec<u8>> for KeyParameter {
    fn from(key: Vec<u8>) -> Self {
        Self { key }
    }
}

impl fmt::Debug for KeyParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyParameter")
            .field("len", &self.key.len())
            .finish_non_exhaustive()
    }
}

/// A key paired with an initialisation vector, for modes such as CBC.
///
/// The IV is copied out of the caller's buffer when the bundle is built, so
/// changing that buffer afterwards has no effect on the bundle.
#[derive(Debug, Clone)]
pub struct ParametersWithIv {
    iv: Box<[u8]>,
    parameters: KeyParameter,
}

impl ParametersWithIv {
    /// Bundle `parameters` with the whole of `iv`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use block_cipher::{KeyParameter, ParametersWithIv};
    ///
    /// let iv: Vec<u8> = (0u8..16).collect();
    /// let params = ParametersWithIv::new(KeyParameter::new(b"my-secret-key-16"), &iv);
    /// assert_eq!(params.iv(), &iv[..]);
    /// ```
    pub fn new(parameters: KeyParameter, iv: &[u8]) -> Self {
        Self {
            iv: iv.into(),
            parameters,
        }
    }

    /// Bundle `parameters` with `iv[iv_off..iv_off + iv_len]`.
    ///
    /// # Errors
    ///
    /// [`CipherError::OutOfRange`] when the range does not fit inside `iv`.
    pub fn with_range(
        parameters: KeyParameter,
        iv: &[u8],
        iv_off: usize,
        iv_len: usize,
    ) -> Result<Self> {
        let range = iv_off
            .checked_add(iv_len)
            .and_then(|end| iv.get(iv_off..end))
            .ok_or(CipherError::OutOfRange {
                offset: iv_off,
                len: iv_len,
                available: iv.len(),
            })?;

        Ok(Self::new(parameters, range))
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn parameters(&self) -> &KeyParameter {
        &self.parameters
    }
}

/// What an engine can be initialised with.
#[derive(Debug, Clone)]
pub enum CipherParameters {
    Key(KeyParameter),
    WithIv(ParametersWithIv),
}

impl CipherParameters {
    /// The key, whether or not an IV travels with it.
    pub fn key_parameter(&self) -> &KeyParameter {
        match self {
            CipherParameters::Key(key) => key,
            CipherParameters::WithIv(params) => params.parameters(),
        }
    }
}

impl From<KeyParameter> for CipherParameters {
    fn from(key: KeyParameter) -> Self {
        CipherParameters::Key(key)
    }
}

impl From<ParametersWithIv> for CipherParameters {
    fn from(params: ParametersWithIv) -> Self {
        CipherParameters::WithIv(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> KeyParameter {
        KeyParameter::new(b"test-key-16-byte")
    }

    #[test]
    fn whole_iv_is_captured() {
        let iv: Vec<u8> = (0x00u8..=0x0f).collect();
        let params = ParametersWithIv::with_range(key(), &iv, 0, 16).unwrap();

        assert_eq!(hex::encode(params.iv()), "000102030405060708090a0b0c0d0e0f");
    }

    #[test]
    fn sub_range_is_captured() {
        let buf: Vec<u8> = (0u8..32).collect();
        let params = ParametersWithIv::with_range(key(), &buf, 8, 16).unwrap();

        assert_eq!(params.iv(), &buf[8..24]);
        assert_eq!(params.iv().len(), 16);
    }

    #[test]
    fn iv_is_independent_of_caller_buffer() {
        let mut buf = vec![0xAAu8; 16];
        let params = ParametersWithIv::with_range(key(), &buf, 0, 16).unwrap();

        buf.iter_mut().for_each(|b| *b = 0x55);

        assert_eq!(params.iv(), &[0xAA; 16]);
    }

    #[test]
    fn range_past_end_fails() {
        let buf = [0u8; 16];
        let result = ParametersWithIv::with_range(key(), &buf, 1, 16);

        assert!(matches!(
            result,
            Err(CipherError::OutOfRange {
                offset: 1,
                len: 16,
                available: 16
            })
        ));
    }

    #[test]
    fn overflowing_range_fails() {
        let buf = [0u8; 16];
        let result = ParametersWithIv::with_range(key(), &buf, usize::MAX, 2);

        assert!(matches!(result, Err(CipherError::OutOfRange { .. })));
    }

    #[test]
    fn empty_range_at_end_is_allowed() {
        let buf = [0u8; 4];
        let params = ParametersWithIv::with_range(key(), &buf, 4, 0).unwrap();
        assert!(params.iv().is_empty());
    }

    #[test]
    fn key_parameter_is_passed_through() {
        let params = ParametersWithIv::new(key(), &[1, 2, 3]);
        assert_eq!(params.parameters(), &key());

        let wrapped = CipherParameters::from(params);
        assert_eq!(wrapped.key_parameter().key(), b"test-key-16-byte");
    }

    #[test]
    fn debug_hides_key_bytes() {
        let rendered = format!("{:?}", KeyParameter::new(b"super-secret"));
        assert!(!rendered.contains("115"));
        assert!(rendered.contains("len: 12"));
    }
}
