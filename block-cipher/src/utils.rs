//! Utility functions shared by engines, modes and the sink

use crate::error::{CipherError, Result};

/// Borrow `buf[off..off + len]`, or fail with a data-length error naming `what`.
pub fn block_at<'a>(buf: &'a [u8], off: usize, len: usize, what: &str) -> Result<&'a [u8]> {
    off.checked_add(len)
        .and_then(|end| buf.get(off..end))
        .ok_or_else(|| too_short(what, buf.len(), off, len))
}

/// Check that one whole block fits in both buffers at the given offsets.
pub fn check_block_bounds(
    input_len: usize,
    in_off: usize,
    output_len: usize,
    out_off: usize,
    block_size: usize,
) -> Result<()> {
    if in_off.checked_add(block_size).map_or(true, |end| end > input_len) {
        return Err(too_short("input", input_len, in_off, block_size));
    }
    if out_off.checked_add(block_size).map_or(true, |end| end > output_len) {
        return Err(too_short("output", output_len, out_off, block_size));
    }
    Ok(())
}

fn too_short(what: &str, available: usize, off: usize, len: usize) -> CipherError {
    CipherError::DataLength(format!(
        "{what} buffer too short: need {len} bytes at offset {off}, have {available}"
    ))
}

/// XOR `src` into `dst` byte by byte.
pub fn xor_in_place(dst: &mut [u8], src: &[u8]) -> Result<()> {
    if dst.len() != src.len() {
        return Err(CipherError::DataLength(
            "Blocks have different lengths for XOR".to_string(),
        ));
    }

    dst.iter_mut().zip(src).for_each(|(d, s)| *d ^= s);
    Ok(())
}

/// Add PKCS#7 padding. Always appends between 1 and `block_size` bytes.
pub fn pkcs7_pad(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    if block_size == 0 || block_size > 255 {
        return Err(CipherError::InvalidBlockSize);
    }

    let padding_needed = block_size - data.len() % block_size;
    let mut padded = Vec::with_capacity(data.len() + padding_needed);
    padded.extend_from_slice(data);
    padded.resize(data.len() + padding_needed, padding_needed as u8);
    Ok(padded)
}

/// Validate and strip PKCS#7 padding.
pub fn pkcs7_unpad(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    if block_size == 0 || block_size > 255 {
        return Err(CipherError::InvalidBlockSize);
    }
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(CipherError::Padding);
    }

    let code = data[data.len() - 1] as usize;
    if code == 0 || code > block_size {
        return Err(CipherError::Padding);
    }

    let (body, padding) = data.split_at(data.len() - code);
    if padding.iter().any(|&b| b as usize != code) {
        return Err(CipherError::Padding);
    }

    Ok(body.to_vec())
}
