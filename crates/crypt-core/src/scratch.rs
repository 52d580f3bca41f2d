//! Views over the caller-owned output and scratch areas.
//!
//! A hash method never sees raw buffers. It receives an [`Output`] that only
//! accepts a complete, NUL-terminated result, and a [`Scratch`] from which it
//! claims working memory. Both check capacity before writing; neither can
//! leave a partial result behind.

use zeroize::Zeroize;

use crate::error::{CryptError, Result};

/// Fixed-capacity working area shared by every method. Wiped on drop.
pub struct Scratch<'a> {
    buf: &'a mut [u8],
}

impl<'a> Scratch<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Borrow `len` zeroed bytes of working memory, or `Range` if the area is
    /// too small.
    pub fn claim(&mut self, len: usize) -> Result<&mut [u8]> {
        let region = self.buf.get_mut(..len).ok_or(CryptError::Range)?;
        region.zeroize();
        Ok(region)
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}

/// Output area. Holds the failure token until [`Output::commit`] succeeds.
pub struct Output<'a> {
    buf: &'a mut [u8],
}

impl<'a> Output<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Fail with `Range` unless `n` bytes (terminator included) fit.
    pub fn require(&self, n: usize) -> Result<()> {
        if self.buf.len() < n {
            return Err(CryptError::Range);
        }
        Ok(())
    }

    /// Replace the contents with `text` plus a NUL terminator.
    pub fn commit(&mut self, text: &[u8]) -> Result<()> {
        self.require(text.len() + 1)?;
        self.buf[..text.len()].copy_from_slice(text);
        self.buf[text.len()] = 0;
        Ok(())
    }
}

/// The NUL-terminated prefix of `buf` (all of it if no NUL is present).
pub fn c_str(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}
