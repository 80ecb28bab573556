//! Byte buffers for framed records and handshake data.
//!
//! [`Buf`] wraps `Vec<u8>` with the handful of operations the record layer
//! needs, and a [`Debug`](fmt::Debug) that prints the length rather than
//! the (potentially large) contents.

use std::fmt;
use std::ops::{Deref, DerefMut};

/// Growable byte buffer.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Buf(Vec<u8>);

impl Buf {
    /// Create a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty buffer able to hold `capacity` bytes without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        Buf(Vec::with_capacity(capacity))
    }

    /// Create a new buffer from a slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Buf(data.to_vec())
    }

    /// Clear the buffer, removing all data.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Extend the buffer with a slice of bytes.
    pub fn extend_from_slice(&mut self, other: &[u8]) {
        self.0.extend_from_slice(other);
    }

    /// Push a single byte onto the buffer.
    pub fn push(&mut self, byte: u8) {
        self.0.push(byte);
    }

    /// Truncate the buffer to the specified length.
    /// If `len` is greater than the buffer's current length, this has no effect.
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    /// Remove the first `n` bytes, shifting the rest to the front.
    pub fn consume(&mut self, n: usize) {
        self.0.drain(..n.min(self.0.len()));
    }

    /// Convert the buffer into the underlying `Vec<u8>`.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Buf {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Buf {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl AsRef<[u8]> for Buf {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl AsMut<[u8]> for Buf {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl From<Vec<u8>> for Buf {
    fn from(value: Vec<u8>) -> Self {
        Buf(value)
    }
}

impl From<&[u8]> for Buf {
    fn from(value: &[u8]) -> Self {
        Buf::from_slice(value)
    }
}

impl fmt::Debug for Buf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buf").field("len", &self.0.len()).finish()
    }
}

/// In-place AEAD operations append the tag to, and strip it from, a `Buf`.
impl aes_gcm::aead::Buffer for Buf {
    fn extend_from_slice(&mut self, other: &[u8]) -> Result<(), aes_gcm::aead::Error> {
        self.0.extend_from_slice(other);
        Ok(())
    }

    fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }
}
