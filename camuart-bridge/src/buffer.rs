//! Host-side input buffer.
//!
//! Bytes arrive in receive order and are appended at the tail; reads consume
//! from the head. The buffer never reorders or duplicates: a take of `n`
//! bytes removes exactly the first `n` and leaves the remainder untouched.

use bytes::{Buf, BytesMut};

/// The bridge-owned receive buffer.
#[derive(Debug, Default)]
pub struct InputBuffer {
    data: BytesMut,
}

impl InputBuffer {
    pub fn new() -> InputBuffer {
        InputBuffer {
            data: BytesMut::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Append received bytes at the tail.
    pub fn push(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Remove and return the first `n` bytes, or fewer if the buffer is
    /// shorter.
    pub fn take(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.data.len());
        self.data.split_to(n).to_vec()
    }

    /// Remove and return everything.
    pub fn take_all(&mut self) -> Vec<u8> {
        let len = self.data.len();
        self.take(len)
    }

    /// Drop the first `n` bytes without returning them.
    pub fn discard(&mut self, n: usize) {
        let n = n.min(self.data.len());
        self.data.advance(n);
    }

    /// Index of the first occurrence of `needle`, if present.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }
        if needle.len() > self.data.len() {
            return None;
        }
        self.data.windows(needle.len()).position(|w| w == needle)
    }
}
