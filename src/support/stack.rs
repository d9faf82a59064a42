//! Append-only byte buffer with drain-and-clear semantics.

use bytes::BytesMut;
use std::string::FromUtf8Error;

/// Growable scratch buffer that is drained in one piece.
///
/// Pushes append; [`ByteStack::pop`] hands back everything accumulated so far
/// and leaves the stack empty whether or not the bytes were valid UTF-8.
#[derive(Debug, Default, Clone)]
pub struct ByteStack {
    data: BytesMut,
}

impl ByteStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a string, returning the number of bytes written.
    pub fn push(&mut self, data: &str) -> usize {
        self.data.extend_from_slice(data.as_bytes());
        data.len()
    }

    /// Push a single byte.
    pub fn push_byte(&mut self, byte: u8) -> usize {
        self.data.extend_from_slice(&[byte]);
        1
    }

    /// Push a byte slice, returning the number of bytes written.
    pub fn push_bytes(&mut self, data: &[u8]) -> usize {
        self.data.extend_from_slice(data);
        data.len()
    }

    /// Drain the stack into a string.
    ///
    /// The stack is empty afterwards even when the accumulated bytes are not
    /// valid UTF-8; the raw bytes are still reachable through the error.
    pub fn pop(&mut self) -> Result<String, FromUtf8Error> {
        let drained = self.data.split();
        String::from_utf8(drained.to_vec())
    }

    /// Number of bytes currently held.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Discard everything, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}
