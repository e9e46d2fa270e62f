//! Bounded buffer for password entry.

use zeroize::Zeroize;

/// Maximum password length in bytes.
pub const CAPACITY: usize = 256;

/// Collects typed password characters up to a fixed capacity.
///
/// Appends are all-or-nothing: input that would push the length past
/// [`CAPACITY`] is rejected whole and the buffer stays untouched. Contents
/// are zeroed on clear and on drop.
pub struct EntryBuffer {
    // Pre-allocated at CAPACITY and never grown past it, so the backing
    // storage is never reallocated and no stale copy of the password is
    // left behind by a move.
    buf: String,
}

impl EntryBuffer {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(CAPACITY),
        }
    }

    /// Appends `text` if it fits; returns whether it was taken.
    pub fn append(&mut self, text: &str) -> bool {
        if self.buf.len() + text.len() > CAPACITY {
            return false;
        }

        self.buf.push_str(text);
        true
    }

    /// Removes the last character; returns whether anything was removed.
    pub fn backspace(&mut self) -> bool {
        self.buf.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.buf.zeroize();
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for EntryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EntryBuffer {
    fn drop(&mut self) {
        self.buf.zeroize();
    }
}
