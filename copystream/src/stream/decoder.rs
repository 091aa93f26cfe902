// Copyright 2026 The Copystream Project
// SPDX-License-Identifier: Apache-2.0

/// Incremental UTF-8 decoder for byte chunks.
///
/// A multi-byte sequence split across chunks is held back until its
/// remaining bytes arrive. Bytes that can never form valid UTF-8 become
/// U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + bytes` as is complete.
    pub fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;
        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[start..valid_end]) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        // Truncated sequence at the end: wait for more bytes.
                        None => {
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Bytes still held back.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Flush at end of stream. A truncated trailing sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_passes_straight_through() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(b"Hello"), "Hello");
        assert_eq!(carry.pending(), 0);
    }

    #[test]
    fn split_sequence_is_carried() {
        let bytes = "café 👋".as_bytes();
        let mut carry = Utf8Carry::new();
        let mut out = String::new();
        for byte in bytes {
            out.push_str(&carry.push(std::slice::from_ref(byte)));
        }
        assert_eq!(out, "café 👋");
        assert_eq!(carry.finish(), "");
    }

    #[test]
    fn invalid_bytes_replaced() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn truncated_tail_flushed_lossily() {
        let mut carry = Utf8Carry::new();
        assert_eq!(carry.push(&"é".as_bytes()[..1]), "");
        assert_eq!(carry.pending(), 1);
        assert_eq!(carry.finish(), "\u{FFFD}");
    }
}
