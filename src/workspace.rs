//! Request-scoped scratch space for reply text.
//!
//! The host framework hands each request a [`Workspace`]; every piece of
//! text the client returns is materialized into it. Callers therefore never
//! hold references into transient reply buffers, and a failed command leaks
//! nothing.

use bytes::{Bytes, BytesMut};

const CHUNK_SIZE: usize = 512;

/// A scratch arena valid for the duration of one request.
#[derive(Debug)]
pub struct Workspace {
    buf: BytesMut,
}

impl Workspace {
    pub fn new() -> Workspace {
        Workspace::with_capacity(CHUNK_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Workspace {
        Workspace {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Copy `data` into the workspace and hand back the materialized slice.
    ///
    /// The returned `Bytes` owns its storage; it stays valid after the reply
    /// that produced it is gone.
    pub fn dup(&mut self, data: &[u8]) -> Bytes {
        self.buf.extend_from_slice(data);
        self.buf.split().freeze()
    }

    /// Render `value` as decimal text in the workspace.
    pub fn put_decimal(&mut self, value: i64) -> Bytes {
        use std::fmt::Write;

        // Writing into a BytesMut cannot fail.
        let _ = write!(self.buf, "{value}");
        self.buf.split().freeze()
    }
}

impl Default for Workspace {
    fn default() -> Workspace {
        Workspace::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dup_hands_out_independent_slices() {
        let mut ws = Workspace::new();
        let first = ws.dup(b"PONG");
        let second = ws.dup(b"OK");

        assert_eq!(&first[..], b"PONG");
        assert_eq!(&second[..], b"OK");
    }

    #[test]
    fn dup_preserves_empty_payloads() {
        let mut ws = Workspace::new();
        assert_eq!(ws.dup(b"").len(), 0);
    }

    #[test]
    fn put_decimal_renders_the_full_signed_range() {
        let mut ws = Workspace::new();
        assert_eq!(&ws.put_decimal(42)[..], b"42");
        assert_eq!(&ws.put_decimal(-2)[..], b"-2");
        assert_eq!(&ws.put_decimal(i64::MIN)[..], b"-9223372036854775808");
    }
}
