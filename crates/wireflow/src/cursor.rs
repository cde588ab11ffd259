//! Read-only cursor over an in-progress network buffer.
//!
//! A [`ByteCursor`] is a positional view over the bytes a transport has
//! buffered so far. Decoders peek ahead through it without committing
//! anything: only once a complete protocol unit is visible do they consume
//! the equivalent range from the underlying buffer. New bytes are fed by the
//! buffer's owner (typically the `FramedRead` driving the decoder); each
//! decode attempt constructs a fresh cursor over the grown buffer and
//! resumes from the same wire position.

use thiserror::Error;

/// Errors reported by cursor operations.
///
/// `InsufficientData` is a suspension signal, not a failure: the caller is
/// expected to await more input and retry. `InvalidAdvance` indicates a
/// decoder bug (consuming past the buffered region) and is not retryable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("need {requested} bytes but only {buffered} are buffered")]
    InsufficientData { requested: usize, buffered: usize },

    #[error("advance of {requested} bytes exceeds the {buffered} buffered")]
    InvalidAdvance { requested: usize, buffered: usize },
}

/// A read-only view over buffered network bytes plus a read position.
///
/// The cursor never mutates the underlying buffer; it only tracks how far
/// parsing has progressed within it. [`ByteCursor::position`] after a
/// successful parse tells the owner how many bytes to actually consume.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Number of bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes left in the view.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns the next `n` unread bytes without advancing.
    ///
    /// Fails with [`CursorError::InsufficientData`] if fewer than `n` bytes
    /// are currently buffered; the caller should await more input and retry
    /// from the same position.
    pub fn peek(&self, n: usize) -> Result<&'a [u8], CursorError> {
        if self.remaining() < n {
            return Err(CursorError::InsufficientData { requested: n, buffered: self.remaining() });
        }
        Ok(&self.buf[self.pos..self.pos + n])
    }

    /// Consumes `n` bytes.
    ///
    /// Fails with [`CursorError::InvalidAdvance`] if `n` exceeds the
    /// buffered length; the cursor position is unchanged on failure.
    pub fn advance(&mut self, n: usize) -> Result<(), CursorError> {
        if self.remaining() < n {
            return Err(CursorError::InvalidAdvance { requested: n, buffered: self.remaining() });
        }
        self.pos += n;
        Ok(())
    }

    /// Returns the next `n` bytes and advances past them.
    ///
    /// Like [`ByteCursor::peek`], fails with `InsufficientData` when the
    /// bytes are not buffered yet.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CursorError> {
        let bytes = self.peek(n)?;
        self.pos += n;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_advance() {
        let cursor = ByteCursor::new(b"abcdef");
        assert_eq!(cursor.peek(3).unwrap(), b"abc");
        assert_eq!(cursor.peek(3).unwrap(), b"abc");
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.remaining(), 6);
    }

    #[test]
    fn peek_past_end_is_insufficient_data() {
        let cursor = ByteCursor::new(b"ab");
        assert_eq!(cursor.peek(3), Err(CursorError::InsufficientData { requested: 3, buffered: 2 }));
        // still usable afterwards
        assert_eq!(cursor.peek(2).unwrap(), b"ab");
    }

    #[test]
    fn advance_consumes() {
        let mut cursor = ByteCursor::new(b"abcdef");
        cursor.advance(2).unwrap();
        assert_eq!(cursor.peek(2).unwrap(), b"cd");
        assert_eq!(cursor.position(), 2);
        assert_eq!(cursor.remaining(), 4);
    }

    #[test]
    fn advance_past_end_is_invalid() {
        let mut cursor = ByteCursor::new(b"abc");
        cursor.advance(2).unwrap();
        assert_eq!(cursor.advance(2), Err(CursorError::InvalidAdvance { requested: 2, buffered: 1 }));
        // position unchanged after the failed advance
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn take_peeks_and_advances() {
        let mut cursor = ByteCursor::new(b"abcdef");
        assert_eq!(cursor.take(4).unwrap(), b"abcd");
        assert_eq!(cursor.take(2).unwrap(), b"ef");
        assert!(cursor.take(1).is_err());
    }

    #[test]
    fn growing_buffer_resumes_from_same_position() {
        // simulates partial delivery: the owner re-creates the cursor after
        // feeding more bytes and retries from the same wire position
        let mut received = Vec::from(&b"ab"[..]);
        let mut cursor = ByteCursor::new(&received);
        assert!(cursor.take(4).is_err());

        received.extend_from_slice(b"cd");
        let mut cursor = ByteCursor::new(&received);
        assert_eq!(cursor.take(4).unwrap(), b"abcd");
    }
}
