//! Error types for buffer operations.
//!
//! Errors returned by operations that insert an item always hand the item
//! back, so a rejected `put` never drops data on the floor.

use std::error::Error;
use std::fmt;

/// Buffer operation error.
///
/// Returned by construction and by the batch operations
/// ([`write`](crate::BlockBuffer::write) and
/// [`read`](crate::BlockBuffer::read)), which have no single item to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// Capacity must be at least one.
    #[error("buffer: invalid capacity {0}")]
    InvalidCapacity(usize),

    /// Buffer has been closed.
    #[error("buffer: closed")]
    Closed,
}

/// End-of-stream marker.
///
/// Returned by [`take`](crate::BlockBuffer::take) once the buffer has been
/// closed and every buffered item has been consumed. No more items will
/// ever arrive, so this is not worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("buffer: done")]
pub struct Done;

/// The buffer was closed; the rejected item is returned.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Closed<T>(pub T);

impl<T> Closed<T> {
    /// Returns the item that was not inserted.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Closed(..)")
    }
}

impl<T> fmt::Display for Closed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("buffer: closed")
    }
}

impl<T> Error for Closed<T> {}

impl<T> From<Closed<T>> for BufferError {
    fn from(_: Closed<T>) -> Self {
        BufferError::Closed
    }
}

/// Error returned by [`try_put`](crate::BlockBuffer::try_put).
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum TryPutError<T> {
    /// The buffer is at capacity. Not an error as such: the caller decides
    /// whether to retry.
    Full(T),
    /// The buffer has been closed.
    Closed(T),
}

impl<T> TryPutError<T> {
    /// Returns the item that was not inserted.
    pub fn into_inner(self) -> T {
        match self {
            TryPutError::Full(item) | TryPutError::Closed(item) => item,
        }
    }

    /// Returns true if the put would have blocked.
    pub fn is_full(&self) -> bool {
        matches!(self, TryPutError::Full(_))
    }

    /// Returns true if the buffer was closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, TryPutError::Closed(_))
    }
}

impl<T> fmt::Debug for TryPutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPutError::Full(_) => f.write_str("Full(..)"),
            TryPutError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TryPutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryPutError::Full(_) => f.write_str("buffer: full"),
            TryPutError::Closed(_) => f.write_str("buffer: closed"),
        }
    }
}

impl<T> Error for TryPutError<T> {}

impl<T> From<Closed<T>> for TryPutError<T> {
    fn from(err: Closed<T>) -> Self {
        TryPutError::Closed(err.0)
    }
}

/// Error returned by [`try_take`](crate::BlockBuffer::try_take).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryTakeError {
    /// The buffer is empty but still open.
    #[error("buffer: empty")]
    Empty,
    /// The buffer is closed and drained.
    #[error("buffer: done")]
    Done,
}

impl TryTakeError {
    /// Returns true if the take would have blocked.
    pub fn is_empty(&self) -> bool {
        matches!(self, TryTakeError::Empty)
    }

    /// Returns true if the stream has ended.
    pub fn is_done(&self) -> bool {
        matches!(self, TryTakeError::Done)
    }
}

impl From<Done> for TryTakeError {
    fn from(_: Done) -> Self {
        TryTakeError::Done
    }
}

/// Error returned by the timed put variants.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum PutTimeoutError<T> {
    /// The wait expired before a slot freed up.
    Timeout(T),
    /// The buffer has been closed.
    Closed(T),
}

impl<T> PutTimeoutError<T> {
    /// Returns the item that was not inserted.
    pub fn into_inner(self) -> T {
        match self {
            PutTimeoutError::Timeout(item) | PutTimeoutError::Closed(item) => item,
        }
    }

    /// Returns true if the wait expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, PutTimeoutError::Timeout(_))
    }

    /// Returns true if the buffer was closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, PutTimeoutError::Closed(_))
    }
}

impl<T> fmt::Debug for PutTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutTimeoutError::Timeout(_) => f.write_str("Timeout(..)"),
            PutTimeoutError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for PutTimeoutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutTimeoutError::Timeout(_) => f.write_str("buffer: timed out"),
            PutTimeoutError::Closed(_) => f.write_str("buffer: closed"),
        }
    }
}

impl<T> Error for PutTimeoutError<T> {}

impl<T> From<Closed<T>> for PutTimeoutError<T> {
    fn from(err: Closed<T>) -> Self {
        PutTimeoutError::Closed(err.0)
    }
}

/// Error returned by the timed take variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TakeTimeoutError {
    /// The wait expired before an item arrived.
    #[error("buffer: timed out")]
    Timeout,
    /// The buffer is closed and drained.
    #[error("buffer: done")]
    Done,
}

impl TakeTimeoutError {
    /// Returns true if the wait expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TakeTimeoutError::Timeout)
    }

    /// Returns true if the stream has ended.
    pub fn is_done(&self) -> bool {
        matches!(self, TakeTimeoutError::Done)
    }
}

impl From<Done> for TakeTimeoutError {
    fn from(_: Done) -> Self {
        TakeTimeoutError::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_error_display() {
        assert_eq!(BufferError::Closed.to_string(), "buffer: closed");
        assert_eq!(
            BufferError::InvalidCapacity(0).to_string(),
            "buffer: invalid capacity 0"
        );
    }

    #[test]
    fn test_done_display() {
        assert_eq!(Done.to_string(), "buffer: done");
        assert_eq!(Done, Done);
    }

    #[test]
    fn test_closed_returns_item() {
        let err = Closed(String::from("payload"));
        assert_eq!(err.to_string(), "buffer: closed");
        assert_eq!(err.into_inner(), "payload");
    }

    #[test]
    fn test_try_put_error() {
        let full = TryPutError::Full(1);
        assert!(full.is_full());
        assert!(!full.is_closed());
        assert_eq!(full.to_string(), "buffer: full");
        assert_eq!(full.into_inner(), 1);

        let closed: TryPutError<i32> = Closed(2).into();
        assert!(closed.is_closed());
        assert_eq!(closed.into_inner(), 2);
    }

    #[test]
    fn test_timeout_distinct_from_closed() {
        let timeout = PutTimeoutError::Timeout(7);
        let closed = PutTimeoutError::Closed(7);
        assert_ne!(timeout, closed);
        assert_ne!(timeout.to_string(), closed.to_string());
        assert!(timeout.is_timeout());
        assert!(closed.is_closed());

        assert_ne!(TakeTimeoutError::Timeout, TakeTimeoutError::Done);
        assert_eq!(TakeTimeoutError::from(Done), TakeTimeoutError::Done);
        assert_eq!(TryTakeError::from(Done), TryTakeError::Done);
    }

    #[test]
    fn test_debug_does_not_require_item_debug() {
        struct Opaque;
        assert_eq!(format!("{:?}", Closed(Opaque)), "Closed(..)");
        assert_eq!(format!("{:?}", TryPutError::Full(Opaque)), "Full(..)");
        assert_eq!(format!("{:?}", PutTimeoutError::Timeout(Opaque)), "Timeout(..)");
    }

    #[test]
    fn test_closed_into_buffer_error() {
        let err: BufferError = Closed(3u8).into();
        assert_eq!(err, BufferError::Closed);
    }
}
