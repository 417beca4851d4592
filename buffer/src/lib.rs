//! Bounded blocking buffer for producer/consumer hand-off.
//!
//! [`BlockBuffer<T>`] is a fixed-capacity FIFO queue built from one mutex and
//! two condition variables (`not_full`, `not_empty`). Producers block while
//! it is full, consumers block while it is empty, which gives backpressure
//! without ever growing past the configured capacity.
//!
//! ```
//! use boundbuf::BlockBuffer;
//!
//! let buf = BlockBuffer::<i32>::new(4).unwrap();
//! buf.put(1).unwrap();
//! buf.put(2).unwrap();
//! assert_eq!(buf.take(), Ok(1));
//! ```
//!
//! # Operations
//!
//! | blocking | non-blocking | bounded wait |
//! |---|---|---|
//! | [`put`](BlockBuffer::put) | [`try_put`](BlockBuffer::try_put) | [`put_timeout`](BlockBuffer::put_timeout), [`put_deadline`](BlockBuffer::put_deadline) |
//! | [`take`](BlockBuffer::take) | [`try_take`](BlockBuffer::try_take) | [`take_timeout`](BlockBuffer::take_timeout), [`take_deadline`](BlockBuffer::take_deadline) |
//!
//! Batch variants [`write`](BlockBuffer::write) and
//! [`read`](BlockBuffer::read) move several elements per lock acquisition.
//!
//! # Closing
//!
//! [`close`](BlockBuffer::close) stops producers but lets consumers drain
//! whatever is still buffered:
//!
//! ```
//! use boundbuf::{BlockBuffer, Done};
//!
//! let buf = BlockBuffer::<i32>::new(2).unwrap();
//! buf.put(1).unwrap();
//! buf.put(2).unwrap();
//! buf.close();
//!
//! assert!(buf.put(3).is_err());
//! assert_eq!(buf.take(), Ok(1));
//! assert_eq!(buf.take(), Ok(2));
//! assert_eq!(buf.take(), Err(Done));
//! ```
//!
//! # Errors
//!
//! Nothing is logged or retried internally. Every failure is returned to the
//! caller, and errors from inserting operations carry the rejected item so
//! it can be recovered with `into_inner()`.
//!
//! # Thread Safety
//!
//! `BlockBuffer<T>` is `Send + Sync` for `T: Send` and can be shared between
//! threads using `Clone` (which shares the underlying buffer via `Arc`). The
//! lock is `parking_lot`'s, so a thread that panics while holding it does not
//! poison the buffer for everyone else.

mod block_buffer;
mod error;

pub use block_buffer::{BlockBuffer, IntoIter, Iter};
pub use error::{
    BufferError, Closed, Done, PutTimeoutError, TakeTimeoutError, TryPutError, TryTakeError,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BlockBuffer<i32>>();
        assert_send_sync::<BlockBuffer<String>>();
    }

    #[test]
    fn test_buffer_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<BlockBuffer<i32>>();
    }

    #[test]
    fn test_errors_are_std_errors() {
        fn assert_error<E: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<BufferError>();
        assert_error::<Done>();
        assert_error::<Closed<i32>>();
        assert_error::<TryPutError<i32>>();
        assert_error::<TryTakeError>();
        assert_error::<PutTimeoutError<i32>>();
        assert_error::<TakeTimeoutError>();
    }
}
