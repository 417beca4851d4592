//! Fixed-size blocking buffer implementation.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{
    BufferError, Closed, Done, PutTimeoutError, TakeTimeoutError, TryPutError, TryTakeError,
};

/// A thread-safe fixed-size blocking buffer.
///
/// `BlockBuffer<T>` is a FIFO queue with a fixed capacity, guarded by a
/// single mutex with two condition variables. It blocks producers when full
/// and consumers when empty, providing backpressure between them.
///
/// # Semantics
///
/// - **Put**: Blocks while full, fails with [`Closed`] once the buffer closes
/// - **Take**: Blocks while empty, drains remaining items after close, then
///   returns [`Done`]
/// - **Close**: Idempotent, wakes every waiter, keeps buffered items
///
/// Cloning a `BlockBuffer` yields another handle to the same buffer.
///
/// # Example
///
/// ```
/// use boundbuf::BlockBuffer;
/// use std::thread;
///
/// let buf = BlockBuffer::<i32>::new(4).unwrap();
/// let producer_buf = buf.clone();
///
/// // Producer thread (will block when buffer is full)
/// let producer = thread::spawn(move || {
///     for i in 0..10 {
///         producer_buf.put(i).unwrap();
///     }
///     producer_buf.close();
/// });
///
/// // Consumer drains until the producer closes the buffer
/// let items: Vec<i32> = buf.iter().collect();
///
/// producer.join().unwrap();
/// assert_eq!(items, (0..10).collect::<Vec<_>>());
/// ```
pub struct BlockBuffer<T> {
    inner: Arc<BlockBufferInner<T>>,
}

struct BlockBufferInner<T> {
    state: Mutex<BlockBufferState<T>>,
    not_full: Condvar,
    not_empty: Condvar,
}

struct BlockBufferState<T> {
    slots: Vec<Option<T>>,
    head: usize, // read position
    tail: usize, // write position
    count: usize,
    closed: bool,
}

impl<T> BlockBufferState<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.count == self.slots.len()
    }

    fn push_back(&mut self, item: T) {
        debug_assert!(!self.is_full());
        let tail = self.tail;
        self.slots[tail] = Some(item);
        self.tail = (tail + 1) % self.slots.len();
        self.count += 1;
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let head = self.head;
        let item = self.slots[head].take();
        self.head = (head + 1) % self.slots.len();
        self.count -= 1;
        item
    }
}

impl<T> Clone for BlockBuffer<T> {
    fn clone(&self) -> Self {
        BlockBuffer {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for BlockBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("BlockBuffer")
            .field("capacity", &state.capacity())
            .field("len", &state.count)
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> BlockBuffer<T> {
    /// Creates a new, empty BlockBuffer with the specified capacity.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, BufferError> {
        if capacity == 0 {
            return Err(BufferError::InvalidCapacity(capacity));
        }
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Ok(Self::with_state(BlockBufferState {
            slots,
            head: 0,
            tail: 0,
            count: 0,
            closed: false,
        }))
    }

    /// Creates a BlockBuffer from an existing Vec.
    ///
    /// The Vec's length determines the buffer capacity. The buffer is created
    /// full, so puts block until some data is taken.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::InvalidCapacity`] if the Vec is empty.
    pub fn from_vec(data: Vec<T>) -> Result<Self, BufferError> {
        let count = data.len();
        if count == 0 {
            return Err(BufferError::InvalidCapacity(0));
        }
        Ok(Self::with_state(BlockBufferState {
            slots: data.into_iter().map(Some).collect(),
            head: 0,
            tail: 0, // count % capacity for a full buffer
            count,
            closed: false,
        }))
    }

    fn with_state(state: BlockBufferState<T>) -> Self {
        BlockBuffer {
            inner: Arc::new(BlockBufferInner {
                state: Mutex::new(state),
                not_full: Condvar::new(),
                not_empty: Condvar::new(),
            }),
        }
    }

    /// Returns the number of elements currently in the buffer.
    pub fn len(&self) -> usize {
        self.inner.state.lock().count
    }

    /// Returns the buffer capacity.
    pub fn capacity(&self) -> usize {
        self.inner.state.lock().capacity()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if the buffer is full.
    pub fn is_full(&self) -> bool {
        self.inner.state.lock().is_full()
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Closes the buffer.
    ///
    /// Further puts fail, while takes keep draining buffered items and then
    /// report [`Done`]. Closing an already-closed buffer does nothing.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        // Every waiter's predicate changed.
        self.inner.not_empty.notify_all();
        self.inner.not_full.notify_all();
    }

    /// Adds an element to the tail of the buffer.
    ///
    /// Blocks while the buffer is full until space becomes available.
    ///
    /// # Errors
    ///
    /// Returns [`Closed`] carrying the item if the buffer is closed before or
    /// while waiting. The item is never inserted in that case.
    pub fn put(&self, item: T) -> Result<(), Closed<T>> {
        let mut state = self.inner.state.lock();
        loop {
            if state.closed {
                return Err(Closed(item));
            }
            if !state.is_full() {
                break;
            }
            self.inner.not_full.wait(&mut state);
        }
        state.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Adds an element without blocking.
    ///
    /// Returns [`TryPutError::Full`] instead of waiting when there is no room.
    pub fn try_put(&self, item: T) -> Result<(), TryPutError<T>> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(TryPutError::Closed(item));
        }
        if state.is_full() {
            return Err(TryPutError::Full(item));
        }
        state.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Adds an element, waiting at most `timeout` for space.
    ///
    /// On timeout nothing is inserted and the item is handed back.
    pub fn put_timeout(&self, item: T, timeout: Duration) -> Result<(), PutTimeoutError<T>> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.put_deadline(item, deadline),
            None => self.put(item).map_err(PutTimeoutError::from),
        }
    }

    /// Adds an element, waiting until `deadline` for space.
    pub fn put_deadline(&self, item: T, deadline: Instant) -> Result<(), PutTimeoutError<T>> {
        let mut state = self.inner.state.lock();
        let mut timed_out = false;
        loop {
            if state.closed {
                return Err(PutTimeoutError::Closed(item));
            }
            if !state.is_full() {
                break;
            }
            if timed_out {
                return Err(PutTimeoutError::Timeout(item));
            }
            timed_out = self
                .inner
                .not_full
                .wait_until(&mut state, deadline)
                .timed_out();
        }
        state.push_back(item);
        self.inner.not_empty.notify_one();
        Ok(())
    }

    /// Removes and returns the element at the head of the buffer.
    ///
    /// Blocks while the buffer is empty until data becomes available.
    /// Returns `Err(Done)` when the buffer is closed and empty.
    pub fn take(&self) -> Result<T, Done> {
        let mut state = self.inner.state.lock();
        loop {
            if let Some(item) = state.pop_front() {
                self.inner.not_full.notify_one();
                return Ok(item);
            }
            if state.closed {
                return Err(Done);
            }
            self.inner.not_empty.wait(&mut state);
        }
    }

    /// Removes the head element without blocking.
    ///
    /// Returns [`TryTakeError::Empty`] instead of waiting when the buffer is
    /// empty but still open.
    pub fn try_take(&self) -> Result<T, TryTakeError> {
        let mut state = self.inner.state.lock();
        if let Some(item) = state.pop_front() {
            self.inner.not_full.notify_one();
            return Ok(item);
        }
        if state.closed {
            Err(TryTakeError::Done)
        } else {
            Err(TryTakeError::Empty)
        }
    }

    /// Removes the head element, waiting at most `timeout` for one to arrive.
    pub fn take_timeout(&self, timeout: Duration) -> Result<T, TakeTimeoutError> {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.take_deadline(deadline),
            None => self.take().map_err(TakeTimeoutError::from),
        }
    }

    /// Removes the head element, waiting until `deadline` for one to arrive.
    pub fn take_deadline(&self, deadline: Instant) -> Result<T, TakeTimeoutError> {
        let mut state = self.inner.state.lock();
        let mut timed_out = false;
        loop {
            if let Some(item) = state.pop_front() {
                self.inner.not_full.notify_one();
                return Ok(item);
            }
            if state.closed {
                return Err(TakeTimeoutError::Done);
            }
            if timed_out {
                return Err(TakeTimeoutError::Timeout);
            }
            timed_out = self
                .inner
                .not_empty
                .wait_until(&mut state, deadline)
                .timed_out();
        }
    }

    /// Reads data from the buffer into `out`.
    ///
    /// Blocks when the buffer is empty until data becomes available, then
    /// moves as many elements as fit. Returns the number of elements read,
    /// which is zero only when `out` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`Done`] when the buffer is closed and empty.
    pub fn read(&self, out: &mut [T]) -> Result<usize, Done> {
        if out.is_empty() {
            return Ok(0);
        }

        let mut state = self.inner.state.lock();
        while state.count == 0 {
            if state.closed {
                return Err(Done);
            }
            self.inner.not_empty.wait(&mut state);
        }

        let mut n = 0;
        while n < out.len() {
            match state.pop_front() {
                Some(item) => out[n] = item,
                None => break,
            }
            n += 1;
        }

        if n == 1 {
            self.inner.not_full.notify_one();
        } else {
            self.inner.not_full.notify_all();
        }
        Ok(n)
    }

    /// Returns a blocking iterator that takes elements until the buffer is
    /// closed and drained.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { buf: self }
    }
}

impl<T: Clone> BlockBuffer<T> {
    /// Writes data to the buffer.
    ///
    /// Blocks when the buffer is full until space becomes available, writing
    /// as many elements as fit on each wake. Returns the number of elements
    /// written, which is less than `data.len()` only if the buffer was closed
    /// part-way through.
    ///
    /// # Errors
    ///
    /// Returns [`BufferError::Closed`] if the buffer was closed before any
    /// element could be written.
    pub fn write(&self, data: &[T]) -> Result<usize, BufferError> {
        if data.is_empty() {
            return Ok(0);
        }

        let mut state = self.inner.state.lock();
        let mut written = 0;

        loop {
            if state.closed {
                return if written > 0 {
                    Ok(written)
                } else {
                    Err(BufferError::Closed)
                };
            }

            let available = state.capacity() - state.count;
            if available > 0 {
                let to_write = available.min(data.len() - written);
                // Clone the chunk before touching the ring: a panicking
                // clone must leave the buffer as it was.
                let chunk = data[written..written + to_write].to_vec();
                for item in chunk {
                    state.push_back(item);
                }
                written += to_write;

                if to_write == 1 {
                    self.inner.not_empty.notify_one();
                } else {
                    self.inner.not_empty.notify_all();
                }

                if written == data.len() {
                    return Ok(written);
                }
            }

            self.inner.not_full.wait(&mut state);
        }
    }

    /// Returns a copy of all elements in the buffer, head first.
    pub fn to_vec(&self) -> Vec<T> {
        let state = self.inner.state.lock();
        let capacity = state.capacity();
        (0..state.count)
            .filter_map(|i| state.slots[(state.head + i) % capacity].clone())
            .collect()
    }
}

/// Blocking iterator over a borrowed [`BlockBuffer`].
///
/// Created by [`BlockBuffer::iter`].
pub struct Iter<'a, T> {
    buf: &'a BlockBuffer<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.buf.take().ok()
    }
}

/// Blocking iterator that owns a [`BlockBuffer`] handle.
pub struct IntoIter<T> {
    buf: BlockBuffer<T>,
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.buf.take().ok()
    }
}

impl<T> IntoIterator for BlockBuffer<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        IntoIter { buf: self }
    }
}

impl<'a, T> IntoIterator for &'a BlockBuffer<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
