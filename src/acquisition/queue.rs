// src/acquisition/queue.rs
//! Bounded, closable FIFO between the transport callback and a writer worker
//!
//! Built on a crossbeam bounded channel. Closing is a shared flag rather than
//! dropping the sender, because the device callback owns a producer for as
//! long as the subscription exists and the shutdown path must still be able to
//! refuse further pushes.

use crate::config::constants::pipeline::PUSH_POLL_INTERVAL_MS;
use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender, TryRecvError, TrySendError};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Queue failures without the rejected item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue capacity must be positive, got {0}")]
    InvalidCapacity(usize),
    #[error("queue is full")]
    Full,
    #[error("queue is closed")]
    Closed,
    #[error("timed out waiting on queue")]
    Timeout,
}

/// A rejected push; hands the item back to the caller
#[derive(PartialEq, Eq)]
pub enum PushError<T> {
    Full(T),
    Closed(T),
    Timeout(T),
}

impl<T> PushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(item) | PushError::Closed(item) | PushError::Timeout(item) => item,
        }
    }

    pub fn kind(&self) -> QueueError {
        match self {
            PushError::Full(_) => QueueError::Full,
            PushError::Closed(_) => QueueError::Closed,
            PushError::Timeout(_) => QueueError::Timeout,
        }
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PushError::{:?}(..)", self.kind())
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind(), f)
    }
}

impl<T> std::error::Error for PushError<T> {}

impl<T> From<PushError<T>> for QueueError {
    fn from(err: PushError<T>) -> Self {
        err.kind()
    }
}

impl<T> From<PushError<T>> for crate::error::ImuError {
    fn from(err: PushError<T>) -> Self {
        crate::error::ImuError::Queue(err.kind())
    }
}

#[derive(Debug)]
struct Shared {
    closed: AtomicBool,
    capacity: usize,
}

/// Create a queue holding at most `capacity` items
pub fn bounded<T>(capacity: usize) -> Result<(QueueProducer<T>, QueueConsumer<T>), QueueError> {
    if capacity == 0 {
        return Err(QueueError::InvalidCapacity(capacity));
    }
    let (tx, rx) = channel::bounded(capacity);
    let shared = Arc::new(Shared {
        closed: AtomicBool::new(false),
        capacity,
    });
    Ok((
        QueueProducer {
            tx,
            shared: Arc::clone(&shared),
        },
        QueueConsumer { rx, shared },
    ))
}

/// Sending half; cheap to clone
pub struct QueueProducer<T> {
    tx: Sender<T>,
    shared: Arc<Shared>,
}

impl<T> Clone for QueueProducer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> QueueProducer<T> {
    /// Block while the queue is full. Gives the item back once the queue is
    /// closed, including while waiting.
    pub fn push(&self, item: T) -> Result<(), PushError<T>> {
        let poll = Duration::from_millis(PUSH_POLL_INTERVAL_MS);
        let mut item = item;
        loop {
            if self.is_closed() {
                return Err(PushError::Closed(item));
            }
            match self.tx.send_timeout(item, poll) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => item = back,
                Err(SendTimeoutError::Disconnected(back)) => return Err(PushError::Closed(back)),
            }
        }
    }

    pub fn try_push(&self, item: T) -> Result<(), PushError<T>> {
        if self.is_closed() {
            return Err(PushError::Closed(item));
        }
        self.tx.try_send(item).map_err(|err| match err {
            TrySendError::Full(item) => PushError::Full(item),
            TrySendError::Disconnected(item) => PushError::Closed(item),
        })
    }

    /// Like [`push`](Self::push) but gives up after `timeout`
    pub fn push_timeout(&self, item: T, timeout: Duration) -> Result<(), PushError<T>> {
        let deadline = Instant::now() + timeout;
        let poll = Duration::from_millis(PUSH_POLL_INTERVAL_MS);
        let mut item = item;
        loop {
            if self.is_closed() {
                return Err(PushError::Closed(item));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PushError::Timeout(item));
            }
            match self.tx.send_timeout(item, remaining.min(poll)) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => item = back,
                Err(SendTimeoutError::Disconnected(back)) => return Err(PushError::Closed(back)),
            }
        }
    }

    /// Refuse further pushes; queued items stay poppable. Returns whether this
    /// call closed the queue.
    pub fn close(&self) -> bool {
        !self.shared.closed.swap(true, Ordering::AcqRel)
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

/// Receiving half, owned by a single worker
pub struct QueueConsumer<T> {
    rx: Receiver<T>,
    shared: Arc<Shared>,
}

impl<T> QueueConsumer<T> {
    /// Wait up to `timeout` for the next item.
    ///
    /// Fails with `Closed` once the queue is closed and empty, and with
    /// `Timeout` otherwise.
    pub fn pop_timeout(&self, timeout: Duration) -> Result<T, QueueError> {
        if self.is_closed() {
            return self.rx.try_recv().map_err(|_| QueueError::Closed);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Ok(item),
            Err(channel::RecvTimeoutError::Timeout) => Err(QueueError::Timeout),
            Err(channel::RecvTimeoutError::Disconnected) => Err(QueueError::Closed),
        }
    }

    pub fn try_pop(&self) -> Result<T, QueueError> {
        self.rx.try_recv().map_err(|err| match err {
            TryRecvError::Empty if !self.is_closed() => QueueError::Timeout,
            _ => QueueError::Closed,
        })
    }

    /// Underlying receiver, for use in `select!`
    pub(crate) fn receiver(&self) -> &Receiver<T> {
        &self.rx
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Closed and nothing left to pop
    pub fn is_finished(&self) -> bool {
        self.is_closed() && self.rx.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }
}

/// Set when a worker last found its queue empty, cleared when it takes an item.
///
/// The shutdown path waits on it to decide a channel has drained.
#[derive(Clone, Default)]
pub struct IdleFlag {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl IdleFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        let (lock, cvar) = &*self.inner;
        let mut idle = lock.lock();
        if !*idle {
            *idle = true;
            cvar.notify_all();
        }
    }

    pub fn clear(&self) {
        *self.inner.0.lock() = false;
    }

    pub fn is_set(&self) -> bool {
        *self.inner.0.lock()
    }

    /// Block until set or `timeout` elapses; returns the final state
    pub fn wait(&self, timeout: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut idle = lock.lock();
        while !*idle {
            if cvar.wait_until(&mut idle, deadline).timed_out() {
                break;
            }
        }
        *idle
    }
}

impl fmt::Debug for IdleFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleFlag").field("set", &self.is_set()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(bounded::<u32>(0).err(), Some(QueueError::InvalidCapacity(0)));
    }

    #[test]
    fn test_fifo_order() {
        let (tx, rx) = bounded(4).unwrap();
        for i in 0..4 {
            tx.push(i).unwrap();
        }
        let popped: Vec<_> = (0..4)
            .map(|_| rx.pop_timeout(Duration::from_millis(10)).unwrap())
            .collect();
        assert_eq!(popped, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_try_push_full() {
        let (tx, _rx) = bounded(1).unwrap();
        tx.try_push(1).unwrap();
        let err = tx.try_push(2).unwrap_err();
        assert_eq!(err.kind(), QueueError::Full);
        assert_eq!(err.into_inner(), 2);
    }

    #[test]
    fn test_push_unblocks_after_pop() {
        let (tx, rx) = bounded(1).unwrap();
        tx.push(1).unwrap();

        let pusher = {
            let tx = tx.clone();
            thread::spawn(move || tx.push(2))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(rx.pop_timeout(Duration::from_secs(1)).unwrap(), 1);
        assert!(pusher.join().unwrap().is_ok());
        assert_eq!(rx.pop_timeout(Duration::from_secs(1)).unwrap(), 2);
    }

    #[test]
    fn test_close_releases_blocked_push() {
        let (tx, _rx) = bounded(1).unwrap();
        tx.push(1).unwrap();

        let pusher = {
            let tx = tx.clone();
            thread::spawn(move || tx.push(2))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(tx.close());
        let err = pusher.join().unwrap().unwrap_err();
        assert_eq!(err.kind(), QueueError::Closed);
        assert_eq!(err.into_inner(), 2);
    }

    #[test]
    fn test_closed_queue_drains_then_reports_closed() {
        let (tx, rx) = bounded(4).unwrap();
        tx.push("a").unwrap();
        tx.push("b").unwrap();
        assert!(tx.close());
        assert!(!tx.close());

        assert!(matches!(tx.push("c"), Err(PushError::Closed("c"))));
        assert_eq!(rx.pop_timeout(Duration::from_millis(10)), Ok("a"));
        assert_eq!(rx.pop_timeout(Duration::from_millis(10)), Ok("b"));
        assert!(rx.is_finished());
        assert_eq!(rx.pop_timeout(Duration::from_secs(5)), Err(QueueError::Closed));
    }

    #[test]
    fn test_pop_timeout_on_empty_open_queue() {
        let (_tx, rx) = bounded::<u8>(2).unwrap();
        let start = Instant::now();
        assert_eq!(rx.pop_timeout(Duration::from_millis(20)), Err(QueueError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_push_timeout_expires_when_full() {
        let (tx, _rx) = bounded(1).unwrap();
        tx.push(1u8).unwrap();
        let err = tx.push_timeout(2, Duration::from_millis(30)).unwrap_err();
        assert_eq!(err.kind(), QueueError::Timeout);
    }

    #[test]
    fn test_idle_flag_wait() {
        let flag = IdleFlag::new();
        assert!(!flag.wait(Duration::from_millis(10)));

        let setter = {
            let flag = flag.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                flag.set();
            })
        };
        assert!(flag.wait(Duration::from_secs(2)));
        setter.join().unwrap();

        flag.clear();
        assert!(!flag.is_set());
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_capacity(
            capacity in 1usize..32,
            ops in proptest::collection::vec(any::<bool>(), 0..128),
        ) {
            let (tx, rx) = bounded(capacity).unwrap();
            let mut expected = 0usize;
            let mut next = 0usize;
            let mut popped = 0usize;
            for push in ops {
                if push {
                    match tx.try_push(next) {
                        Ok(()) => {
                            expected += 1;
                            next += 1;
                        }
                        Err(PushError::Full(_)) => {
                            prop_assert_eq!(expected, capacity);
                        }
                        Err(other) => {
                            prop_assert!(false, "unexpected {:?}", other);
                        }
                    }
                } else {
                    match rx.pop_timeout(Duration::ZERO) {
                        Ok(item) => {
                            prop_assert_eq!(item, popped);
                            popped += 1;
                            expected -= 1;
                        }
                        Err(QueueError::Timeout) => {
                            prop_assert_eq!(expected, 0);
                        }
                        Err(other) => {
                            prop_assert!(false, "unexpected {:?}", other);
                        }
                    }
                }
                prop_assert!(tx.len() <= tx.capacity());
                prop_assert_eq!(tx.len(), expected);
                prop_assert_eq!(rx.len(), expected);
            }
        }
    }
}
