//! Bounded blocking channel
//!
//! A fixed-capacity FIFO shared by every handle. Senders block while the
//! buffer is full, receivers block while it is empty, and `close` is a
//! one-way transition that still lets receivers drain what was buffered.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::error::{ChannelError, ReceiveTimeoutError, TryReceiveError, TrySendError};
use super::iter::{IntoIter, Iter, TryIter};

/// Mutable channel state, only touched under the lock
struct State<T> {
    buffer: VecDeque<T>,
    closed: bool,
    /// Receivers currently parked in a blocking receive
    waiting_receivers: usize,
    /// Values pushed into the buffer since creation
    sent: u64,
    /// Values taken out of the buffer since creation
    received: u64,
}

impl<T> State<T> {
    /// Append a value and return its position in the send sequence
    fn push(&mut self, value: T) -> u64 {
        self.buffer.push_back(value);
        let ticket = self.sent;
        self.sent += 1;
        ticket
    }
}

struct Shared<T> {
    capacity: usize,
    state: Mutex<State<T>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> Shared<T> {
    /// Number of values the buffer may hold. A rendezvous channel still
    /// needs one hand-off slot for the value in transit.
    fn slots(&self) -> usize {
        self.capacity.max(1)
    }

    fn is_rendezvous(&self) -> bool {
        self.capacity == 0
    }

    /// Pop the head of the buffer and wake whoever is waiting for space.
    fn take(&self, state: &mut State<T>) -> Option<T> {
        let value = state.buffer.pop_front()?;
        state.received += 1;
        if self.is_rendezvous() {
            // The hand-off sender and the next queued sender share the condvar
            self.not_full.notify_all();
        } else {
            self.not_full.notify_one();
        }
        Some(value)
    }
}

/// A fixed-capacity FIFO channel with blocking send and receive
///
/// Handles are cheap to clone and all share the same buffer; the buffer
/// lives as long as the last handle.
///
/// A capacity of zero gives a rendezvous channel: `send` returns only once
/// a receiver has taken the value.
///
/// # Example
///
/// ```
/// use throttle_core::Channel;
///
/// let channel = Channel::new(3);
/// channel.send(1).unwrap();
/// channel.send(2).unwrap();
/// channel.close().unwrap();
///
/// assert_eq!(channel.receive(), Some(1));
/// assert_eq!(channel.receive(), Some(2));
/// assert_eq!(channel.receive(), None);
/// ```
pub struct Channel<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Channel<T> {
    /// Create an empty channel holding at most `capacity` values
    pub fn new(capacity: usize) -> Self {
        Self::with_buffer(capacity, VecDeque::with_capacity(capacity))
    }

    /// Create a channel whose buffer starts out holding `buffer`
    pub(crate) fn with_buffer(capacity: usize, buffer: VecDeque<T>) -> Self {
        debug_assert!(buffer.len() <= capacity);
        let sent = buffer.len() as u64;
        Self {
            shared: Arc::new(Shared {
                capacity,
                state: Mutex::new(State {
                    buffer,
                    closed: false,
                    waiting_receivers: 0,
                    sent,
                    received: 0,
                }),
                not_empty: Condvar::new(),
                not_full: Condvar::new(),
            }),
        }
    }

    /// Send a value, blocking while the buffer is full
    ///
    /// Fails with [`ChannelError::Closed`] if the channel is closed, including
    /// when it is closed while this sender is waiting for space.
    pub fn send(&self, value: T) -> Result<(), ChannelError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        while !state.closed && state.buffer.len() >= shared.slots() {
            shared.not_full.wait(&mut state);
        }
        if state.closed {
            return Err(ChannelError::Closed);
        }

        let ticket = state.push(value);
        shared.not_empty.notify_one();

        if shared.is_rendezvous() {
            // Already accepted: a later close leaves the value receivable,
            // so keep waiting for it to be taken.
            while state.received <= ticket {
                shared.not_full.wait(&mut state);
            }
        }

        Ok(())
    }

    /// Send a value without blocking
    ///
    /// On a rendezvous channel this only succeeds when a receiver is already
    /// waiting for the value.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        if state.closed {
            return Err(TrySendError::Closed(value));
        }
        let has_slot = if shared.is_rendezvous() {
            state.buffer.is_empty() && state.waiting_receivers > 0
        } else {
            state.buffer.len() < shared.capacity
        };
        if !has_slot {
            return Err(TrySendError::Full(value));
        }

        state.push(value);
        shared.not_empty.notify_one();
        Ok(())
    }

    /// Receive the value at the head of the channel, blocking while empty
    ///
    /// Returns `None` once the channel is closed and every buffered value has
    /// been received.
    pub fn receive(&self) -> Option<T> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        loop {
            if let Some(value) = shared.take(&mut state) {
                return Some(value);
            }
            if state.closed {
                return None;
            }
            state.waiting_receivers += 1;
            shared.not_empty.wait(&mut state);
            state.waiting_receivers -= 1;
        }
    }

    /// Receive without blocking
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        match shared.take(&mut state) {
            Some(value) => Ok(value),
            None if state.closed => Err(TryReceiveError::Closed),
            None => Err(TryReceiveError::Empty),
        }
    }

    /// Receive, waiting at most `timeout` for a value to arrive
    pub fn receive_timeout(&self, timeout: Duration) -> Result<T, ReceiveTimeoutError> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.receive().ok_or(ReceiveTimeoutError::Closed);
        };

        let shared = &*self.shared;
        let mut state = shared.state.lock();

        loop {
            if let Some(value) = shared.take(&mut state) {
                return Ok(value);
            }
            if state.closed {
                return Err(ReceiveTimeoutError::Closed);
            }
            if Instant::now() >= deadline {
                return Err(ReceiveTimeoutError::Timeout);
            }
            state.waiting_receivers += 1;
            shared.not_empty.wait_until(&mut state, deadline);
            state.waiting_receivers -= 1;
        }
    }

    /// Close the channel
    ///
    /// Buffered values stay receivable. Every blocked sender fails with
    /// [`ChannelError::Closed`]; every blocked receiver on an empty channel
    /// observes the closure.
    pub fn close(&self) -> Result<(), ChannelError> {
        let shared = &*self.shared;
        let mut state = shared.state.lock();

        if state.closed {
            return Err(ChannelError::AlreadyClosed);
        }
        state.closed = true;
        shared.not_empty.notify_all();
        shared.not_full.notify_all();
        Ok(())
    }

    /// Maximum number of buffered values (zero for a rendezvous channel)
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Number of values currently buffered
    pub fn len(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    /// Whether no values are currently buffered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Blocking iterator that ends once the channel is closed and drained
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Non-blocking iterator over the values buffered right now
    pub fn try_iter(&self) -> TryIter<'_, T> {
        TryIter::new(self)
    }

    /// A send-only handle to this channel
    pub fn sender(&self) -> Sender<T> {
        Sender {
            channel: self.clone(),
        }
    }

    /// A receive-only handle to this channel
    pub fn receiver(&self) -> Receiver<T> {
        Receiver {
            channel: self.clone(),
        }
    }
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Channel")
            .field("capacity", &self.shared.capacity)
            .field("len", &state.buffer.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a Channel<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> IntoIterator for Channel<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self)
    }
}

/// Send-only view of a [`Channel`]
pub struct Sender<T> {
    channel: Channel<T>,
}

impl<T> Sender<T> {
    /// See [`Channel::send`]
    pub fn send(&self, value: T) -> Result<(), ChannelError> {
        self.channel.send(value)
    }

    /// See [`Channel::try_send`]
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.channel.try_send(value)
    }

    /// See [`Channel::close`]
    pub fn close(&self) -> Result<(), ChannelError> {
        self.channel.close()
    }

    pub fn capacity(&self) -> usize {
        self.channel.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<T> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sender").field(&self.channel).finish()
    }
}

/// Receive-only view of a [`Channel`]
pub struct Receiver<T> {
    channel: Channel<T>,
}

impl<T> Receiver<T> {
    /// See [`Channel::receive`]
    pub fn receive(&self) -> Option<T> {
        self.channel.receive()
    }

    /// See [`Channel::try_receive`]
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        self.channel.try_receive()
    }

    /// See [`Channel::receive_timeout`]
    pub fn receive_timeout(&self, timeout: Duration) -> Result<T, ReceiveTimeoutError> {
        self.channel.receive_timeout(timeout)
    }

    pub fn len(&self) -> usize {
        self.channel.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channel.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.channel.is_closed()
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.channel.iter()
    }

    /// See [`Channel::close`]
    ///
    /// Lets a consumer that stops early fail any blocked senders.
    pub fn close(&self) -> Result<(), ChannelError> {
        self.channel.close()
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<T> fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Receiver").field(&self.channel).finish()
    }
}

impl<'a, T> IntoIterator for &'a Receiver<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> IntoIterator for Receiver<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    const SETTLE: Duration = Duration::from_millis(50);

    #[test]
    fn test_fifo_order() {
        let channel = Channel::new(4);
        for v in 1..=4 {
            channel.send(v).unwrap();
        }
        let received: Vec<_> = (0..4).filter_map(|_| channel.receive()).collect();
        assert_eq!(received, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_fill_to_capacity_without_blocking() {
        let channel = Channel::new(3);
        channel.send(1).unwrap();
        channel.send(2).unwrap();
        channel.send(3).unwrap();

        assert_eq!(channel.len(), 3);
        assert!(channel.try_send(4).unwrap_err().is_full());
    }

    #[test]
    fn test_closed_channel_drains_then_reports_closed() {
        let channel = Channel::new(3);
        channel.send("a").unwrap();
        channel.send("b").unwrap();
        channel.close().unwrap();

        assert_eq!(channel.send("c"), Err(ChannelError::Closed));
        assert_eq!(channel.receive(), Some("a"));
        assert_eq!(channel.receive(), Some("b"));
        assert_eq!(channel.receive(), None);
        assert_eq!(channel.try_receive(), Err(TryReceiveError::Closed));
    }

    #[test]
    fn test_double_close_fails() {
        let channel = Channel::<u8>::new(1);
        assert!(channel.close().is_ok());
        assert_eq!(channel.close(), Err(ChannelError::AlreadyClosed));
        assert!(channel.is_closed());
    }

    #[test]
    fn test_try_receive_empty() {
        let channel = Channel::<u8>::new(2);
        assert_eq!(channel.try_receive(), Err(TryReceiveError::Empty));
    }

    #[test]
    fn test_receive_blocks_until_send() {
        let channel = Channel::new(1);
        let received = Arc::new(AtomicBool::new(false));

        let handle = {
            let channel = channel.clone();
            let received = Arc::clone(&received);
            thread::spawn(move || {
                let value = channel.receive();
                received.store(true, Ordering::SeqCst);
                value
            })
        };

        thread::sleep(SETTLE);
        assert!(!received.load(Ordering::SeqCst));

        channel.send(7).unwrap();
        assert_eq!(handle.join().unwrap(), Some(7));
        assert!(received.load(Ordering::SeqCst));
    }

    #[test]
    fn test_close_wakes_blocked_receiver() {
        let channel = Channel::<u32>::new(1);
        let handle = {
            let channel = channel.clone();
            thread::spawn(move || channel.receive())
        };

        thread::sleep(SETTLE);
        channel.close().unwrap();
        assert_eq!(handle.join().unwrap(), None);
    }

    #[test]
    fn test_close_fails_blocked_sender() {
        let channel = Channel::new(1);
        channel.send(1).unwrap();

        let handle = {
            let channel = channel.clone();
            thread::spawn(move || channel.send(2))
        };

        thread::sleep(SETTLE);
        channel.close().unwrap();
        assert_eq!(handle.join().unwrap(), Err(ChannelError::Closed));
        assert_eq!(channel.receive(), Some(1));
        assert_eq!(channel.receive(), None);
    }

    #[test]
    fn test_rendezvous_send_waits_for_receiver() {
        let channel = Channel::new(0);
        let delivered = Arc::new(AtomicBool::new(false));

        let handle = {
            let channel = channel.clone();
            let delivered = Arc::clone(&delivered);
            thread::spawn(move || {
                channel.send(42).unwrap();
                delivered.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(SETTLE);
        assert!(!delivered.load(Ordering::SeqCst));

        assert_eq!(channel.receive(), Some(42));
        handle.join().unwrap();
        assert!(delivered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_rendezvous_value_in_transit_survives_close() {
        let channel = Channel::new(0);

        let handle = {
            let channel = channel.clone();
            thread::spawn(move || channel.send(1))
        };

        // Wait until the value sits in the hand-off slot
        while channel.len() == 0 {
            thread::sleep(Duration::from_millis(1));
        }
        channel.close().unwrap();

        thread::sleep(SETTLE);
        assert!(!handle.is_finished());

        assert_eq!(channel.receive(), Some(1));
        assert!(handle.join().unwrap().is_ok());
        assert_eq!(channel.receive(), None);
        assert_eq!(channel.send(2), Err(ChannelError::Closed));
    }

    #[test]
    fn test_rendezvous_try_send_needs_waiting_receiver() {
        let channel = Channel::new(0);
        assert!(channel.try_send(1).unwrap_err().is_full());

        let handle = {
            let channel = channel.clone();
            thread::spawn(move || channel.receive())
        };

        // Retry until the receiver has parked
        let mut value = 2;
        loop {
            match channel.try_send(value) {
                Ok(()) => break,
                Err(err) => {
                    value = err.into_inner();
                    thread::sleep(Duration::from_millis(5));
                }
            }
        }
        assert_eq!(handle.join().unwrap(), Some(2));
    }

    #[test]
    fn test_receive_timeout() {
        let channel = Channel::<u8>::new(1);
        assert_eq!(
            channel.receive_timeout(Duration::from_millis(20)),
            Err(ReceiveTimeoutError::Timeout)
        );

        channel.send(9).unwrap();
        assert_eq!(channel.receive_timeout(Duration::from_millis(20)), Ok(9));

        channel.close().unwrap();
        assert_eq!(
            channel.receive_timeout(Duration::from_millis(20)),
            Err(ReceiveTimeoutError::Closed)
        );
    }

    #[test]
    fn test_directional_handles_share_state() {
        let channel = Channel::new(2);
        let tx = channel.sender();
        let rx = channel.receiver();

        tx.send("x").unwrap();
        assert_eq!(rx.len(), 1);
        assert_eq!(rx.receive(), Some("x"));

        tx.close().unwrap();
        assert!(rx.is_closed());
        assert_eq!(rx.receive(), None);
    }

    #[test]
    fn test_receiver_close_fails_blocked_sender() {
        let channel = Channel::new(1);
        let rx = channel.receiver();
        channel.send(1).unwrap();

        let handle = {
            let tx = channel.sender();
            thread::spawn(move || tx.send(2))
        };

        thread::sleep(SETTLE);
        rx.close().unwrap();
        assert_eq!(handle.join().unwrap(), Err(ChannelError::Closed));
        assert_eq!(rx.receive(), Some(1));
        assert_eq!(rx.receive(), None);
    }

    #[test]
    fn test_debug_does_not_require_debug_values() {
        struct Opaque;
        let channel = Channel::new(2);
        channel.send(Opaque).unwrap();
        let rendered = format!("{:?}", channel);
        assert!(rendered.contains("capacity: 2"));
        assert!(rendered.contains("len: 1"));
    }
}
