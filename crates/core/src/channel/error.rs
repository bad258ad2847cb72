//! Channel errors

use std::fmt;

/// Errors from blocking channel operations
///
/// Both variants indicate misuse of the channel lifecycle and are never
/// retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    /// Send on a channel that has been closed
    #[error("send on closed channel")]
    Closed,

    /// Close on a channel that has already been closed
    #[error("close of closed channel")]
    AlreadyClosed,
}

/// Error returned by [`Channel::try_send`](super::Channel::try_send)
///
/// The rejected value is handed back to the caller.
#[derive(PartialEq, Eq)]
pub enum TrySendError<T> {
    /// No free slot (or, for a rendezvous channel, no waiting receiver)
    Full(T),

    /// The channel is closed
    Closed(T),
}

impl<T> TrySendError<T> {
    /// Recover the value that could not be sent
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(value) | Self::Closed(value) => value,
        }
    }

    /// Whether the send failed because the channel was full
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Whether the send failed because the channel was closed
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => write!(f, "channel is full"),
            Self::Closed(_) => write!(f, "send on closed channel"),
        }
    }
}

impl<T> std::error::Error for TrySendError<T> {}

/// Error returned by [`Channel::try_receive`](super::Channel::try_receive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TryReceiveError {
    /// Nothing buffered, but the channel is still open
    #[error("channel is empty")]
    Empty,

    /// Nothing buffered and the channel is closed
    #[error("channel is closed and drained")]
    Closed,
}

/// Error returned by [`Channel::receive_timeout`](super::Channel::receive_timeout)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReceiveTimeoutError {
    /// No value arrived before the deadline
    #[error("timed out waiting on channel")]
    Timeout,

    /// The channel was closed and drained
    #[error("channel is closed and drained")]
    Closed,
}
