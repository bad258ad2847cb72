//! Bounded blocking channels
//!
//! This module provides:
//! - [`Channel`] - Fixed-capacity FIFO with blocking send/receive and one-way close
//! - [`Sender`] / [`Receiver`] - Direction-restricted views over the same channel
//! - [`Iter`] / [`IntoIter`] / [`TryIter`] - Receive loops over a channel
//!
//! # Semantics
//!
//! ```text
//!            send (blocks while full)              receive (blocks while empty)
//!  ───────────────────────────────►  [ v1 v2 v3 ]  ───────────────────────────────►
//!                                     capacity 3
//!
//!  close(): no further sends; receivers drain [v1 v2 v3], then observe `None`
//! ```
//!
//! A capacity of zero yields a rendezvous channel: each `send` waits until a
//! receiver has taken its value.

mod bounded;
mod error;
mod iter;

pub use bounded::{Channel, Receiver, Sender};
pub use error::{ChannelError, ReceiveTimeoutError, TryReceiveError, TrySendError};
pub use iter::{IntoIter, Iter, TryIter};
