//! Channel iterators

use super::bounded::Channel;

/// Blocking iterator over a borrowed channel
///
/// Yields values until the channel is closed and drained.
#[derive(Debug)]
pub struct Iter<'a, T> {
    channel: &'a Channel<T>,
}

impl<'a, T> Iter<'a, T> {
    pub(super) fn new(channel: &'a Channel<T>) -> Self {
        Self { channel }
    }
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.receive()
    }
}

/// Non-blocking iterator that stops at the first empty read
#[derive(Debug)]
pub struct TryIter<'a, T> {
    channel: &'a Channel<T>,
}

impl<'a, T> TryIter<'a, T> {
    pub(super) fn new(channel: &'a Channel<T>) -> Self {
        Self { channel }
    }
}

impl<T> Iterator for TryIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.try_receive().ok()
    }
}

/// Blocking iterator that owns a channel handle
#[derive(Debug)]
pub struct IntoIter<T> {
    channel: Channel<T>,
}

impl<T> IntoIter<T> {
    pub(super) fn new(channel: Channel<T>) -> Self {
        Self { channel }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.channel.receive()
    }
}
