// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! A single bounded channel: ring buffer plus wait queues

use crate::wait::WakeQueue;
use crate::{Error, Result};
use std::cell::RefCell;

/// Bounded FIFO of messages with per-direction wait queues
///
/// The channel wakes exactly one parked sender per element removed and
/// exactly one parked receiver per element inserted. Blocking behaviour
/// lives in [`Bus`](crate::Bus); the channel itself never parks anyone.
#[derive(Debug)]
pub(crate) struct Channel {
    ring: RefCell<Ring>,
    /// Tasks waiting until the channel is not full.
    pub(crate) send_waiters: WakeQueue,
    /// Tasks waiting until the channel is not empty.
    pub(crate) recv_waiters: WakeQueue,
}

impl Channel {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            ring: RefCell::new(Ring::with_capacity(capacity)),
            send_waiters: WakeQueue::new(),
            recv_waiters: WakeQueue::new(),
        }
    }

    #[cfg(feature = "broadcast")]
    pub(crate) fn is_full(&self) -> bool {
        self.ring.borrow().is_full()
    }

    /// Appends one message, failing if the channel is full.
    pub(crate) fn try_send(&self, value: u32) -> Result<()> {
        {
            let mut ring = self.ring.borrow_mut();
            if ring.is_full() {
                return Err(Error::WouldBlock);
            }
            ring.push(value);
        }
        self.recv_waiters.wake_first();
        Ok(())
    }

    /// Removes the oldest message, failing if the channel is empty.
    pub(crate) fn try_recv(&self) -> Result<u32> {
        let value = {
            let mut ring = self.ring.borrow_mut();
            if ring.is_empty() {
                return Err(Error::WouldBlock);
            }
            ring.pop()
        };
        self.send_waiters.wake_first();
        Ok(value)
    }

    /// Appends as many leading elements of `values` as currently fit.
    ///
    /// Fails with [`Error::WouldBlock`] only if the channel is full on
    /// entry; otherwise at least one element (given a non-empty slice) is
    /// transferred and one receiver is woken per element.
    #[cfg(feature = "batch")]
    pub(crate) fn try_send_slice(&self, values: &[u32]) -> Result<usize> {
        let sent = {
            let mut ring = self.ring.borrow_mut();
            if ring.is_full() {
                return Err(Error::WouldBlock);
            }
            let sent = values.len().min(ring.free());
            for &value in &values[..sent] {
                ring.push(value);
            }
            sent
        };
        for _ in 0..sent {
            self.recv_waiters.wake_first();
        }
        Ok(sent)
    }

    /// Moves up to `buffer.len()` queued messages into `buffer`.
    ///
    /// Fails with [`Error::WouldBlock`] only if the channel is empty on
    /// entry; otherwise returns the number of elements written and wakes
    /// one sender per element.
    #[cfg(feature = "batch")]
    pub(crate) fn try_recv_slice(&self, buffer: &mut [u32]) -> Result<usize> {
        let received = {
            let mut ring = self.ring.borrow_mut();
            if ring.is_empty() {
                return Err(Error::WouldBlock);
            }
            let received = buffer.len().min(ring.len());
            for slot in &mut buffer[..received] {
                *slot = ring.pop();
            }
            received
        };
        for _ in 0..received {
            self.send_waiters.wake_first();
        }
        Ok(received)
    }

    /// Wakes every parked task so it can observe that the channel is gone.
    ///
    /// Queued data is discarded with the channel storage once the last
    /// waiter drops its reference.
    pub(crate) fn close(&self) {
        self.send_waiters.drain();
        self.recv_waiters.drain();
    }
}

/// Fixed-capacity ring of `u32` messages
///
/// Elements occupy positions `(head + i) % capacity` for `i < len`.
#[derive(Debug)]
struct Ring {
    buf: Box<[u32]>,
    head: usize,
    len: usize,
}

impl Ring {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[cfg(feature = "batch")]
    fn len(&self) -> usize {
        self.len
    }

    #[cfg(feature = "batch")]
    fn free(&self) -> usize {
        self.capacity() - self.len
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    fn push(&mut self, value: u32) {
        debug_assert!(!self.is_full());
        let tail = (self.head + self.len) % self.capacity();
        self.buf[tail] = value;
        self.len += 1;
    }

    fn pop(&mut self) -> u32 {
        debug_assert!(!self.is_empty());
        let value = self.buf[self.head];
        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn ring_wraps_around() {
        let mut ring = Ring::with_capacity(2);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.pop(), 1);
        ring.push(3);
        assert_eq!(ring.pop(), 2);
        assert_eq!(ring.pop(), 3);
        assert!(ring.is_empty());
    }

    #[test]
    fn send_and_recv_are_fifo() {
        let channel = Channel::new(3);
        for value in [7, 8, 9] {
            channel.try_send(value).unwrap();
        }
        assert_eq!(channel.try_recv(), Ok(7));
        assert_eq!(channel.try_recv(), Ok(8));
        assert_eq!(channel.try_recv(), Ok(9));
        assert_eq!(channel.try_recv(), Err(Error::WouldBlock));
    }

    #[test]
    fn send_to_full_channel_fails() {
        let channel = Channel::new(1);
        channel.try_send(1).unwrap();
        assert_eq!(channel.try_send(2), Err(Error::WouldBlock));
    }

    #[cfg(feature = "batch")]
    #[test]
    fn slice_transfer_is_partial() {
        let channel = Channel::new(4);
        channel.try_send(0).unwrap();
        assert_matches!(channel.try_send_slice(&[1, 2, 3, 4, 5]), Ok(3));

        let mut buffer = [0; 2];
        assert_matches!(channel.try_recv_slice(&mut buffer), Ok(2));
        assert_eq!(buffer, [0, 1]);
        assert_matches!(channel.try_recv_slice(&mut [0; 8]), Ok(2));
    }

    #[cfg(feature = "batch")]
    #[test]
    fn slice_transfer_fails_only_at_the_boundary() {
        let channel = Channel::new(1);
        assert_eq!(channel.try_recv_slice(&mut [0; 4]), Err(Error::WouldBlock));
        channel.try_send(1).unwrap();
        assert_eq!(channel.try_send_slice(&[2, 3]), Err(Error::WouldBlock));
    }
}
