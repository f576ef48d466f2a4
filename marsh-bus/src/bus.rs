// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! The bus: a sparse, stably-indexed table of channels

use crate::channel::Channel;
use crate::{Error, Result};
use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

/// Identifier of an open channel
///
/// Ids are stable for the life of the channel. After
/// [`close`](Bus::close), the id is dead and every operation quoting it
/// fails with [`Error::NoChannel`]; the slot (and thus the id) may be
/// reused by a later [`open`](Bus::open).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ChannelId(usize);

impl Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Owner of a set of channels
///
/// See the [crate documentation](crate) for an overview. Dropping the bus
/// frees every live channel without running any waiter logic; by
/// construction no task is parked on a bus that is being torn down.
#[derive(Debug, Default)]
pub struct Bus {
    slots: RefCell<Vec<Option<Rc<Channel>>>>,
}

impl Bus {
    /// Creates a bus with no channels.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a channel holding at most `capacity` messages.
    ///
    /// The lowest empty slot is reused; otherwise the table grows.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn open(&self, capacity: usize) -> ChannelId {
        assert!(capacity >= 1, "channel capacity must be at least 1");
        let channel = Some(Rc::new(Channel::new(capacity)));

        let mut slots = self.slots.borrow_mut();
        if let Some(index) = slots.iter().position(Option::is_none) {
            slots[index] = channel;
            return ChannelId(index);
        }

        if slots.len() == slots.capacity() {
            // Table growth: 4, then doubling up to 1024, then one quarter.
            let target = match slots.capacity() {
                0 => 4,
                cap if cap <= 1024 => cap * 2,
                cap => cap + cap / 4,
            };
            let current_len = slots.len();
            slots.reserve_exact(target - current_len);
        }
        slots.push(channel);
        ChannelId(slots.len() - 1)
    }

    /// Closes a channel, discarding any queued messages.
    ///
    /// Every task parked on the channel is woken, FIFO; each resumes, fails
    /// to find the id in the table, and reports [`Error::NoChannel`]. The
    /// channel storage is released once the last such task has let go of
    /// it. Closing an id that is not open is a no-op.
    pub fn close(&self, id: ChannelId) {
        let channel = self
            .slots
            .borrow_mut()
            .get_mut(id.0)
            .and_then(Option::take);
        if let Some(channel) = channel {
            channel.close();
        }
    }

    fn channel(&self, id: ChannelId) -> Result<Rc<Channel>> {
        self.slots
            .borrow()
            .get(id.0)
            .and_then(|slot| slot.clone())
            .ok_or(Error::NoChannel)
    }

    /// Sends one message without blocking.
    pub fn try_send(&self, id: ChannelId, value: u32) -> Result<()> {
        self.channel(id)?.try_send(value)
    }

    /// Sends one message, parking until the channel has room.
    pub async fn send(&self, id: ChannelId, value: u32) -> Result<()> {
        loop {
            let channel = self.channel(id)?;
            match channel.try_send(value) {
                Err(Error::WouldBlock) => channel.send_waiters.park().await,
                outcome => return outcome,
            }
        }
    }

    /// Receives the oldest message without blocking.
    pub fn try_recv(&self, id: ChannelId) -> Result<u32> {
        self.channel(id)?.try_recv()
    }

    /// Receives the oldest message, parking until one arrives.
    pub async fn recv(&self, id: ChannelId) -> Result<u32> {
        loop {
            let channel = self.channel(id)?;
            match channel.try_recv() {
                Err(Error::WouldBlock) => channel.recv_waiters.park().await,
                outcome => return outcome,
            }
        }
    }
}

#[cfg(feature = "broadcast")]
impl Bus {
    /// Sends `value` to every live channel, all or nothing.
    ///
    /// Fails with [`Error::NoChannel`] if no channel exists and with
    /// [`Error::WouldBlock`] if any channel is full; in the latter case no
    /// channel is mutated. On success one receiver is woken per channel.
    pub fn try_broadcast(&self, value: u32) -> Result<()> {
        let live: Vec<Rc<Channel>> = self.slots.borrow().iter().flatten().cloned().collect();
        if live.is_empty() {
            return Err(Error::NoChannel);
        }
        if live.iter().any(|channel| channel.is_full()) {
            return Err(Error::WouldBlock);
        }
        for channel in live {
            let sent = channel.try_send(value);
            debug_assert_eq!(sent, Ok(()));
        }
        Ok(())
    }

    /// Sends `value` to every live channel, parking while any is full.
    ///
    /// The task parks on the send queue of the first full channel found and
    /// retries the whole broadcast after each wake-up.
    pub async fn broadcast(&self, value: u32) -> Result<()> {
        loop {
            match self.try_broadcast(value) {
                Err(Error::WouldBlock) => {}
                outcome => return outcome,
            }
            let full = self
                .slots
                .borrow()
                .iter()
                .flatten()
                .find(|channel| channel.is_full())
                .cloned();
            if let Some(channel) = full {
                channel.send_waiters.park().await;
            }
        }
    }
}

#[cfg(not(feature = "broadcast"))]
impl Bus {
    /// Stub; compiled without the `broadcast` feature.
    pub fn try_broadcast(&self, _value: u32) -> Result<()> {
        Err(Error::NotImplemented)
    }

    /// Stub; compiled without the `broadcast` feature.
    pub async fn broadcast(&self, _value: u32) -> Result<()> {
        Err(Error::NotImplemented)
    }
}

#[cfg(feature = "batch")]
impl Bus {
    /// Sends the leading elements of `values` that fit, without blocking.
    ///
    /// Returns the number of elements sent. Fails with
    /// [`Error::WouldBlock`] only if the channel is full on entry.
    pub fn try_send_slice(&self, id: ChannelId, values: &[u32]) -> Result<usize> {
        self.channel(id)?.try_send_slice(values)
    }

    /// Sends at least one element of `values`, parking while the channel is
    /// full.
    ///
    /// Returns the number of elements sent, which may be less than
    /// `values.len()`.
    pub async fn send_slice(&self, id: ChannelId, values: &[u32]) -> Result<usize> {
        loop {
            let channel = self.channel(id)?;
            match channel.try_send_slice(values) {
                Err(Error::WouldBlock) => channel.send_waiters.park().await,
                outcome => return outcome,
            }
        }
    }

    /// Moves up to `buffer.len()` queued messages into `buffer`, without
    /// blocking.
    ///
    /// Returns the number of elements received. Fails with
    /// [`Error::WouldBlock`] only if the channel is empty on entry.
    pub fn try_recv_slice(&self, id: ChannelId, buffer: &mut [u32]) -> Result<usize> {
        self.channel(id)?.try_recv_slice(buffer)
    }

    /// Receives at least one message into `buffer`, parking while the
    /// channel is empty.
    pub async fn recv_slice(&self, id: ChannelId, buffer: &mut [u32]) -> Result<usize> {
        loop {
            let channel = self.channel(id)?;
            match channel.try_recv_slice(buffer) {
                Err(Error::WouldBlock) => channel.recv_waiters.park().await,
                outcome => return outcome,
            }
        }
    }
}

#[cfg(not(feature = "batch"))]
impl Bus {
    /// Stub; compiled without the `batch` feature.
    pub fn try_send_slice(&self, _id: ChannelId, _values: &[u32]) -> Result<usize> {
        Err(Error::NotImplemented)
    }

    /// Stub; compiled without the `batch` feature.
    pub async fn send_slice(&self, _id: ChannelId, _values: &[u32]) -> Result<usize> {
        Err(Error::NotImplemented)
    }

    /// Stub; compiled without the `batch` feature.
    pub fn try_recv_slice(&self, _id: ChannelId, _buffer: &mut [u32]) -> Result<usize> {
        Err(Error::NotImplemented)
    }

    /// Stub; compiled without the `batch` feature.
    pub async fn recv_slice(&self, _id: ChannelId, _buffer: &mut [u32]) -> Result<usize> {
        Err(Error::NotImplemented)
    }
}
