// This file is part of marsh, a cooperative multitasking toolkit and shell.
// Copyright (C) 2026 the marsh authors

//! `marsh-bus` is a multi-channel, bounded, single-value message bus for
//! cooperatively scheduled tasks sharing one thread.
//!
//! A [`Bus`] owns any number of channels, each a fixed-capacity FIFO of
//! `u32` messages identified by a stable [`ChannelId`]. Senders and
//! receivers on the same channel rendezvous through two per-channel wait
//! queues: `try_*` operations fail fast with [`Error::WouldBlock`], while
//! the `async` operations park the calling task until the channel has room
//! (or data) again, in strict first-parked-first-woken order.
//!
//! ```
//! # use marsh_bus::{Bus, Error};
//! let bus = Bus::new();
//! let id = bus.open(2);
//!
//! bus.try_send(id, 10)?;
//! bus.try_send(id, 20)?;
//! assert_eq!(bus.try_send(id, 30), Err(Error::WouldBlock));
//!
//! assert_eq!(bus.try_recv(id)?, 10);
//! assert_eq!(bus.try_recv(id)?, 20);
//!
//! bus.close(id);
//! assert_eq!(bus.try_recv(id), Err(Error::NoChannel));
//! # Ok::<(), Error>(())
//! ```
//!
//! The bus is strictly single-threaded (`!Send`, `!Sync`); there are no
//! locks because there is no preemption. The `async` operations are driven
//! by any single-threaded executor, such as `marsh-executor`. They tolerate
//! spurious resumes by re-checking channel state after every wake-up, and
//! they re-validate the channel id as well: a task parked on a channel that
//! gets [closed](Bus::close) under it resumes with [`Error::NoChannel`].
//!
//! Two optional operation families are enabled by default:
//!
//! - `batch` — [`send_slice`](Bus::send_slice) and friends move as many
//!   elements as currently fit instead of failing, which guarantees forward
//!   progress under contention without all-or-nothing transfers.
//! - `broadcast` — [`broadcast`](Bus::broadcast) pushes one value into
//!   every live channel, all or nothing.
//!
//! With a feature disabled, the corresponding operations are stubs that
//! fail with [`Error::NotImplemented`].

use thiserror::Error;

mod bus;
mod channel;
mod wait;

pub use bus::{Bus, ChannelId};

/// Failure reason of a bus operation
///
/// Every operation reports its outcome through its return value; there is
/// no shared error register to inspect afterwards.
#[derive(Clone, Copy, Debug, Eq, Error, Hash, PartialEq)]
pub enum Error {
    /// The channel id is out of range or the channel has been closed.
    #[error("channel does not exist")]
    NoChannel,

    /// The channel is full (sending) or empty (receiving) right now.
    ///
    /// Only `try_*` operations fail this way; the `async` operations park
    /// the task instead.
    #[error("operation would block")]
    WouldBlock,

    /// Support for this operation was compiled out.
    #[error("support for this operation was compiled out")]
    NotImplemented,
}

/// Result type of bus operations
pub type Result<T> = std::result::Result<T, Error>;
