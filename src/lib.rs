#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible to every module.
#[macro_use]
mod fmt;

pub mod config;
pub mod datagram;
pub mod ec;
pub mod mailbox;
pub mod ring;

#[cfg(feature = "firmware")]
pub mod board;
#[cfg(feature = "firmware")]
pub mod tasks;

#[cfg(feature = "firmware")]
pub use board::Board;
pub use mailbox::Mailbox;
pub use ring::{MsgRing, RingError};
