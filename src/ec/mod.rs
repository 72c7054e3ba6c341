//! EC host command protocol: versioned request/response packets with an
//! additive checksum, a sorted command table and an SPI link.

pub mod commands;
pub mod framer;
pub mod host;
pub mod poll;
pub mod registry;
pub mod spi;
pub mod wire;

pub use commands::{feature_words, BUILTIN_TABLE};
pub use host::{
    Completion, CompletionSlot, HostCommands, HostInbox, HostPacket, HostState, Platform, ResponseSink,
};
pub use registry::{CommandTable, HandlerArgs, HostCommand};
pub use spi::{LinkState, SpiLink, SpiPort};
pub use wire::Status;
