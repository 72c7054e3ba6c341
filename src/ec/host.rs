//! Task-side EC host command processing for one link.
//!
//! The link posts a [`HostPacket`] into the shared inbox from interrupt
//! context. Once per scheduler tick the task calls
//! [`HostCommands::has_pending`] / [`HostCommands::process_pending`], which
//! validates the packet, runs the handler and hands the framed response to
//! the link through [`ResponseSink`].

use heapless::Vec;

use super::framer::{self, Envelope};
use super::registry::{CommandTable, HandlerArgs};
use super::wire::{Status, RESPONSE_HEADER_LEN};
use crate::config::{SPI_MAX_REQUEST_SIZE, SPI_MAX_RESPONSE_SIZE};
use crate::mailbox::Mailbox;

/// A complete frame captured by a link.
pub struct HostPacket {
    pub request: Vec<u8, SPI_MAX_REQUEST_SIZE>,
    pub request_max: usize,
    /// Room the link has for the response, header included.
    pub response_max: usize,
    pub driver_result: Status,
    /// Ask the dispatcher to copy params out of `request` before use.
    pub copy_params: bool,
}

impl HostPacket {
    pub const fn new() -> Self {
        Self {
            request: Vec::new(),
            request_max: SPI_MAX_REQUEST_SIZE,
            response_max: SPI_MAX_RESPONSE_SIZE,
            driver_result: Status::Success,
            copy_params: false,
        }
    }
}

impl Default for HostPacket {
    fn default() -> Self {
        Self::new()
    }
}

pub type HostInbox = Mailbox<HostPacket>;

/// Real outcome of a command that answered `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    pub result: Status,
    /// Payload bytes the result would have carried.
    pub payload_len: usize,
}

/// Slow work posts its [`Completion`] here from any context; the dispatcher
/// applies it on its next tick.
pub type CompletionSlot = Mailbox<Completion>;

/// Where a framed response goes. Implemented by each link.
///
/// Called exactly once per processed packet, from task context. The link
/// drops the response if the host already ended the transaction.
pub trait ResponseSink {
    fn send_response(&mut self, response: &[u8]);
}

/// Board hooks the built-in commands need.
pub trait Platform {
    /// Put actuators into a safe state before a reset.
    fn stop_outputs(&mut self) {}

    /// Reset the MCU. Should not return.
    fn reboot(&mut self);
}

/// State the built-in commands read and update.
pub struct HostState {
    /// An `InProgress` response went out and the real result has not arrived.
    pub command_pending: bool,
    /// Result of the last slow command, returned once by `ResendResponse`.
    pub saved_result: Status,
    /// Feature words reported by `GetFeatures`.
    pub features: [u32; 2],
}

impl HostState {
    pub const fn new(features: [u32; 2]) -> Self {
        Self {
            command_pending: false,
            saved_result: Status::Unavailable,
            features,
        }
    }
}

pub struct HostCommands<'a, P: Platform> {
    table: &'a CommandTable,
    inbox: &'a HostInbox,
    completions: Option<&'a CompletionSlot>,
    platform: P,
    state: HostState,
    response: [u8; SPI_MAX_RESPONSE_SIZE],
    temp: [u8; SPI_MAX_REQUEST_SIZE],
}

impl<'a, P: Platform> HostCommands<'a, P> {
    pub fn new(table: &'a CommandTable, inbox: &'a HostInbox, platform: P, features: [u32; 2]) -> Self {
        Self {
            table,
            inbox,
            completions: None,
            platform,
            state: HostState::new(features),
            response: [0; SPI_MAX_RESPONSE_SIZE],
            temp: [0; SPI_MAX_REQUEST_SIZE],
        }
    }

    /// Accept late results of `InProgress` commands through `slot`.
    pub fn with_completions(mut self, slot: &'a CompletionSlot) -> Self {
        self.completions = Some(slot);
        self
    }

    pub fn state(&self) -> &HostState {
        &self.state
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Non-blocking check for the scheduler.
    pub fn has_pending(&self) -> bool {
        self.inbox.is_occupied() || self.completions.is_some_and(|c| c.is_occupied())
    }

    /// Apply a posted completion, then handle the waiting packet, if any,
    /// and send its response.
    ///
    /// Returns the result code that was sent.
    pub fn process_pending(&mut self, sink: &mut impl ResponseSink) -> Option<Status> {
        if let Some(done) = self.completions.and_then(|c| c.take()) {
            self.finish_in_progress(done.result, done.payload_len);
        }

        let pkt = self.inbox.take()?;

        let response_max = pkt.response_max.min(self.response.len());
        if response_max < RESPONSE_HEADER_LEN {
            error!("host cmd: link offers {} response bytes, dropping", response_max);
            return None;
        }

        let env = Envelope {
            request: &pkt.request,
            request_temp: if pkt.copy_params { Some(&mut self.temp[..]) } else { None },
            request_max: pkt.request_max,
            driver_result: pkt.driver_result,
        };

        let (result, payload_len) = match framer::receive(env) {
            Err(status) => {
                warn!("host packet rejected: {:?}", status);
                (status, 0)
            }
            Ok(req) => {
                let payload = &mut self.response[RESPONSE_HEADER_LEN..response_max];
                let mut args = HandlerArgs {
                    command: req.command,
                    version: req.version,
                    params: req.params,
                    response: payload,
                    response_size: 0,
                    host: &mut self.state,
                    table: self.table,
                    platform: &mut self.platform,
                };
                let status = self.table.dispatch(&mut args);
                debug!("host cmd 0x{:04X} v{} -> {:?}", req.command, req.version, status);
                (status, args.response_size)
            }
        };

        if result == Status::InProgress {
            self.state.command_pending = true;
        }

        let (result, len) = framer::respond(result, payload_len, &mut self.response[..response_max]);
        sink.send_response(&self.response[..len]);
        Some(result)
    }

    /// Report the real outcome of a command that answered `InProgress`.
    ///
    /// The host has moved on, so only the status is kept for
    /// `ResendResponse`; a completion that carries data is stashed as
    /// `Unavailable`.
    pub fn finish_in_progress(&mut self, result: Status, payload_len: usize) {
        if !self.state.command_pending {
            warn!("host cmd: completion {:?} with nothing in progress", result);
            return;
        }
        self.state.saved_result = if payload_len != 0 {
            Status::Unavailable
        } else {
            result
        };
        self.state.command_pending = false;
        info!("host cmd: slow command finished with {:?}", self.state.saved_result);
    }
}
