//! SPI link state machine for EC packets.
//!
//! Events arrive from the select-sense edge and DMA completions (interrupt
//! priority); the response arrives from the host command task through
//! [`ResponseSink`]. The link never runs a handler itself.

use super::host::{HostInbox, HostPacket, ResponseSink};
use super::wire::{spi_status, RequestHeader, REQUEST_HEADER_LEN, REQUEST_VERSION, SPI_PAST_END_LEN, SPI_PREAMBLE};
use crate::config::{SPI_MAX_REQUEST_SIZE, SPI_MAX_RESPONSE_SIZE};

/// Bytes clocked out for the largest response.
pub const SPI_OUT_LEN: usize = SPI_PREAMBLE.len() + SPI_MAX_RESPONSE_SIZE + SPI_PAST_END_LEN;

/// What the link needs from the SPI peripheral.
pub trait SpiPort {
    /// Full peripheral reset.
    fn reset(&mut self);
    /// Arm reception of exactly `len` bytes, landing at `offset` of the request.
    fn start_rx(&mut self, offset: usize, len: usize);
    /// Clock out `frame`, then keep sending the status byte.
    fn start_tx(&mut self, frame: &[u8]);
    fn stop_tx(&mut self);
    fn flush_rx(&mut self);
    /// Byte the peripheral sends while it has nothing else to say.
    fn set_status(&mut self, byte: u8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Disabled,
    PrepareRx,
    ReadyToRx,
    ReceivingHeader,
    ReceivingPayload,
    Processing,
    Sending,
    /// Ignore everything until the host deasserts select.
    RxBad,
}

pub struct SpiLink<'a, P: SpiPort> {
    port: P,
    inbox: &'a HostInbox,
    state: LinkState,
    /// Select went high while a command was processing; re-arm once the
    /// response path runs.
    rearm_later: bool,
    /// A posted frame has not been answered yet. The peripheral must not be
    /// reset until it is.
    in_flight: bool,
    rx_offset: usize,
    rx_len: usize,
    in_msg: [u8; SPI_MAX_REQUEST_SIZE],
    out_msg: [u8; SPI_OUT_LEN],
}

impl<'a, P: SpiPort> SpiLink<'a, P> {
    pub fn new(port: P, inbox: &'a HostInbox) -> Self {
        Self {
            port,
            inbox,
            state: LinkState::Disabled,
            rearm_later: false,
            in_flight: false,
            rx_offset: 0,
            rx_len: 0,
            in_msg: [0; SPI_MAX_REQUEST_SIZE],
            out_msg: [0; SPI_OUT_LEN],
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn rearm_pending(&self) -> bool {
        self.rearm_later
    }

    pub fn command_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Reset the peripheral and wait for the next request header.
    pub fn reinit(&mut self) {
        self.port.reset();

        self.state = LinkState::PrepareRx;
        self.port.set_status(spi_status::NOT_READY);
        self.port.stop_tx();
        self.port.flush_rx();
        self.rearm_later = false;

        self.arm_rx(0, REQUEST_HEADER_LEN);
        self.state = LinkState::ReadyToRx;
        self.port.set_status(spi_status::OLD_READY);
    }

    /// Select asserted: a transaction starts.
    pub fn on_select_fall(&mut self) {
        match self.state {
            LinkState::Disabled => {}
            LinkState::ReadyToRx => {
                self.state = LinkState::ReceivingHeader;
                self.port.set_status(spi_status::RECEIVING);
            }
            other => {
                warn!("spi: select asserted in {:?}", other);
                self.bad(spi_status::NOT_READY);
            }
        }
    }

    /// Select deasserted: the host ended the transaction.
    pub fn on_select_rise(&mut self) {
        if self.state == LinkState::Disabled {
            return;
        }
        if self.in_flight {
            // The task still owns the packet; re-arm when it answers.
            debug!("spi: host left while {:?} with a command in flight", self.state);
            self.rearm_later = true;
            return;
        }
        self.reinit();
    }

    /// The armed reception finished with `data`.
    pub fn on_rx_done(&mut self, data: &[u8]) {
        match self.state {
            LinkState::Disabled => return,
            LinkState::ReceivingHeader | LinkState::ReceivingPayload => {}
            other => {
                warn!("spi: rx completion in {:?}", other);
                self.bad(spi_status::RX_BAD_DATA);
                return;
            }
        }

        if data.len() != self.rx_len {
            warn!("spi: rx got {} bytes, armed {}", data.len(), self.rx_len);
            self.bad(spi_status::RX_BAD_DATA);
            return;
        }
        let end = self.rx_offset + self.rx_len;
        self.in_msg[self.rx_offset..end].copy_from_slice(data);

        if self.state == LinkState::ReceivingHeader {
            self.header_received();
        } else {
            self.frame_complete(end);
        }
    }

    /// DMA or peripheral error during reception.
    pub fn on_rx_error(&mut self) {
        if self.state != LinkState::Disabled {
            warn!("spi: bus error in {:?}", self.state);
            self.bad(spi_status::RX_BAD_DATA);
        }
    }

    /// The response has been clocked out.
    pub fn on_tx_done(&mut self) {
        if self.state == LinkState::Sending {
            // Stay put until the host drops select.
            self.port.set_status(spi_status::PAST_END);
        }
    }

    fn header_received(&mut self) {
        // Caller checked that a full header is in place.
        let Some(hdr) = RequestHeader::parse(&self.in_msg) else {
            self.bad(spi_status::RX_BAD_DATA);
            return;
        };
        if hdr.struct_version != REQUEST_VERSION {
            warn!("spi: bad struct version {}", hdr.struct_version);
            self.bad(spi_status::RX_BAD_DATA);
            return;
        }

        let total = REQUEST_HEADER_LEN + hdr.data_len as usize;
        if total > self.in_msg.len() {
            warn!("spi: request of {} bytes too big", total);
            self.bad(spi_status::RX_BAD_DATA);
            return;
        }

        if hdr.data_len == 0 {
            self.frame_complete(REQUEST_HEADER_LEN);
        } else {
            self.state = LinkState::ReceivingPayload;
            self.arm_rx(REQUEST_HEADER_LEN, hdr.data_len as usize);
        }
    }

    fn frame_complete(&mut self, len: usize) {
        let mut pkt = HostPacket::new();
        if pkt.request.extend_from_slice(&self.in_msg[..len]).is_err() {
            self.bad(spi_status::RX_BAD_DATA);
            return;
        }
        pkt.request_max = self.in_msg.len();
        pkt.response_max = SPI_MAX_RESPONSE_SIZE;

        if self.inbox.try_post(pkt).is_err() {
            // Previous command not answered yet.
            warn!("spi: request while a command is in flight");
            self.bad(spi_status::RX_BAD_DATA);
            return;
        }

        self.in_flight = true;
        self.state = LinkState::Processing;
        self.port.set_status(spi_status::PROCESSING);
    }

    fn arm_rx(&mut self, offset: usize, len: usize) {
        self.rx_offset = offset;
        self.rx_len = len;
        self.port.start_rx(offset, len);
    }

    fn bad(&mut self, status: u8) {
        self.state = LinkState::RxBad;
        self.port.set_status(status);
    }
}

impl<P: SpiPort> ResponseSink for SpiLink<'_, P> {
    fn send_response(&mut self, response: &[u8]) {
        self.in_flight = false;
        if self.rearm_later {
            // Host already left; the response goes nowhere.
            debug!("spi: response dropped, re-arming");
            self.reinit();
            return;
        }
        if self.state != LinkState::Processing {
            warn!("spi: response dropped in {:?}", self.state);
            return;
        }

        let pre = SPI_PREAMBLE.len();
        let total = pre + response.len() + SPI_PAST_END_LEN;
        if total > self.out_msg.len() {
            error!("spi: response of {} bytes too big", response.len());
            self.bad(spi_status::RX_BAD_DATA);
            return;
        }

        self.out_msg[..pre].copy_from_slice(&SPI_PREAMBLE);
        self.out_msg[pre..pre + response.len()].copy_from_slice(response);
        self.out_msg[total - 1] = spi_status::PAST_END;

        self.state = LinkState::Sending;
        self.port.start_tx(&self.out_msg[..total]);
    }
}
