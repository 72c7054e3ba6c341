//! Stop-and-wait delivery over full-duplex datagram exchanges.
//!
//! Every bus cycle the host clocks one packet in while we clock one out.
//! [`DatagramLink::receive`] handles the packet that arrived and
//! [`DatagramLink::next_packet`] picks what goes out on the next cycle.
//!
//! Reliable messages carry `ACKREQ` plus a toggle bit. The receiver delivers
//! a reliable message only when its toggle differs from the last one seen
//! and acks it either way; the sender repeats the message until an `ACK`
//! with the same toggle comes back, then flips its own toggle.

use super::packet::{flags, id, Message, Packet, PacketError, DATA_WORDS, PACKET_LEN};
use crate::config::{DATAGRAM_RX_DEPTH, DATAGRAM_STATS_PERIOD, DATAGRAM_TX_DEPTH};
use crate::ring::MsgRing;

pub type RxRing = MsgRing<Message, DATAGRAM_RX_DEPTH>;
pub type TxRing = MsgRing<Message, DATAGRAM_TX_DEPTH>;

/// What happened to an incoming packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxOutcome {
    Delivered,
    /// Repeat of the last reliable message; acked again, not delivered.
    Duplicate,
    /// RX ring full. Reliable messages are not acked so the host retries.
    Dropped,
    /// Idle or status packet; nothing to deliver.
    NoCommand,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkCounters {
    pub exchanges: u32,
    pub delivered: u32,
    pub duplicates: u32,
    pub dropped: u32,
    pub crc_errors: u32,
    pub no_direction: u32,
    pub acked: u32,
    pub retransmits: u32,
}

pub struct DatagramLink<'a> {
    rx_ring: &'a RxRing,
    tx_ring: &'a TxRing,
    /// Toggle of the last reliable message delivered; `None` until the first.
    rx_toggle: Option<bool>,
    tx_toggle: bool,
    /// Reliable message sent but not yet acked.
    in_flight: Option<Message>,
    /// Toggle to acknowledge on the next packet out.
    ack_pending: Option<bool>,
    counters: LinkCounters,
}

impl<'a> DatagramLink<'a> {
    pub fn new(rx_ring: &'a RxRing, tx_ring: &'a TxRing) -> Self {
        Self {
            rx_ring,
            tx_ring,
            rx_toggle: None,
            tx_toggle: false,
            in_flight: None,
            ack_pending: None,
            counters: LinkCounters::default(),
        }
    }

    pub fn counters(&self) -> &LinkCounters {
        &self.counters
    }

    pub fn rx_toggle(&self) -> Option<bool> {
        self.rx_toggle
    }

    pub fn tx_toggle(&self) -> bool {
        self.tx_toggle
    }

    pub fn in_flight(&self) -> Option<&Message> {
        self.in_flight.as_ref()
    }

    /// One bus cycle: handle `rx`, return the packet for the next cycle.
    pub fn exchange(&mut self, rx: &[u8]) -> (Result<RxOutcome, PacketError>, [u8; PACKET_LEN]) {
        let res = self.receive(rx);
        (res, self.next_packet())
    }

    pub fn receive(&mut self, rx: &[u8]) -> Result<RxOutcome, PacketError> {
        bump(&mut self.counters.exchanges);
        if self.counters.exchanges % DATAGRAM_STATS_PERIOD == 0 {
            let c = &self.counters;
            info!(
                "datagram: {} delivered, {} dup, {} dropped, {} crc, {} acked, {} resent",
                c.delivered,
                c.duplicates,
                c.dropped,
                c.crc_errors,
                c.acked,
                c.retransmits
            );
        }

        let pkt = match Packet::decode(rx) {
            Ok(p) => p,
            Err(e) => {
                match e {
                    PacketError::CrcMismatch => {
                        bump(&mut self.counters.crc_errors);
                        debug!("datagram: crc mismatch");
                    }
                    PacketError::NoDirection => bump(&mut self.counters.no_direction),
                    PacketError::InvalidLength => warn!("datagram: {} byte packet", rx.len()),
                }
                return Err(e);
            }
        };

        // An ack only counts on a packet that doesn't want one itself.
        if pkt.has(flags::ACK) && !pkt.has(flags::ACKREQ) {
            self.handle_ack(pkt.toggle());
        }

        if !id::is_command(pkt.id) {
            return Ok(RxOutcome::NoCommand);
        }

        if !pkt.has(flags::ACKREQ) {
            return Ok(self.deliver(&pkt));
        }

        let toggle = pkt.toggle();
        if self.rx_toggle == Some(toggle) {
            bump(&mut self.counters.duplicates);
            self.ack_pending = Some(toggle);
            return Ok(RxOutcome::Duplicate);
        }

        let outcome = self.deliver(&pkt);
        if outcome == RxOutcome::Delivered {
            self.rx_toggle = Some(toggle);
            self.ack_pending = Some(toggle);
        }
        Ok(outcome)
    }

    fn handle_ack(&mut self, toggle: bool) {
        if self.in_flight.is_some() && toggle == self.tx_toggle {
            self.in_flight = None;
            self.tx_toggle = !self.tx_toggle;
            bump(&mut self.counters.acked);
        }
    }

    fn deliver(&mut self, pkt: &Packet) -> RxOutcome {
        match self.rx_ring.push(Message::from(pkt)) {
            Ok(()) => {
                bump(&mut self.counters.delivered);
                RxOutcome::Delivered
            }
            Err(_) => {
                // Drop without notice while busy.
                bump(&mut self.counters.dropped);
                RxOutcome::Dropped
            }
        }
    }

    /// Packet to clock out next: pending ack, then the unacked message,
    /// then the next queued one, else an idle packet.
    pub fn next_packet(&mut self) -> [u8; PACKET_LEN] {
        if let Some(toggle) = self.ack_pending.take() {
            return Packet {
                id: id::ACK,
                flags: flags::ACK | toggle_flag(toggle),
                data: [0; DATA_WORDS],
            }
            .encode();
        }

        if let Some(msg) = self.in_flight {
            bump(&mut self.counters.retransmits);
            return self.reliable_packet(&msg);
        }

        match self.tx_ring.pop() {
            Ok(msg) if msg.ackreq => {
                self.in_flight = Some(msg);
                self.reliable_packet(&msg)
            }
            Ok(msg) => Packet {
                id: msg.id,
                flags: 0,
                data: msg.data,
            }
            .encode(),
            Err(_) => Packet::IDLE.encode(),
        }
    }

    fn reliable_packet(&self, msg: &Message) -> [u8; PACKET_LEN] {
        Packet {
            id: msg.id,
            flags: flags::ACKREQ | toggle_flag(self.tx_toggle),
            data: msg.data,
        }
        .encode()
    }
}

/// Counters wrap; they are only read as deltas.
fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}

fn toggle_flag(toggle: bool) -> u8 {
    if toggle {
        flags::ACKTGL
    } else {
        0
    }
}
