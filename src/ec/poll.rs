//! Polled EC link for boards without SPI DMA.
//!
//! Every byte wait is bounded by one deadline per request (a
//! `CountDown`) and abandoned as soon as the host deasserts select.

use embedded_hal::digital::v2::InputPin;
use embedded_hal::spi::FullDuplex;
use embedded_hal::timer::CountDown;

use super::host::{HostPacket, ResponseSink};
use super::wire::{spi_status, RequestHeader, Status, REQUEST_HEADER_LEN, SPI_PREAMBLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollError<E> {
    /// Deadline passed before the host clocked the byte.
    Timeout,
    /// Select went high mid-request.
    Deselected,
    Bus(E),
    /// Header version or reserved byte not acceptable.
    BadHeader,
    /// Declared request does not fit the buffer.
    Overflow,
}

impl<E> From<PollError<E>> for Status {
    fn from(e: PollError<E>) -> Self {
        match e {
            PollError::Timeout => Status::Timeout,
            PollError::Deselected => Status::RequestTruncated,
            PollError::Bus(_) => Status::BusError,
            PollError::BadHeader => Status::InvalidHeader,
            PollError::Overflow => Status::RequestTruncated,
        }
    }
}

pub struct PolledSpi<S, CS, T: CountDown> {
    spi: S,
    cs: CS,
    timer: T,
    timeout: T::Time,
}

impl<S, CS, T> PolledSpi<S, CS, T>
where
    S: FullDuplex<u8>,
    CS: InputPin,
    T: CountDown,
    T::Time: Clone,
{
    pub fn new(spi: S, cs: CS, timer: T, timeout: T::Time) -> Self {
        Self {
            spi,
            cs,
            timer,
            timeout,
        }
    }

    pub fn release(self) -> (S, CS, T) {
        (self.spi, self.cs, self.timer)
    }

    fn selected(&self) -> bool {
        matches!(self.cs.is_low(), Ok(true))
    }

    /// Retry `op` until it completes, the deadline passes or select drops.
    fn poll<R>(
        &mut self,
        mut op: impl FnMut(&mut S) -> nb::Result<R, S::Error>,
    ) -> Result<R, PollError<S::Error>> {
        loop {
            if !self.selected() {
                return Err(PollError::Deselected);
            }
            match op(&mut self.spi) {
                Ok(v) => return Ok(v),
                Err(nb::Error::Other(e)) => return Err(PollError::Bus(e)),
                Err(nb::Error::WouldBlock) => {}
            }
            if let Ok(()) = self.timer.wait() {
                return Err(PollError::Timeout);
            }
        }
    }

    fn exchange(&mut self, out: u8) -> Result<u8, PollError<S::Error>> {
        self.poll(|spi| spi.send(out))?;
        self.poll(|spi| spi.read())
    }

    /// Clock in one request. Returns its length in `buf`.
    pub fn receive_request(&mut self, buf: &mut [u8]) -> Result<usize, PollError<S::Error>> {
        if buf.len() < REQUEST_HEADER_LEN {
            return Err(PollError::Overflow);
        }
        self.timer.start(self.timeout.clone());

        for b in buf[..REQUEST_HEADER_LEN].iter_mut() {
            *b = self.exchange(spi_status::RECEIVING)?;
        }
        let expected = RequestHeader::parse(buf)
            .and_then(|h| h.expected_size())
            .ok_or(PollError::BadHeader)?;
        if expected > buf.len() {
            return Err(PollError::Overflow);
        }
        for b in buf[REQUEST_HEADER_LEN..expected].iter_mut() {
            *b = self.exchange(spi_status::RECEIVING)?;
        }
        Ok(expected)
    }

    /// Clock in one request and package it for the host command task.
    /// Link failures travel in `driver_result`.
    pub fn receive_packet(&mut self) -> HostPacket {
        let mut pkt = HostPacket::new();
        let mut buf = [0u8; crate::config::SPI_MAX_REQUEST_SIZE];
        match self.receive_request(&mut buf) {
            Ok(n) => {
                // `buf` and `pkt.request` have the same capacity.
                let _ = pkt.request.extend_from_slice(&buf[..n]);
            }
            Err(e) => {
                warn!("polled spi: request failed");
                pkt.driver_result = e.into();
            }
        }
        pkt
    }
}

impl<S, CS, T> ResponseSink for PolledSpi<S, CS, T>
where
    S: FullDuplex<u8>,
    CS: InputPin,
    T: CountDown,
    T::Time: Clone,
{
    fn send_response(&mut self, response: &[u8]) {
        self.timer.start(self.timeout.clone());
        let bytes = SPI_PREAMBLE
            .iter()
            .chain(response.iter())
            .chain(core::iter::once(&spi_status::PAST_END));
        for &b in bytes {
            if self.exchange(b).is_err() {
                debug!("polled spi: host stopped clocking the response");
                return;
            }
        }
    }
}
