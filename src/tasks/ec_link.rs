//! EC link over the SPI1 slave.
//!
//! `SpiLink` decides what the peripheral should do next and records it in
//! [`EmbassyPort`]; this task carries it out with DMA transfers raced against
//! the select-sense line. The task runs on the high-priority executor, the
//! host command task answers through [`LinkSink`].

use core::cell::RefCell;

use embassy_executor::task;
use embassy_futures::select::{select, select3, Either, Either3};
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::{mode::Async, spi::SpiSlave};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;

use crate::ec::spi::SPI_OUT_LEN;
use crate::ec::wire::spi_status;
use crate::ec::{LinkState, ResponseSink, SpiLink, SpiPort};

/// Status bytes clocked per round while waiting on the task.
const FILL_CHUNK: usize = 16;

pub type SharedLink = Mutex<CriticalSectionRawMutex, RefCell<SpiLink<'static, EmbassyPort>>>;

/// Raised once a response has been handed to the link.
static RESPONSE_READY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum PortOp {
    Idle,
    Rx { len: usize },
    Tx { len: usize },
}

/// `SpiPort` that queues one operation for [`ec_link_task`] to run.
pub struct EmbassyPort {
    op: PortOp,
    status: u8,
    frame: [u8; SPI_OUT_LEN],
}

impl EmbassyPort {
    pub const fn new() -> Self {
        Self {
            op: PortOp::Idle,
            status: spi_status::NOT_READY,
            frame: [0; SPI_OUT_LEN],
        }
    }

    fn take_op(&mut self) -> (PortOp, u8) {
        (core::mem::replace(&mut self.op, PortOp::Idle), self.status)
    }
}

impl SpiPort for EmbassyPort {
    fn reset(&mut self) {
        // Dropping the in-flight transfer future stops the DMA.
        self.op = PortOp::Idle;
    }

    fn start_rx(&mut self, _offset: usize, len: usize) {
        self.op = PortOp::Rx { len };
    }

    fn start_tx(&mut self, frame: &[u8]) {
        let len = frame.len().min(SPI_OUT_LEN);
        self.frame[..len].copy_from_slice(&frame[..len]);
        self.op = PortOp::Tx { len };
    }

    fn stop_tx(&mut self) {
        if let PortOp::Tx { .. } = self.op {
            self.op = PortOp::Idle;
        }
    }

    fn flush_rx(&mut self) {
        if let PortOp::Rx { .. } = self.op {
            self.op = PortOp::Idle;
        }
    }

    fn set_status(&mut self, byte: u8) {
        self.status = byte;
    }
}

fn with_link<R>(link: &SharedLink, f: impl FnOnce(&mut SpiLink<'static, EmbassyPort>) -> R) -> R {
    link.lock(|l| f(&mut l.borrow_mut()))
}

/// Response path used by the host command task.
pub struct LinkSink(pub &'static SharedLink);

impl ResponseSink for LinkSink {
    fn send_response(&mut self, response: &[u8]) {
        with_link(self.0, |l| l.send_response(response));
        RESPONSE_READY.signal(());
    }
}

#[task]
pub async fn ec_link_task(
    mut spi: SpiSlave<'static, Async>,
    mut cs: ExtiInput<'static>,
    link: &'static SharedLink,
) {
    info!("EC link task started");

    let mut inb = [0u8; SPI_OUT_LEN];
    let mut out = [0u8; SPI_OUT_LEN];

    with_link(link, |l| l.reinit());

    loop {
        let (op, status) = with_link(link, |l| l.port_mut().take_op());
        match op {
            PortOp::Rx { len } => {
                let len = len.min(inb.len());
                out[..len].fill(status);
                // NSS gates the peripheral, so the transfer can be armed
                // before the host selects us.
                match select(spi.transfer(&mut inb[..len], &out[..len]), cs.wait_for_rising_edge()).await {
                    Either::First(Ok(())) => with_link(link, |l| {
                        if l.state() == LinkState::ReadyToRx {
                            l.on_select_fall();
                        }
                        l.on_rx_done(&inb[..len]);
                    }),
                    Either::First(Err(e)) => {
                        warn!("EC link rx error: {:?}", e);
                        with_link(link, |l| l.on_rx_error());
                    }
                    Either::Second(()) => with_link(link, |l| l.on_select_rise()),
                }
            }
            PortOp::Tx { len } => {
                with_link(link, |l| out[..len].copy_from_slice(&l.port().frame[..len]));
                match select(spi.transfer(&mut inb[..len], &out[..len]), cs.wait_for_rising_edge()).await {
                    Either::First(Ok(())) => with_link(link, |l| l.on_tx_done()),
                    Either::First(Err(e)) => warn!("EC link tx error: {:?}", e),
                    Either::Second(()) => with_link(link, |l| l.on_select_rise()),
                }
            }
            PortOp::Idle => {
                // Keep the host fed with the status byte until something happens.
                out[..FILL_CHUNK].fill(status);
                match select3(
                    spi.transfer(&mut inb[..FILL_CHUNK], &out[..FILL_CHUNK]),
                    cs.wait_for_any_edge(),
                    RESPONSE_READY.wait(),
                )
                .await
                {
                    Either3::First(_) => {}
                    Either3::Second(()) => {
                        let selected = cs.is_low();
                        with_link(link, |l| {
                            if selected {
                                l.on_select_fall();
                            } else {
                                l.on_select_rise();
                            }
                        });
                    }
                    Either3::Third(()) => {}
                }
            }
        }
    }
}
