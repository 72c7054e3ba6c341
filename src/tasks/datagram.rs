//! Datagram link with ping-pong buffers.
//!
//! Each full-duplex transfer shifts out the packet chosen last round while
//! the host's packet lands in the same buffer; the next reply is built in
//! the other buffer and the two swap roles.
use embassy_executor::task;
use embassy_stm32::{mode::Async, spi::SpiSlave};
use embassy_time::{Duration, Ticker};

use crate::board::BoardPlatform;
use crate::config::HOST_TICK_US;
use crate::datagram::rc::{RC_CHANNELS, RC_REFRESH_US};
use crate::datagram::{packet::PACKET_LEN, DatagramHost, DatagramLink, PacketError, RcFailsafe, RcInput};
use crate::ec::Platform;

#[task]
pub async fn datagram_link_task(mut spi: SpiSlave<'static, Async>, mut link: DatagramLink<'static>) {
    info!("datagram link task started");

    let mut buf_a = [0u8; PACKET_LEN];
    let mut buf_b = [0u8; PACKET_LEN];

    let mut tx = &mut buf_a;
    let mut rx = &mut buf_b;
    *tx = link.next_packet();

    loop {
        // 1) shift out *tx*, the host's packet comes back in the same buffer
        if let Err(e) = spi.transfer_in_place(tx).await {
            warn!("datagram spi error: {:?}", e);
            continue;
        }

        // 2) handle it and build the next reply in *rx*
        let (res, next) = link.exchange(&tx[..]);
        match res {
            Ok(_) | Err(PacketError::NoDirection) => {}
            Err(e) => debug!("datagram rx: {:?}", e),
        }
        *rx = next;

        // 3) swap roles
        core::mem::swap(&mut tx, &mut rx);
    }
}

/// Runs datagram handlers, one message per scheduler tick.
#[task]
pub async fn datagram_host_task(mut host: DatagramHost<'static>) {
    info!("datagram host task started");
    let mut ticker = Ticker::every(Duration::from_micros(HOST_TICK_US));

    loop {
        ticker.next().await;
        if host.has_pending() {
            host.process_one();
        }
    }
}

/// Control-loop side of the RC channels: drops the outputs when the host
/// stops refreshing them.
#[task]
pub async fn rc_failsafe_task(rc: &'static RcInput, mut platform: BoardPlatform) {
    info!("rc failsafe task started");
    let mut failsafe = RcFailsafe::new();
    let mut ticker = Ticker::every(Duration::from_micros(RC_REFRESH_US.into()));

    loop {
        ticker.next().await;
        match failsafe.tick(rc.check_received()) {
            Some(true) => {
                debug!("rc: ch0..{} = {} {} {} {}", RC_CHANNELS, rc.raw(0), rc.raw(1), rc.raw(2), rc.raw(3));
                platform.enable_outputs();
            }
            Some(false) => platform.stop_outputs(),
            None => {}
        }
    }
}
