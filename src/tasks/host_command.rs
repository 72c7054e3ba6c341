use embassy_executor::task;
use embassy_time::{Duration, Ticker};

use super::ec_link::{LinkSink, SharedLink};
use crate::board::BoardPlatform;
use crate::config::HOST_TICK_US;
use crate::ec::HostCommands;

/// Runs EC handlers in thread mode, one packet per scheduler tick.
#[task]
pub async fn host_command_task(
    mut host: HostCommands<'static, BoardPlatform>,
    link: &'static SharedLink,
) {
    info!("host command task started");
    let mut sink = LinkSink(link);
    let mut ticker = Ticker::every(Duration::from_micros(HOST_TICK_US));

    loop {
        ticker.next().await;
        if host.has_pending() {
            host.process_pending(&mut sink);
        }
    }
}
