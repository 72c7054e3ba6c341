#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::{InterruptExt, Priority};
use {defmt_rtt as _, panic_probe as _};

use hostcmd_embassy::board::BoardPlatform;
use hostcmd_embassy::config::{FW_NAME, FW_VERSION};
use hostcmd_embassy::Board;

#[cfg(not(feature = "datagram"))]
use {
    core::cell::RefCell,
    embassy_sync::blocking_mutex::Mutex,
    hostcmd_embassy::config::EC_FEATURES,
    hostcmd_embassy::ec::{CompletionSlot, HostCommands, HostInbox, SpiLink, BUILTIN_TABLE},
    hostcmd_embassy::tasks::{ec_link_task, host_command_task, EmbassyPort, SharedLink},
    static_cell::StaticCell,
};

#[cfg(feature = "datagram")]
use hostcmd_embassy::{
    datagram::{commands::BUILTIN_TABLE, DatagramHost, DatagramLink, RcInput, RxRing, TxRing},
    tasks::{datagram_host_task, datagram_link_task, rc_failsafe_task},
};

static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn USART2() {
    EXECUTOR_HIGH.on_interrupt()
}

#[cfg(not(feature = "datagram"))]
static HOST_INBOX: HostInbox = HostInbox::new();
/// Late results of `InProgress` commands.
#[cfg(not(feature = "datagram"))]
static HOST_COMPLETIONS: CompletionSlot = CompletionSlot::new();
#[cfg(not(feature = "datagram"))]
static EC_LINK: StaticCell<SharedLink> = StaticCell::new();

#[cfg(feature = "datagram")]
static RX_RING: RxRing = RxRing::new();
#[cfg(feature = "datagram")]
static TX_RING: TxRing = TxRing::new();
#[cfg(feature = "datagram")]
static RC_INPUT: RcInput = RcInput::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Starting {} v{}.{}", FW_NAME, FW_VERSION & 0xFF, FW_VERSION >> 8);
    let board = Board::init();
    let platform = BoardPlatform::new(board.outputs_enable);

    // Link events preempt the handlers running in thread mode
    interrupt::USART2.set_priority(Priority::P1);
    let spawner_high = EXECUTOR_HIGH.start(interrupt::USART2);

    #[cfg(not(feature = "datagram"))]
    {
        let link = EC_LINK.init(Mutex::new(RefCell::new(SpiLink::new(
            EmbassyPort::new(),
            &HOST_INBOX,
        ))));
        let mut platform = platform;
        platform.enable_outputs();
        let host = HostCommands::new(&BUILTIN_TABLE, &HOST_INBOX, platform, EC_FEATURES)
            .with_completions(&HOST_COMPLETIONS);

        spawner_high
            .spawn(ec_link_task(board.spi1, board.spi_select, link))
            .unwrap();
        info!("EC link task spawned on high-priority executor");
        spawner.spawn(host_command_task(host, link)).unwrap();
    }

    #[cfg(feature = "datagram")]
    {
        // Datagram framing has no use for select edges; keep the pin configured.
        core::mem::forget(board.spi_select);
        let link = DatagramLink::new(&RX_RING, &TX_RING);
        let host = DatagramHost::new(&BUILTIN_TABLE, &RX_RING, &TX_RING, &RC_INPUT);

        spawner_high.spawn(datagram_link_task(board.spi1, link)).unwrap();
        info!("datagram link task spawned on high-priority executor");
        spawner.spawn(datagram_host_task(host)).unwrap();
        // Outputs stay off until the first RC frame arrives.
        spawner.spawn(rc_failsafe_task(&RC_INPUT, platform)).unwrap();
    }

    core::future::pending::<()>().await;
}
