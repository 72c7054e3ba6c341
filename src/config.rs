// Centralize all configuration constants

/// Largest EC request the SPI link accepts (header, flash write offset/size
/// and 512 bytes of data).
pub const SPI_MAX_REQUEST_SIZE: usize = 0x220;
pub const SPI_MAX_RESPONSE_SIZE: usize = 0x220;

/// Cooperative scheduler tick; the host command task polls once per tick.
pub const HOST_TICK_US: u64 = 1_000;

// Datagram queue depths
pub const DATAGRAM_RX_DEPTH: usize = 8;
pub const DATAGRAM_TX_DEPTH: usize = 8;

/// Log the datagram link counters every this many exchanges.
pub const DATAGRAM_STATS_PERIOD: u32 = 10_000;

pub const FW_NAME: &str = "hostcmd-embassy";
/// Firmware version as `minor << 8 | major`.
pub const FW_VERSION: u16 = 1 << 8;

/// Capability codes the EC link reports through `GetFeatures`.
pub const EC_FEATURES: [u32; 2] = crate::ec::commands::feature_words(&[
    crate::ec::commands::feature::GPIO,
    crate::ec::commands::feature::I2C,
    crate::ec::commands::feature::MOTION_SENSE,
]);

/// Datagram `ReqInfo` feature word: PWM outputs and motors.
pub const DATAGRAM_FEATURES: u32 = (1 << 4) | (1 << 5);
