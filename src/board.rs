use embassy_stm32::exti::ExtiInput;
use embassy_stm32::mode::Async;
use embassy_stm32::spi::SpiSlave;
use embassy_stm32::{
    gpio::{Level, Output, Pull, Speed},
    rcc, spi, Config,
};

use crate::ec::Platform;

// ── Board struct ──────────────────────────────────────────
pub struct Board {
    pub spi1: SpiSlave<'static, Async>, // DMA
    /// Second pin tied to SPI1 NSS so select edges raise an EXTI event.
    pub spi_select: ExtiInput<'static>,
    /// Driven high while the outputs are safe to drive.
    pub outputs_enable: Output<'static>,
}

impl Board {
    pub fn init() -> Self {
        // Configure for maximum performance
        let mut config = Config::default();

        // Enable HSI and configure PLL for 64MHz
        config.rcc.hsi = Some(rcc::Hsi {
            sys_div: rcc::HsiSysDiv::DIV1,
        });
        config.rcc.pll = Some(rcc::Pll {
            source: rcc::PllSource::HSI,    // Use HSI as PLL source
            prediv: rcc::PllPreDiv::DIV2,   // 16MHz / 2 = 8MHz
            mul: rcc::PllMul::MUL16,        // 8MHz * 16 = 128MHz
            divp: None,
            divq: None,
            divr: Some(rcc::PllRDiv::DIV2), // 128MHz / 2 = 64MHz
        });
        config.rcc.sys = rcc::Sysclk::PLL1_R;
        let p = embassy_stm32::init(config);

        let outputs_enable = Output::new(p.PA9, Level::Low, Speed::Low);

        // SPI1 slave (DMA CH5 TX, CH4 RX)
        let mut spi_cfg = spi::ConfigSlave::default();
        spi_cfg.mode = spi::MODE_0;
        let spi1 = SpiSlave::new_hardware_cs(
            p.SPI1,
            p.PA5, p.PA7, p.PA6, p.PA4, // SCK, MOSI, MISO, NSS
            p.DMA1_CH5,                 // TX
            p.DMA1_CH4,                 // RX
            spi_cfg,
        );

        // PA8 is strapped to PA4 on the carrier.
        let spi_select = ExtiInput::new(p.PA8, p.EXTI8, Pull::Up);

        Self {
            spi1,
            spi_select,
            outputs_enable,
        }
    }
}

/// Reset and output hooks for the built-in host commands.
pub struct BoardPlatform {
    outputs_enable: Output<'static>,
}

impl BoardPlatform {
    pub fn new(outputs_enable: Output<'static>) -> Self {
        Self { outputs_enable }
    }

    pub fn enable_outputs(&mut self) {
        self.outputs_enable.set_high();
    }
}

impl Platform for BoardPlatform {
    fn stop_outputs(&mut self) {
        self.outputs_enable.set_low();
    }

    fn reboot(&mut self) {
        cortex_m::peripheral::SCB::sys_reset();
    }
}
