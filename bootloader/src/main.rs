// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]
mod jump_app;

use defmt_rtt as _;
// global logger
use embassy_nrf as _;
// time driver
use panic_probe as _;

use consts::BASE_APP_ADDR;
use core::ptr::addr_of_mut;
use cortex_m::peripheral::SCB;
use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::nvmc::Nvmc;
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use fw_update::{
    application_present, run_update_with_report, HandoffRecord, NorFlashInternal, StorageError,
    UpdateConfig,
};
use jump_app::jump_to_app;
use w25q::W25q;

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_SPI0 => spim::InterruptHandler<peripherals::SPI0>;
});

/// Commit (or package version) the bootloader was built from.
const BUILD_TAG: &str = env!("BUILD_TAG");

/// Outcome of the last update attempt, read by the application after boot.
/// `NOLOAD`: the initializer is never written to RAM.
#[used]
#[link_section = ".handoff"]
static mut HANDOFF: HandoffRecord = HandoffRecord {
    status: 0,
    reserved: 0,
    build_tag: [0; consts::BUILD_TAG_LEN],
};

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("Bootloader {}", BUILD_TAG);

    // External W25Q flash on SPIM0
    let mut config_spi = spim::Config::default();
    config_spi.frequency = spim::Frequency::M8;
    config_spi.mode = spim::MODE_0;
    let spi = Spim::new(p.SPI0, Irqs, p.P0_04, p.P0_12, p.P0_05, config_spi);
    let cs = Output::new(p.P0_14, Level::High, OutputDrive::Standard);
    let device = ExclusiveDevice::new(spi, cs, Delay).unwrap();
    let mut storage = W25q::new(device, Delay);

    // The application may have left the flash in deep power-down.
    if let Err(e) = storage.release_power_down() {
        warn!("Flash wake-up failed: {:?}", e.kind());
    }

    // FLASH
    let mut flash = NorFlashInternal::new(Nvmc::new(p.NVMC), 0);

    let config = UpdateConfig {
        max_attempts: cfg!(feature = "attempt-limit").then_some(3),
        ..Default::default()
    };
    // SAFETY: only ever referenced here, before any other code runs.
    let handoff = unsafe { &mut *addr_of_mut!(HANDOFF) };
    let report = run_update_with_report(
        &mut storage,
        &mut flash,
        handoff,
        &config,
        BUILD_TAG.as_bytes(),
    );
    let bootable = report.application_intact() && application_present(&mut flash, BASE_APP_ADDR);
    if report.status.exit_code() != 0 && bootable {
        warn!("Update failed ({:?}), booting the current application", report.status);
    }

    if let Err(e) = storage.power_down() {
        warn!("Flash power-down failed: {:?}", e.kind());
    }
    // Releases SPIM0 and the pins back to their reset state.
    drop(storage);

    if !bootable {
        // A still pending update is retried on the next boot.
        warn!("No complete application at {=u32:x}, resetting", BASE_APP_ADDR);
        SCB::sys_reset();
    }

    unsafe {
        jump_to_app();
    }
}
