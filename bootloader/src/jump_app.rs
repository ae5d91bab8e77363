// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later
use consts::BASE_APP_ADDR;
use cortex_m::peripheral::{NVIC, SCB};
use defmt::info;
use embassy_nrf::interrupt::Interrupt;

/// Boots the application placed at `BASE_APP_ADDR`.
///
/// # Safety
///
/// This modifies the stack pointer and reset vector and will run code placed in the application partition.
pub unsafe fn jump_to_app() -> ! {
    // Disable active interrupts
    NVIC::mask(Interrupt::SPIM0_SPIS0_SPI0);
    NVIC::mask(Interrupt::RTC1);

    critical_section::with(|_| {
        let addr_header = BASE_APP_ADDR;
        let msp = *(addr_header as *const u32);
        let rv = *((addr_header + 4) as *const u32);

        info!("msp = {=u32:x}, rv = {=u32:x}", msp, rv);

        // The application's vector table replaces ours.
        (*SCB::PTR).vtor.write(addr_header);

        // These instructions perform the following operations:
        //
        // * Modify control register to use MSP as stack pointer (clear spsel bit)
        // * Synchronize instruction barrier
        // * Initialize stack pointer from the application's vector table
        // * Set link register to not return (0xFF)
        // * Jump to the application's reset vector
        core::arch::asm!(
            "mrs {tmp}, CONTROL",
            "bics {tmp}, {spsel}",
            "msr CONTROL, {tmp}",
            "isb",
            "msr MSP, {msp}",
            "mov lr, {new_lr}",
            "bx {rv}",
            // `out(reg) _` is not permitted in a `noreturn` asm! call,
            // so instead use `in(reg) 0` and don't restore it afterwards.
            tmp = in(reg) 0,
            spsel = in(reg) 2,
            new_lr = in(reg) 0xFFFFFFFFu32,
            msp = in(reg) msp,
            rv = in(reg) rv,
            options(noreturn),
        );
    })
}
