// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Generates `memory.x` from the shared layout constants and exports the
//! `BUILD_TAG` reported to the application in the handoff record.

use consts::{
    BASE_BOOTLOADER_ADDR, BOOTLOADER_SIZE, BUILD_TAG_LEN, HANDOFF_ADDR, HANDOFF_REGION_SIZE,
};
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;

fn main() {
    let memory_x_content = format!(
        r##"
        MEMORY
        {{
            /* NOTE 1 K = 1 KiBi = 1024 bytes */
            FLASH (rx) : ORIGIN = {flash_origin:#X}, LENGTH = {flash_length:#X}
            /* The handoff record sits at the very start of RAM, outside of what
               either image initialises, so it survives the jump to the application. */
            HANDOFF (rw) : ORIGIN = {handoff_origin:#X}, LENGTH = {handoff_length:#X}
            RAM (rwx) : ORIGIN = {ram_origin:#X}, LENGTH = 24K - {handoff_length:#X}
        }}

        SECTIONS {{
            .handoff (NOLOAD) : {{
                KEEP(*(.handoff))
                . = ALIGN(4);
            }} > HANDOFF
        }};
        "##,
        flash_origin = BASE_BOOTLOADER_ADDR,
        flash_length = BOOTLOADER_SIZE,
        handoff_origin = HANDOFF_ADDR,
        handoff_length = HANDOFF_REGION_SIZE,
        ram_origin = HANDOFF_ADDR + HANDOFF_REGION_SIZE,
    );
    // Put `memory.x` in our output directory and ensure it's
    // on the linker search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(memory_x_content.as_bytes())
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=../consts/src/lib.rs");

    let mut build_tag = git_commit().unwrap_or_else(|| env::var("CARGO_PKG_VERSION").unwrap());
    // One byte of the record field is the NUL terminator.
    build_tag.truncate(BUILD_TAG_LEN - 1);
    println!("cargo:rustc-env=BUILD_TAG={build_tag}");
    println!("cargo:rerun-if-changed=../.git/HEAD");

    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}

/// Short hash of the checked out commit, marked `-dirty` with local changes.
fn git_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--always", "--dirty", "--abbrev=12"])
        .output()
        .ok()
        .filter(|output| output.status.success())?;
    let tag = String::from_utf8(output.stdout).ok()?;
    let tag = tag.trim();
    (!tag.is_empty()).then(|| tag.to_owned())
}
