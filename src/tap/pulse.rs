/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
//! **TAPE** pulse signal encoding and decoding.
#![warn(unused_imports)]

mod decoding;
mod encoding;

pub mod consts {
    /// The largest pulse duration in *TAP units* that fits a single data byte.
    pub const MAX_BYTE_PULSE_TICKS: u64 = 255;
    /// The number of *TAP unit* bits consumed by a single escape code group.
    pub const ESCAPE_GROUP_BITS: u32 = 24;
    /// The duration of a version 0 zero byte as a fraction of a second.
    pub const PAUSE_RATE: u32 = 50;
    /// The binary right shift aligning escape code cycle counts with the *TAP unit* domain.
    pub const CYCLE_SHIFT: u32 = 3;
    /// The longest regular full-wave pulse byte produced by Commodore tape routines.
    pub const REGULAR_PULSE_CEILING: u8 = 0xD0;
}

pub use decoding::*;
pub use encoding::*;
