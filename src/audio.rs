/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
//! Tape waveform synthesis and signal detection.
use bitflags::bitflags;

pub mod decode;
pub mod filter;
pub mod synth;

pub use decode::{DecodeMethod, WaveformDecoder};
pub use filter::DcFilter;
pub use synth::{SynthOptions, WaveformSynth, DEFAULT_GAIN};

bitflags! {
    /// Boolean switches of the waveform synthesizer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SynthFlags: u8 {
        /// Flip the polarity of every produced sample.
        const INVERT    = 0b0000_0001;
        /// Bypass the DC-removal high-pass filter.
        const NO_FILTER = 0b0000_0010;
    }
}

bitflags! {
    /// Boolean switches of the waveform decoder pipeline.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DecodeFlags: u8 {
        /// Flip the polarity of every input sample before detection.
        const INVERT = 0b0000_0001;
        /// Split the produced tape image across files on pulse overflow.
        const SPLIT  = 0b0000_0010;
    }
}
