/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
//! Square-wave synthesis from half-wave durations.
use core::slice;
use std::io::{Error, ErrorKind, Result, Write};

use super::filter::{DcFilter, DEFAULT_CUTOFF_HZ};
use super::SynthFlags;

/// The default amplitude swing of the synthesized waveform.
pub const DEFAULT_GAIN: u8 = 0xC0;
/// The default sample rate of the synthesized waveform.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// The configuration of a [WaveformSynth].
#[derive(Clone, Debug)]
pub struct SynthOptions {
    /// The rate of the produced samples.
    pub sample_rate: u32,
    /// 8 for amplitude samples, 1 for a packed logic-level signal.
    pub bits_per_sample: u16,
    /// The amplitude swing between the two polarity levels.
    pub gain: u8,
    /// The cutoff frequency of the DC-removal filter.
    pub cutoff_hz: f64,
    pub flags: SynthFlags
}

/// Synthesizes a PCM square wave from a sequence of half-wave durations, writing samples
/// to the underlying writer.
///
/// Every call to [WaveformSynth::render_half_wave] emits the given number of samples at
/// the current polarity level and then toggles the polarity, including for a zero-length
/// half-wave.
///
/// In 8-bit mode each sample is the polarity level passed through the DC-removal filter
/// and re-centered around `0x80` (or mapped to a fixed low band when the filter is
/// disabled), clipped to the unsigned byte range. In 1-bit mode samples are bare logic
/// levels packed into bytes MSB first; no amplitude processing applies.
#[derive(Debug)]
pub struct WaveformSynth<W> {
    wr: W,
    gain: u8,
    flags: SynthFlags,
    filter: Option<DcFilter>,
    level: u8,
    bit: u8,
    bit_register: u16,
    samples: u64,
    bytes_written: u64
}

impl Default for SynthOptions {
    fn default() -> Self {
        SynthOptions {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bits_per_sample: 8,
            gain: DEFAULT_GAIN,
            cutoff_hz: DEFAULT_CUTOFF_HZ,
            flags: SynthFlags::empty()
        }
    }
}

impl<W> WaveformSynth<W> {
    /// Returns the number of samples emitted so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }
    /// Returns the number of bytes written to the underlying writer so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.wr
    }
    /// Returns a mutable reference to the inner writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.wr
    }
    /// Returns a shared reference to the inner writer.
    pub fn get_ref(&self) -> &W {
        &self.wr
    }
}

impl<W: Write> WaveformSynth<W> {
    /// Returns a new instance of `WaveformSynth` writing samples to `wr` on success.
    ///
    /// `start_high` selects the initial polarity level of the 8-bit amplitude mode;
    /// half-wave encoded tapes begin on the high level.
    pub fn try_new(wr: W, opts: &SynthOptions, start_high: bool) -> Result<Self> {
        match opts.bits_per_sample {
            1 | 8 => {},
            _ => return Err(Error::new(ErrorKind::InvalidInput,
                            "only 1-bit and 8-bit waveforms can be synthesized"))
        }
        let filter = if opts.bits_per_sample != 8 || opts.flags.contains(SynthFlags::NO_FILTER) {
            None
        }
        else {
            Some(DcFilter::new(opts.cutoff_hz, opts.sample_rate))
        };
        Ok(WaveformSynth {
            wr,
            gain: opts.gain,
            flags: opts.flags,
            filter,
            level: if start_high { opts.gain } else { 0 },
            bit: if opts.flags.contains(SynthFlags::INVERT) { 0 } else { 1 },
            bit_register: if opts.bits_per_sample == 1 { 1 } else { 0 },
            samples: 0,
            bytes_written: 0
        })
    }
    /// Emits `duration` samples of the current polarity level, then toggles the polarity.
    pub fn render_half_wave(&mut self, duration: u32) -> Result<()> {
        if self.bit_register != 0 {
            self.render_packed(duration)
        }
        else {
            self.render_amplitude(duration)
        }
    }
    /// Flushes the synthesizer and the underlying writer.
    ///
    /// In 1-bit mode a partially filled last byte is zero-padded and written out.
    pub fn finalize(&mut self) -> Result<()> {
        if self.bit_register > 1 {
            while self.bit_register & 0x100 == 0 {
                self.bit_register <<= 1;
            }
            self.write_byte((self.bit_register & 0xFF) as u8)?;
            self.bit_register = 1;
        }
        self.wr.flush()
    }

    fn render_amplitude(&mut self, duration: u32) -> Result<()> {
        let invert_mask = if self.flags.contains(SynthFlags::INVERT) { 0xFF } else { 0x00 };
        for _ in 0..duration {
            let output = match self.filter.as_mut() {
                Some(filter) => 0x80 - filter.apply(self.level as f64) as i32,
                None => (255 - self.gain as i32) / 2 - self.level as i32
            };
            let output = output.clamp(0, 255) as u8;
            self.write_byte(output ^ invert_mask)?;
        }
        self.samples += duration as u64;
        self.level ^= self.gain;
        Ok(())
    }

    fn render_packed(&mut self, duration: u32) -> Result<()> {
        for _ in 0..duration {
            self.bit_register = (self.bit_register << 1) | self.bit as u16;
            if self.bit_register & 0x100 != 0 {
                self.write_byte((self.bit_register & 0xFF) as u8)?;
                self.bit_register = 1;
            }
        }
        self.samples += duration as u64;
        self.bit ^= 1;
        Ok(())
    }

    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.wr.write_all(slice::from_ref(&byte))?;
        self.bytes_written += 1;
        Ok(())
    }
}
