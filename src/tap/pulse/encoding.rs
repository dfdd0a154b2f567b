/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
use super::consts::*;
use crate::tap::TapVersion;

/// Expands *TAP* pulse data into half-wave durations via an [Iterator] interface.
///
/// Each item is the duration of a single half-wave converted to the target sample rate:
/// `round(ticks * sample_rate / tick_rate)`. Versions 0 and 1 describe full waves, so every
/// pulse is emitted as two half-waves with the midpoint remainder going to the second one.
/// Version 2 counts half-waves directly and emits one item per pulse.
///
/// An item may be `0` when a short pulse vanishes at a low sample rate. Consumers must still
/// toggle the output polarity for such items to keep the wave phase intact.
///
/// The iterator is finite and non-restartable. A version 1/2 escape code truncated by the end
/// of the data ends the iteration silently: real-world captures are often cut short and the
/// dangling escape carries no recoverable pulse.
#[derive(Clone, Debug)]
pub struct TapPulseIter<'a> {
    data: &'a [u8],
    pos: usize,
    version: TapVersion,
    tick_rate: u32,
    sample_rate: u32,
    pause_unit: u32,
    second_half: Option<u32>,
    done: bool
}

impl<'a> TapPulseIter<'a> {
    /// Creates a new `TapPulseIter` over *TAP* pulse `data` (without the file header).
    ///
    /// `tick_rate` is the *TAP unit* rate of the source machine and `sample_rate` the rate
    /// of the produced half-wave durations.
    pub fn new(data: &'a [u8], version: TapVersion, tick_rate: u32, sample_rate: u32) -> Self {
        TapPulseIter {
            data,
            pos: 0,
            version,
            tick_rate,
            sample_rate,
            pause_unit: sample_rate / PAUSE_RATE,
            second_half: None,
            done: false
        }
    }
    /// Returns the number of data bytes already interpreted.
    pub fn position(&self) -> usize {
        self.pos
    }
    /// Converts a duration in *TAP units* to a duration in samples, rounding to nearest.
    #[inline]
    fn ticks_to_samples(&self, ticks: u64) -> u32 {
        ((ticks * self.sample_rate as u64 + (self.tick_rate / 2) as u64)
            / self.tick_rate as u64) as u32
    }
    /// Interprets a version 0 pause: the run of zero bytes starting at the current position,
    /// the first zero having been consumed already.
    fn zero_run_ticks(&mut self) -> u64 {
        let mut run = 1u64;
        while let Some(0) = self.data.get(self.pos) {
            run += 1;
            self.pos += 1;
        }
        (run * self.pause_unit as u64) >> CYCLE_SHIFT
    }
    /// Interprets a version 1/2 escape code: a 24-bit LE machine-cycle count following the
    /// zero byte. Returns `None` if the data ends before the full count.
    fn escape_ticks(&mut self) -> Option<u64> {
        match self.data.get(self.pos..self.pos + 3) {
            Some(&[b0, b1, b2]) => {
                self.pos += 3;
                Some((u32::from_le_bytes([b0, b1, b2, 0]) >> CYCLE_SHIFT) as u64)
            }
            _ => None
        }
    }
}

impl<'a> Iterator for TapPulseIter<'a> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if let Some(half_wave) = self.second_half.take() {
            return Some(half_wave);
        }
        if self.done {
            return None;
        }
        let byte = match self.data.get(self.pos) {
            Some(&byte) => byte,
            None => {
                self.done = true;
                return None;
            }
        };
        self.pos += 1;
        let ticks = if byte != 0 {
            byte as u64
        }
        else {
            match self.version {
                TapVersion::V0 => self.zero_run_ticks(),
                TapVersion::V1 | TapVersion::V2 => match self.escape_ticks() {
                    Some(ticks) => ticks,
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            }
        };
        let half_wave_time = self.ticks_to_samples(ticks);
        match self.version {
            TapVersion::V2 => Some(half_wave_time),
            _ => {
                let half_pulse = half_wave_time / 2;
                self.second_half = Some(half_wave_time - half_pulse);
                Some(half_pulse)
            }
        }
    }
}
