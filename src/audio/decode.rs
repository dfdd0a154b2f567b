/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
//! Bit-level signal detection in sampled waveforms.
use core::convert::TryFrom;
use std::io::{Error, ErrorKind};

/// A signal detection algorithm of the [WaveformDecoder].
///
/// The `threshold` mentioned below is the decoder's sensitivity setting, a percentage
/// (0..=100) of the dynamic range. How it is interpreted depends on the method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DecodeMethod {
    /// Level hysteresis combined with a slope condition: the bit goes high only above
    /// `0x80` + scaled threshold on a rising slope of at least 8, low only at or below
    /// `0x7F` - scaled threshold on a falling slope of at least 8.
    Combined     = 0,
    /// Level hysteresis alone, ignoring the slope.
    Hysteresis   = 1,
    /// The bit toggles whenever the sample-to-sample difference exceeds the raw
    /// threshold value, regardless of the absolute level.
    EdgeMagnitude = 2,
    /// The bit toggles when the signal crosses the `0x80` midline and the difference
    /// exceeds the raw threshold value.
    ZeroCrossing = 3,
    /// Tracks local extrema via slope sign reversals; a new maximum or minimum sets the
    /// bit high or low when the peak-to-peak swing exceeds the scaled threshold.
    PeakDetect   = 4
}

/// Detects the logic-level bit stream carried by a sampled tape signal.
///
/// Feed every sample to [WaveformDecoder::update] in order. The decoder owns the
/// cross-sample history of exactly one input stream: create a fresh instance per stream
/// and never share one between streams.
///
/// Samples are expected in the unsigned 8-bit domain centered on `0x80`. 16-bit input is
/// accepted as signed values and compared against the same constants; with the level
/// based methods 0 and 1 this skews detection towards the high bit, a long-standing
/// quirk kept for compatibility with existing recordings.
#[derive(Clone, Debug)]
pub struct WaveformDecoder {
    method: DecodeMethod,
    threshold: u8,
    bit: bool,
    previous_sample: i32,
    previous_change: i32,
    last_local_max: i32,
    last_local_min: i32
}

impl Default for DecodeMethod {
    fn default() -> Self {
        DecodeMethod::Combined
    }
}

impl TryFrom<u8> for DecodeMethod {
    type Error = Error;

    fn try_from(method: u8) -> Result<Self, Error> {
        match method {
            0 => Ok(DecodeMethod::Combined),
            1 => Ok(DecodeMethod::Hysteresis),
            2 => Ok(DecodeMethod::EdgeMagnitude),
            3 => Ok(DecodeMethod::ZeroCrossing),
            4 => Ok(DecodeMethod::PeakDetect),
            _ => Err(Error::new(ErrorKind::InvalidInput, "unknown signal detection method"))
        }
    }
}

impl WaveformDecoder {
    /// Creates a new `WaveformDecoder` with the given method and threshold percentage.
    pub fn new(method: DecodeMethod, threshold: u8) -> Self {
        WaveformDecoder {
            method,
            threshold: threshold.min(100),
            bit: false,
            previous_sample: 0,
            previous_change: 0,
            last_local_max: 0,
            last_local_min: 0
        }
    }
    /// Returns the currently detected bit.
    #[inline]
    pub fn bit(&self) -> bool {
        self.bit
    }
    /// Processes one sample, updating and returning the detected bit.
    pub fn update(&mut self, sample: i32) -> bool {
        let change = sample - self.previous_sample;
        match self.method {
            DecodeMethod::Combined => {
                let threshold = 128 * self.threshold as i32 / 100;
                if sample > 0x80 + threshold && change >= 8 {
                    self.bit = true;
                }
                else if sample <= 0x7F - threshold && change <= -8 {
                    self.bit = false;
                }
            }
            DecodeMethod::Hysteresis => {
                let threshold = 128 * self.threshold as i32 / 100;
                if sample > 0x80 + threshold {
                    self.bit = true;
                }
                else if sample <= 0x7F - threshold {
                    self.bit = false;
                }
            }
            DecodeMethod::EdgeMagnitude => {
                if change.abs() > self.threshold as i32 {
                    self.bit = !self.bit;
                }
            }
            DecodeMethod::ZeroCrossing => {
                if ((self.previous_sample > 0x80 && sample <= 0x7F)
                        || (sample > 0x80 && self.previous_sample <= 0x7F))
                    && change.abs() > self.threshold as i32
                {
                    self.bit = !self.bit;
                }
            }
            DecodeMethod::PeakDetect => {
                let threshold = self.threshold as i32 * 240 / 255;
                if change <= 0 && self.previous_change > 0 {
                    self.last_local_max = sample;
                    if self.last_local_max - self.last_local_min > threshold {
                        self.bit = true;
                    }
                }
                else if change >= 0 && self.previous_change < 0 {
                    self.last_local_min = sample;
                    if self.last_local_max - self.last_local_min > threshold {
                        self.bit = false;
                    }
                }
            }
        }
        self.previous_change = change;
        self.previous_sample = sample;
        self.bit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_settles_on_constant_input() {
        let mut decoder = WaveformDecoder::new(DecodeMethod::Hysteresis, 50);
        // 0xFF clears the 0x80 + 64 threshold from the very first sample
        for _ in 0..100 {
            assert_eq!(true, decoder.update(0xFF));
        }
        // and values inside the hysteresis band leave the bit untouched
        assert_eq!(true, decoder.update(0x80));
        assert_eq!(false, decoder.update(0x10));
    }

    #[test]
    fn combined_requires_slope() {
        let mut decoder = WaveformDecoder::new(DecodeMethod::Combined, 0);
        // a slow drift upwards never makes the slope condition
        for sample in (0..=0xF8).step_by(4) {
            assert_eq!(false, decoder.update(sample));
        }
        // a sharp rise does
        let mut decoder = WaveformDecoder::new(DecodeMethod::Combined, 0);
        decoder.update(0x40);
        assert_eq!(true, decoder.update(0xC0));
        // and a sharp fall takes it back
        assert_eq!(false, decoder.update(0x40));
    }

    #[test]
    fn edge_magnitude_toggles() {
        let mut decoder = WaveformDecoder::new(DecodeMethod::EdgeMagnitude, 10);
        assert_eq!(false, decoder.update(5));
        assert_eq!(true, decoder.update(100));   // |delta| = 95
        assert_eq!(true, decoder.update(105));   // |delta| = 5, no toggle
        assert_eq!(false, decoder.update(5));    // toggles back
    }

    #[test]
    fn zero_crossing_needs_midline() {
        let mut decoder = WaveformDecoder::new(DecodeMethod::ZeroCrossing, 0);
        // the first sample above the midline crosses it from the initial zero level
        assert_eq!(true, decoder.update(0x90));
        // a large swing above the midline does not toggle
        assert_eq!(true, decoder.update(0xF0));
        // crossing the midline does
        assert_eq!(false, decoder.update(0x40));
        assert_eq!(true, decoder.update(0xD0));
    }

    #[test]
    fn peak_detect_tracks_extrema() {
        let mut decoder = WaveformDecoder::new(DecodeMethod::PeakDetect, 50);
        // rise to a local maximum...
        decoder.update(0x20);
        decoder.update(0x80);
        decoder.update(0xE0);
        // ...the downward reversal records it; swing 0xE0 - 0 > 47
        assert_eq!(true, decoder.update(0xD0));
        decoder.update(0x40);
        // the upward reversal records a local minimum and drops the bit
        assert_eq!(false, decoder.update(0x50));
    }

    #[test]
    fn peak_detect_ignores_small_ripple() {
        let mut decoder = WaveformDecoder::new(DecodeMethod::PeakDetect, 50);
        decoder.update(0x90);
        // the first downward reversal swings against the initial zero floor
        assert_eq!(true, decoder.update(0x70));
        decoder.update(0x80);
        decoder.update(0x84);
        // a 2-step ripple reversal stays under the swing threshold
        assert_eq!(true, decoder.update(0x82));
        assert_eq!(true, decoder.update(0x84));
    }

    #[test]
    fn wide_sample_bias_is_kept() {
        // signed 16-bit samples against 8-bit constants: hysteresis with a maximum
        // threshold still reports high for any sample over 0x80 + 128
        let mut decoder = WaveformDecoder::new(DecodeMethod::Hysteresis, 100);
        assert_eq!(true, decoder.update(0x7FFF));
        assert_eq!(false, decoder.update(-0x8000));
        assert_eq!(true, decoder.update(0x300));
    }

    #[test]
    fn decode_method_try_from_works() {
        assert_eq!(DecodeMethod::Combined, DecodeMethod::try_from(0).unwrap());
        assert_eq!(DecodeMethod::PeakDetect, DecodeMethod::try_from(4).unwrap());
        assert!(DecodeMethod::try_from(5).is_err());
        assert_eq!(DecodeMethod::Combined, DecodeMethod::default());
    }
}
