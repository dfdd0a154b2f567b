/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
//! Whole-file conversion pipelines between *TAP* images and PCM waveforms.
use std::fs::File;
use std::io::{BufReader, Error, ErrorKind, Read, Result, Seek, Write};
use std::path::Path;

use log::debug;

use crate::audio::decode::{DecodeMethod, WaveformDecoder};
use crate::audio::synth::{SynthOptions, WaveformSynth};
use crate::audio::DecodeFlags;
use crate::tap::pulse::PulseStats;
use crate::tap::{read_tap, ChunkedTapWriter, Machine, PulseSink, TapHeader, TapVersion,
                 TapWriter, VideoStandard};
use crate::wav::{read_wav, WavFile, WavSpec, WavWriter};

/// The configuration of the waveform to tape image pipeline.
#[derive(Clone, Debug)]
pub struct DecodeOptions {
    /// The signal detection algorithm.
    pub method: DecodeMethod,
    /// The detection sensitivity as a percentage (0..=100) of the dynamic range.
    pub threshold: u8,
    /// The *TAP* version of the produced image.
    pub version: TapVersion,
    /// The machine the produced image declares.
    pub machine: Machine,
    /// The video standard the produced image declares.
    pub video_standard: VideoStandard,
    pub flags: DecodeFlags
}

/// A summary of a finished waveform synthesis.
#[derive(Clone, Copy, Debug)]
pub struct WavSummary {
    /// The header of the source tape image.
    pub header: TapHeader,
    /// The number of samples emitted.
    pub samples: u64,
    /// The number of sample data bytes written.
    pub data_bytes: u64
}

/// A summary of a finished tape image recovery.
#[derive(Clone, Debug)]
pub struct TapSummary {
    /// The number of signal edges detected.
    pub pulses: u64,
    /// The number of pulse data bytes written to the last produced file.
    pub data_bytes: u32,
    /// The number of extra chunk files created by tape splitting.
    pub chunks: u32,
    /// The pulse duration histogram of the last produced file.
    pub stats: PulseStats
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            method: DecodeMethod::default(),
            threshold: 0,
            version: TapVersion::V2,
            machine: Machine::C264,
            video_standard: VideoStandard::Pal,
            flags: DecodeFlags::empty()
        }
    }
}

impl DecodeOptions {
    fn header(&self) -> TapHeader {
        TapHeader::new(self.version, self.machine, self.video_standard)
    }
}

/// Converts a *TAP* tape image read from `rd` into a PCM *WAV* file written to `wr`.
pub fn tap_to_wav<R: Read, W: Write + Seek>(rd: R, wr: W, opts: &SynthOptions) -> Result<WavSummary> {
    let tap = read_tap(rd)?;
    debug!("{} {} tape, {} ticks/s, {} bytes of pulse data",
           tap.header.machine, tap.header.video_standard, tap.header.tick_rate(), tap.data.len());
    let spec = WavSpec {
        channels: 1,
        sample_rate: opts.sample_rate,
        bits_per_sample: opts.bits_per_sample
    };
    let wav = WavWriter::try_new(wr, spec)?;
    // half-wave encoded tapes idle on the high level
    let start_high = tap.header.version == TapVersion::V2;
    let mut synth = WaveformSynth::try_new(wav, opts, start_high)?;
    for half_wave in tap.pulse_iter(opts.sample_rate) {
        synth.render_half_wave(half_wave)?;
    }
    synth.finalize()?;
    let samples = synth.samples();
    let mut wav = synth.into_inner();
    let data_bytes = wav.finalize()? as u64;
    Ok(WavSummary { header: tap.header, samples, data_bytes })
}

/// Recovers a *TAP* tape image from a PCM *WAV* file read from `rd`, writing it to `wr`.
///
/// Tape splitting is not available through arbitrary writers; use [wav_to_tap_file]
/// with [DecodeFlags::SPLIT] for images that may overflow a single file.
pub fn wav_to_tap<R: Read, W: Write + Seek>(rd: R, wr: W, opts: &DecodeOptions) -> Result<TapSummary> {
    let wav = read_wav(rd)?;
    let mut tap = TapWriter::try_new(wr, opts.header())?;
    let pulses = passthrough(&wav, opts, &mut tap)?;
    let data_bytes = tap.finalize()?;
    Ok(TapSummary { pulses, data_bytes, chunks: 0, stats: tap.into_stats() })
}

/// Recovers a *TAP* tape image from the PCM *WAV* file at `input`, writing it to a file
/// created at `output`.
///
/// With [DecodeFlags::SPLIT] a pause too long for a single escape code group continues in
/// numbered chunk files next to `output`.
pub fn wav_to_tap_file<P, Q>(input: P, output: Q, opts: &DecodeOptions) -> Result<TapSummary>
    where P: AsRef<Path>, Q: AsRef<Path>
{
    let wav = read_wav(BufReader::new(File::open(input)?))?;
    let split = opts.flags.contains(DecodeFlags::SPLIT);
    let mut tap = ChunkedTapWriter::create(output, opts.header(), split)?;
    let pulses = passthrough(&wav, opts, &mut tap)?;
    let data_bytes = tap.finalize()?;
    let chunks = tap.chunks();
    Ok(TapSummary { pulses, data_bytes, chunks, stats: tap.into_stats() })
}

/// Runs the per-sample detection loop, feeding detected pulses to the sink.
///
/// Returns the number of signal edges detected. The signal tail after the last edge is
/// not committed; without an edge there is no pulse boundary to place it at.
fn passthrough<S: PulseSink>(wav: &WavFile, opts: &DecodeOptions, sink: &mut S) -> Result<u64> {
    let mut decoder = WaveformDecoder::new(opts.method, opts.threshold);
    let invert = opts.flags.contains(DecodeFlags::INVERT);
    let seconds_per_sample = 1.0 / wav.spec.sample_rate as f64;
    let mut previous_bit = false;
    let mut pulses = 0u64;
    let mut edge = |bit: bool, sink: &mut S| -> Result<()> {
        if bit != previous_bit {
            sink.end_pulse()?;
            pulses += 1;
            previous_bit = bit;
        }
        sink.advance(seconds_per_sample);
        Ok(())
    };
    match wav.spec.bits_per_sample {
        1 => {
            for &byte in wav.data.iter() {
                let byte = if invert { byte ^ 0xFF } else { byte };
                for shift in (0..8).rev() {
                    let bit = byte & (1 << shift) != 0;
                    edge(bit, sink)?;
                }
            }
        }
        8 => {
            for &byte in wav.data.iter() {
                let sample = if invert { byte ^ 0xFF } else { byte };
                let bit = decoder.update(sample as i32);
                edge(bit, sink)?;
            }
        }
        16 => {
            for pair in wav.data.chunks_exact(2) {
                let sample = i16::from_le_bytes([pair[0], pair[1]]);
                let sample = if invert { !sample } else { sample };
                let bit = decoder.update(sample as i32);
                edge(bit, sink)?;
            }
        }
        _ => return Err(Error::new(ErrorKind::InvalidInput,
                        "only 1, 8 or 16 bits per sample can be decoded"))
    }
    debug!("{} pulses detected", pulses);
    Ok(pulses)
}
