/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
/*! **TAP** file format utilities.

# TAP format

A **TAP** file is a dump of the signal recorded on a Commodore cassette tape, stored as a stream
of pulse durations rather than sampled amplitudes. The file begins with a 20-byte header:

| offset | size | description                                         |
|--------|------|-----------------------------------------------------|
|    0   |   12 | signature: `C64-TAPE-RAW` or `C16-TAPE-RAW`         |
|   12   |    1 | format version (0, 1 or 2)                          |
|   13   |    1 | machine: 0 C64, 1 VIC-20, 2 C16/plus4               |
|   14   |    1 | video standard: 0 PAL, 1 NTSC                       |
|   15   |    1 | reserved                                            |
|   16   |    4 | size of the pulse data in bytes (LSB first)         |

after which the pulse data follows to the end of the file.

Each non-zero data byte represents one pulse lasting `byte` *TAP units*. The duration of a single
unit is 8 machine cycles, so the unit rate in Hz depends on the machine and the video standard;
see [Machine::tap_tick_rate]. A zero byte is an escape code:

* in version 0 a run of consecutive zero bytes encodes a pause, each zero extending it by
  roughly 1/50th of a second,
* in versions 1 and 2 a zero byte is followed by a 24-bit little-endian count of machine cycles
  (a regular pulse duration scaled by 8).

Versions 0 and 1 describe full square-wave cycles, while version 2 (used for C16/plus4 tapes)
counts every half-wave separately, doubling the effective resolution.

## Reading

[read_tap] slurps and validates a *TAP* file, producing a [TapFile]. Use [TapFile::pulse_iter]
to expand the pulse data into half-wave durations measured in audio samples:

```no_run
use tapwave::tap::read_tap;

let tap = read_tap(std::fs::File::open("some.tap")?)?;
println!("{:?} {:?} tape", tap.header.machine, tap.header.video_standard);
for half_wave in tap.pulse_iter(44100) {
    // render half_wave samples...
}
# Ok::<(), std::io::Error>(())
```

## Writing

[TapWriter] writes the header up front and backpatches the size field when finalized.
Detected pulses are fed to it as elapsed seconds between signal edges:

```no_run
use tapwave::tap::{TapHeader, TapVersion, Machine, VideoStandard, TapWriter, PulseSink};

let header = TapHeader::new(TapVersion::V2, Machine::C264, VideoStandard::Pal);
let mut writer = TapWriter::try_new(std::fs::File::create("out.tap")?, header)?;
writer.advance(0.001);
writer.end_pulse()?;
writer.finalize()?;
# Ok::<(), std::io::Error>(())
```
*/
use core::convert::TryFrom;
use std::fmt;
use std::io::{Error, ErrorKind, Result};

use log::warn;

pub mod pulse;
mod read;
mod write;
pub use read::*;
pub use write::*;

/// The size of the *TAP* file header in bytes.
pub const TAP_HEADER_SIZE: usize = 20;
/// The header signature written for [Machine::C64] and [Machine::Vic20] tapes.
pub const TAP_SIGNATURE_C64: &[u8; 12] = b"C64-TAPE-RAW";
/// The header signature written for [Machine::C264] tapes.
pub const TAP_SIGNATURE_C16: &[u8; 12] = b"C16-TAPE-RAW";

/// The number of *TAP units* per second of a PAL C64 tape.
pub const C64_PAL_TICK_RATE: u32 = 123_156; //  985248 / 8
/// The number of *TAP units* per second of an NTSC C64 tape.
pub const C64_NTSC_TICK_RATE: u32 = 127_841; // 1022727 / 8
/// The number of *TAP units* per second of a PAL VIC-20 tape.
pub const VIC_PAL_TICK_RATE: u32 = 138_551; // 1108405 / 8
/// The number of *TAP units* per second of an NTSC VIC-20 tape.
pub const VIC_NTSC_TICK_RATE: u32 = 127_841; // 1022727 / 8
/// The number of *TAP units* per second of a PAL C16/plus4 tape.
pub const C16_PAL_TICK_RATE: u32 = 110_840; //  886724 / 8
/// The number of *TAP units* per second of an NTSC C16/plus4 tape.
pub const C16_NTSC_TICK_RATE: u32 = 111_860; //  894886 / 8

/// The *TAP* format version.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TapVersion {
    /// Full-wave pulses, zero-run pause encoding.
    V0 = 0,
    /// Full-wave pulses, 24-bit escape codes.
    V1 = 1,
    /// Half-wave pulses, 24-bit escape codes.
    V2 = 2
}

/// The Commodore machine the tape was recorded for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Machine {
    C64   = 0,
    Vic20 = 1,
    /// The 264 series: C16, C116 and plus/4.
    C264  = 2
}

/// The video standard of the recording machine, determining its clock frequency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum VideoStandard {
    Pal  = 0,
    Ntsc = 1
}

/// Represents the 20-byte *TAP* file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TapHeader {
    pub version: TapVersion,
    pub machine: Machine,
    pub video_standard: VideoStandard,
    /// The size of the pulse data in bytes.
    pub size: u32
}

impl Machine {
    /// Returns the number of *TAP units* per second for tapes recorded on this machine
    /// with the given video standard.
    pub fn tap_tick_rate(self, video_standard: VideoStandard) -> u32 {
        use Machine::*;
        use VideoStandard::*;
        match (self, video_standard) {
            (C64,   Pal)  => C64_PAL_TICK_RATE,
            (C64,   Ntsc) => C64_NTSC_TICK_RATE,
            (Vic20, Pal)  => VIC_PAL_TICK_RATE,
            (Vic20, Ntsc) => VIC_NTSC_TICK_RATE,
            (C264,  Pal)  => C16_PAL_TICK_RATE,
            (C264,  Ntsc) => C16_NTSC_TICK_RATE,
        }
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Machine::C64   => "C64",
            Machine::Vic20 => "VIC-20",
            Machine::C264  => "C264"
        })
    }
}

impl fmt::Display for VideoStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VideoStandard::Pal  => "PAL",
            VideoStandard::Ntsc => "NTSC"
        })
    }
}

impl TryFrom<u8> for TapVersion {
    type Error = Error;

    #[inline]
    fn try_from(version: u8) -> Result<Self> {
        match version {
            0 => Ok(TapVersion::V0),
            1 => Ok(TapVersion::V1),
            2 => Ok(TapVersion::V2),
            _ => Err(Error::new(ErrorKind::InvalidData, "TAP version not supported"))
        }
    }
}

impl TryFrom<u8> for Machine {
    type Error = Error;

    #[inline]
    fn try_from(machine: u8) -> Result<Self> {
        match machine {
            0 => Ok(Machine::C64),
            1 => Ok(Machine::Vic20),
            2 => Ok(Machine::C264),
            _ => Err(Error::new(ErrorKind::InvalidData, "unknown machine type in TAP header"))
        }
    }
}

impl TapHeader {
    /// Creates a new header with a zero data size.
    pub fn new(version: TapVersion, machine: Machine, video_standard: VideoStandard) -> Self {
        TapHeader { version, machine, video_standard, size: 0 }
    }
    /// Returns the number of *TAP units* per second for this tape.
    #[inline]
    pub fn tick_rate(&self) -> u32 {
        self.machine.tap_tick_rate(self.video_standard)
    }
    /// Returns the header signature matching [TapHeader::machine].
    pub fn signature(&self) -> &'static [u8; 12] {
        match self.machine {
            Machine::C264 => TAP_SIGNATURE_C16,
            _ => TAP_SIGNATURE_C64
        }
    }
    /// Serializes the header into its on-disk representation.
    pub fn to_bytes(&self) -> [u8; TAP_HEADER_SIZE] {
        let mut buffer = [0u8; TAP_HEADER_SIZE];
        buffer[0..12].copy_from_slice(self.signature());
        buffer[12] = self.version as u8;
        buffer[13] = self.machine as u8;
        buffer[14] = self.video_standard as u8;
        buffer[16..20].copy_from_slice(&self.size.to_le_bytes());
        buffer
    }
    /// Deserializes a header from its on-disk representation.
    ///
    /// Any 3-character machine prefix of the signature is accepted. A video standard byte
    /// other than 0 or 1 falls back to PAL with a logged warning. An unsupported version
    /// or machine byte is an error.
    pub fn from_bytes(buffer: &[u8; TAP_HEADER_SIZE]) -> Result<Self> {
        if &buffer[4..12] != &TAP_SIGNATURE_C64[4..12] {
            return Err(Error::new(ErrorKind::InvalidData, "invalid or corrupt TAP file"));
        }
        let version = TapVersion::try_from(buffer[12])?;
        let machine = Machine::try_from(buffer[13])?;
        let video_standard = match buffer[14] {
            0 => VideoStandard::Pal,
            1 => VideoStandard::Ntsc,
            other => {
                warn!("illegal video standard value ({:#04x}), assuming PAL", other);
                VideoStandard::Pal
            }
        };
        let mut size = [0u8; 4];
        size.copy_from_slice(&buffer[16..20]);
        let size = u32::from_le_bytes(size);
        Ok(TapHeader { version, machine, video_standard, size })
    }
}
