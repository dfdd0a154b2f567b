/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
use core::convert::TryFrom;
use std::io::{Read, Result};

use log::warn;

use super::pulse::TapPulseIter;
use super::{TapHeader, TAP_HEADER_SIZE};

/// A *TAP* file loaded into memory: the parsed header and the raw pulse data.
#[derive(Clone, Debug)]
pub struct TapFile {
    pub header: TapHeader,
    pub data: Box<[u8]>
}

/// Reads a whole *TAP* file from the given reader.
///
/// The header is validated as in [TapHeader::from_bytes]. When the data size recorded in
/// the header disagrees with the actual amount of data, the actual size wins and a warning
/// is logged; files are frequently truncated or appended to by other tools.
pub fn read_tap<R: Read>(mut rd: R) -> Result<TapFile> {
    let mut buffer = [0u8; TAP_HEADER_SIZE];
    rd.read_exact(&mut buffer)?;
    let mut header = TapHeader::from_bytes(&buffer)?;
    let mut data = Vec::new();
    rd.read_to_end(&mut data)?;
    let real_size = u32::try_from(data.len()).unwrap_or_else(|_| {
        warn!("TAP data larger than 4GiB, header size left untouched");
        header.size
    });
    if header.size != real_size {
        warn!("TAP header size {} doesn't match actual data size {}, corrected",
              header.size, real_size);
        header.size = real_size;
    }
    Ok(TapFile { header, data: data.into_boxed_slice() })
}

impl TapFile {
    /// Returns an iterator of half-wave durations over the pulse data, measured in samples
    /// at the given rate.
    pub fn pulse_iter(&self, sample_rate: u32) -> TapPulseIter<'_> {
        TapPulseIter::new(&self.data, self.header.version, self.header.tick_rate(), sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, ErrorKind};
    use crate::tap::{Machine, TapVersion, VideoStandard};

    #[test]
    fn read_tap_works() {
        let mut image = TapHeader::new(TapVersion::V2, Machine::C264, VideoStandard::Pal)
                            .to_bytes().to_vec();
        image[16] = 3; // header size field
        image.extend_from_slice(&[0x32, 0x2E, 0x40]);
        let tap = read_tap(Cursor::new(&image)).unwrap();
        assert_eq!(TapVersion::V2, tap.header.version);
        assert_eq!(Machine::C264, tap.header.machine);
        assert_eq!(110_840, tap.header.tick_rate());
        assert_eq!(3, tap.header.size);
        assert_eq!(&[0x32, 0x2E, 0x40], &tap.data[..]);
    }

    #[test]
    fn read_tap_corrects_size() {
        let mut image = TapHeader::new(TapVersion::V1, Machine::C64, VideoStandard::Ntsc)
                            .to_bytes().to_vec();
        image[16] = 100; // header lies about the data size
        image.extend_from_slice(&[0x32, 0x32]);
        let tap = read_tap(Cursor::new(&image)).unwrap();
        assert_eq!(2, tap.header.size);
    }

    #[test]
    fn read_tap_rejects_garbage() {
        assert_eq!(ErrorKind::UnexpectedEof,
                   read_tap(Cursor::new(b"C64-TAPE".to_vec())).unwrap_err().kind());
        let image = b"this is not a tape image....".to_vec();
        assert_eq!(ErrorKind::InvalidData,
                   read_tap(Cursor::new(image)).unwrap_err().kind());
    }

    #[test]
    fn pulse_iter_works() {
        let mut image = TapHeader::new(TapVersion::V2, Machine::C64, VideoStandard::Pal)
                            .to_bytes().to_vec();
        image.push(0x32);
        let tap = read_tap(Cursor::new(&image)).unwrap();
        assert_eq!(vec![18], tap.pulse_iter(44100).collect::<Vec<_>>());
    }
}
