/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
/*! PCM **WAV** container utilities.

Only the bare subset of the RIFF/WAVE format the tape pipelines need is implemented here:
uncompressed integer PCM with the `fmt ` and `data` subchunks. Unknown subchunks are
skipped while reading and never produced while writing.
*/
use core::convert::TryFrom;
use std::io::{Error, ErrorKind, Read, Result, Seek, SeekFrom, Write};

use log::warn;

use nom::bytes::complete::{tag, take};
use nom::number::complete::{le_u16, le_u32};
use nom::IResult;

/// The size of the canonical *WAV* file header produced by [WavWriter].
pub const WAV_HEADER_SIZE: usize = 44;
/// The offset of the RIFF chunk size field backpatched by [WavWriter::finalize].
const RIFF_SIZE_OFFSET: u64 = 4;
/// The offset of the data subchunk size field backpatched by [WavWriter::finalize].
const DATA_SIZE_OFFSET: u64 = 40;
/// The PCM format tag of the `fmt ` subchunk.
const WAVE_FORMAT_PCM: u16 = 1;

/// The sample format of a *WAV* file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
    /// 1, 8 or 16; 1-bit data is a packed logic-level signal, 16-bit samples are signed.
    pub bits_per_sample: u16
}

/// A *WAV* file loaded into memory: the sample format and the raw sample data.
#[derive(Clone, Debug)]
pub struct WavFile {
    pub spec: WavSpec,
    pub data: Box<[u8]>
}

/// A tool for writing PCM sample data to a *WAV* file via a [Write] + [Seek] byte stream.
///
/// The 44-byte header is written in [WavWriter::try_new] with zeroed size fields which are
/// backpatched by [WavWriter::finalize] once the amount of sample data is known.
/// Sample data is written through the [Write] implementation.
#[derive(Debug)]
pub struct WavWriter<W> {
    wr: W,
    spec: WavSpec,
    data_bytes: u64
}

impl WavSpec {
    /// Returns the number of bytes each second of sample data occupies.
    pub fn byte_rate(&self) -> u32 {
        (self.sample_rate * self.channels as u32 * self.bits_per_sample as u32 + 7) / 8
    }
    /// Returns the number of bytes of one sample frame, at least 1.
    pub fn block_align(&self) -> u16 {
        ((self.channels * self.bits_per_sample + 7) / 8).max(1)
    }
    /// Returns the duration in seconds of `data_bytes` of sample data.
    pub fn duration_secs(&self, data_bytes: u64) -> f64 {
        data_bytes as f64 * 8.0
            / (self.bits_per_sample as f64 * self.channels as f64 * self.sample_rate as f64)
    }

    fn validate(&self) -> Result<()> {
        if self.channels != 1 {
            return Err(Error::new(ErrorKind::InvalidInput, "only mono WAV files are supported"));
        }
        match self.bits_per_sample {
            1 | 8 | 16 => Ok(()),
            _ => Err(Error::new(ErrorKind::InvalidInput,
                     "only 1, 8 or 16 bits per sample are supported"))
        }
    }
}

fn riff_form(input: &[u8]) -> IResult<&[u8], u32> {
    let (input, _) = tag(&b"RIFF"[..])(input)?;
    let (input, size) = le_u32(input)?;
    let (input, _) = tag(&b"WAVE"[..])(input)?;
    Ok((input, size))
}

fn subchunk_header(input: &[u8]) -> IResult<&[u8], (&[u8], u32)> {
    let (input, id) = take(4usize)(input)?;
    let (input, size) = le_u32(input)?;
    Ok((input, (id, size)))
}

fn format_fields(input: &[u8]) -> IResult<&[u8], (u16, WavSpec)> {
    let (input, format_tag) = le_u16(input)?;
    let (input, channels) = le_u16(input)?;
    let (input, sample_rate) = le_u32(input)?;
    let (input, _byte_rate) = le_u32(input)?;
    let (input, _block_align) = le_u16(input)?;
    let (input, bits_per_sample) = le_u16(input)?;
    Ok((input, (format_tag, WavSpec { channels, sample_rate, bits_per_sample })))
}

/// Parses an in-memory *WAV* file, returning the sample format and a reference to the
/// sample data.
///
/// Subchunks other than `fmt ` and `data` are skipped. A `data` subchunk declaring more
/// bytes than the file holds is accepted with whatever data is present; truncated
/// recordings are commonplace.
pub fn parse_wav(raw: &[u8]) -> Result<(WavSpec, &[u8])> {
    let (mut input, _) = riff_form(raw).map_err(|_|
        Error::new(ErrorKind::InvalidData, "not a RIFF/WAVE file"))?;
    let mut spec: Option<WavSpec> = None;
    loop {
        let (rest, (id, size)) = subchunk_header(input).map_err(|_|
            Error::new(ErrorKind::InvalidData, "no data subchunk in WAV file"))?;
        let size = size as usize;
        if id == b"data" {
            let spec = spec.ok_or_else(||
                Error::new(ErrorKind::InvalidData, "data subchunk precedes the format subchunk"))?;
            let available = size.min(rest.len());
            if available < size {
                warn!("WAV data subchunk truncated: {} of {} bytes present", available, size);
            }
            return Ok((spec, &rest[..available]));
        }
        if id == b"fmt " {
            let (_, (format_tag, fmt)) = format_fields(rest).map_err(|_|
                Error::new(ErrorKind::InvalidData, "malformed WAV format subchunk"))?;
            if format_tag != WAVE_FORMAT_PCM {
                return Err(Error::new(ErrorKind::InvalidInput,
                           "only uncompressed PCM WAV files are supported"));
            }
            fmt.validate()?;
            spec = Some(fmt);
        }
        input = rest.get(size..).ok_or_else(||
            Error::new(ErrorKind::InvalidData, "WAV subchunk exceeds the file size"))?;
    }
}

/// Reads a whole PCM *WAV* file from the given reader.
pub fn read_wav<R: Read>(mut rd: R) -> Result<WavFile> {
    let mut raw = Vec::new();
    rd.read_to_end(&mut raw)?;
    let (spec, data) = parse_wav(&raw)?;
    Ok(WavFile { spec, data: data.to_vec().into_boxed_slice() })
}

impl<W> WavWriter<W> {
    /// Returns the sample format being written.
    pub fn spec(&self) -> &WavSpec {
        &self.spec
    }
    /// Returns the number of sample data bytes written so far.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }
    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.wr
    }
}

impl<W: Write + Seek> WavWriter<W> {
    /// Returns a new instance of `WavWriter` with the given writer on success.
    ///
    /// Writes the file header at the current stream position.
    pub fn try_new(mut wr: W, spec: WavSpec) -> Result<Self> {
        spec.validate()?;
        let mut header = [0u8; WAV_HEADER_SIZE];
        header[0..4].copy_from_slice(b"RIFF");
        header[8..16].copy_from_slice(b"WAVEfmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        header[22..24].copy_from_slice(&spec.channels.to_le_bytes());
        header[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&spec.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&spec.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&spec.bits_per_sample.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        wr.write_all(&header)?;
        Ok(WavWriter { wr, spec, data_bytes: 0 })
    }
    /// Backpatches the RIFF and data size fields with the amount of sample data written
    /// and flushes the underlying writer. Returns the patched data size.
    pub fn finalize(&mut self) -> Result<u32> {
        let data_size = u32::try_from(self.data_bytes).map_err(|_|
            Error::new(ErrorKind::InvalidData, "WAV data size exceeds the header field"))?;
        let riff_size = data_size + (WAV_HEADER_SIZE as u32 - 8);
        self.wr.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.wr.write_all(&riff_size.to_le_bytes())?;
        self.wr.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.wr.write_all(&data_size.to_le_bytes())?;
        self.wr.seek(SeekFrom::End(0))?;
        self.wr.flush()?;
        Ok(data_size)
    }
}

impl<W: Write> Write for WavWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let written = self.wr.write(buf)?;
        self.data_bytes += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> Result<()> {
        self.wr.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SPEC: WavSpec = WavSpec { channels: 1, sample_rate: 44100, bits_per_sample: 8 };

    #[test]
    fn wav_roundtrip_works() {
        let mut writer = WavWriter::try_new(Cursor::new(Vec::new()), SPEC).unwrap();
        writer.write_all(&[0x80, 0x90, 0x70, 0x80]).unwrap();
        assert_eq!(4, writer.finalize().unwrap());
        let image = writer.into_inner().into_inner();
        assert_eq!(WAV_HEADER_SIZE + 4, image.len());
        let wav = read_wav(Cursor::new(&image)).unwrap();
        assert_eq!(SPEC, wav.spec);
        assert_eq!(&[0x80, 0x90, 0x70, 0x80], &wav.data[..]);
        // backpatched sizes
        assert_eq!(&(4 + 36u32).to_le_bytes(), &image[4..8]);
        assert_eq!(&4u32.to_le_bytes(), &image[40..44]);
    }

    #[test]
    fn unknown_subchunks_are_skipped() {
        let mut writer = WavWriter::try_new(Cursor::new(Vec::new()), SPEC).unwrap();
        writer.write_all(&[1, 2, 3]).unwrap();
        writer.finalize().unwrap();
        let image = writer.into_inner().into_inner();
        // splice a LIST subchunk between fmt and data
        let mut spliced = image[..36].to_vec();
        spliced.extend_from_slice(b"LIST");
        spliced.extend_from_slice(&6u32.to_le_bytes());
        spliced.extend_from_slice(b"junk..");
        spliced.extend_from_slice(&image[36..]);
        // keep the RIFF size honest
        let riff_size = (spliced.len() - 8) as u32;
        spliced[4..8].copy_from_slice(&riff_size.to_le_bytes());
        let wav = read_wav(Cursor::new(&spliced)).unwrap();
        assert_eq!(SPEC, wav.spec);
        assert_eq!(&[1, 2, 3], &wav.data[..]);
        assert_eq!(&[1, 2, 3], &read_wav(Cursor::new(&image)).unwrap().data[..]);
    }

    #[test]
    fn truncated_data_is_accepted() {
        let mut writer = WavWriter::try_new(Cursor::new(Vec::new()), SPEC).unwrap();
        writer.write_all(&[7; 10]).unwrap();
        writer.finalize().unwrap();
        let mut image = writer.into_inner().into_inner();
        image.truncate(image.len() - 4);
        let wav = read_wav(Cursor::new(&image)).unwrap();
        assert_eq!(&[7; 6], &wav.data[..]);
    }

    #[test]
    fn non_pcm_is_rejected() {
        let mut writer = WavWriter::try_new(Cursor::new(Vec::new()), SPEC).unwrap();
        writer.write_all(&[0; 2]).unwrap();
        writer.finalize().unwrap();
        let mut image = writer.into_inner().into_inner();
        image[20] = 3; // IEEE float format tag
        assert_eq!(ErrorKind::InvalidInput,
                   read_wav(Cursor::new(&image)).unwrap_err().kind());
        assert_eq!(ErrorKind::InvalidData,
                   read_wav(Cursor::new(b"RIFFxxxxJUNK".to_vec())).unwrap_err().kind());
    }

    #[test]
    fn unsupported_width_is_rejected() {
        let spec = WavSpec { bits_per_sample: 24, ..SPEC };
        assert_eq!(ErrorKind::InvalidInput,
                   WavWriter::try_new(Cursor::new(Vec::new()), spec).unwrap_err().kind());
        let spec = WavSpec { channels: 2, ..SPEC };
        assert_eq!(ErrorKind::InvalidInput,
                   WavWriter::try_new(Cursor::new(Vec::new()), spec).unwrap_err().kind());
    }

    #[test]
    fn spec_arithmetic_works() {
        assert_eq!(44100, SPEC.byte_rate());
        assert_eq!(1, SPEC.block_align());
        let packed = WavSpec { bits_per_sample: 1, ..SPEC };
        assert_eq!(44100 / 8 + 1, packed.byte_rate()); // 44101 bits round up
        assert_eq!(1, packed.block_align());
        let wide = WavSpec { bits_per_sample: 16, ..SPEC };
        assert_eq!(88200, wide.byte_rate());
        assert_eq!(2, wide.block_align());
        assert_eq!(1.0, SPEC.duration_secs(44100));
    }
}
