/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of TAPWAVE, a Rust library for Commodore tape conversion.

    For the full copyright notice, see the lib.rs file.
*/
use core::convert::TryFrom;
use std::fs::File;
use std::io::{BufWriter, Error, ErrorKind, Result, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;

use super::pulse::{PulseDecodeWriter, PulseStats};
use super::TapHeader;

/// The offset of the data size field in the *TAP* file header.
const TAP_SIZE_OFFSET: u64 = 16;

/// A sink of detected tape pulses.
///
/// The current pulse is extended with [PulseSink::advance] for every elapsed slice of time
/// and committed with [PulseSink::end_pulse] whenever a signal edge is detected.
pub trait PulseSink {
    /// Extends the current pulse by the given number of seconds.
    fn advance(&mut self, seconds: f64);
    /// Ends the current pulse and writes its encoding to the tape.
    fn end_pulse(&mut self) -> Result<()>;
}

/// A tool for writing pulses to a *TAP* file via a [Write] + [Seek] byte stream.
///
/// The header is written in [TapWriter::try_new] with a zero size field which is
/// backpatched by [TapWriter::finalize] once the amount of pulse data is known.
#[derive(Debug)]
pub struct TapWriter<W> {
    header: TapHeader,
    pdw: PulseDecodeWriter<W>
}

/// A *TAP* file writer that can split the tape image across multiple files.
///
/// With splitting enabled, whenever a pulse overflows a single 24-bit escape code group
/// the current file is finalized and the remaining groups continue in a fresh chunk file
/// named after the first one with a 3-digit ordinal appended to its stem. Every chunk is
/// a valid *TAP* file starting with its own header.
///
/// A failure to create a chunk file aborts the conversion; pulse data is never dropped.
#[derive(Debug)]
pub struct ChunkedTapWriter {
    base: PathBuf,
    split: bool,
    chunks: u32,
    current: TapWriter<BufWriter<File>>
}

impl<W> TapWriter<W> {
    /// Returns a reference to the written header.
    pub fn header(&self) -> &TapHeader {
        &self.header
    }
    /// Returns a reference to the pulse statistics gathered so far.
    pub fn stats(&self) -> &PulseStats {
        self.pdw.stats()
    }
    /// Returns the pulse statistics, dropping the writer.
    pub fn into_stats(self) -> PulseStats {
        self.pdw.into_stats()
    }
    /// Returns the underlying pulse decode writer.
    pub fn into_inner(self) -> PulseDecodeWriter<W> {
        self.pdw
    }
    /// Returns a mutable reference to the inner pulse decode writer.
    pub fn get_mut(&mut self) -> &mut PulseDecodeWriter<W> {
        &mut self.pdw
    }
    /// Returns a shared reference to the inner pulse decode writer.
    pub fn get_ref(&self) -> &PulseDecodeWriter<W> {
        &self.pdw
    }
}

impl<W: Write + Seek> TapWriter<W> {
    /// Returns a new instance of `TapWriter` with the given writer on success.
    ///
    /// Writes the file header at the current stream position.
    pub fn try_new(mut wr: W, header: TapHeader) -> Result<Self> {
        wr.write_all(&header.to_bytes())?;
        let pdw = PulseDecodeWriter::new(wr, header.tick_rate());
        Ok(TapWriter { header, pdw })
    }
    /// Backpatches the header size field with the amount of pulse data written and
    /// flushes the underlying writer. Returns the patched size.
    pub fn finalize(&mut self) -> Result<u32> {
        let size = u32::try_from(self.pdw.bytes_written()).map_err(|_|
                    Error::new(ErrorKind::InvalidData, "TAP data size exceeds the header field"))?;
        self.header.size = size;
        let wr = self.pdw.get_mut();
        wr.seek(SeekFrom::Start(TAP_SIZE_OFFSET))?;
        wr.write_all(&size.to_le_bytes())?;
        wr.seek(SeekFrom::End(0))?;
        wr.flush()?;
        Ok(size)
    }
}

impl<W: Write + Seek> PulseSink for TapWriter<W> {
    #[inline]
    fn advance(&mut self, seconds: f64) {
        self.pdw.advance(seconds);
    }
    #[inline]
    fn end_pulse(&mut self) -> Result<()> {
        self.pdw.end_pulse()
    }
}

impl ChunkedTapWriter {
    /// Creates a *TAP* file at the given path and returns a new instance of
    /// `ChunkedTapWriter` on success.
    ///
    /// With `split` enabled, pulses overflowing a single escape code group will roll over
    /// to numbered chunk files next to `path`.
    pub fn create<P: AsRef<Path>>(path: P, header: TapHeader, split: bool) -> Result<Self> {
        let base = path.as_ref().to_path_buf();
        let current = Self::create_writer(&base, header)?;
        Ok(ChunkedTapWriter { base, split, chunks: 0, current })
    }
    /// Returns the number of extra chunk files created so far.
    pub fn chunks(&self) -> u32 {
        self.chunks
    }
    /// Returns a reference to the written header.
    pub fn header(&self) -> &TapHeader {
        self.current.header()
    }
    /// Returns a reference to the pulse statistics of the current chunk file.
    pub fn stats(&self) -> &PulseStats {
        self.current.stats()
    }
    /// Finalizes the current chunk file and returns its patched data size.
    pub fn finalize(&mut self) -> Result<u32> {
        self.current.finalize()
    }
    /// Returns the pulse statistics of the current chunk file, dropping the writer.
    pub fn into_stats(self) -> PulseStats {
        self.current.into_stats()
    }

    fn create_writer(path: &Path, header: TapHeader) -> Result<TapWriter<BufWriter<File>>> {
        let file = BufWriter::new(File::create(path)?);
        TapWriter::try_new(file, header)
    }

    fn rotate(&mut self) -> Result<()> {
        self.current.finalize()?;
        self.chunks += 1;
        let path = chunk_path(&self.base, self.chunks);
        debug!("tape chunk overflow, continuing in {}", path.display());
        let header = TapHeader { size: 0, ..*self.current.header() };
        let mut next = Self::create_writer(&path, header)?;
        // the sub-tick remainder spans chunk files
        next.get_mut().set_remainder(self.current.get_ref().remainder());
        self.current = next;
        Ok(())
    }
}

impl PulseSink for ChunkedTapWriter {
    #[inline]
    fn advance(&mut self, seconds: f64) {
        self.current.advance(seconds);
    }
    fn end_pulse(&mut self) -> Result<()> {
        if !self.split {
            return self.current.end_pulse();
        }
        let mut remaining = self.current.get_mut().begin_pulse()?;
        while let Some(ticks) = remaining {
            self.rotate()?;
            remaining = self.current.get_mut().continue_pulse(ticks)?;
        }
        Ok(())
    }
}

/// Returns the path of the `n`-th chunk file: the base file stem with a zero-padded
/// 3-digit ordinal and a `.tap` extension.
fn chunk_path(base: &Path, n: u32) -> PathBuf {
    let mut name = base.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
    name.push(format!("{:03}.tap", n));
    base.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use crate::tap::{read_tap, Machine, TapVersion, VideoStandard};

    fn test_header() -> TapHeader {
        TapHeader::new(TapVersion::V2, Machine::C264, VideoStandard::Pal)
    }

    #[test]
    fn tap_writer_works() {
        let mut writer = TapWriter::try_new(Cursor::new(Vec::new()), test_header()).unwrap();
        let tick_rate = writer.header().tick_rate();
        for &ticks in &[0x32u32, 0x2E, 300] {
            writer.advance(ticks as f64 / tick_rate as f64);
            writer.end_pulse().unwrap();
        }
        assert_eq!(6, writer.finalize().unwrap());
        let image = writer.into_inner().into_inner().into_inner();
        let tap = read_tap(Cursor::new(&image)).unwrap();
        assert_eq!(6, tap.header.size);
        assert_eq!(test_header().machine, tap.header.machine);
        assert_eq!(&[0x32, 0x2E, 0x00, 0x2C, 0x01, 0x00], &tap.data[..]);
    }

    #[test]
    fn chunk_path_works() {
        assert_eq!(Path::new("/tmp/foo001.tap"), chunk_path(Path::new("/tmp/foo.tap"), 1));
        assert_eq!(Path::new("bar042.tap"), chunk_path(Path::new("bar.tap"), 42));
    }

    #[test]
    fn split_on_overflow_works() {
        let dir = std::env::temp_dir().join(format!("tapwave-split-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let base = dir.join("split.tap");
        let header = test_header();
        let tick_rate = header.tick_rate();

        let mut writer = ChunkedTapWriter::create(&base, header, true).unwrap();
        // a pause spanning two escape code groups forces exactly one extra chunk
        let ticks = 0x200_0001u64;
        writer.advance(ticks as f64 / tick_rate as f64);
        writer.end_pulse().unwrap();
        assert_eq!(1, writer.chunks());
        assert_eq!(4, writer.finalize().unwrap());
        drop(writer);

        let first = read_tap(Cursor::new(fs::read(&base).unwrap())).unwrap();
        assert_eq!(4, first.header.size);
        assert_eq!(&[0x00, 0x01, 0x00, 0x00], &first.data[..]);
        let second = read_tap(Cursor::new(fs::read(dir.join("split001.tap")).unwrap())).unwrap();
        assert_eq!(4, second.header.size);
        assert_eq!(&[0x00, 0x02, 0x00, 0x00], &second.data[..]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn no_split_keeps_single_file() {
        let dir = std::env::temp_dir().join(format!("tapwave-nosplit-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let base = dir.join("whole.tap");
        let header = test_header();
        let tick_rate = header.tick_rate();

        let mut writer = ChunkedTapWriter::create(&base, header, false).unwrap();
        writer.advance(0x200_0001 as f64 / tick_rate as f64);
        writer.end_pulse().unwrap();
        assert_eq!(0, writer.chunks());
        assert_eq!(8, writer.finalize().unwrap());
        drop(writer);

        let tap = read_tap(Cursor::new(fs::read(&base).unwrap())).unwrap();
        assert_eq!(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00], &tap.data[..]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
