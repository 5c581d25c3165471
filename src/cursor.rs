use std::fmt::Debug;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use crate::error::Result;

/// Buffered, position-tracking reader over any seekable byte source.
///
/// `position()` is always the absolute offset of the next unread byte, so the
/// walker never has to ask the underlying source where it is.
#[derive(Debug)]
pub struct ByteCursor<R: Read + Seek + Debug> {
    reader: BufReader<R>,
    abs_pos: u64,
}

impl<R: Read + Seek + Debug> ByteCursor<R> {
    const BUFFER_SIZE: usize = 1024 * 16;

    pub fn new(reader: R) -> Self {
        let reader = BufReader::with_capacity(Self::BUFFER_SIZE, reader);
        Self { reader, abs_pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> u64 {
        self.abs_pos
    }

    /// Reads exactly `N` bytes, failing with `UnexpectedEof` on a short read.
    pub fn read_exact<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut result = [0u8; N];
        self.reader.read_exact(&mut result)?;
        self.abs_pos += N as u64;
        Ok(result)
    }

    /// Reads `N` bytes, or returns `None` when the stream ends first.
    ///
    /// Bytes consumed by a short read are not given back; callers treat `None`
    /// as end of stream.
    pub fn try_read_array<const N: usize>(&mut self) -> Result<Option<[u8; N]>> {
        let mut result = [0u8; N];
        let mut filled = 0;
        while filled < N {
            match self.reader.read(&mut result[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.abs_pos += filled as u64;

        Ok((filled == N).then_some(result))
    }

    /// Reads at most `n` bytes. Fewer come back when the stream is shorter.
    pub fn read_up_to(&mut self, n: u64) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = (&mut self.reader).take(n).read_to_end(&mut buf)?;
        self.abs_pos += read as u64;
        Ok(buf)
    }

    /// Moves forward by `n` bytes without reading them. Landing past the end of
    /// the stream is allowed; the next read simply comes back empty.
    pub fn skip(&mut self, n: u64) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        match i64::try_from(n) {
            Ok(delta) => {
                self.reader.seek_relative(delta)?;
                self.abs_pos += n;
            }
            Err(_) => {
                let target = self.abs_pos.checked_add(n).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidInput, "seek offset overflows u64")
                })?;
                self.seek(SeekFrom::Start(target))?;
            }
        }
        Ok(())
    }

    /// Steps back `n` bytes that were just read.
    pub fn rewind(&mut self, n: u64) -> Result<()> {
        let delta = i64::try_from(n)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "rewind too large"))?;
        self.reader.seek_relative(-delta)?;
        self.abs_pos = self.abs_pos.saturating_sub(n);
        Ok(())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.abs_pos = self.reader.seek(pos)?;
        Ok(self.abs_pos)
    }
}
