//! Fixed-layout chunk decoders and the records they produce.
//!
//! Every decoder has the same shape, [`Decoder`], so the registry can hold
//! them in one table. Decoders see the payload exactly as the walker read it
//! (padding included) and report short or inconsistent payloads through
//! [`ChunkError`] rather than panicking.

use std::mem::size_of;

use bytemuck::AnyBitPattern;
use enum_dispatch::enum_dispatch;
use serde::Serialize;

use crate::context::ByteOrder;
use crate::error::{ChunkError, Diagnostic};
use crate::format::FormatChunk;
use crate::fourcc::FourCc;

pub mod basic;
pub mod broadcast;
pub mod info;
pub mod sampler;
pub mod xml;

pub use basic::{DataChunk, DisplayChunk, FactChunk, GenericChunk, Md5Chunk};
pub use broadcast::{BroadcastChunk, CartChunk, ChannelAssignmentChunk, PeakEnvelopeChunk};
pub use info::{AssociatedDataChunk, InfoChunk};
pub use sampler::{AcidChunk, CueChunk, InstrumentChunk, SamplerChunk, SlicesChunk};
pub use xml::XmlChunk;

/// What a decoder is handed for one chunk occurrence.
#[derive(Debug, Clone, Copy)]
pub struct ChunkInput<'a> {
    pub identifier: FourCc,
    pub size: u64,
    pub payload: &'a [u8],
    pub byte_order: ByteOrder,
}

impl<'a> ChunkInput<'a> {
    pub fn reader(&self) -> FieldReader<'a> {
        FieldReader::new(self.payload, self.byte_order)
    }

    /// A reader that ignores the stream byte order, for chunks that are
    /// little-endian by definition (`bext`, `levl`).
    pub fn le_reader(&self) -> FieldReader<'a> {
        FieldReader::new(self.payload, ByteOrder::Forward)
    }
}

pub type Decoder = fn(&ChunkInput<'_>) -> Result<DecodedChunk, ChunkError>;

/// Common surface of every decoded record.
#[enum_dispatch]
pub trait ChunkRecord {
    fn identifier(&self) -> FourCc;

    /// Padding-adjusted size from the chunk header.
    fn size(&self) -> u64;

    fn diagnostics(&self) -> &[Diagnostic] {
        &[]
    }
}

/// One decoded chunk occurrence.
#[enum_dispatch(ChunkRecord)]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedChunk {
    Format(FormatChunk),
    Data(DataChunk),
    Fact(FactChunk),
    Info(InfoChunk),
    Instrument(InstrumentChunk),
    PeakEnvelope(PeakEnvelopeChunk),
    Sampler(SamplerChunk),
    Acid(AcidChunk),
    Slices(SlicesChunk),
    Cart(CartChunk),
    ChannelAssignment(ChannelAssignmentChunk),
    Broadcast(BroadcastChunk),
    Display(DisplayChunk),
    Cue(CueChunk),
    AssociatedData(AssociatedDataChunk),
    Xml(XmlChunk),
    Md5(Md5Chunk),
    Generic(GenericChunk),
}

/// Implements [`ChunkRecord`] for a record with `identifier` and `size` fields,
/// and optionally a `diagnostics` field.
macro_rules! impl_record {
    ($ty:ty) => {
        impl $crate::chunks::ChunkRecord for $ty {
            fn identifier(&self) -> $crate::fourcc::FourCc {
                self.identifier
            }
            fn size(&self) -> u64 {
                self.size
            }
        }
    };
    ($ty:ty, diagnostics) => {
        impl $crate::chunks::ChunkRecord for $ty {
            fn identifier(&self) -> $crate::fourcc::FourCc {
                self.identifier
            }
            fn size(&self) -> u64 {
                self.size
            }
            fn diagnostics(&self) -> &[$crate::error::Diagnostic] {
                &self.diagnostics
            }
        }
    };
}
pub(crate) use impl_record;

impl_record!(FormatChunk, diagnostics);

/// Sequential, bounds-checked reads over a chunk payload.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
    order: ByteOrder,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self {
            data,
            pos: 0,
            order,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], ChunkError> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(ChunkError::Truncated {
                need: self.pos.saturating_add(n),
                have: self.data.len(),
            });
        };
        let out = &self.data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Up to `n` bytes; fewer when the payload ends first.
    pub fn take_up_to(&mut self, n: usize) -> &'a [u8] {
        let n = n.min(self.remaining());
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        out
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.data[self.pos..];
        self.pos = self.data.len();
        out
    }

    pub fn read_exact<const N: usize>(&mut self) -> Result<[u8; N], ChunkError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    pub fn u8(&mut self) -> Result<u8, ChunkError> {
        Ok(self.read_exact::<1>()?[0])
    }

    pub fn i8(&mut self) -> Result<i8, ChunkError> {
        Ok(self.u8()? as i8)
    }

    pub fn u16(&mut self) -> Result<u16, ChunkError> {
        let bytes = self.read_exact::<2>()?;
        Ok(self.order.u16(bytes))
    }

    pub fn i16(&mut self) -> Result<i16, ChunkError> {
        Ok(self.u16()? as i16)
    }

    pub fn u32(&mut self) -> Result<u32, ChunkError> {
        let bytes = self.read_exact::<4>()?;
        Ok(self.order.u32(bytes))
    }

    pub fn i32(&mut self) -> Result<i32, ChunkError> {
        let bytes = self.read_exact::<4>()?;
        Ok(self.order.i32(bytes))
    }

    pub fn u64(&mut self) -> Result<u64, ChunkError> {
        let bytes = self.read_exact::<8>()?;
        Ok(self.order.u64(bytes))
    }

    pub fn f32(&mut self) -> Result<f32, ChunkError> {
        let bytes = self.read_exact::<4>()?;
        Ok(self.order.f32(bytes))
    }

    pub fn fourcc(&mut self) -> Result<FourCc, ChunkError> {
        Ok(FourCc(self.read_exact::<4>()?))
    }

    /// A fixed-width Latin-1 text field.
    pub fn text(&mut self, width: usize) -> Result<String, ChunkError> {
        Ok(latin1_text(self.take(width)?))
    }

    /// Reads a `Pod` record as it sits in the payload. Multi-byte fields are
    /// still in stream order and must be fixed up by the caller.
    pub fn pod<T: AnyBitPattern>(&mut self) -> Result<T, ChunkError> {
        Ok(bytemuck::pod_read_unaligned(self.take(size_of::<T>())?))
    }
}

/// Latin-1 text cut at the first NUL, trailing whitespace trimmed.
pub fn latin1_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text: String = bytes[..end].iter().map(|&b| b as char).collect();
    text.trim_end().to_string()
}

/// UTF-8 text with invalid sequences replaced and NUL padding removed.
pub fn utf8_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches('\0')
        .to_string()
}

/// Lowercase hex of `bytes`, in the order given.
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_reports_truncation_with_offsets() {
        let mut r = FieldReader::new(&[1, 0, 2, 0, 0, 0], ByteOrder::Forward);
        assert_eq!(r.u16().unwrap(), 1);
        assert_eq!(r.u32().unwrap(), 2);
        assert_eq!(
            r.u16(),
            Err(ChunkError::Truncated { need: 8, have: 6 })
        );
        // a failed read does not move the reader
        assert_eq!(r.position(), 6);
    }

    #[test]
    fn reader_honors_byte_order() {
        let data = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(FieldReader::new(&data, ByteOrder::Reversed).u32(), Ok(0x1234_5678));
        assert_eq!(FieldReader::new(&data, ByteOrder::Forward).u32(), Ok(0x7856_3412));
        assert_eq!(FieldReader::new(&data, ByteOrder::Reversed).i16(), Ok(0x1234));
    }

    #[test]
    fn take_up_to_stops_at_end() {
        let mut r = FieldReader::new(b"abc", ByteOrder::Forward);
        assert_eq!(r.take_up_to(2), b"ab");
        assert_eq!(r.take_up_to(10), b"c");
        assert!(r.rest().is_empty());
    }

    #[test]
    fn latin1_text_stops_at_nul_and_trims() {
        assert_eq!(latin1_text(b"Title  \0garbage"), "Title");
        assert_eq!(latin1_text(b"caf\xe9"), "caf\u{e9}");
        assert_eq!(latin1_text(b"\0\0\0"), "");
    }

    #[test]
    fn utf8_text_trims_nul_padding() {
        assert_eq!(utf8_text(b"<a/>\0\0"), "<a/>");
        assert_eq!(utf8_text(b"\xff<b/>"), "\u{fffd}<b/>");
    }

    #[test]
    fn decoded_chunks_dispatch_the_record_trait() {
        let chunk: DecodedChunk = GenericChunk {
            identifier: FourCc(*b"abcd"),
            size: 6,
            text: "hello".into(),
            diagnostics: vec![Diagnostic::new("abcd", "oops")],
        }
        .into();

        assert_eq!(chunk.identifier(), FourCc(*b"abcd"));
        assert_eq!(chunk.size(), 6);
        assert_eq!(chunk.diagnostics().len(), 1);
    }
}
