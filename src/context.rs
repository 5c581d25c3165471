use bytemuck::{Pod, Zeroable};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::fourcc::FourCc;

/// Byte order of every multi-byte integer in a stream.
///
/// Decided once from the master identifier, before anything else is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteOrder {
    /// Little-endian (`RIFF`, `RF64`, `BW64`).
    #[serde(rename = "little")]
    Forward,
    /// Big-endian (`RIFX`, `FFIR`).
    #[serde(rename = "big")]
    Reversed,
}

impl ByteOrder {
    #[inline]
    pub fn u16(self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::Forward => u16::from_le_bytes(bytes),
            ByteOrder::Reversed => u16::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::Forward => u32::from_le_bytes(bytes),
            ByteOrder::Reversed => u32::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn u64(self, bytes: [u8; 8]) -> u64 {
        match self {
            ByteOrder::Forward => u64::from_le_bytes(bytes),
            ByteOrder::Reversed => u64::from_be_bytes(bytes),
        }
    }

    #[inline]
    pub fn i32(self, bytes: [u8; 4]) -> i32 {
        self.u32(bytes) as i32
    }

    #[inline]
    pub fn f32(self, bytes: [u8; 4]) -> f32 {
        f32::from_bits(self.u32(bytes))
    }

    /// Reinterprets a `u32` that was loaded with native byte order (e.g. out of
    /// a `Pod` record) as a value stored in this byte order.
    #[inline]
    pub fn fix_u32(self, raw: u32) -> u32 {
        match self {
            ByteOrder::Forward => u32::from_le(raw),
            ByteOrder::Reversed => u32::from_be(raw),
        }
    }

    #[inline]
    pub fn fix_u16(self, raw: u16) -> u16 {
        match self {
            ByteOrder::Forward => u16::from_le(raw),
            ByteOrder::Reversed => u16::from_be(raw),
        }
    }
}

/// The container family named by the master identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Container {
    Riff,
    Rifx,
    Ffir,
    Rf64,
    Bw64,
}

impl Container {
    /// Maps a master identifier to its container and byte order.
    pub fn from_master(master: FourCc) -> Result<(Container, ByteOrder)> {
        match master.as_bytes() {
            b"RIFF" => Ok((Container::Riff, ByteOrder::Forward)),
            b"RF64" => Ok((Container::Rf64, ByteOrder::Forward)),
            b"BW64" => Ok((Container::Bw64, ByteOrder::Forward)),
            b"RIFX" => Ok((Container::Rifx, ByteOrder::Reversed)),
            b"FFIR" => Ok((Container::Ffir, ByteOrder::Reversed)),
            _ => Err(Error::UnrecognizedContainer(master)),
        }
    }
}

/// On-disk body of a `ds64` chunk, after its 8-byte header.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Ds64Body {
    riff_low: u32,
    riff_high: u32,
    data_low: u32,
    data_high: u32,
    sample_low: u32,
    sample_high: u32,
    table_entry_count: u32,
}

/// The 64-bit size table of an RF64/BW64 stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ds64Table {
    pub chunk_size: u32,
    pub riff_size: u64,
    pub data_size: u64,
    pub sample_count: u64,
    /// Number of 12-byte table records that follow the body. They are skipped.
    pub table_entry_count: u32,
}

impl Ds64Table {
    pub const BODY_LEN: usize = std::mem::size_of::<Ds64Body>();
    pub const TABLE_RECORD_LEN: u64 = 12;

    pub fn parse(order: ByteOrder, chunk_size: u32, body: &[u8; Self::BODY_LEN]) -> Self {
        let raw: Ds64Body = bytemuck::pod_read_unaligned(body);
        let wide = |low: u32, high: u32| {
            u64::from(order.fix_u32(low)) | (u64::from(order.fix_u32(high)) << 32)
        };

        Self {
            chunk_size,
            riff_size: wide(raw.riff_low, raw.riff_high),
            data_size: wide(raw.data_low, raw.data_high),
            sample_count: wide(raw.sample_low, raw.sample_high),
            table_entry_count: order.fix_u32(raw.table_entry_count),
        }
    }

    /// Bytes occupied by the skipped table records.
    pub fn table_len(&self) -> u64 {
        u64::from(self.table_entry_count) * Self::TABLE_RECORD_LEN
    }
}

/// Per-decode state established by the container header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamContext {
    pub master: FourCc,
    pub container: Container,
    pub byte_order: ByteOrder,
    pub form_type: FourCc,
    /// The container size as declared in the header.
    pub declared_size: u32,
    pub ds64: Option<Ds64Table>,
}

impl StreamContext {
    /// Declared container size meaning "look in ds64".
    pub const SIZE_SENTINEL: u32 = 0xFFFF_FFFF;

    pub fn is_wide(&self) -> bool {
        self.ds64.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_identifier_decides_byte_order() {
        for master in [FourCc::RIFF, FourCc::BW64, FourCc::RF64] {
            let (_, order) = Container::from_master(master).unwrap();
            assert_eq!(order, ByteOrder::Forward, "{master}");
        }
        for master in [FourCc::RIFX, FourCc::FFIR] {
            let (_, order) = Container::from_master(master).unwrap();
            assert_eq!(order, ByteOrder::Reversed, "{master}");
        }
    }

    #[test]
    fn unknown_master_is_rejected() {
        for master in [*b"FORM", *b"riff", *b"FIRR", [0; 4]] {
            match Container::from_master(FourCc(master)) {
                Err(Error::UnrecognizedContainer(found)) => assert_eq!(found, FourCc(master)),
                other => panic!("expected UnrecognizedContainer, got {other:?}"),
            }
        }
    }

    #[test]
    fn ds64_body_joins_halves_in_stream_order() {
        let mut body = Vec::new();
        for word in [1u32, 2, 3, 0, 5, 1, 4] {
            body.extend_from_slice(&word.to_be_bytes());
        }
        let body: [u8; Ds64Table::BODY_LEN] = body.try_into().unwrap();
        let table = Ds64Table::parse(ByteOrder::Reversed, 28, &body);

        assert_eq!(table.riff_size, (2u64 << 32) | 1);
        assert_eq!(table.data_size, 3);
        assert_eq!(table.sample_count, (1u64 << 32) | 5);
        assert_eq!(table.table_entry_count, 4);
        assert_eq!(table.table_len(), 48);
    }

    #[test]
    fn reversed_order_reads_big_endian() {
        assert_eq!(ByteOrder::Reversed.u16([0x01, 0x02]), 0x0102);
        assert_eq!(ByteOrder::Forward.u16([0x01, 0x02]), 0x0201);
        assert_eq!(ByteOrder::Reversed.u32([0, 0, 0, 16]), 16);
    }
}
