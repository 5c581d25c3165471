use serde::Serialize;

use super::{impl_record, latin1_text, ChunkInput, DecodedChunk};
use crate::context::ByteOrder;
use crate::error::{ChunkError, Diagnostic};
use crate::format;
use crate::fourcc::FourCc;

/// `data`: only its extent is recorded, never the samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub byte_count: u64,
    /// Filled in by the registry once a matching `fmt ` is known.
    pub frame_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub samples: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Md5Chunk {
    pub identifier: FourCc,
    pub size: u64,
    /// 32 lowercase hex digits.
    pub checksum: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub cftype: &'static str,
    pub data: String,
}

/// Fallback for identifiers without a decoder, and for decoders that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericChunk {
    pub identifier: FourCc,
    pub size: u64,
    /// The payload as Latin-1 text.
    pub text: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl_record!(DataChunk);
impl_record!(FactChunk);
impl_record!(Md5Chunk);
impl_record!(DisplayChunk);
impl_record!(GenericChunk, diagnostics);

impl GenericChunk {
    pub fn new(input: &ChunkInput<'_>) -> Self {
        Self {
            identifier: input.identifier,
            size: input.size,
            text: input.payload.iter().map(|&b| b as char).collect(),
            diagnostics: Vec::new(),
        }
    }

    /// The record left in a slot whose decoder returned `err`.
    pub fn from_error(input: &ChunkInput<'_>, err: &ChunkError) -> Self {
        let mut chunk = Self::new(input);
        chunk.diagnostics.push(Diagnostic::new(
            format!("'{}'", input.identifier),
            err.to_string(),
        ));
        chunk
    }
}

pub fn decode_format(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    Ok(format::resolve(input.byte_order, input.identifier, input.size, input.payload).into())
}

pub fn decode_data(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    Ok(DataChunk {
        identifier: input.identifier,
        size: input.size,
        byte_count: input.size,
        frame_count: None,
    }
    .into())
}

pub fn decode_fact(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let samples = input.reader().u32()?;
    Ok(FactChunk {
        identifier: input.identifier,
        size: input.size,
        samples,
    }
    .into())
}

pub fn decode_md5(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let bytes = input.reader().read_exact::<16>()?;
    let checksum = match input.byte_order {
        ByteOrder::Forward => u128::from_le_bytes(bytes),
        ByteOrder::Reversed => u128::from_be_bytes(bytes),
    };
    Ok(Md5Chunk {
        identifier: input.identifier,
        size: input.size,
        checksum: format!("{checksum:032x}"),
    }
    .into())
}

/// Clipboard format name for a `DISP` type code.
pub fn clipboard_type(code: u32) -> &'static str {
    match code {
        1 => "CF_TEXT",
        2 => "CF_BITMAP",
        3 => "CF_METAFILE",
        8 => "CF_DIB",
        9 => "CF_PALETTE",
        _ => "UNKNOWN_TYPE",
    }
}

pub fn decode_display(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.reader();
    let cftype = clipboard_type(r.u32()?);
    Ok(DisplayChunk {
        identifier: input.identifier,
        size: input.size,
        cftype,
        data: latin1_text(r.rest()),
    }
    .into())
}
