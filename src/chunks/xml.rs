use serde::Serialize;

use super::{impl_record, utf8_text, ChunkInput, DecodedChunk};
use crate::error::ChunkError;
use crate::fourcc::FourCc;

/// `iXML`, `aXML` and `_PMX` (XMP) documents, kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XmlChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub xml: String,
}

impl_record!(XmlChunk);

pub fn decode_xml(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    Ok(XmlChunk {
        identifier: input.identifier,
        size: input.size,
        xml: utf8_text(input.payload),
    }
    .into())
}
