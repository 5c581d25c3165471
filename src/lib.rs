//! Chunk-level decoding of RIFF-family WAVE streams.
//!
//! A stream is walked once, front to back: the container header fixes the
//! byte order (and, for RF64/BW64, the 64-bit size table), then each chunk is
//! read and handed to the decoder registered for its normalized identifier.
//! The result is a [`Document`] that serializes straight to JSON.
//!
//! ```no_run
//! use wave_probe::{decode_path, render, DecodeOptions, RenderOptions};
//!
//! let document = decode_path("take.wav", &DecodeOptions::default())?;
//! println!("{}", render(&document, &RenderOptions::default())?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

pub mod chunks;
pub mod context;
pub mod cursor;
pub mod error;
pub mod format;
pub mod fourcc;
pub mod registry;
pub mod render;
pub mod sniff;
pub mod walker;

pub use chunks::{ChunkInput, ChunkRecord, DecodedChunk, Decoder};
pub use context::{ByteOrder, Container, Ds64Table, StreamContext};
pub use cursor::ByteCursor;
pub use error::{ChunkError, Diagnostic, Error, Result};
pub use fallible_streaming_iterator::FallibleStreamingIterator;
pub use format::{FormatChunk, FormatLayout};
pub use fourcc::FourCc;
pub use registry::{Document, Registry};
pub use render::{render, RenderOptions};
pub use sniff::{sniff, Signature};
pub use walker::{ChunkWalker, RawChunk};

/// Pro Tools session chunks that can be large and carry nothing readable.
pub const VENDOR_CHUNKS: [FourCc; 7] = [
    FourCc(*b"minf"),
    FourCc(*b"elm1"),
    FourCc(*b"regn"),
    FourCc(*b"umid"),
    FourCc(*b"elmo"),
    FourCc(*b"DGDA"),
    FourCc(*b"ovwf"),
];

/// Controls how chunks are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Identifiers whose payload is seeked over instead of read. The chunk
    /// is still reported and dispatched, with an empty payload.
    pub skip_payload: BTreeSet<FourCc>,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            skip_payload: [FourCc::DATA, FourCc::JUNK, FourCc::FLLR, FourCc::PAD]
                .into_iter()
                .collect(),
        }
    }
}

impl DecodeOptions {
    /// Also skips the payloads in [`VENDOR_CHUNKS`].
    pub fn ignore_vendor_chunks(mut self) -> Self {
        self.skip_payload.extend(VENDOR_CHUNKS);
        self
    }

    pub fn skip(mut self, identifier: FourCc) -> Self {
        self.skip_payload.insert(identifier);
        self
    }

    /// Reads the payload of `identifier` even if it is skipped by default.
    pub fn keep(mut self, identifier: FourCc) -> Self {
        self.skip_payload.remove(&identifier);
        self
    }
}

/// Decodes a whole stream with the standard registry.
pub fn decode<R: Read + Seek + Debug>(reader: R, options: &DecodeOptions) -> Result<Document> {
    decode_with(reader, options, Registry::shared())
}

/// Decodes a whole stream with a caller-supplied registry.
pub fn decode_with<R: Read + Seek + Debug>(
    reader: R,
    options: &DecodeOptions,
    registry: &Registry,
) -> Result<Document> {
    let mut cursor = ByteCursor::new(reader);
    let mut walker = ChunkWalker::new(&mut cursor, options)?;
    let context = walker.context().clone();
    registry.assemble(&mut walker, &context)
}

/// Decodes an in-memory stream, if its signature is one we handle.
pub fn decode_bytes(bytes: &[u8], options: &DecodeOptions) -> Result<Document> {
    if sniff(bytes).is_none() {
        return Err(Error::Unsupported("not a RIFF-family WAVE stream"));
    }
    decode(Cursor::new(bytes), options)
}

/// Opens and decodes a file, if its signature is one we handle.
pub fn decode_path(path: impl AsRef<Path>, options: &DecodeOptions) -> Result<Document> {
    let mut file = File::open(path.as_ref())?;

    let mut head = Vec::with_capacity(sniff::SIGNATURE_LEN);
    file.by_ref()
        .take(sniff::SIGNATURE_LEN as u64)
        .read_to_end(&mut head)?;
    if sniff(&head).is_none() {
        return Err(Error::Unsupported("not a RIFF-family WAVE stream"));
    }

    file.rewind()?;
    decode(file, options)
}
