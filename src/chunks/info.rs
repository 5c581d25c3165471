use std::collections::BTreeMap;

use serde::Serialize;

use super::{impl_record, latin1_text, ChunkInput, DecodedChunk, FieldReader};
use crate::context::ByteOrder;
use crate::error::{ChunkError, Diagnostic};
use crate::fourcc::FourCc;

/// `LIST`/`INFO` text tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InfoChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub archival_location: Option<String>,
    pub artist: Option<String>,
    pub commissioned: Option<String>,
    pub comment: Option<String>,
    pub copyright: Option<String>,
    pub creation_date: Option<String>,
    pub cropped: Option<String>,
    pub dimensions: Option<String>,
    pub dots_per_inch: Option<String>,
    pub engineer: Option<String>,
    pub genre: Option<String>,
    pub keywords: Option<String>,
    pub lightness: Option<String>,
    pub medium: Option<String>,
    pub title: Option<String>,
    pub palette: Option<String>,
    pub product: Option<String>,
    pub album: Option<String>,
    pub subject: Option<String>,
    pub software: Option<String>,
    pub source: Option<String>,
    pub source_form: Option<String>,
    pub technician: Option<String>,
    /// Tags not in the list above, keyed by their four-character code.
    pub other: BTreeMap<String, String>,
}

impl_record!(InfoChunk);

impl InfoChunk {
    fn set(&mut self, tag: FourCc, text: String) {
        let field = match tag.as_bytes() {
            b"IARL" => &mut self.archival_location,
            b"IART" => &mut self.artist,
            b"ICMS" => &mut self.commissioned,
            b"ICMT" => &mut self.comment,
            b"ICOP" => &mut self.copyright,
            b"ICRD" => &mut self.creation_date,
            b"ICRP" => &mut self.cropped,
            b"IDIM" => &mut self.dimensions,
            b"IDPI" => &mut self.dots_per_inch,
            b"IENG" => &mut self.engineer,
            b"IGNR" => &mut self.genre,
            b"IKEY" => &mut self.keywords,
            b"ILGT" => &mut self.lightness,
            b"IMED" => &mut self.medium,
            b"INAM" => &mut self.title,
            b"IPLT" => &mut self.palette,
            b"IPRD" => {
                self.album = Some(text.clone());
                &mut self.product
            }
            b"ISBJ" => &mut self.subject,
            b"ISFT" => &mut self.software,
            b"ISRC" => &mut self.source,
            b"ISRF" => &mut self.source_form,
            b"ITCH" => &mut self.technician,
            _ => {
                self.other.insert(tag.to_latin1(), text);
                return;
            }
        };
        *field = Some(text);
    }
}

/// Reads one `(id, size, body)` sub-chunk, padding odd sizes. `None` once
/// fewer than eight bytes remain.
fn next_subchunk<'a>(r: &mut FieldReader<'a>) -> Option<(FourCc, &'a [u8])> {
    if r.remaining() < 8 {
        return None;
    }
    let id = r.fourcc().ok()?;
    let size = r.u32().ok()? as usize;
    let body = r.take_up_to(size);
    if size % 2 != 0 {
        r.take_up_to(1);
    }
    Some((id, body))
}

pub fn decode_info(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut info = InfoChunk {
        identifier: input.identifier,
        size: input.size,
        ..Default::default()
    };

    let mut r = input.reader();
    while let Some((tag, body)) = next_subchunk(&mut r) {
        info.set(tag, latin1_text(body));
    }

    Ok(info.into())
}

/// Text attached to a cue point (`labl` and `note`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CueText {
    pub cue_point_id: u32,
    pub text: String,
}

/// `ltxt`: a labelled region following a cue point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabeledText {
    pub cue_point_id: u32,
    pub sample_length: u32,
    pub purpose_id: FourCc,
    pub country: u16,
    pub language: u16,
    pub dialect: u16,
    pub code_page: u16,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "sub_chunk_id")]
pub enum AssociatedEntry {
    #[serde(rename = "labl")]
    Label(CueText),
    #[serde(rename = "note")]
    Note(CueText),
    #[serde(rename = "ltxt")]
    LabeledText(LabeledText),
}

/// `LIST`/`adtl`: labels, notes and labelled text for cue points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociatedDataChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub entries: Vec<AssociatedEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl_record!(AssociatedDataChunk, diagnostics);

fn cue_text(body: &[u8], order: ByteOrder) -> Result<CueText, ChunkError> {
    let mut r = FieldReader::new(body, order);
    Ok(CueText {
        cue_point_id: r.u32()?,
        text: latin1_text(r.rest()),
    })
}

fn labeled_text(body: &[u8], order: ByteOrder) -> Result<LabeledText, ChunkError> {
    let mut r = FieldReader::new(body, order);
    Ok(LabeledText {
        cue_point_id: r.u32()?,
        sample_length: r.u32()?,
        purpose_id: r.fourcc()?,
        country: r.u16()?,
        language: r.u16()?,
        dialect: r.u16()?,
        code_page: r.u16()?,
        text: latin1_text(r.rest()),
    })
}

pub fn decode_adtl(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut chunk = AssociatedDataChunk {
        identifier: input.identifier,
        size: input.size,
        entries: Vec::new(),
        diagnostics: Vec::new(),
    };

    let mut r = input.reader();
    while let Some((id, body)) = next_subchunk(&mut r) {
        let entry = match id.as_bytes() {
            b"labl" => cue_text(body, input.byte_order).map(AssociatedEntry::Label),
            b"note" => cue_text(body, input.byte_order).map(AssociatedEntry::Note),
            b"ltxt" => labeled_text(body, input.byte_order).map(AssociatedEntry::LabeledText),
            _ => {
                chunk.diagnostics.push(Diagnostic::new(
                    "'adtl'",
                    format!("UNKNOWN SUB-CHUNK '{id}' SKIPPED."),
                ));
                continue;
            }
        };

        match entry {
            Ok(entry) => chunk.entries.push(entry),
            Err(err) => chunk
                .diagnostics
                .push(Diagnostic::new(format!("'adtl' -- '{id}'"), err.to_string())),
        }
    }

    Ok(chunk.into())
}
