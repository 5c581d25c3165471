use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::OnceLock;

use fallible_streaming_iterator::FallibleStreamingIterator;
use serde::Serialize;

use crate::chunks::{
    basic, broadcast, info, sampler, xml, ChunkInput, ChunkRecord, DecodedChunk, Decoder,
    GenericChunk,
};
use crate::context::{ByteOrder, Container, Ds64Table, StreamContext};
use crate::error::{Diagnostic, Error, Result};
use crate::format::FormatChunk;
use crate::fourcc::FourCc;
use crate::walker::RawChunk;

/// Everything decoded from one stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub master: FourCc,
    pub container: Container,
    pub form_type: FourCc,
    pub byte_order: ByteOrder,
    /// Only present in 64-bit mode; a stray `ds64` chunk elsewhere lands in
    /// its own slot under the same key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ds64: Option<Ds64Table>,
    /// From the most recent `fmt `.
    pub bitrate: Option<u64>,
    pub bitrate_long: Option<String>,
    /// Every identifier in stream order, including the sub-type of each
    /// unwrapped `LIST`/`adtl`.
    pub chunk_ids: Vec<FourCc>,
    /// Decoded chunks keyed by slot name (`fmt`, `fmt2`, `data`, `info`, ...).
    #[serde(flatten)]
    pub slots: BTreeMap<String, DecodedChunk>,
}

impl Document {
    pub fn new(context: &StreamContext) -> Self {
        Self {
            master: context.master,
            container: context.container,
            form_type: context.form_type,
            byte_order: context.byte_order,
            ds64: context.ds64,
            bitrate: None,
            bitrate_long: None,
            chunk_ids: Vec::new(),
            slots: BTreeMap::new(),
        }
    }

    pub fn get(&self, slot: &str) -> Option<&DecodedChunk> {
        self.slots.get(slot)
    }

    pub fn contains(&self, slot: &str) -> bool {
        self.slots.contains_key(slot)
    }

    /// The first `fmt ` chunk, if one was seen.
    pub fn format(&self) -> Option<&FormatChunk> {
        match self.slots.get("fmt") {
            Some(DecodedChunk::Format(fmt)) => Some(fmt),
            _ => None,
        }
    }

    /// All diagnostics with the slot they belong to.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&str, &Diagnostic)> {
        self.slots
            .iter()
            .flat_map(|(slot, chunk)| chunk.diagnostics().iter().map(move |d| (slot.as_str(), d)))
    }
}

/// Maps normalized chunk names to decoders.
#[derive(Clone)]
pub struct Registry {
    decoders: HashMap<String, Decoder>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: BTreeSet<&str> = self.decoders.keys().map(String::as_str).collect();
        f.debug_struct("Registry").field("decoders", &names).finish()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry with every built-in decoder.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        let table: [(&str, Decoder); 19] = [
            ("fmt", basic::decode_format),
            ("data", basic::decode_data),
            ("fact", basic::decode_fact),
            ("md5", basic::decode_md5),
            ("disp", basic::decode_display),
            ("info", info::decode_info),
            ("adtl", info::decode_adtl),
            ("inst", sampler::decode_inst),
            ("smpl", sampler::decode_smpl),
            ("acid", sampler::decode_acid),
            ("strc", sampler::decode_strc),
            ("cue", sampler::decode_cue),
            ("bext", broadcast::decode_bext),
            ("cart", broadcast::decode_cart),
            ("chna", broadcast::decode_chna),
            ("levl", broadcast::decode_levl),
            ("pmx", xml::decode_xml),
            ("axml", xml::decode_xml),
            ("ixml", xml::decode_xml),
        ];
        for (name, decoder) in table {
            registry.register(name, decoder);
        }
        registry
    }

    /// The standard registry, built on first use.
    pub fn shared() -> &'static Registry {
        static STANDARD: OnceLock<Registry> = OnceLock::new();
        STANDARD.get_or_init(Registry::standard)
    }

    /// Adds or replaces the decoder for `name`, which is matched against
    /// normalized identifiers (lowercase, trimmed, no leading `_`).
    pub fn register(&mut self, name: impl Into<String>, decoder: Decoder) -> Option<Decoder> {
        self.decoders.insert(name.into(), decoder)
    }

    pub fn decoder(&self, name: &str) -> Option<Decoder> {
        self.decoders.get(name).copied()
    }

    /// Drains `chunks` into a [`Document`].
    ///
    /// Only errors from the chunk source are returned; decoder failures end
    /// up as diagnostics on a generic record in the affected slot.
    pub fn assemble<I>(&self, chunks: &mut I, context: &StreamContext) -> Result<Document>
    where
        I: FallibleStreamingIterator<Item = RawChunk, Error = Error>,
    {
        let mut assembly = Assembly::new(context);
        while let Some(chunk) = chunks.next()? {
            assembly.doc.chunk_ids.push(chunk.identifier);

            let wrapped = chunk.identifier == FourCc::LIST || chunk.identifier == FourCc::ADTL;
            if wrapped && chunk.payload.len() >= 4 {
                let sub_type = FourCc::from_prefix(&chunk.payload);
                assembly.doc.chunk_ids.push(sub_type);
                self.dispatch(
                    &mut assembly,
                    ChunkInput {
                        identifier: sub_type,
                        size: chunk.size.saturating_sub(12),
                        payload: &chunk.payload[4..],
                        byte_order: context.byte_order,
                    },
                );
            } else {
                self.dispatch(
                    &mut assembly,
                    ChunkInput {
                        identifier: chunk.identifier,
                        size: chunk.size,
                        payload: &chunk.payload,
                        byte_order: context.byte_order,
                    },
                );
            }
        }
        Ok(assembly.doc)
    }

    fn dispatch(&self, assembly: &mut Assembly, input: ChunkInput<'_>) {
        let name = input.identifier.normalized();
        let count = assembly.counts.entry(name.clone()).or_insert(0);
        *count += 1;
        let slot = if *count == 1 {
            name.clone()
        } else {
            format!("{name}{count}")
        };

        let record = match self.decoder(&name) {
            Some(decoder) => decoder(&input).unwrap_or_else(|err| {
                tracing::warn!(%slot, identifier = %input.identifier, %err, "chunk decoder failed");
                GenericChunk::from_error(&input, &err).into()
            }),
            None => GenericChunk::new(&input).into(),
        };
        tracing::debug!(%slot, identifier = %input.identifier, size = input.size, "dispatched");

        match &record {
            DecodedChunk::Format(fmt) => {
                assembly.doc.bitrate = Some(fmt.bitrate());
                assembly.doc.bitrate_long = Some(fmt.bitrate_long());
                assembly.formats.push(slot.clone());
            }
            DecodedChunk::Data(_) => assembly.datas.push(slot.clone()),
            _ => {}
        }
        let pairs_changed = matches!(record, DecodedChunk::Format(_) | DecodedChunk::Data(_));

        assembly.doc.slots.insert(slot, record);
        if pairs_changed {
            assembly.update_frame_counts();
        }
    }
}

/// Working state while a document is being assembled.
struct Assembly {
    doc: Document,
    counts: HashMap<String, u32>,
    /// Slot names of `fmt ` and `data` records, in arrival order.
    formats: Vec<String>,
    datas: Vec<String>,
    warned: BTreeSet<String>,
}

impl Assembly {
    fn new(context: &StreamContext) -> Self {
        Self {
            doc: Document::new(context),
            counts: HashMap::new(),
            formats: Vec::new(),
            datas: Vec::new(),
            warned: BTreeSet::new(),
        }
    }

    /// Pairs the k-th `data` with the k-th `fmt ` (or the last one when there
    /// are fewer) and recomputes its frame count.
    fn update_frame_counts(&mut self) {
        for (k, data_slot) in self.datas.iter().enumerate() {
            let Some(fmt_slot) = self.formats.get(k).or(self.formats.last()) else {
                continue;
            };
            let block_align = match self.doc.slots.get(fmt_slot) {
                Some(DecodedChunk::Format(fmt)) => fmt.block_align,
                _ => continue,
            };
            let Some(DecodedChunk::Data(data)) = self.doc.slots.get_mut(data_slot) else {
                continue;
            };

            if block_align == 0 {
                data.frame_count = None;
                if self.warned.insert(data_slot.clone()) {
                    tracing::warn!(data = %data_slot, fmt = %fmt_slot, "block align is zero, frame count unknown");
                }
            } else {
                data.frame_count = Some(data.byte_count / u64::from(block_align));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChunkError;

    fn context() -> StreamContext {
        StreamContext {
            master: FourCc::RIFF,
            container: Container::Riff,
            byte_order: ByteOrder::Forward,
            form_type: FourCc::WAVE,
            declared_size: 0,
            ds64: None,
        }
    }

    fn raw(id: &[u8; 4], size: u64, payload: &[u8]) -> RawChunk {
        RawChunk {
            identifier: FourCc(*id),
            size,
            payload: payload.to_vec(),
            offset: 0,
        }
    }

    fn fmt_payload(block_align: u16) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&44_100u32.to_le_bytes());
        out.extend_from_slice(&(44_100 * u32::from(block_align)).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out
    }

    fn assemble_with(registry: &Registry, chunks: Vec<RawChunk>) -> Document {
        let mut source = fallible_streaming_iterator::convert(chunks.iter().map(Ok::<_, Error>));
        registry.assemble(&mut source, &context()).unwrap()
    }

    fn assemble(chunks: Vec<RawChunk>) -> Document {
        assemble_with(&Registry::standard(), chunks)
    }

    fn frame_count(doc: &Document, slot: &str) -> Option<u64> {
        match doc.get(slot) {
            Some(DecodedChunk::Data(data)) => data.frame_count,
            other => panic!("expected data in {slot}, got {other:?}"),
        }
    }

    #[test]
    fn repeated_chunks_get_numbered_slots() {
        let doc = assemble(vec![
            raw(b"fmt ", 16, &fmt_payload(4)),
            raw(b"data", 4_000, &[]),
            raw(b"fmt ", 16, &fmt_payload(2)),
            raw(b"data", 4_000, &[]),
        ]);

        assert!(doc.contains("fmt") && doc.contains("fmt2"));
        assert!(doc.contains("data") && doc.contains("data2"));
        assert_eq!(frame_count(&doc, "data"), Some(1_000));
        assert_eq!(frame_count(&doc, "data2"), Some(2_000));
        assert_eq!(doc.bitrate, Some(44_100 * 2 * 8));
        assert_eq!(doc.chunk_ids.len(), 4);
    }

    #[test]
    fn data_before_fmt_is_filled_in_later() {
        let doc = assemble(vec![raw(b"data", 600, &[]), raw(b"fmt ", 16, &fmt_payload(6))]);
        assert_eq!(frame_count(&doc, "data"), Some(100));
    }

    #[test]
    fn extra_data_pairs_with_last_fmt() {
        let doc = assemble(vec![
            raw(b"fmt ", 16, &fmt_payload(4)),
            raw(b"data", 40, &[]),
            raw(b"data", 80, &[]),
        ]);
        assert_eq!(frame_count(&doc, "data2"), Some(20));
    }

    #[test]
    fn zero_block_align_leaves_frame_count_unset() {
        let doc = assemble(vec![raw(b"fmt ", 16, &fmt_payload(0)), raw(b"data", 40, &[])]);
        assert_eq!(frame_count(&doc, "data"), None);
    }

    #[test]
    fn list_is_unwrapped_one_level() {
        let mut payload = b"INFO".to_vec();
        payload.extend_from_slice(b"INAM\x05\x00\x00\x00Song\0\0");
        let size = payload.len() as u64;
        let doc = assemble(vec![raw(b"LIST", size, &payload)]);

        assert_eq!(doc.chunk_ids, [FourCc::LIST, FourCc(*b"INFO")]);
        assert!(!doc.contains("list"));
        let Some(DecodedChunk::Info(info)) = doc.get("info") else {
            panic!("expected info slot");
        };
        assert_eq!(info.title.as_deref(), Some("Song"));
        assert_eq!(info.size, size - 12);
    }

    #[test]
    fn list_adtl_reaches_the_adtl_decoder() {
        let mut payload = b"adtl".to_vec();
        payload.extend_from_slice(b"labl\x08\x00\x00\x00\x01\x00\x00\x00Hi\0\0");
        let doc = assemble(vec![raw(b"LIST", payload.len() as u64, &payload)]);

        assert_eq!(doc.chunk_ids, [FourCc::LIST, FourCc::ADTL]);
        assert!(matches!(doc.get("adtl"), Some(DecodedChunk::AssociatedData(_))));
    }

    #[test]
    fn empty_list_is_generic() {
        let doc = assemble(vec![raw(b"LIST", 2, &[0, 0])]);
        assert!(matches!(doc.get("list"), Some(DecodedChunk::Generic(_))));
        assert_eq!(doc.chunk_ids, [FourCc::LIST]);
    }

    #[test]
    fn identifiers_are_normalized() {
        let doc = assemble(vec![
            raw(b"_PMX", 4, b"<x/>"),
            raw(b"cue ", 4, &[0; 4]),
            raw(b"MD5 ", 16, &[0; 16]),
            raw(b"odd ", 2, b"hi"),
        ]);

        assert!(matches!(doc.get("pmx"), Some(DecodedChunk::Xml(_))));
        assert!(matches!(doc.get("cue"), Some(DecodedChunk::Cue(_))));
        assert!(matches!(doc.get("md5"), Some(DecodedChunk::Md5(_))));
        let Some(DecodedChunk::Generic(generic)) = doc.get("odd") else {
            panic!("expected generic slot");
        };
        assert_eq!(generic.text, "hi");
        assert!(generic.diagnostics.is_empty());
    }

    #[test]
    fn decoder_failure_becomes_generic_with_diagnostic() {
        let doc = assemble(vec![raw(b"fact", 2, &[1, 2])]);

        let Some(DecodedChunk::Generic(generic)) = doc.get("fact") else {
            panic!("expected generic slot");
        };
        assert_eq!(generic.diagnostics.len(), 1);
        assert_eq!(doc.diagnostics().count(), 1);
    }

    #[test]
    fn custom_decoders_can_be_registered() {
        fn always_fails(_: &ChunkInput<'_>) -> std::result::Result<DecodedChunk, ChunkError> {
            Err(ChunkError::Malformed("nope"))
        }

        let mut registry = Registry::standard();
        assert!(registry.register("fact", always_fails).is_some());
        registry.register("zzzz", basic::decode_fact);

        let doc = assemble_with(
            &registry,
            vec![raw(b"fact", 4, &[1, 0, 0, 0]), raw(b"ZZZZ", 4, &[2, 0, 0, 0])],
        );
        assert!(matches!(doc.get("fact"), Some(DecodedChunk::Generic(_))));
        assert!(matches!(doc.get("zzzz"), Some(DecodedChunk::Fact(f)) if f.samples == 2));
    }

    #[test]
    fn stray_ds64_chunk_serializes_once() {
        let doc = assemble(vec![raw(b"ds64", 4, &[0; 4])]);
        assert!(doc.ds64.is_none());
        assert!(doc.contains("ds64"));

        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json.matches("\"ds64\"").count(), 1);
    }

    #[test]
    fn source_errors_propagate() {
        let fmt = raw(b"fmt ", 16, &fmt_payload(4));
        let items: Vec<std::result::Result<&RawChunk, Error>> =
            vec![Ok(&fmt), Err(Error::Unsupported("boom"))];
        let mut source = fallible_streaming_iterator::convert(items.into_iter());
        assert!(Registry::standard().assemble(&mut source, &context()).is_err());
    }
}
