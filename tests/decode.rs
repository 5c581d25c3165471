use std::io::Cursor;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use wave_probe::format::FormatLayout;
use wave_probe::*;

fn chunk(id: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 != 0 && id != b"bext" {
        out.push(0);
    }
    out
}

fn riff(chunks: &[Vec<u8>]) -> Vec<u8> {
    let body = chunks.concat();
    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(&body);
    out
}

fn pcm_fmt(channels: u16, sample_rate: u32, bits: u16) -> Vec<u8> {
    let block_align = channels * bits / 8;
    let mut out = Vec::new();
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out
}

fn info_list(tags: &[(&[u8; 4], &str)]) -> Vec<u8> {
    let mut body = b"INFO".to_vec();
    for (tag, text) in tags {
        let mut value = text.as_bytes().to_vec();
        value.push(0);
        body.extend_from_slice(&chunk(tag, &value));
    }
    body
}

#[test]
fn decodes_a_typical_pcm_file() {
    let bytes = riff(&[
        chunk(b"fmt ", &pcm_fmt(2, 48_000, 24)),
        chunk(
            b"LIST",
            &info_list(&[(b"INAM", "Room tone"), (b"ISFT", "Field Recorder")]),
        ),
        chunk(b"data", &[0; 600]),
    ]);

    let document = decode_bytes(&bytes, &DecodeOptions::default()).unwrap();

    assert_eq!(document.container, Container::Riff);
    assert_eq!(document.byte_order, ByteOrder::Forward);
    assert_eq!(
        document.chunk_ids,
        [FourCc::FMT, FourCc::LIST, FourCc(*b"INFO"), FourCc::DATA]
    );
    assert_eq!(document.bitrate, Some(48_000 * 6 * 8));
    assert_eq!(document.bitrate_long.as_deref(), Some("2304.0 kb/s"));

    let fmt = document.format().unwrap();
    assert_eq!(fmt.layout, FormatLayout::Pcm);
    assert_eq!(fmt.encoding(), "WAVE_FORMAT_PCM");
    assert!(fmt.diagnostics.is_empty());

    let Some(DecodedChunk::Data(data)) = document.get("data") else {
        panic!("expected data slot");
    };
    assert_eq!(data.byte_count, 600);
    assert_eq!(data.frame_count, Some(100));

    let Some(DecodedChunk::Info(info)) = document.get("info") else {
        panic!("expected info slot");
    };
    assert_eq!(info.title.as_deref(), Some("Room tone"));
    assert_eq!(info.software.as_deref(), Some("Field Recorder"));
    assert_eq!(document.diagnostics().count(), 0);
}

#[test]
fn rendered_json_leads_with_stream_keys() {
    let bytes = riff(&[chunk(b"fmt ", &pcm_fmt(1, 8_000, 8)), chunk(b"data", &[0; 16])]);
    let document = decode_bytes(&bytes, &DecodeOptions::default()).unwrap();
    let out = render(&document, &RenderOptions::default()).unwrap();

    assert!(out.trim_start().starts_with("{\n  \"master\": \"RIFF\""));
    let value: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["byte_order"], "little");
    assert_eq!(value["fmt"]["mode"], "WAVE_FORMAT_PCM");
    assert_eq!(value["data"]["frame_count"], 16);
    assert_eq!(value["chunk_ids"], serde_json::json!(["fmt ", "data"]));
    assert!(value.get("ds64").is_none());
}

#[test]
fn big_endian_streams_resolve_fields() {
    let mut fmt = Vec::new();
    for v in [1u16, 2] {
        fmt.extend_from_slice(&v.to_be_bytes());
    }
    for v in [44_100u32, 176_400] {
        fmt.extend_from_slice(&v.to_be_bytes());
    }
    for v in [4u16, 16] {
        fmt.extend_from_slice(&v.to_be_bytes());
    }

    let mut bytes = b"RIFX".to_vec();
    bytes.extend_from_slice(&(4 + 8 + 16u32).to_be_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_be_bytes());
    bytes.extend_from_slice(&fmt);

    let document = decode_bytes(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(document.byte_order, ByteOrder::Reversed);
    let fmt = document.format().unwrap();
    assert_eq!(fmt.sample_rate, 44_100);
    assert_eq!(fmt.block_align, 4);
}

#[test]
fn rf64_takes_data_size_from_ds64() {
    let mut bytes = b"RF64".to_vec();
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"ds64");
    bytes.extend_from_slice(&28u32.to_le_bytes());
    for v in [0u64, 8, 2] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&chunk(b"fmt ", &pcm_fmt(2, 8_000, 16)));
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(&[0; 8]);

    let document = decode_bytes(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(document.container, Container::Rf64);
    let ds64 = document.ds64.unwrap();
    assert_eq!(ds64.data_size, 8);
    assert_eq!(ds64.sample_count, 2);

    let Some(DecodedChunk::Data(data)) = document.get("data") else {
        panic!("expected data slot");
    };
    assert_eq!(data.byte_count, 8);
    assert_eq!(data.frame_count, Some(2));
}

#[test]
fn rf64_without_ds64_is_fatal() {
    let mut bytes = b"RF64".to_vec();
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(&chunk(b"fmt ", &pcm_fmt(1, 8_000, 8)));

    let err = decode_bytes(&bytes, &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::MissingDs64 { .. }));
}

#[test]
fn unknown_master_is_fatal_in_the_core() {
    let mut bytes = riff(&[]);
    bytes[..4].copy_from_slice(b"FORM");

    let err = decode(Cursor::new(bytes.clone()), &DecodeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnrecognizedContainer(id) if id == FourCc(*b"FORM")));
    assert!(matches!(
        decode_bytes(&bytes, &DecodeOptions::default()),
        Err(Error::Unsupported(_))
    ));
}

#[test]
fn truncated_header_decodes_to_an_empty_document() {
    let document = decode(Cursor::new(b"RIFF\x04\0\0\0".to_vec()), &DecodeOptions::default()).unwrap();
    assert_eq!(document.master, FourCc::RIFF);
    assert!(document.chunk_ids.is_empty());
    assert!(document.slots.is_empty());
}

#[test]
fn broken_chunks_do_not_abort_the_document() {
    let bytes = riff(&[
        chunk(b"fact", &[1, 2]),
        chunk(b"fmt ", &{
            let mut fmt = pcm_fmt(1, 8_000, 8);
            fmt[0] = 6;
            fmt
        }),
        chunk(b"data", &[0; 4]),
    ]);

    let document = decode_bytes(&bytes, &DecodeOptions::default()).unwrap();
    assert!(matches!(document.get("fact"), Some(DecodedChunk::Generic(_))));
    let fmt = document.format().unwrap();
    assert_eq!(fmt.layout, FormatLayout::Unresolved);
    assert_eq!(document.diagnostics().count(), 2);
    assert!(document.contains("data"));
}

#[test]
fn extensible_format_lists_speakers() {
    let mut fmt = pcm_fmt(2, 48_000, 16);
    fmt[..2].copy_from_slice(&0xFFFEu16.to_le_bytes());
    fmt.extend_from_slice(&22u16.to_le_bytes());
    fmt.extend_from_slice(&16u16.to_le_bytes());
    fmt.extend_from_slice(&0x3u32.to_le_bytes());
    fmt.extend_from_slice(&[
        0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38, 0x9B,
        0x71,
    ]);

    let document = decode_bytes(&riff(&[chunk(b"fmt ", &fmt)]), &DecodeOptions::default()).unwrap();
    let fmt = document.format().unwrap();
    let ext = fmt.layout.extensible().unwrap();
    assert_eq!(ext.speaker_layout, ["SPEAKER_FRONT_LEFT", "SPEAKER_FRONT_RIGHT"]);
    assert_eq!(ext.subformat.format_code, 1);
    assert_eq!(fmt.encoding(), "WAVE_FORMAT_PCM");
    assert!(fmt.diagnostics.is_empty());
}

const RANDOM_IDS: [&[u8; 4]; 6] = [b"fact", b"zzzz", b"bext", b"cue ", b"DISP", b"iXML"];

/// A stream of random chunks, with the identifiers in order.
fn random_chunks(rng: &mut StdRng) -> Vec<Vec<u8>> {
    (0..rng.random_range(1..12))
        .map(|_| {
            let id = RANDOM_IDS[rng.random_range(0..RANDOM_IDS.len())];
            let len = rng.random_range(0..80usize);
            let body: Vec<u8> = (0..len).map(|_| rng.random()).collect();
            chunk(id, &body)
        })
        .collect()
}

#[test]
fn walked_sizes_account_for_every_byte() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0001);
    for _ in 0..64 {
        let bytes = riff(&random_chunks(&mut rng));
        let total = bytes.len() as u64;

        let mut cursor = ByteCursor::new(Cursor::new(bytes));
        let mut walker = ChunkWalker::new(&mut cursor, &DecodeOptions::default()).unwrap();
        let mut consumed = 0;
        while let Some(chunk) = walker.next().unwrap() {
            consumed += chunk.size + 8;
        }
        assert_eq!(consumed, total - 12);
        assert_eq!(cursor.position(), total);
    }
}

#[test]
fn decoded_chunks_do_not_depend_on_their_offset() {
    let mut rng = StdRng::seed_from_u64(0x5EED_0002);
    for _ in 0..64 {
        let chunks = random_chunks(&mut rng);
        let plain = decode_bytes(&riff(&chunks), &DecodeOptions::default()).unwrap();

        let filler_len = rng.random_range(0..200usize);
        let mut shifted_chunks = vec![chunk(b"FLLR", &vec![0xA5; filler_len])];
        shifted_chunks.extend(chunks);
        let mut shifted = decode_bytes(&riff(&shifted_chunks), &DecodeOptions::default()).unwrap();

        assert!(shifted.slots.remove("fllr").is_some());
        assert_eq!(shifted.chunk_ids.remove(0), FourCc::FLLR);
        assert_eq!(shifted, plain);
    }
}
