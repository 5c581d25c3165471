use bytemuck::{Pod, Zeroable};
use serde::Serialize;

use super::{hex, impl_record, latin1_text, ChunkInput, DecodedChunk};
use crate::error::ChunkError;
use crate::fourcc::FourCc;

/// Where the free-form coding history starts in a `bext` payload.
pub const CODING_HISTORY_OFFSET: usize = 602;

/// `bext`: EBU Tech 3285 broadcast extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BroadcastChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub description: String,
    pub originator: String,
    pub originator_reference: String,
    pub origin_date: String,
    pub origin_time: String,
    pub time_reference_low: u32,
    pub time_reference_high: u32,
    /// Sample count since midnight, both halves joined.
    pub time_reference: u64,
    pub version: u16,
    /// Hex; 32 bytes for a basic UMID, 64 for an extended one, empty when unset.
    pub smpte_umid: String,
    pub loudness_value: i16,
    pub loudness_range: i16,
    pub max_true_peak_level: i16,
    pub max_momentary_loudness: i16,
    pub max_short_term_loudness: i16,
    pub coding_history: String,
}

impl_record!(BroadcastChunk);

fn umid_hex(umid: &[u8; 64]) -> String {
    if umid.iter().all(|&b| b == 0) {
        String::new()
    } else if umid[32..].iter().all(|&b| b == 0) {
        hex(&umid[..32])
    } else {
        hex(umid)
    }
}

pub fn decode_bext(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.le_reader();
    let description = r.text(256)?;
    let originator = r.text(32)?;
    let originator_reference = r.text(32)?;
    let origin_date = r.text(10)?;
    let origin_time = r.text(8)?;
    let time_reference_low = r.u32()?;
    let time_reference_high = r.u32()?;
    let version = r.u16()?;
    let umid = r.read_exact::<64>()?;

    Ok(BroadcastChunk {
        identifier: input.identifier,
        size: input.size,
        description,
        originator,
        originator_reference,
        origin_date,
        origin_time,
        time_reference_low,
        time_reference_high,
        time_reference: u64::from(time_reference_low) | (u64::from(time_reference_high) << 32),
        version,
        smpte_umid: umid_hex(&umid),
        loudness_value: r.i16()?,
        loudness_range: r.i16()?,
        max_true_peak_level: r.i16()?,
        max_momentary_loudness: r.i16()?,
        max_short_term_loudness: r.i16()?,
        coding_history: input
            .payload
            .get(CODING_HISTORY_OFFSET..)
            .map(latin1_text)
            .unwrap_or_default(),
    }
    .into())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostTimer {
    pub usage_id: String,
    pub value: u32,
}

/// `cart`: AES46 radio traffic data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub version: String,
    pub title: String,
    pub artist: String,
    pub cut_id: String,
    pub client_id: String,
    pub category: String,
    pub classification: String,
    pub out_cue: String,
    pub start_date: String,
    pub start_time: String,
    pub end_date: String,
    pub end_time: String,
    pub producer_app_id: String,
    pub producer_app_version: String,
    pub user_defined_text: String,
    pub level_reference: i32,
    pub post_timers: Vec<PostTimer>,
    pub url: String,
    pub tag_text: String,
}

impl_record!(CartChunk);

const CART_TIMER_COUNT: usize = 8;
const CART_RESERVED_LEN: usize = 276;
const CART_URL_LEN: usize = 1024;

pub fn decode_cart(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.reader();
    let version = r.text(4)?;
    let title = r.text(64)?;
    let artist = r.text(64)?;
    let cut_id = r.text(64)?;
    let client_id = r.text(64)?;
    let category = r.text(64)?;
    let classification = r.text(64)?;
    let out_cue = r.text(64)?;
    let start_date = r.text(10)?;
    let start_time = r.text(8)?;
    let end_date = r.text(10)?;
    let end_time = r.text(8)?;
    let producer_app_id = r.text(64)?;
    let producer_app_version = r.text(64)?;
    let user_defined_text = r.text(64)?;
    let level_reference = r.i32()?;

    let mut post_timers = Vec::with_capacity(CART_TIMER_COUNT);
    for _ in 0..CART_TIMER_COUNT {
        post_timers.push(PostTimer {
            usage_id: r.text(4)?,
            value: r.u32()?,
        });
    }

    // everything past the timers may be missing
    r.take_up_to(CART_RESERVED_LEN);
    let url = latin1_text(r.take_up_to(CART_URL_LEN));
    let tag_text = latin1_text(r.rest());

    Ok(CartChunk {
        identifier: input.identifier,
        size: input.size,
        version,
        title,
        artist,
        cut_id,
        client_id,
        category,
        classification,
        out_cue,
        start_date,
        start_time,
        end_date,
        end_time,
        producer_app_id,
        producer_app_version,
        user_defined_text,
        level_reference,
        post_timers,
        url,
        tag_text,
    }
    .into())
}

/// One `chna` track-to-ADM mapping, as stored.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct AudioIdRaw {
    track_index: u16,
    uid: [u8; 12],
    track_reference: [u8; 14],
    pack_reference: [u8; 11],
    pad: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioId {
    pub track_index: u16,
    pub uid: String,
    pub track_reference: String,
    pub pack_reference: String,
    pub padded: bool,
}

/// `chna`: ADM channel assignment for BW64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelAssignmentChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub track_count: u16,
    pub uid_count: u16,
    pub track_ids: Vec<AudioId>,
}

impl_record!(ChannelAssignmentChunk);

pub fn decode_chna(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.reader();
    let track_count = r.u16()?;
    let uid_count = r.u16()?;

    let mut track_ids = Vec::with_capacity(usize::from(uid_count));
    for _ in 0..uid_count {
        let raw: AudioIdRaw = r.pod()?;
        track_ids.push(AudioId {
            track_index: input.byte_order.fix_u16(raw.track_index),
            uid: latin1_text(&raw.uid),
            track_reference: latin1_text(&raw.track_reference),
            pack_reference: latin1_text(&raw.pack_reference),
            padded: raw.pad == 0,
        });
    }

    Ok(ChannelAssignmentChunk {
        identifier: input.identifier,
        size: input.size,
        track_count,
        uid_count,
        track_ids,
    }
    .into())
}

/// `levl`: EBU Tech 3285-3 peak envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakEnvelopeChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub version: u32,
    pub format: u32,
    pub points_per_value: u32,
    pub block_size: u32,
    pub channel_count: u32,
    pub frame_count: u32,
    pub position: u32,
    pub offset: u32,
    pub timestamp: String,
    /// Bytes of peak data following the 120-byte header.
    pub peak_envelope_data_len: usize,
}

impl_record!(PeakEnvelopeChunk);

pub fn decode_levl(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.le_reader();
    let version = r.u32()?;
    let format = r.u32()?;
    let points_per_value = r.u32()?;
    let block_size = r.u32()?;
    let channel_count = r.u32()?;
    let frame_count = r.u32()?;
    let position = r.u32()?;
    let offset = r.u32()?;
    let timestamp = latin1_text(r.take_up_to(28));
    r.take_up_to(60);

    Ok(PeakEnvelopeChunk {
        identifier: input.identifier,
        size: input.size,
        version,
        format,
        points_per_value,
        block_size,
        channel_count,
        frame_count,
        position,
        offset,
        timestamp,
        peak_envelope_data_len: r.rest().len(),
    }
    .into())
}
