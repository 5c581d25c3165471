use bytemuck::{Pod, Zeroable};
use serde::Serialize;

use super::{impl_record, ChunkInput, DecodedChunk};
use crate::error::{ChunkError, Diagnostic};
use crate::fourcc::FourCc;

/// `inst`: how a sampler should map this sound onto a keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstrumentChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub unshifted_note: u8,
    /// Pitch shift in cents, -50..=50.
    pub fine_tuning: i8,
    /// Gain in dB.
    pub gain: i8,
    pub low_note: u8,
    pub high_note: u8,
    pub low_velocity: u8,
    pub high_velocity: u8,
}

impl_record!(InstrumentChunk);

pub fn decode_inst(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.reader();
    Ok(InstrumentChunk {
        identifier: input.identifier,
        size: input.size,
        unshifted_note: r.u8()?,
        fine_tuning: r.i8()?,
        gain: r.i8()?,
        low_note: r.u8()?,
        high_note: r.u8()?,
        low_velocity: r.u8()?,
        high_velocity: r.u8()?,
    }
    .into())
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct SampleLoopRaw([u32; 6]);

const SAMPLE_LOOP_LEN: usize = std::mem::size_of::<SampleLoopRaw>();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleLoop {
    pub identifier: u32,
    pub loop_type: u32,
    pub start: u32,
    pub end: u32,
    pub fraction: u32,
    pub loop_count: u32,
}

/// `smpl`: sampler playback parameters and loop points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SamplerChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub manufacturer: i32,
    pub product: i32,
    pub sample_period: i32,
    pub unity_note: i32,
    pub pitch_fraction: i32,
    pub smpte_format: i32,
    /// `hh:mm:ss:ff/format`
    pub smpte_offset: String,
    pub sample_loop_count: i32,
    pub sampler_data_size: i32,
    pub sample_loops: Vec<SampleLoop>,
    /// Bytes of vendor data actually present after the loops.
    pub sampler_data_len: usize,
}

impl_record!(SamplerChunk);

fn smpte_offset(offset: i32, format: i32) -> String {
    let [hours, minutes, seconds, frames] = (offset as u32).to_be_bytes();
    format!("{hours:02}:{minutes:02}:{seconds:02}:{frames:02}/{format}")
}

pub fn decode_smpl(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.reader();
    let manufacturer = r.i32()?;
    let product = r.i32()?;
    let sample_period = r.i32()?;
    let unity_note = r.i32()?;
    let pitch_fraction = r.i32()?;
    let smpte_format = r.i32()?;
    let raw_offset = r.i32()?;
    let sample_loop_count = r.i32()?;
    let sampler_data_size = r.i32()?;

    let count = usize::try_from(sample_loop_count)
        .map_err(|_| ChunkError::Malformed("negative sample loop count"))?;
    if count > r.remaining() / SAMPLE_LOOP_LEN {
        return Err(ChunkError::Truncated {
            need: r.position().saturating_add(count.saturating_mul(SAMPLE_LOOP_LEN)),
            have: input.payload.len(),
        });
    }

    let order = input.byte_order;
    let mut sample_loops = Vec::with_capacity(count);
    for _ in 0..count {
        let SampleLoopRaw(words) = r.pod()?;
        let [identifier, loop_type, start, end, fraction, loop_count] =
            words.map(|w| order.fix_u32(w));
        sample_loops.push(SampleLoop {
            identifier,
            loop_type,
            start,
            end,
            fraction,
            loop_count,
        });
    }

    let declared = usize::try_from(sampler_data_size).unwrap_or(0);
    let sampler_data_len = r.take_up_to(declared).len();

    Ok(SamplerChunk {
        identifier: input.identifier,
        size: input.size,
        manufacturer,
        product,
        sample_period,
        unity_note,
        pitch_fraction,
        smpte_format,
        smpte_offset: smpte_offset(raw_offset, smpte_format),
        sample_loop_count,
        sampler_data_size,
        sample_loops,
        sampler_data_len,
    }
    .into())
}

/// `acid`: ACID loop metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcidChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub properties: u32,
    pub is_oneshot: bool,
    pub is_loop: bool,
    pub is_root_note: bool,
    pub is_stretched: bool,
    pub is_disk_based: bool,
    pub is_ram_based: bool,
    pub is_unknown: bool,
    pub root_note: u16,
    pub unknown_one: u16,
    pub unknown_two: f32,
    pub beat_count: u32,
    pub meter_denominator: u16,
    pub meter_numerator: u16,
    pub tempo: f32,
}

impl_record!(AcidChunk);

pub fn decode_acid(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.reader();
    let properties = r.u32()?;
    let flag = |bit: u32| properties & bit != 0;

    Ok(AcidChunk {
        identifier: input.identifier,
        size: input.size,
        properties,
        is_oneshot: flag(0x01),
        is_loop: !flag(0x01),
        is_root_note: flag(0x02),
        is_stretched: flag(0x04),
        is_disk_based: flag(0x08),
        is_ram_based: !flag(0x08),
        is_unknown: flag(0x10),
        root_note: r.u16()?,
        unknown_one: r.u16()?,
        unknown_two: r.f32()?,
        beat_count: r.u32()?,
        meter_denominator: r.u16()?,
        meter_numerator: r.u16()?,
        tempo: r.f32()?,
    }
    .into())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SliceBlock {
    pub data1: u32,
    pub data2: u32,
    pub sample_position: u64,
    pub sample_position2: u64,
    pub data3: u32,
    pub data4: u32,
}

/// `strc`: ACID slice markers. The layout is undocumented; only the slice
/// positions are known to be meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlicesChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub unknown1: u32,
    pub slice_count: u32,
    pub unknown2: u32,
    pub unknown3: u32,
    pub unknown4: u32,
    pub unknown5: u32,
    pub unknown6: u32,
    pub slice_blocks: Vec<SliceBlock>,
    pub diagnostics: Vec<Diagnostic>,
}

impl_record!(SlicesChunk, diagnostics);

const SLICE_BLOCK_LEN: usize = 32;

pub fn decode_strc(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.reader();
    let mut chunk = SlicesChunk {
        identifier: input.identifier,
        size: input.size,
        unknown1: r.u32()?,
        slice_count: r.u32()?,
        unknown2: r.u32()?,
        unknown3: r.u32()?,
        unknown4: r.u32()?,
        unknown5: r.u32()?,
        unknown6: r.u32()?,
        slice_blocks: Vec::new(),
        diagnostics: Vec::new(),
    };

    for i in 0..chunk.slice_count {
        if r.remaining() < SLICE_BLOCK_LEN {
            chunk.diagnostics.push(Diagnostic::new(
                format!("'strc' -- SLICE {i}"),
                "NOT ENOUGH DATA TO UNPACK SLICE -- MISSING OR PADDED SLICE.",
            ));
            break;
        }
        chunk.slice_blocks.push(SliceBlock {
            data1: r.u32()?,
            data2: r.u32()?,
            sample_position: r.u64()?,
            sample_position2: r.u64()?,
            data3: r.u32()?,
            data4: r.u32()?,
        });
    }

    if chunk.slice_blocks.len() != chunk.slice_count as usize {
        chunk.diagnostics.push(Diagnostic::new(
            "'strc' -- SLICE BLOCKS",
            format!(
                "EXPECTED {} SLICES -- GOT {}.",
                chunk.slice_count,
                chunk.slice_blocks.len()
            ),
        ));
    }

    Ok(chunk.into())
}

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct CuePointRaw {
    point_id: u32,
    position: u32,
    chunk_id: [u8; 4],
    chunk_start: u32,
    block_start: u32,
    sample_start: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CuePoint {
    pub point_id: u32,
    pub position: u32,
    /// The chunk the cue refers into, normally `data`.
    pub chunk_id: FourCc,
    pub chunk_start: u32,
    pub block_start: u32,
    pub sample_start: u32,
}

/// `cue `: marker positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CueChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub point_count: u32,
    pub cue_points: Vec<CuePoint>,
}

impl_record!(CueChunk);

pub fn decode_cue(input: &ChunkInput<'_>) -> Result<DecodedChunk, ChunkError> {
    let mut r = input.reader();
    let point_count = r.u32()?;

    let order = input.byte_order;
    let mut cue_points = Vec::new();
    for _ in 0..point_count {
        let raw: CuePointRaw = r.pod()?;
        cue_points.push(CuePoint {
            point_id: order.fix_u32(raw.point_id),
            position: order.fix_u32(raw.position),
            chunk_id: FourCc(raw.chunk_id),
            chunk_start: order.fix_u32(raw.chunk_start),
            block_start: order.fix_u32(raw.block_start),
            sample_start: order.fix_u32(raw.sample_start),
        });
    }

    Ok(CueChunk {
        identifier: input.identifier,
        size: input.size,
        point_count,
        cue_points,
    }
    .into())
}
