use bytemuck::{Pod, Zeroable};
use serde::Serialize;
use uuid::Uuid;

use crate::context::ByteOrder;
use crate::error::Diagnostic;
use crate::fourcc::FourCc;

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

/// The PVOC-EX sub-format GUID, in both byte orders it is found written in.
const PVOC_EX_GUIDS: [Uuid; 2] = [
    Uuid::from_u128(0x8312b9c2_2e6e_11d4_a824_de5b96c3ab21),
    Uuid::from_u128(0xc2b91283_6e2e_d411_a824_de5b96c3ab21),
];

const HEADER_LEN: usize = 16;
const EXTENDED_LEN: usize = 18;
const EXTENSIBLE_LEN: usize = 40;
const PVOC_EX_LEN: usize = 80;
const PVOC_BLOCK_LEN: u32 = 32;

const LOCATION_SIZE: &str = "'fmt ' -- AUDIO FORMAT / SIZE";
const LOCATION_PVOC: &str = "'fmt ' -- PVOC-EX SIZE";
const LOCATION_PAYLOAD: &str = "'fmt ' -- PAYLOAD";

/// Speaker position for each channel-mask bit, lowest bit first.
pub const SPEAKER_POSITIONS: [(u32, &str); 18] = [
    (0x1, "SPEAKER_FRONT_LEFT"),
    (0x2, "SPEAKER_FRONT_RIGHT"),
    (0x4, "SPEAKER_FRONT_CENTER"),
    (0x8, "SPEAKER_LOW_FREQUENCY"),
    (0x10, "SPEAKER_BACK_LEFT"),
    (0x20, "SPEAKER_BACK_RIGHT"),
    (0x40, "SPEAKER_FRONT_LEFT_OF_CENTER"),
    (0x80, "SPEAKER_FRONT_RIGHT_OF_CENTER"),
    (0x100, "SPEAKER_BACK_CENTER"),
    (0x200, "SPEAKER_SIDE_LEFT"),
    (0x400, "SPEAKER_SIDE_RIGHT"),
    (0x800, "SPEAKER_TOP_CENTER"),
    (0x1000, "SPEAKER_TOP_FRONT_LEFT"),
    (0x2000, "SPEAKER_TOP_FRONT_CENTER"),
    (0x4000, "SPEAKER_TOP_FRONT_RIGHT"),
    (0x8000, "SPEAKER_TOP_BACK_LEFT"),
    (0x10000, "SPEAKER_TOP_BACK_CENTER"),
    (0x20000, "SPEAKER_TOP_BACK_RIGHT"),
];

/// Expands a channel mask into speaker names. Bits outside the table are ignored.
pub fn speaker_layout(mask: u32) -> Vec<&'static str> {
    SPEAKER_POSITIONS
        .iter()
        .filter(|(bit, _)| mask & bit != 0)
        .map(|&(_, name)| name)
        .collect()
}

/// Codec name for a `WAVE_FORMAT_*` code.
pub fn codec_name(code: u16) -> &'static str {
    match code {
        0x0000 => "WAVE_FORMAT_UNKNOWN",
        0x0001 => "WAVE_FORMAT_PCM",
        0x0002 => "WAVE_FORMAT_ADPCM",
        0x0003 => "WAVE_FORMAT_IEEE_FLOAT",
        0x0005 => "WAVE_FORMAT_IBM_CVSD",
        0x0006 => "WAVE_FORMAT_ALAW",
        0x0007 => "WAVE_FORMAT_MULAW",
        0x0010 => "WAVE_FORMAT_OKI_ADPCM",
        0x0011 => "WAVE_FORMAT_DVI_ADPCM",
        0x0022 => "WAVE_FORMAT_DSPGROUP_TRUESPEECH",
        0x0031 => "WAVE_FORMAT_GSM610",
        0x0040 => "WAVE_FORMAT_G721_ADPCM",
        0x0050 => "WAVE_FORMAT_MPEG",
        0x0055 => "WAVE_FORMAT_MPEGLAYER3",
        0x0092 => "WAVE_FORMAT_DOLBY_AC3_SPDIF",
        0x00FF => "WAVE_FORMAT_RAW_AAC1",
        0x0161 => "WAVE_FORMAT_WMAUDIO2",
        0x0162 => "WAVE_FORMAT_WMAUDIO3",
        0x0163 => "WAVE_FORMAT_WMAUDIO_LOSSLESS",
        0x1610 => "WAVE_FORMAT_MPEG_HEAAC",
        0xFFFE => "WAVE_FORMAT_EXTENSIBLE",
        0xFFFF => "WAVE_FORMAT_DEVELOPMENT",
        _ => "Unknown",
    }
}

/// The 16 bytes every `fmt ` chunk starts with.
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct FormatHeader {
    audio_format: u16,
    channel_count: u16,
    sample_rate: u32,
    byte_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubFormat {
    /// First two GUID bytes, always read little-endian.
    pub format_code: u16,
    pub guid: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extensible {
    pub extension_size: u16,
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    pub speaker_layout: Vec<&'static str>,
    pub subformat: SubFormat,
}

/// Phase-vocoder analysis parameters carried by PVOC-EX files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PvocEx {
    pub version: u32,
    pub pvoc_size: u32,
    pub word_format: u16,
    pub analysis_format: u16,
    pub source_format: u16,
    pub window_type: u16,
    pub bin_count: u32,
    pub window_length: u32,
    pub overlap: u32,
    pub frame_align: u32,
    pub analysis_rate: f32,
    pub window_param: f32,
}

/// Which of the mutually exclusive `fmt ` layouts a chunk resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode")]
pub enum FormatLayout {
    /// Non-PCM format code without the mandatory extension field.
    #[serde(rename = "UNRESOLVED")]
    Unresolved,
    #[serde(rename = "WAVE_FORMAT_PCM")]
    Pcm,
    #[serde(rename = "WAVE_FORMAT_EXTENDED")]
    Extended { extension_size: u16 },
    #[serde(rename = "WAVE_FORMAT_EXTENSIBLE")]
    Extensible(Extensible),
    #[serde(rename = "WAVE_FORMAT_PVOC_EX")]
    PvocEx {
        #[serde(flatten)]
        extensible: Extensible,
        pvoc_ex: PvocEx,
    },
}

impl FormatLayout {
    pub fn extensible(&self) -> Option<&Extensible> {
        match self {
            FormatLayout::Extensible(ext) | FormatLayout::PvocEx { extensible: ext, .. } => {
                Some(ext)
            }
            _ => None,
        }
    }
}

/// A decoded `fmt ` chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatChunk {
    pub identifier: FourCc,
    pub size: u64,
    pub audio_format: u16,
    pub channel_count: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    #[serde(flatten)]
    pub layout: FormatLayout,
    pub diagnostics: Vec<Diagnostic>,
}

impl FormatChunk {
    /// Codec name, taken from the sub-format code for extensible layouts.
    pub fn encoding(&self) -> &'static str {
        match &self.layout {
            FormatLayout::PvocEx { .. } => "WAVE_FORMAT_PVOC_EX",
            FormatLayout::Extensible(ext) => codec_name(ext.subformat.format_code),
            _ => codec_name(self.audio_format),
        }
    }

    pub fn bitrate(&self) -> u64 {
        u64::from(self.byte_rate) * 8
    }

    pub fn bitrate_long(&self) -> String {
        format!("{:.1} kb/s", self.bitrate() as f64 / 1000.0)
    }
}

/// Fixed-size view over the payload, zero-filled past its end.
struct Padded<'a> {
    payload: &'a [u8],
    order: ByteOrder,
    needed: usize,
}

impl<'a> Padded<'a> {
    fn new(payload: &'a [u8], order: ByteOrder) -> Self {
        Self {
            payload,
            order,
            needed: HEADER_LEN,
        }
    }

    fn bytes<const N: usize>(&mut self, offset: usize) -> [u8; N] {
        self.needed = self.needed.max(offset + N);
        let mut out = [0u8; N];
        if let Some(avail) = self.payload.get(offset..) {
            let n = avail.len().min(N);
            out[..n].copy_from_slice(&avail[..n]);
        }
        out
    }

    fn u16(&mut self, offset: usize) -> u16 {
        let bytes = self.bytes::<2>(offset);
        self.order.u16(bytes)
    }

    fn u32(&mut self, offset: usize) -> u32 {
        let bytes = self.bytes::<4>(offset);
        self.order.u32(bytes)
    }

    fn f32(&mut self, offset: usize) -> f32 {
        let bytes = self.bytes::<4>(offset);
        self.order.f32(bytes)
    }
}

/// Decodes a `fmt ` payload. Never fails: structural problems are recorded as
/// diagnostics and missing bytes read as zero.
pub fn resolve(order: ByteOrder, identifier: FourCc, size: u64, payload: &[u8]) -> FormatChunk {
    let mut view = Padded::new(payload, order);
    let mut diagnostics = Vec::new();

    let raw: FormatHeader = bytemuck::pod_read_unaligned(&view.bytes::<HEADER_LEN>(0));
    let audio_format = order.fix_u16(raw.audio_format);

    let layout = if audio_format != WAVE_FORMAT_PCM && size == HEADER_LEN as u64 {
        diagnostics.push(Diagnostic::new(
            LOCATION_SIZE,
            "NON-PCM FORMATS MUST CONTAIN AN EXTENSION FIELD.",
        ));
        FormatLayout::Unresolved
    } else if audio_format == WAVE_FORMAT_EXTENSIBLE {
        let extensible = read_extensible(&mut view);

        if PVOC_EX_GUIDS.contains(&extensible.subformat.guid) {
            if size == PVOC_EX_LEN as u64 {
                let pvoc_ex = read_pvoc_ex(&mut view);
                if pvoc_ex.pvoc_size != PVOC_BLOCK_LEN {
                    diagnostics.push(Diagnostic::new(
                        LOCATION_PVOC,
                        format!(
                            "PVOC-EX DATA BLOCK MUST BE SIZE {PVOC_BLOCK_LEN} NOT {}.",
                            pvoc_ex.pvoc_size
                        ),
                    ));
                }
                FormatLayout::PvocEx {
                    extensible,
                    pvoc_ex,
                }
            } else {
                diagnostics.push(Diagnostic::new(
                    LOCATION_PVOC,
                    format!("PVOC-EX FORMAT MUST BE SIZE {PVOC_EX_LEN} NOT {size}."),
                ));
                FormatLayout::Extensible(extensible)
            }
        } else {
            if size != EXTENSIBLE_LEN as u64 {
                diagnostics.push(Diagnostic::new(
                    LOCATION_SIZE,
                    format!(
                        "AUDIO FORMAT (EXTENSIBLE / 65534 / 0xFFFE) MUST BE SIZE {EXTENSIBLE_LEN} NOT {size}."
                    ),
                ));
            }
            FormatLayout::Extensible(extensible)
        }
    } else if size == EXTENDED_LEN as u64 {
        FormatLayout::Extended {
            extension_size: view.u16(HEADER_LEN),
        }
    } else {
        if size != HEADER_LEN as u64 {
            diagnostics.push(Diagnostic::new(
                LOCATION_SIZE,
                format!("AUDIO FORMAT (PCM / 1 / 0x0001) MUST BE SIZE {HEADER_LEN} NOT {size}."),
            ));
        }
        FormatLayout::Pcm
    };

    if payload.len() < view.needed {
        diagnostics.push(Diagnostic::new(
            LOCATION_PAYLOAD,
            format!(
                "PAYLOAD TRUNCATED: NEED {} BYTES, HAVE {}.",
                view.needed,
                payload.len()
            ),
        ));
    }

    FormatChunk {
        identifier,
        size,
        audio_format,
        channel_count: order.fix_u16(raw.channel_count),
        sample_rate: order.fix_u32(raw.sample_rate),
        byte_rate: order.fix_u32(raw.byte_rate),
        block_align: order.fix_u16(raw.block_align),
        bits_per_sample: order.fix_u16(raw.bits_per_sample),
        layout,
        diagnostics,
    }
}

fn read_extensible(view: &mut Padded<'_>) -> Extensible {
    let extension_size = view.u16(16);
    let valid_bits_per_sample = view.u16(18);
    let channel_mask = view.u32(20);
    let guid_bytes = view.bytes::<16>(24);

    Extensible {
        extension_size,
        valid_bits_per_sample,
        channel_mask,
        speaker_layout: speaker_layout(channel_mask),
        subformat: SubFormat {
            format_code: u16::from_le_bytes([guid_bytes[0], guid_bytes[1]]),
            guid: Uuid::from_bytes(guid_bytes),
        },
    }
}

fn read_pvoc_ex(view: &mut Padded<'_>) -> PvocEx {
    PvocEx {
        version: view.u32(40),
        pvoc_size: view.u32(44),
        word_format: view.u16(48),
        analysis_format: view.u16(50),
        source_format: view.u16(52),
        window_type: view.u16(54),
        bin_count: view.u32(56),
        window_length: view.u32(60),
        overlap: view.u32(64),
        frame_align: view.u32(68),
        analysis_rate: view.f32(72),
        window_param: view.f32(76),
    }
}
