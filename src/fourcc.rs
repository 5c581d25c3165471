use std::fmt;

use serde::{Serialize, Serializer};

/// A four-character code naming a chunk or container.
///
/// The bytes are kept raw: identifiers found in the wild are not always valid
/// text, so they are only ever rendered as Latin-1 (one byte per character).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub const RIFF: FourCc = FourCc(*b"RIFF");
    pub const RIFX: FourCc = FourCc(*b"RIFX");
    pub const FFIR: FourCc = FourCc(*b"FFIR");
    pub const RF64: FourCc = FourCc(*b"RF64");
    pub const BW64: FourCc = FourCc(*b"BW64");
    pub const WAVE: FourCc = FourCc(*b"WAVE");

    pub const DS64: FourCc = FourCc(*b"ds64");
    pub const FMT: FourCc = FourCc(*b"fmt ");
    pub const DATA: FourCc = FourCc(*b"data");
    pub const FACT: FourCc = FourCc(*b"fact");
    pub const LIST: FourCc = FourCc(*b"LIST");
    pub const ADTL: FourCc = FourCc(*b"adtl");
    pub const DISP: FourCc = FourCc(*b"DISP");
    pub const BEXT: FourCc = FourCc(*b"bext");
    pub const AFSP: FourCc = FourCc(*b"afsp");
    pub const JUNK: FourCc = FourCc(*b"JUNK");
    pub const FLLR: FourCc = FourCc(*b"FLLR");
    pub const PAD: FourCc = FourCc(*b"PAD ");
    pub const NULL: FourCc = FourCc([0; 4]);

    /// Builds a code from the first four bytes of `bytes`, padding with spaces.
    pub fn from_prefix(bytes: &[u8]) -> Self {
        let mut code = *b"    ";
        for (dst, src) in code.iter_mut().zip(bytes) {
            *dst = *src;
        }
        FourCc(code)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Latin-1 rendering of the code, untrimmed.
    pub fn to_latin1(&self) -> String {
        self.0.iter().map(|&b| b as char).collect()
    }

    /// The name used to pick a decoder and a document slot.
    ///
    /// Lowercased and trimmed, so `"cue "` becomes `"cue"` and `"INFO"` becomes
    /// `"info"`. A leading underscore is dropped (`"_PMX"` → `"pmx"`).
    pub fn normalized(&self) -> String {
        let lowered = self.to_latin1().to_lowercase();
        let trimmed = lowered.trim();
        trimmed.strip_prefix('_').unwrap_or(trimmed).to_string()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_latin1())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_latin1())
    }
}

impl From<[u8; 4]> for FourCc {
    fn from(bytes: [u8; 4]) -> Self {
        FourCc(bytes)
    }
}

impl Serialize for FourCc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_latin1())
    }
}
