use std::fmt;

use serde::Serialize;

use crate::context::{ByteOrder, Container};
use crate::fourcc::FourCc;

/// Bytes needed to recognize a stream: master id, size, form type.
pub const SIGNATURE_LEN: usize = 12;

/// What the first bytes of a stream claim it to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub base: FourCc,
    pub container: Container,
    pub byte_order: ByteOrder,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let container = match self.container {
            Container::Riff => "RIFF",
            Container::Rifx => "RIFX",
            Container::Ffir => "FFIR",
            Container::Rf64 => "RF64",
            Container::Bw64 => "BW64",
        };
        write!(f, "Type [{}] derived from [{container}]", self.base)
    }
}

/// Matches a RIFF-family master id at offset 0 and `WAVE` at offset 8.
///
/// This only decides whether decoding is worth attempting; the walker
/// re-derives the byte order from the header itself.
pub fn sniff(bytes: &[u8]) -> Option<Signature> {
    if bytes.len() < SIGNATURE_LEN {
        return None;
    }
    let master = FourCc::from_prefix(bytes);
    let form_type = FourCc::from_prefix(&bytes[8..]);
    if form_type != FourCc::WAVE {
        return None;
    }

    let (container, byte_order) = Container::from_master(master).ok()?;
    Some(Signature {
        base: form_type,
        container,
        byte_order,
    })
}
