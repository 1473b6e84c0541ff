//! VQM block synthesiser (component F): produces the exact byte image of a
//! `VQM `/`VQMu`/`VQMp` subtree from a list of entries to splice into the
//! index buffer. Byte-for-byte grounded in `utils/ddi_utils.py::read_vqm`
//! read the other way: every literal this writer emits is a literal
//! `read_vqm` asserts on the way in.

use crate::cursor::{push_f32_le, push_pstring, push_u32_le, push_u64_le};

/// One synthesised entry. `idx_string` becomes the trailing pstring index;
/// `prefix10` is the opaque per-entry prefix (`unknown1` in the parsed
/// model) carried through verbatim from the donor or a fixed constant for
/// `sta2vqm`.
#[derive(Debug, Clone)]
pub struct VqmEntrySpec {
    pub idx_string: String,
    pub prefix10: [u8; 10],
    pub pitch2: f32,
    pub unknown2: f32,
    pub dynamics: f32,
    pub unknown3: f32,
    pub epr_offsets: Vec<u64>,
    pub snd_identifier: u32,
    pub snd_offset: u64,
}

/// The fixed pitch1 literal the growl container format always uses for
/// synthesised entries (`224.0`), per the reference tool's VQM writer.
pub const SYNTHESIZED_PITCH1: f32 = 224.0;

/// The fixed (sample_rate, channel) trailer every VQMp entry carries:
/// 44100 Hz, 1 channel.
const FS_LITERAL: u32 = 44100;
const CHANNEL_TRAILER: [u8; 2] = [0x01, 0x00];

pub fn encode(entries: &[VqmEntrySpec]) -> Vec<u8> {
    let mut buf = Vec::new();

    buf.extend_from_slice(&[0xFFu8; 8]);
    buf.extend_from_slice(b"VQM ");
    push_u32_le(&mut buf, 0);
    push_u32_le(&mut buf, 1);
    push_u32_le(&mut buf, 0);
    push_u32_le(&mut buf, 1);
    buf.extend_from_slice(&[0xFFu8; 8]);

    buf.extend_from_slice(b"VQMu");
    push_u32_le(&mut buf, 0);
    push_u32_le(&mut buf, 1);
    push_u32_le(&mut buf, 0);

    let count = entries.len() as u32;
    push_u32_le(&mut buf, count);
    push_u32_le(&mut buf, count);

    for entry in entries {
        buf.extend_from_slice(&[0xFFu8; 8]);
        buf.extend_from_slice(b"VQMp");
        push_u32_le(&mut buf, 0);
        push_u32_le(&mut buf, 0);
        push_u32_le(&mut buf, 1);

        buf.extend_from_slice(&entry.prefix10);
        push_f32_le(&mut buf, SYNTHESIZED_PITCH1);
        push_f32_le(&mut buf, entry.pitch2);
        push_f32_le(&mut buf, entry.unknown2);
        push_f32_le(&mut buf, entry.dynamics);
        push_f32_le(&mut buf, entry.unknown3);

        push_u32_le(&mut buf, 0);
        buf.extend_from_slice(&[0xFFu8; 4]);
        push_u32_le(&mut buf, entry.epr_offsets.len() as u32);
        for offset in &entry.epr_offsets {
            push_u64_le(&mut buf, *offset);
        }

        push_u32_le(&mut buf, FS_LITERAL);
        buf.extend_from_slice(&CHANNEL_TRAILER);

        push_u32_le(&mut buf, entry.snd_identifier);
        push_u64_le(&mut buf, entry.snd_offset);

        buf.extend_from_slice(&[0xFFu8; 0x10]);
        push_pstring(&mut buf, &entry.idx_string);
    }

    push_pstring(&mut buf, "GROWL");
    push_pstring(&mut buf, "vqm");

    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::vqm::read_vqm;
    use crate::cursor::Cursor;

    fn sample_entry(idx: &str) -> VqmEntrySpec {
        VqmEntrySpec {
            idx_string: idx.to_string(),
            prefix10: [1, 2, 3, 4, 5, 6, 7, 8, 9, 10],
            pitch2: 1.5,
            unknown2: 2.5,
            dynamics: 3.5,
            unknown3: 4.5,
            epr_offsets: vec![0x1000, 0x2000],
            snd_identifier: 0xAABBCCDD,
            snd_offset: 0x3000,
        }
    }

    #[test]
    fn encodes_the_fixed_header_and_footer_literals() {
        let bytes = encode(&[]);
        assert_eq!(&bytes[0..8], &[0xFFu8; 8]);
        assert_eq!(&bytes[8..12], b"VQM ");
        assert!(bytes.windows(5).any(|w| w == b"GROWL"));
        assert!(bytes.ends_with(b"vqm"));
    }

    #[test]
    fn round_trips_through_the_parser() {
        let entries = vec![sample_entry("0"), sample_entry("1")];
        let bytes = encode(&entries);
        let mut c = Cursor::new(&bytes);
        let parsed = read_vqm(&mut c).unwrap();
        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.entries[0].pitch1, SYNTHESIZED_PITCH1);
        assert_eq!(parsed.entries[0].snd.identifier, 0xAABBCCDD);
        assert_eq!(parsed.entries[0].snd.offset, 0x3000);
        assert_eq!(parsed.entries[0].epr.len(), 2);
        assert_eq!(parsed.entries[0].epr[0].offset, 0x1000);
        assert_eq!(parsed.entries[1].index, 1);
    }
}
