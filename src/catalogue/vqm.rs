//! `VQM `/`VQMu`/`VQMp` parsing — the optional growl/breath ("GROWL") stream.
//! Absent entirely on banks that have never had a mix-in applied.

use super::{EprRef, SndRef};
use crate::cursor::Cursor;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct VqmEntry {
    pub index: u32,
    pub unknown1: [u8; 0x0a],
    pub pitch1: f32,
    pub pitch2: f32,
    pub unknown2: f32,
    pub dynamics: f32,
    pub unknown3: f32,
    pub epr: Vec<EprRef>,
    pub fs: u32,
    pub snd: SndRef,
}

#[derive(Debug, Clone, Default)]
pub struct VqmSection {
    pub entries: Vec<VqmEntry>,
}

pub fn read_vqm(c: &mut Cursor) -> Result<VqmSection> {
    c.expect_fill(8, 0xFF, "VQM")?;
    c.expect_magic("VQM ", "VQM")?;
    c.expect_u32(0, "VQM")?;
    c.expect_u32(1, "VQM")?;
    c.expect_u32(0, "VQM")?;
    c.expect_u32(1, "VQM")?;
    c.expect_fill(8, 0xFF, "VQM")?;

    c.expect_magic("VQMu", "VQMu")?;
    c.expect_u32(0, "VQMu")?;
    c.expect_u32(1, "VQMu")?;
    c.expect_u32(0, "VQMu")?;

    let vqmp_num = c.read_u32()?;
    c.expect_u32(vqmp_num, "VQMu")?;

    let mut entries = Vec::with_capacity(vqmp_num as usize);
    for _ in 0..vqmp_num {
        c.expect_fill(8, 0xFF, "VQMp")?;
        c.expect_magic("VQMp", "VQMp")?;
        c.expect_u32(0, "VQMp")?;
        c.expect_u32(0, "VQMp")?;
        c.expect_u32(1, "VQMp")?;
        let unknown1 = c.read_array::<0x0a>()?;
        let pitch1 = c.read_f32()?;
        let pitch2 = c.read_f32()?;
        let unknown2 = c.read_f32()?;
        let dynamics = c.read_f32()?;
        let unknown3 = c.read_f32()?;
        c.expect_u32(0, "VQMp")?;
        c.expect_fill(4, 0xFF, "VQMp")?;
        let epr_num = c.read_u32()?;
        let mut epr = Vec::with_capacity(epr_num as usize);
        for _ in 0..epr_num {
            let site = c.pos() as u64;
            let offset = c.read_u64()?;
            epr.push(EprRef { site, offset });
        }
        let fs = c.read_u32()?;
        c.expect_bytes(&[0x01, 0x00], "VQMp")?;
        let identifier = c.read_u32()?;
        let site = c.pos() as u64;
        let offset = c.read_u64()?;
        let snd = SndRef { site, offset, identifier };
        c.expect_fill(0x10, 0xFF, "VQMp")?;
        let index: u32 = c
            .read_pstring()?
            .parse()
            .map_err(|_| crate::error::DdiError::CorruptInput {
                path: "VQMp index".to_string(),
                reason: "expected a decimal index string".to_string(),
            })?;

        entries.push(VqmEntry {
            index,
            unknown1,
            pitch1,
            pitch2,
            unknown2,
            dynamics,
            unknown3,
            epr,
            fs,
            snd,
        });
    }

    let tag = c.read_pstring()?;
    debug_assert_eq!(tag, "GROWL");
    let tag = c.read_pstring()?;
    debug_assert_eq!(tag, "vqm");

    Ok(VqmSection { entries })
}
