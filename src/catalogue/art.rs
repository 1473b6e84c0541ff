//! `ART `/`ARTu`/`ARTp` parsing — the articulation (transition) tree.
//!
//! The on-disk format interleaves two kinds of children under one counter
//! (`artu_num`): a nested `ART ` block (another triphoneme level) or a leaf
//! `ARTu` block. Rather than reproducing that as two same-keyed maps the way
//! the Python reference does, it is modeled here as a single ordered
//! `Vec<ArtChild>` tagged sum type, preserving on-disk order and matching
//! each child's concrete shape.

use super::{EprRef, SndRef};
use crate::cursor::Cursor;
use crate::error::{DdiError, Result};

/// A V2 bank stores one flat `u32` array; a V3 bank groups alignment marks
/// into 4-`u32` tuples. Byte length alone distinguishes them at parse time
/// (a V3 block is never exactly 4 bytes of payload for a single mark).
#[derive(Debug, Clone)]
pub enum FrameAlign {
    V2(Vec<u32>),
    V3(Vec<FrameAlignGroup>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAlignGroup {
    pub start: u32,
    pub end: u32,
    pub start2: u32,
    pub end2: u32,
}

#[derive(Debug, Clone)]
pub struct ArticulationParam {
    pub artp_idx: u64,
    pub dev_artp_offset: u64,
    pub unknown1: [u8; 0x0a],
    pub pitch1: f32,
    pub pitch2: f32,
    pub unknown2: f32,
    pub dynamics: f32,
    pub unknown3: f32,
    pub snd_unknown: u32,
    pub epr: Vec<EprRef>,
    pub fs: u32,
    /// Primary `SND ` back-pointer. The on-disk value is biased `+0x12`
    /// relative to the chunk start (it points past the stationary header
    /// into FRM2/SND payload region); callers needing the logical chunk
    /// start should subtract 0x12.
    pub snd: SndRef,
    /// Secondary back-pointer recorded immediately after `snd`, called
    /// `snd_start` in the reference tool (and, inconsistently, referenced
    /// as `snd_cutoff` in its own packer — both names the same field).
    pub snd_start_site: u64,
    pub snd_start_offset: u64,
    pub frame_align: FrameAlign,
}

#[derive(Debug, Clone)]
pub struct ArticulationUnit {
    pub index: u32,
    pub phoneme: String,
    pub params: Vec<ArticulationParam>,
}

#[derive(Debug, Clone)]
pub enum ArtChild {
    Nested(ArticulationEntry),
    Unit(ArticulationUnit),
}

#[derive(Debug, Clone)]
pub struct ArticulationEntry {
    pub index: u32,
    pub children: Vec<ArtChild>,
    pub phoneme: String,
}

impl ArticulationEntry {
    pub fn units(&self) -> impl Iterator<Item = &ArticulationUnit> {
        self.children.iter().filter_map(|c| match c {
            ArtChild::Unit(u) => Some(u),
            ArtChild::Nested(_) => None,
        })
    }

    pub fn nested(&self) -> impl Iterator<Item = &ArticulationEntry> {
        self.children.iter().filter_map(|c| match c {
            ArtChild::Nested(n) => Some(n),
            ArtChild::Unit(_) => None,
        })
    }
}

pub fn read_art(c: &mut Cursor) -> Result<Vec<ArticulationEntry>> {
    let _unknown = c.read_u64()?;
    let arr_tail = c.read_arr()?;
    if u32::from_le_bytes(arr_tail) == 0 {
        return Err(DdiError::AssertionFailed {
            pos: c.pos() - 4,
            section: "ART",
            expected: "nonzero".to_string(),
            found: "0".to_string(),
        });
    }

    let mut entries = Vec::new();
    loop {
        let mark_pos = c.pos();
        let mark = c.read_array::<8>()?;
        if mark != [0u8; 8] && mark != [0xFFu8; 8] {
            c.seek(mark_pos);
            let tag = c.read_pstring()?;
            debug_assert_eq!(tag, "articulation");
            break;
        }
        c.expect_magic("ART ", "ART")?;
        let (idx, entry) = read_art_block(c)?;
        entries.push((idx, entry));
    }
    entries.sort_by_key(|(idx, _)| *idx);
    Ok(entries.into_iter().map(|(_, e)| e).collect())
}

fn read_art_block(c: &mut Cursor) -> Result<(u32, ArticulationEntry)> {
    let _unknown = c.read_u32()?;
    c.expect_u32(1, "ART")?;
    c.expect_u32(0, "ART")?;
    let art_idx = c.read_u32()?;
    let artu_num = c.read_u32()?;

    let mut children = Vec::with_capacity(artu_num as usize);
    for _ in 0..artu_num {
        c.expect_u64(0, "ART.child")?;
        let block_type = c.read_array::<4>()?;
        if &block_type == b"ART " {
            let (sub_idx, sub_entry) = read_art_block(c)?;
            let _ = sub_idx;
            children.push(ArtChild::Nested(sub_entry));
            continue;
        }
        if &block_type != b"ARTu" {
            return Err(DdiError::AssertionFailed {
                pos: c.pos() - 4,
                section: "ART.child",
                expected: "ART  or ARTu".to_string(),
                found: String::from_utf8_lossy(&block_type).into_owned(),
            });
        }

        let _unknown = c.read_u32()?;
        c.expect_u32(0, "ARTu")?;
        c.expect_u32(0, "ARTu")?;
        let artu_idx = c.read_u32()?;
        let guard = c.read_u64()?;
        if guard != 0 && guard != 1 {
            return Err(DdiError::AssertionFailed {
                pos: c.pos() - 8,
                section: "ARTu",
                expected: "0 or 1".to_string(),
                found: guard.to_string(),
            });
        }
        let _unknown = c.read_u32()?;
        c.expect_fill(4, 0xFF, "ARTu")?;
        let artp_num = c.read_u32()?;

        let mut params = Vec::with_capacity(artp_num as usize);
        for _ in 0..artp_num {
            let dev_artp_offset = c.read_u64()?;
            c.expect_magic("ARTp", "ARTp")?;
            let _unknown = c.read_u32()?;
            c.expect_u32(0, "ARTp")?;
            c.expect_u32(1, "ARTp")?;
            let unknown1 = c.read_array::<0x0a>()?;
            let pitch1 = c.read_f32()?;
            let pitch2 = c.read_f32()?;
            let unknown2 = c.read_f32()?;
            let dynamics = c.read_f32()?;
            let unknown3 = c.read_f32()?;
            c.expect_u32(2, "ARTp")?;
            let artp_idx = c.read_u64()?;
            c.expect_magic("EMPT", "ARTp")?;
            let _unknown = c.read_u32()?;
            let tag = c.read_pstring()?;
            debug_assert_eq!(tag, "SND");
            let snd_unknown = c.read_u32()?;
            c.expect_u32(0, "ARTp")?;
            c.expect_magic("EMPT", "ARTp")?;
            let _unknown = c.read_u32()?;
            let tag = c.read_pstring()?;
            debug_assert_eq!(tag, "EpR");

            let resume_point = c.pos();
            let (epr, fs) = match read_epr_block_strict(c) {
                Ok(v) => v,
                Err(_) => {
                    c.seek(resume_point);
                    read_epr_block_loose(c)?
                }
            };

            let snd_identifier = c.read_u32()?;
            let snd_site = c.pos() as u64;
            let snd_offset = c.read_u64()?;
            let snd_start_site = c.pos() as u64;
            let snd_start_offset = c.read_u64()?;

            let frame_align = read_frame_align(c)?;

            let tag = c.read_pstring()?;
            debug_assert_eq!(tag, "default");

            params.push(ArticulationParam {
                artp_idx,
                dev_artp_offset,
                unknown1,
                pitch1,
                pitch2,
                unknown2,
                dynamics,
                unknown3,
                snd_unknown,
                epr,
                fs,
                snd: SndRef { site: snd_site, offset: snd_offset, identifier: snd_identifier },
                snd_start_site,
                snd_start_offset,
                frame_align,
            });
        }
        params.sort_by_key(|p| p.artp_idx);
        let phoneme = c.read_pstring()?;
        children.push(ArtChild::Unit(ArticulationUnit { index: artu_idx, phoneme, params }));
    }

    let phoneme = c.read_pstring()?;
    Ok((art_idx, ArticulationEntry { index: art_idx, children, phoneme }))
}

/// The common-case `EpR` body: `epr_num` (u32) followed by that many 8-byte
/// back-pointers, then `fs` (u32) and the `\x01\x00` trailer.
fn read_epr_block_strict(c: &mut Cursor) -> Result<(Vec<EprRef>, u32)> {
    let epr_num = c.read_u32()?;
    if epr_num > 0x1000 {
        return Err(DdiError::AssertionFailed {
            pos: c.pos() - 4,
            section: "ARTp.EpR",
            expected: "plausible epr_num".to_string(),
            found: epr_num.to_string(),
        });
    }
    let mut epr = Vec::with_capacity(epr_num as usize);
    for _ in 0..epr_num {
        let site = c.pos() as u64;
        let offset = c.read_u64()?;
        epr.push(EprRef { site, offset });
    }
    let fs = c.read_u32()?;
    c.expect_bytes(&[0x01, 0x00], "ARTp.EpR")?;
    Ok((epr, fs))
}

/// Fallback layout seen on some banks: a 4-byte `0xFFFFFFFF` marker
/// precedes `epr_num`, mirroring the `STAp`/`VQMp` layout.
fn read_epr_block_loose(c: &mut Cursor) -> Result<(Vec<EprRef>, u32)> {
    let _marker = c.read_u32()?;
    read_epr_block_strict(c)
}

fn read_frame_align(c: &mut Cursor) -> Result<FrameAlign> {
    // "default" always terminates the frame-alignment block; scan ahead to
    // find it and derive the block's byte length rather than trusting a
    // separate size field (mirrors the reference tool's `ddi_bytes.find`).
    let probe_start = c.pos();
    let probe = c.peek(c.remaining().min(1024))?;
    let needle = b"default";
    let found = probe
        .windows(needle.len())
        .position(|w| w == needle)
        .ok_or(DdiError::AssertionFailed {
            pos: probe_start,
            section: "ARTp.frame_align",
            expected: "\"default\" terminator within 1024 bytes".to_string(),
            found: "none".to_string(),
        })?;
    let align_length = found.saturating_sub(4);
    let align_bytes = c.read_bytes(align_length)?.to_vec();

    if align_length > 4 {
        let group_num = u32::from_le_bytes(align_bytes[0..4].try_into().unwrap());
        let mut groups = Vec::with_capacity(group_num as usize);
        let mut off = 4usize;
        for _ in 0..group_num {
            let start = u32::from_le_bytes(align_bytes[off..off + 4].try_into().unwrap());
            let end = u32::from_le_bytes(align_bytes[off + 4..off + 8].try_into().unwrap());
            let start2 = u32::from_le_bytes(align_bytes[off + 8..off + 12].try_into().unwrap());
            let end2 = u32::from_le_bytes(align_bytes[off + 12..off + 16].try_into().unwrap());
            groups.push(FrameAlignGroup { start, end, start2, end2 });
            off += 16;
        }
        Ok(FrameAlign::V3(groups))
    } else {
        let mut marks = Vec::with_capacity(align_bytes.len() / 4);
        for chunk in align_bytes.chunks_exact(4) {
            marks.push(u32::from_le_bytes(chunk.try_into().unwrap()));
        }
        Ok(FrameAlign::V2(marks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_default_pstring(buf: &mut Vec<u8>) {
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(b"default");
    }

    #[test]
    fn frame_align_v2_round_trips_raw_marks() {
        // The V2/V3 split is a byte-length heuristic inherited from the
        // reference tool (`align_length > 4` => V3): a V2 block only ever
        // carries a single flat mark in practice, since anything longer is
        // reinterpreted as a V3 group.
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_le_bytes());
        push_default_pstring(&mut buf);
        let mut c = Cursor::new(&buf);
        match read_frame_align(&mut c).unwrap() {
            FrameAlign::V2(marks) => assert_eq!(marks, vec![10]),
            FrameAlign::V3(_) => panic!("expected V2 layout"),
        }
        assert_eq!(c.read_pstring().unwrap(), "default");
    }

    #[test]
    fn frame_align_v3_groups_four_u32_per_entry() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes()); // group_num
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&4u32.to_le_bytes());
        push_default_pstring(&mut buf);
        let mut c = Cursor::new(&buf);
        match read_frame_align(&mut c).unwrap() {
            FrameAlign::V3(groups) => {
                assert_eq!(groups, vec![FrameAlignGroup { start: 1, end: 2, start2: 3, end2: 4 }]);
            }
            FrameAlign::V2(_) => panic!("expected V3 layout"),
        }
        assert_eq!(c.read_pstring().unwrap(), "default");
    }
}
