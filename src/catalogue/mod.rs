//! The index parser/encoder (component B): turns the flat `.IDX` byte
//! buffer into the typed [`Catalogue`] model, tracking every back-pointer
//! site so the rewrite engine can patch them later without re-parsing.
//!
//! Structurally this plays the role `swdl.rs`'s `SWDL::read_from_file` plays
//! for the teacher's own tagged-chunk format: locate each top-level section
//! by magic, dispatch to a per-section reader, and record where it started
//! and ended.

mod art;
mod dbv;
mod phdc;
mod sta;
mod tdb;
pub(crate) mod vqm;

pub use art::{ArtChild, ArticulationEntry, ArticulationParam, ArticulationUnit, FrameAlign, FrameAlignGroup};
pub use dbv::DatabaseVersion;
pub use phdc::{CategoryEntry, PhdcCategory, Phg2Category, PhonemeDictionary};
pub use sta::{StationaryParam, StationaryUnit};
pub use tdb::TimbreDictionary;
pub use vqm::{VqmEntry, VqmSection};

use crate::cursor::{reverse_search, Cursor};
use crate::error::{DdiError, Result};

/// A back-reference to a length-prefixed `EpR` frame-pointer slot: the byte
/// position of the 8-byte field in the index (`site`) and its current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EprRef {
    pub site: u64,
    pub offset: u64,
}

/// A back-reference to a `SND ` chunk: byte position of the 8-byte offset
/// field, its current value, and the adjacent identifier field that always
/// sits immediately before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SndRef {
    pub site: u64,
    pub offset: u64,
    pub identifier: u32,
}

/// Byte range `[start, end)` a parsed section occupied in the index buffer.
pub type Span = (usize, usize);

#[derive(Debug, Default, Clone)]
pub struct OffsetMap {
    pub phdc: Option<Span>,
    pub tdb: Option<Span>,
    pub dbv: Option<Span>,
    pub sta: Option<Span>,
    pub art: Option<Span>,
    pub vqm: Option<Span>,
}

/// The fully parsed voice-bank index.
#[derive(Debug)]
pub struct Catalogue {
    pub phdc: Option<PhonemeDictionary>,
    pub tdb: Option<TimbreDictionary>,
    pub dbv: DatabaseVersion,
    pub sta: Vec<StationaryUnit>,
    pub art: Vec<ArticulationEntry>,
    pub vqm: Option<VqmSection>,
    pub offsets: OffsetMap,
}

impl Catalogue {
    /// Parses an in-memory `.IDX` buffer into a [`Catalogue`].
    ///
    /// Sections are located by magic search rather than sequential read,
    /// exactly mirroring the Python reference's `ddi_bytes.find(...)` calls.
    pub fn read(data: &[u8]) -> Result<Catalogue> {
        let mut offsets = OffsetMap::default();

        let phdc = if let Some(phdc_offset) = crate::cursor::find(data, b"PHDC", 0) {
            let mut c = Cursor::at(data, phdc_offset);
            let parsed = phdc::read_phdc(&mut c)?;
            offsets.phdc = Some((phdc_offset, c.pos()));
            Some(parsed)
        } else {
            None
        };

        let mut tdb_needle = [0xFFu8; 12];
        tdb_needle[8..12].copy_from_slice(b"TDB ");
        let tdb = if let Some(tdb_offset) = crate::cursor::find(data, &tdb_needle, 0) {
            let mut c = Cursor::at(data, tdb_offset);
            let parsed = tdb::read_tdb(&mut c)?;
            offsets.tdb = Some((tdb_offset, c.pos()));
            Some(parsed)
        } else {
            None
        };

        let mut dbv_needle = [0u8; 12];
        dbv_needle[8..12].copy_from_slice(b"DBV ");
        let dbv_offset = crate::cursor::find(data, &dbv_needle, 0)
            .ok_or(DdiError::SectionNotFound { section: "DBV" })?;
        let mut c = Cursor::at(data, dbv_offset);
        let dbv = dbv::read_dbv(&mut c)?;
        offsets.dbv = Some((dbv_offset, c.pos()));

        let mut sta_needle = [0u8; 12];
        sta_needle[8..12].copy_from_slice(b"STA ");
        let sta_magic_offset = crate::cursor::find(data, &sta_needle, 0)
            .ok_or(DdiError::SectionNotFound { section: "STA" })?;
        let sta_offset = reverse_search(data, b"ARR ", sta_magic_offset, None)
            .ok_or(DdiError::SectionNotFound { section: "STA (ARR header)" })?
            - 8;
        let mut c = Cursor::at(data, sta_offset);
        let sta = sta::read_sta(&mut c)?;
        offsets.sta = Some((sta_offset, c.pos()));

        let mut art_needle = [0u8; 12];
        art_needle[8..12].copy_from_slice(b"ART ");
        let art_magic_offset = crate::cursor::find(data, &art_needle, 0)
            .ok_or(DdiError::SectionNotFound { section: "ART" })?;
        let art_offset = reverse_search(data, b"ARR ", art_magic_offset, None)
            .ok_or(DdiError::SectionNotFound { section: "ART (ARR header)" })?
            - 8;
        let mut c = Cursor::at(data, art_offset);
        let art = art::read_art(&mut c)?;
        offsets.art = Some((art_offset, c.pos()));

        let mut vqm_needle = [0xFFu8; 12];
        vqm_needle[8..12].copy_from_slice(b"VQM ");
        let vqm = if let Some(vqm_offset) = crate::cursor::find(data, &vqm_needle, 0) {
            let mut c = Cursor::at(data, vqm_offset);
            let parsed = vqm::read_vqm(&mut c)?;
            offsets.vqm = Some((vqm_offset, c.pos()));
            Some(parsed)
        } else {
            None
        };

        Ok(Catalogue { phdc, tdb, dbv, sta, art, vqm, offsets })
    }

    /// The literal footer the format uses to mark "no VQM section present"
    /// (`original_source/mixins_ddb.py`'s `ddi_footer`).
    pub fn footer_without_vqm() -> [u8; 9] {
        let mut buf = [0u8; 9];
        buf[0..4].copy_from_slice(&5u32.to_le_bytes());
        buf[4..9].copy_from_slice(b"voice");
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footer_without_vqm_matches_reference_literal() {
        assert_eq!(&Catalogue::footer_without_vqm(), b"\x05\x00\x00\x00voice");
    }
}
