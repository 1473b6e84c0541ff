//! Mix-in orchestrator (component I): splices a donor "growl" voice-quality
//! region into a recipient bank, either copying the donor's `VQM` entries
//! verbatim or synthesising one from a donor `STAu`'s stationary params.
//!
//! The `vqm` mode is grounded byte-for-byte in
//! `original_source/mixins_ddb.py`: stream every donor `EpR`/`SND ` chunk
//! into the recipient data file, record the new offset, then splice the
//! resulting `VQM` image into (or onto the end of) the recipient index. The
//! `sta2vqm` mode has no surviving reference implementation — it follows
//! spec.md §4.9's contract, reusing the same copy-then-splice path with a
//! donor `STAu` as the entry source instead of a donor `VQM` section.

use crate::catalogue::Catalogue;
use crate::chunk::{read_frm2_raw, read_snd_raw};
use crate::cursor::{find, Patcher};
use crate::error::{DdiError, Result};
use crate::locator::{locate_snd_backward, MIXIN_BACKWARD_LIMIT};
use crate::rewrite::splice_vqm;
use crate::vqm_synth::{self, VqmEntrySpec};

/// `sta2vqm`'s hard-coded opaque per-entry prefix. Empirically chosen by the
/// reference tooling; meaning undocumented (spec.md §9 Open Questions).
const STA2VQM_PREFIX: [u8; 10] = [0x2c, 0xfb, 0xb7, 0x5b, 0x72, 0x93, 0xe2, 0x3f, 0x01, 0x00];

/// `sta2vqm` only carries the first 100 `FRM2` references of each donor
/// `STAp`, per spec.md §4.9.
const STA2VQM_EPR_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub enum MixinMode {
    Vqm,
    Sta2Vqm { phoneme: String },
}

/// Runs the mix-in pipeline end to end: builds the `VqmEntry` list per
/// `mode`, streams donor chunk bytes into a copy of the recipient data
/// file, and splices a freshly synthesised `VQM` block into a copy of the
/// recipient index. Returns `(new_index_bytes, new_data_bytes)`.
pub fn mixin(
    recipient_idx: &[u8],
    recipient_dat: &[u8],
    recipient_catalogue: &Catalogue,
    donor_dat: &[u8],
    donor_catalogue: &Catalogue,
    mode: &MixinMode,
) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut out_dat = recipient_dat.to_vec();
    let entries = match mode {
        MixinMode::Vqm => collect_vqm_entries(donor_catalogue, donor_dat, &mut out_dat)?,
        MixinMode::Sta2Vqm { phoneme } => collect_sta2vqm_entries(donor_catalogue, donor_dat, phoneme, &mut out_dat)?,
    };

    let out_idx = splice_vqm_into(recipient_idx, recipient_catalogue, &entries)?;
    Ok((out_idx, out_dat))
}

fn collect_vqm_entries(donor_catalogue: &Catalogue, donor_dat: &[u8], out_dat: &mut Vec<u8>) -> Result<Vec<VqmEntrySpec>> {
    let donor_vqm = donor_catalogue
        .vqm
        .as_ref()
        .ok_or(DdiError::SectionNotFound { section: "VQM (donor has none)" })?;

    let mut entries = Vec::with_capacity(donor_vqm.entries.len());
    for entry in &donor_vqm.entries {
        let mut epr_offsets = Vec::with_capacity(entry.epr.len());
        for epr in &entry.epr {
            let written_at = out_dat.len() as u64;
            let frm2 = read_frm2_raw(donor_dat, epr.offset)?;
            out_dat.extend_from_slice(frm2);
            epr_offsets.push(written_at);
        }

        let snd_written_at = out_dat.len() as u64;
        let snd_bytes = read_snd_raw(donor_dat, entry.snd.offset)?;
        out_dat.extend_from_slice(snd_bytes);

        entries.push(VqmEntrySpec {
            idx_string: entry.index.to_string(),
            prefix10: entry.unknown1,
            pitch2: entry.pitch2,
            unknown2: entry.unknown2,
            dynamics: entry.dynamics,
            unknown3: entry.unknown3,
            epr_offsets,
            snd_identifier: entry.snd.identifier,
            snd_offset: snd_written_at,
        });
    }
    Ok(entries)
}

fn collect_sta2vqm_entries(
    donor_catalogue: &Catalogue,
    donor_dat: &[u8],
    phoneme: &str,
    out_dat: &mut Vec<u8>,
) -> Result<Vec<VqmEntrySpec>> {
    let unit = donor_catalogue
        .sta
        .iter()
        .find(|u| u.phoneme == phoneme)
        .ok_or_else(|| DdiError::PhonemeNotFound { phoneme: phoneme.to_string() })?;

    let mut entries = Vec::with_capacity(unit.params.len());
    for (i, param) in unit.params.iter().enumerate() {
        let mut epr_offsets = Vec::new();
        for epr in param.epr.iter().take(STA2VQM_EPR_LIMIT) {
            let written_at = out_dat.len() as u64;
            let frm2 = read_frm2_raw(donor_dat, epr.offset)?;
            out_dat.extend_from_slice(frm2);
            epr_offsets.push(written_at);
        }

        let real_snd_offset = locate_snd_backward(donor_dat, param.snd.offset, MIXIN_BACKWARD_LIMIT, phoneme)?;
        let snd_written_at = out_dat.len() as u64;
        let snd_bytes = read_snd_raw(donor_dat, real_snd_offset)?;
        out_dat.extend_from_slice(snd_bytes);

        entries.push(VqmEntrySpec {
            idx_string: i.to_string(),
            prefix10: STA2VQM_PREFIX,
            pitch2: param.pitch2,
            unknown2: param.unknown2,
            dynamics: param.dynamics,
            unknown3: param.unknown3,
            epr_offsets,
            snd_identifier: param.snd.identifier,
            snd_offset: snd_written_at,
        });
    }
    Ok(entries)
}

/// Splices a freshly synthesised `VQM` image into a copy of the recipient
/// index: replaces the existing section if one is present, or inserts it
/// at the `"voice"` footer and bumps `DBV`'s version count by one,
/// mirroring `mixins_ddb.py`'s `byte_replace`/footer-insert fallback.
fn splice_vqm_into(recipient_idx: &[u8], recipient_catalogue: &Catalogue, entries: &[VqmEntrySpec]) -> Result<Vec<u8>> {
    let vqm_bytes = vqm_synth::encode(entries);
    let mut idx = recipient_idx.to_vec();

    match recipient_catalogue.offsets.vqm {
        Some((start, end)) => {
            splice_vqm(&mut idx, start, end, &vqm_bytes);
        }
        None => {
            let footer = Catalogue::footer_without_vqm();
            let insert_at = find(&idx, &footer, 0).ok_or(DdiError::SectionNotFound { section: "voice footer" })?;
            splice_vqm(&mut idx, insert_at, insert_at, &vqm_bytes);

            let mut patcher = Patcher::new(&mut idx);
            patcher.write_u32_at(recipient_catalogue.dbv.version_site, recipient_catalogue.dbv.version + 1)?;
        }
    }

    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::{DatabaseVersion, OffsetMap};

    fn minimal_catalogue(vqm: Option<(usize, usize)>, version: u32, version_site: u64) -> Catalogue {
        Catalogue {
            phdc: None,
            tdb: None,
            dbv: DatabaseVersion { unknown: 0, version, version_site },
            sta: Vec::new(),
            art: Vec::new(),
            vqm: None,
            offsets: OffsetMap { vqm, ..Default::default() },
        }
    }

    #[test]
    fn splice_without_existing_vqm_bumps_dbv_and_inserts_at_footer() {
        let mut idx = vec![0u8; 8];
        idx[0..4].copy_from_slice(&4u32.to_le_bytes()); // version field at site 0
        idx.extend_from_slice(&Catalogue::footer_without_vqm());
        idx.extend_from_slice(b"TAIL");

        let catalogue = minimal_catalogue(None, 4, 0);
        let spliced = splice_vqm_into(&idx, &catalogue, &[]).unwrap();

        assert_eq!(u32::from_le_bytes(spliced[0..4].try_into().unwrap()), 5);
        assert!(spliced.windows(4).any(|w| w == b"GROW".as_slice() || w == b"VQM ".as_slice()));
        assert!(spliced.ends_with(&Catalogue::footer_without_vqm()) == false);
        assert!(spliced.ends_with(b"TAIL"));
    }

    #[test]
    fn splice_with_existing_vqm_replaces_the_section_in_place() {
        let mut idx = b"PREFIX".to_vec();
        let vqm_start = idx.len();
        idx.extend_from_slice(b"OLDVQMBYTES");
        let vqm_end = idx.len();
        idx.extend_from_slice(b"SUFFIX");

        let catalogue = minimal_catalogue(Some((vqm_start, vqm_end)), 4, 0);
        let spliced = splice_vqm_into(&idx, &catalogue, &[]).unwrap();

        assert!(spliced.starts_with(b"PREFIX"));
        assert!(spliced.ends_with(b"SUFFIX"));
        assert!(!spliced.windows(11).any(|w| w == b"OLDVQMBYTES"));
    }

    #[test]
    fn sta2vqm_rejects_unknown_phoneme() {
        let catalogue = minimal_catalogue(None, 4, 0);
        let mut out_dat = Vec::new();
        let err = collect_sta2vqm_entries(&catalogue, &[], "zz", &mut out_dat).unwrap_err();
        assert!(matches!(err, DdiError::PhonemeNotFound { .. }));
    }

    #[test]
    fn vqm_mode_rejects_donor_without_vqm_section() {
        let catalogue = minimal_catalogue(None, 4, 0);
        let mut out_dat = Vec::new();
        let err = collect_vqm_entries(&catalogue, &[], &mut out_dat).unwrap_err();
        assert!(matches!(err, DdiError::SectionNotFound { .. }));
    }
}
