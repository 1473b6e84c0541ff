//! Pack orchestrator (component G): reads a devkit-style source tree of
//! per-phoneme chunk files and assembles a fresh `.DAT` data file, patching
//! every back-pointer in a working copy of the `.IDX` buffer to point at the
//! freshly written locations.
//!
//! Grounded byte-for-byte in `original_source/pack_ddb.py`: same streaming
//! order (EpR frames, then the `SND ` chunk, per unit), the same `+0x12`
//! bias on articulation `SND ` writes, and the same `0x3D` stationary
//! header-start constant.

use std::path::{Path, PathBuf};

use crate::catalogue::{ArtChild, ArticulationEntry, ArticulationParam, Catalogue};
use crate::error::{DdiError, Result};
use crate::paths::escape_filename;
use crate::rewrite::{apply_patches, Patch};

/// Byte position of a stationary unit's `SND ` chunk within its own
/// single-unit source file, per `pack_ddb.py`'s `real_snd_offset`.
const STA_SND_OFFSET: u64 = 0x3D;

/// The `snd_start_offset - snd_offset` gap observed in known-good banks
/// (spec'd as an invariant, not an assumption: recomputed from the source
/// file every time, only checked against this for a warning).
const EXPECTED_ART_SND_GAP: i64 = 0x800;

fn collect_art_groups(entries: &[ArticulationEntry]) -> Vec<(Vec<String>, Vec<ArticulationParam>)> {
    fn walk(
        entry: &ArticulationEntry,
        prefix: &mut Vec<String>,
        out: &mut Vec<(Vec<String>, Vec<ArticulationParam>)>,
    ) {
        prefix.push(entry.phoneme.clone());
        for child in &entry.children {
            match child {
                ArtChild::Nested(nested) => walk(nested, prefix, out),
                ArtChild::Unit(unit) => {
                    prefix.push(unit.phoneme.clone());
                    out.push((prefix.clone(), unit.params.clone()));
                    prefix.pop();
                }
            }
        }
        prefix.pop();
    }

    let mut out = Vec::new();
    for entry in entries {
        walk(entry, &mut Vec::new(), &mut out);
    }
    out
}

fn art_source_path(src_root: &Path, phonemes: &[String]) -> PathBuf {
    let mut path = src_root.join("voice").join("articulation");
    for p in phonemes {
        path = path.join(escape_filename(p));
    }
    path
}

fn sta_source_path(src_root: &Path, phoneme: &str, index: usize) -> PathBuf {
    src_root
        .join("voice")
        .join("stationary")
        .join("normal")
        .join(escape_filename(phoneme))
        .join(escape_filename(&index.to_string()))
}

/// Streams one `FRM2` chunk from `source` at `offset` into `dat`, returning
/// the byte position it was written at.
fn stream_frm2(dat: &mut Vec<u8>, source: &[u8], offset: u64, context: &str) -> Result<u64> {
    let written_at = dat.len() as u64;
    let chunk = crate::chunk::read_frm2_raw(source, offset).map_err(|_| DdiError::CorruptInput {
        path: context.to_string(),
        reason: format!("expected FRM2 at offset 0x{offset:x}"),
    })?;
    dat.extend_from_slice(chunk);
    Ok(written_at)
}

/// Packs one source tree into a new `(.IDX, .DAT)` pair, returning the
/// patched index bytes and the freshly assembled data file.
pub fn pack(idx_bytes: &[u8], catalogue: &Catalogue, src_root: &Path) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut idx = idx_bytes.to_vec();
    let mut dat = Vec::new();
    let mut patches = Vec::new();

    for (phonemes, params) in collect_art_groups(&catalogue.art) {
        let art_path = art_source_path(src_root, &phonemes);
        let art_bytes = std::fs::read(&art_path).map_err(|_| DdiError::MissingSourceFile {
            phoneme_path: art_path.display().to_string(),
        })?;

        for param in &params {
            for epr in &param.epr {
                let written_at =
                    stream_frm2(&mut dat, &art_bytes, epr.offset, &art_path.display().to_string())?;
                patches.push(Patch { site: epr.site, new_offset: written_at });
            }

            let snd_offset = param.snd.offset;
            // `snd.offset` is the raw on-disk value, biased +0x12 relative to the
            // chunk's true start (see art.rs); the source tree stores the chunk at
            // the logical (unbiased) position, matching pack_ddb.py's seek.
            let source_snd_offset = snd_offset.checked_sub(0x12).ok_or_else(|| DdiError::CorruptInput {
                path: art_path.display().to_string(),
                reason: format!("SND offset 0x{snd_offset:x} underflows the 0x12 articulation bias"),
            })?;
            let snd_bytes =
                crate::chunk::read_snd_raw(&art_bytes, source_snd_offset).map_err(|_| DdiError::CorruptInput {
                    path: art_path.display().to_string(),
                    reason: format!("expected SND at offset 0x{source_snd_offset:x}"),
                })?;

            let observed_gap = param.snd_start_offset as i64 - snd_offset as i64;
            if observed_gap != EXPECTED_ART_SND_GAP {
                eprintln!(
                    "warning: {} snd_start gap is 0x{:x}, expected 0x{:x}",
                    art_path.display(),
                    observed_gap,
                    EXPECTED_ART_SND_GAP
                );
            }

            let ddb_snd_offset = dat.len() as u64 + 0x12;
            dat.extend_from_slice(snd_bytes);

            patches.push(Patch { site: param.snd.site, new_offset: ddb_snd_offset });
            patches.push(Patch {
                site: param.snd_start_site,
                new_offset: (ddb_snd_offset as i64 + observed_gap) as u64,
            });
        }
    }

    for unit in &catalogue.sta {
        for (i, param) in unit.params.iter().enumerate() {
            let sta_path = sta_source_path(src_root, &unit.phoneme, i);
            let sta_bytes = std::fs::read(&sta_path).map_err(|_| DdiError::MissingSourceFile {
                phoneme_path: sta_path.display().to_string(),
            })?;

            for epr in &param.epr {
                let written_at =
                    stream_frm2(&mut dat, &sta_bytes, epr.offset, &sta_path.display().to_string())?;
                patches.push(Patch { site: epr.site, new_offset: written_at });
            }

            let snd_bytes =
                crate::chunk::read_snd_raw(&sta_bytes, STA_SND_OFFSET).map_err(|_| DdiError::CorruptInput {
                    path: sta_path.display().to_string(),
                    reason: format!("expected SND at offset 0x{STA_SND_OFFSET:x}"),
                })?;

            let delta_snd_offset = param.snd.offset as i64 - STA_SND_OFFSET as i64;
            let ddb_snd_offset = (dat.len() as i64 + delta_snd_offset) as u64;
            dat.extend_from_slice(snd_bytes);

            patches.push(Patch { site: param.snd.site, new_offset: ddb_snd_offset });
        }
    }

    apply_patches(&mut idx, &patches)?;
    Ok((idx, dat))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::ArticulationUnit;

    #[test]
    fn collects_two_phoneme_groups_from_flat_units() {
        let entry = ArticulationEntry {
            index: 0,
            phoneme: "a".to_string(),
            children: vec![ArtChild::Unit(ArticulationUnit {
                index: 0,
                phoneme: "k".to_string(),
                params: vec![],
            })],
        };
        let groups = collect_art_groups(&[entry]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, vec!["a".to_string(), "k".to_string()]);
    }

    #[test]
    fn collects_three_phoneme_groups_from_nested_entries() {
        let inner = ArticulationEntry {
            index: 1,
            phoneme: "k".to_string(),
            children: vec![ArtChild::Unit(ArticulationUnit {
                index: 0,
                phoneme: "i".to_string(),
                params: vec![],
            })],
        };
        let outer = ArticulationEntry {
            index: 0,
            phoneme: "a".to_string(),
            children: vec![ArtChild::Nested(inner)],
        };
        let groups = collect_art_groups(&[outer]);
        assert_eq!(groups[0].0, vec!["a".to_string(), "k".to_string(), "i".to_string()]);
    }

    #[test]
    fn sta_source_path_uses_zero_based_index() {
        let path = sta_source_path(Path::new("/root"), "a", 2);
        assert_eq!(path, PathBuf::from("/root/voice/stationary/normal/a/2"));
    }

    #[test]
    fn art_source_path_joins_escaped_phonemes() {
        let path = art_source_path(Path::new("/root"), &["a".to_string(), "k".to_string()]);
        assert_eq!(path, PathBuf::from("/root/voice/articulation/a/k"));
    }
}
