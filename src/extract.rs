//! Extract orchestrator (component H): walks the catalogue, resolves every
//! `SND ` chunk through the locator (component C), reads it (component D),
//! and emits a `WAV` plus optional label/segmentation files per unit. A
//! post-pass brute-force scan recovers `SND ` chunks the index never
//! referenced at all.
//!
//! Grounded in `original_source/extract_wav.py::main`: the same three walk
//! orders (articulation, then stationary, then VQM), the same bias handling
//! (articulation's `snd`/`snd_start` both subtract 0x12; the bias cancels
//! when only the *difference* between them is needed), and the same
//! unindexed-chunk scan with a 4-byte overlap between windows.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;

use crate::catalogue::{ArtChild, ArticulationEntry, ArticulationParam, Catalogue, FrameAlign, StationaryParam};
use crate::chunk::SndChunk;
use crate::error::Result;
use crate::label::{self, FrameWindow};
use crate::locator;
use crate::paths::{create_file_name, FilenameStyle};
use crate::wav::write_wav;

/// Brute-force scan window size, per spec.md §4.8 ("10 KiB windows").
const SCAN_WINDOW: usize = 10 * 1024;
/// Window advance: `window_size - 3`, so a 4-byte magic straddling a window
/// boundary is never missed (Design Notes §9).
const SCAN_ADVANCE: usize = SCAN_WINDOW - 3;

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    pub style: FilenameStyle,
    pub gen_lab: bool,
    pub gen_seg: bool,
    pub classify: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractReport {
    pub articulation: usize,
    pub stationary: usize,
    pub vqm: usize,
    pub unindexed: usize,
    pub skipped: usize,
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Flattens the articulation tree into `(phoneme path, per-unit artp index,
/// param)` triples, in catalogue order. The "per-unit" index resets for
/// every `ARTu` (mirrors `extract_wav.py`'s `i = 0` at the top of each
/// `artu_item` loop).
fn walk_articulation(entries: &[ArticulationEntry]) -> Vec<(Vec<String>, usize, ArticulationParam)> {
    fn walk(
        entry: &ArticulationEntry,
        prefix: &mut Vec<String>,
        out: &mut Vec<(Vec<String>, usize, ArticulationParam)>,
    ) {
        prefix.push(entry.phoneme.clone());
        for child in &entry.children {
            match child {
                ArtChild::Nested(nested) => walk(nested, prefix, out),
                ArtChild::Unit(unit) => {
                    prefix.push(unit.phoneme.clone());
                    for (i, param) in unit.params.iter().enumerate() {
                        out.push((prefix.clone(), i, param.clone()));
                    }
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

fn frame_windows(frame_align: &FrameAlign) -> Option<Vec<FrameWindow>> {
    match frame_align {
        FrameAlign::V3(groups) => {
            Some(groups.iter().map(|g| FrameWindow { start: g.start, end: g.end }).collect())
        }
        FrameAlign::V2(_) => None,
    }
}

fn extract_articulation(
    catalogue: &Catalogue,
    dat: &[u8],
    dst_root: &Path,
    opts: &ExtractOptions,
    seen: &mut HashSet<u64>,
    report: &mut ExtractReport,
) {
    let unvoiced: Vec<String> = catalogue.phdc.as_ref().map(|p| p.unvoiced.clone()).unwrap_or_default();

    for (phonemes, classify_idx, param) in walk_articulation(&catalogue.art) {
        let label_str = phonemes.join(" ");
        let chunk_start = match param.snd.offset.checked_sub(0x12) {
            Some(v) => v,
            None => {
                eprintln!("{}SND back-pointer underflow for [{label_str}]", "Warning: ".yellow());
                report.skipped += 1;
                continue;
            }
        };

        if let Err(e) = locator::locate_snd_exact(dat, chunk_start, &label_str) {
            eprintln!("{}{e} (articulation [{label_str}])", "Warning: ".yellow());
            report.skipped += 1;
            continue;
        }

        let chunk = match SndChunk::read_at(dat, chunk_start) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}{e} (articulation [{label_str}])", "Warning: ".yellow());
                report.skipped += 1;
                continue;
            }
        };

        let classify = opts.classify.then_some(classify_idx);
        let wav_path = dst_root.join(create_file_name(&phonemes, opts.style, classify, chunk_start, param.pitch1, "wav"));
        if let Err(e) = ensure_parent_dir(&wav_path).and_then(|_| write_wav(&wav_path, &chunk)) {
            eprintln!("{}{e} (articulation [{label_str}])", "Warning: ".yellow());
            report.skipped += 1;
            continue;
        }
        println!("Dumped [{label_str}] -> {}", wav_path.display());
        seen.insert(chunk_start);
        report.articulation += 1;

        if !(opts.gen_lab || opts.gen_seg) {
            continue;
        }
        let windows = match frame_windows(&param.frame_align) {
            Some(w) => w,
            None => continue,
        };
        // The bias both `snd` and `snd_start` carry (-0x12) cancels in this
        // difference, so the raw on-disk values can be subtracted directly.
        let offset_bytes = (param.snd_start_offset as i64 - param.snd.offset as i64).max(0) as u64;

        if opts.gen_lab {
            let lab = label::generate_art_lab(&phonemes, &windows, chunk.sample_rate, offset_bytes, chunk.total_len as u64);
            let lab_path = dst_root.join(create_file_name(&phonemes, opts.style, classify, chunk_start, param.pitch1, "lab"));
            if ensure_parent_dir(&lab_path).and_then(|_| Ok(fs::write(&lab_path, lab)?)).is_err() {
                eprintln!("{}could not write lab file for [{label_str}]", "Warning: ".yellow());
            }
        } else if opts.gen_seg {
            let (trans, seg, as0) = label::generate_art_seg_files_with_as0(
                &phonemes,
                &windows,
                chunk.sample_rate,
                offset_bytes,
                chunk.total_len as u64,
                &unvoiced,
            );
            for (ext, content) in [("trans", &trans), ("seg", &seg), ("as0", &as0)] {
                let p = dst_root.join(create_file_name(&phonemes, opts.style, classify, chunk_start, param.pitch1, ext));
                if ensure_parent_dir(&p).and_then(|_| Ok(fs::write(&p, content)?)).is_err() {
                    eprintln!("{}could not write .{ext} file for [{label_str}]", "Warning: ".yellow());
                }
            }
        }
    }
}

fn extract_stationary(
    catalogue: &Catalogue,
    dat: &[u8],
    dst_root: &Path,
    opts: &ExtractOptions,
    seen: &mut HashSet<u64>,
    report: &mut ExtractReport,
) {
    for unit in &catalogue.sta {
        let phoneme = unit.phoneme.clone();
        for (i, param) in (0_usize..).zip(unit.params.iter()) {
            if let Err(skipped) = extract_one_stationary(&phoneme, i, param, dat, dst_root, opts, seen) {
                eprintln!("{}{skipped} (stationary [{phoneme}] #{i})", "Warning: ".yellow());
                report.skipped += 1;
                continue;
            }
            report.stationary += 1;
        }
    }
}

fn extract_one_stationary(
    phoneme: &str,
    index: usize,
    param: &StationaryParam,
    dat: &[u8],
    dst_root: &Path,
    opts: &ExtractOptions,
    seen: &mut HashSet<u64>,
) -> Result<()> {
    let declared_offset = param.snd.offset;
    let classify = opts.classify.then_some(index);
    let wav_path = dst_root.join(create_file_name(
        &[phoneme.to_string()],
        opts.style,
        classify,
        declared_offset,
        param.pitch1,
        "wav",
    ));

    let real_offset = locator::locate_snd_backward(dat, declared_offset, locator::DEFAULT_BACKWARD_LIMIT, phoneme)?;
    let chunk = SndChunk::read_at(dat, real_offset)?;
    ensure_parent_dir(&wav_path)?;
    write_wav(&wav_path, &chunk)?;
    println!("Dumped [{phoneme}] -> {}", wav_path.display());
    seen.insert(real_offset);

    if opts.gen_lab || opts.gen_seg {
        let offset_pos = declared_offset - real_offset;
        let cutoff_pos = (param.snd_length as u64).saturating_sub(offset_pos);

        if opts.gen_lab {
            let lab = label::generate_sta_lab(phoneme, chunk.sample_rate, offset_pos, cutoff_pos, chunk.total_len as u64);
            let lab_path = dst_root.join(create_file_name(&[phoneme.to_string()], opts.style, classify, declared_offset, param.pitch1, "lab"));
            ensure_parent_dir(&lab_path)?;
            fs::write(&lab_path, lab)?;
        } else if opts.gen_seg {
            let (trans, seg) = label::generate_sta_seg_files(phoneme, chunk.sample_rate, offset_pos, cutoff_pos, chunk.total_len as u64);
            for (ext, content) in [("trans", &trans), ("seg", &seg)] {
                let p = dst_root.join(create_file_name(&[phoneme.to_string()], opts.style, classify, declared_offset, param.pitch1, ext));
                ensure_parent_dir(&p)?;
                fs::write(&p, content)?;
            }
        }
    }

    Ok(())
}

fn extract_vqm(catalogue: &Catalogue, dat: &[u8], dst_root: &Path, opts: &ExtractOptions, seen: &mut HashSet<u64>, report: &mut ExtractReport) {
    let Some(vqm) = catalogue.vqm.as_ref() else { return };
    for entry in &vqm.entries {
        let offset = entry.snd.offset;
        if let Err(e) = locator::locate_snd_exact(dat, offset, "vqm") {
            eprintln!("{}{e} (VQM #{})", "Warning: ".yellow(), entry.index);
            report.skipped += 1;
            continue;
        }
        let chunk = match SndChunk::read_at(dat, offset) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}{e} (VQM #{})", "Warning: ".yellow(), entry.index);
                report.skipped += 1;
                continue;
            }
        };
        let phonemes = vec!["growl".to_string()];
        let wav_path = dst_root.join(create_file_name(&phonemes, opts.style, None, offset, entry.pitch1, "wav"));
        if let Err(e) = ensure_parent_dir(&wav_path).and_then(|_| write_wav(&wav_path, &chunk)) {
            eprintln!("{}{e} (VQM #{})", "Warning: ".yellow(), entry.index);
            report.skipped += 1;
            continue;
        }
        println!("Dumped VQM growl -> {}", wav_path.display());
        seen.insert(offset);
        report.vqm += 1;
    }
}

/// Scans `dat` for `SND ` magics not already in `seen`, writing an
/// `unknown_<offset>.wav` for each. `cancel` is polled between windows so a
/// caller can install a Ctrl-C handler that flips it; a mid-scan cancel
/// returns `Ok` with whatever was found so far, never corrupting prior
/// output (spec.md §5).
fn scan_unindexed(dat: &[u8], dst_root: &Path, opts: &ExtractOptions, seen: &HashSet<u64>, cancel: &AtomicBool, report: &mut ExtractReport) -> Result<()> {
    let mut window_start = 0usize;
    while window_start < dat.len() {
        if cancel.load(Ordering::Relaxed) {
            println!("Scanning aborted");
            return Ok(());
        }
        let window_end = (window_start + SCAN_WINDOW).min(dat.len());
        let window = &dat[window_start..window_end];

        for i in 0..window.len() {
            if window[i..].starts_with(b"SND ") {
                let offset = (window_start + i) as u64;
                if seen.contains(&offset) {
                    continue;
                }
                match SndChunk::read_at(dat, offset) {
                    Ok(chunk) => {
                        let wav_path = dst_root.join(create_file_name(&[], opts.style, None, offset, 0.0, "wav"));
                        if ensure_parent_dir(&wav_path).and_then(|_| write_wav(&wav_path, &chunk)).is_ok() {
                            println!("Dumped unindexed SND -> {}", wav_path.display());
                            report.unindexed += 1;
                        }
                    }
                    Err(_) => continue,
                }
            }
        }

        if window_end == dat.len() {
            break;
        }
        window_start += SCAN_ADVANCE;
    }
    Ok(())
}

/// Runs the whole extract pipeline: articulation, stationary, VQM, then the
/// unindexed-chunk scan. `cancel` only gates the scan pass (spec.md §5: "no
/// suspension points... beyond the one cooperative check in the brute-force
/// scan").
pub fn extract(catalogue: &Catalogue, dat: &[u8], dst_root: &Path, opts: &ExtractOptions, cancel: &AtomicBool) -> Result<ExtractReport> {
    let mut seen = HashSet::new();
    let mut report = ExtractReport::default();

    extract_articulation(catalogue, dat, dst_root, opts, &mut seen, &mut report);
    extract_stationary(catalogue, dat, dst_root, opts, &mut seen, &mut report);
    extract_vqm(catalogue, dat, dst_root, opts, &mut seen, &mut report);

    println!("Scan for unindexed SND...");
    println!("You can press Ctrl+C to stop scanning and keep the found SNDs.");
    scan_unindexed(dat, dst_root, opts, &seen, cancel, &mut report)?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_snd(sample_rate: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"SND ");
        buf.extend_from_slice(&22u32.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&[0u8; 4]);
        buf
    }

    #[test]
    fn scan_finds_a_single_unreferenced_chunk() {
        let mut dat = vec![0u8; 16];
        dat.extend_from_slice(&build_snd(44100));
        let dst = std::env::temp_dir().join(format!("ddibank-extract-test-{}", std::process::id()));
        let _ = fs::create_dir_all(&dst);
        let opts = ExtractOptions { style: FilenameStyle::Flat, gen_lab: false, gen_seg: false, classify: false };
        let cancel = AtomicBool::new(false);
        let mut report = ExtractReport::default();
        scan_unindexed(&dat, &dst, &opts, &HashSet::new(), &cancel, &mut report).unwrap();
        assert_eq!(report.unindexed, 1);
        let _ = fs::remove_dir_all(&dst);
    }

    #[test]
    fn scan_skips_an_already_seen_offset() {
        let mut dat = vec![0u8; 16];
        dat.extend_from_slice(&build_snd(44100));
        let dst = std::env::temp_dir().join(format!("ddibank-extract-test-seen-{}", std::process::id()));
        let _ = fs::create_dir_all(&dst);
        let opts = ExtractOptions { style: FilenameStyle::Flat, gen_lab: false, gen_seg: false, classify: false };
        let cancel = AtomicBool::new(false);
        let mut report = ExtractReport::default();
        let mut seen = HashSet::new();
        seen.insert(16u64);
        scan_unindexed(&dat, &dst, &opts, &seen, &cancel, &mut report).unwrap();
        assert_eq!(report.unindexed, 0);
        let _ = fs::remove_dir_all(&dst);
    }

    #[test]
    fn scan_respects_cancellation_flag() {
        let mut dat = vec![0u8; 16];
        dat.extend_from_slice(&build_snd(44100));
        let dst = std::env::temp_dir().join(format!("ddibank-extract-test-cancel-{}", std::process::id()));
        let _ = fs::create_dir_all(&dst);
        let opts = ExtractOptions { style: FilenameStyle::Flat, gen_lab: false, gen_seg: false, classify: false };
        let cancel = AtomicBool::new(true);
        let mut report = ExtractReport::default();
        scan_unindexed(&dat, &dst, &opts, &HashSet::new(), &cancel, &mut report).unwrap();
        assert_eq!(report.unindexed, 0);
        let _ = fs::remove_dir_all(&dst);
    }
}
