//! Chunk locator (component C): given a back-pointer's recorded offset,
//! find the actual `SND `/`FRM2` chunk in the data file. Articulation and
//! VQM back-pointers are trustworthy exact seeks; stationary back-pointers
//! routinely drift, so stationary lookups fall back to a bounded backward
//! byte-stepping search for the nearest preceding `SND ` magic — the same
//! trade-off `extract_wav.py` makes (`0x3d` constant offset replaced with
//! `stream_reverse_search(..., 0x8000)` once indexed offsets turned out
//! unreliable).

use crate::cursor::reverse_search;
use crate::error::{DdiError, Result};

/// Default backward-search window used for stationary `SND ` recovery,
/// matching `extract_wav.py`'s `0x8000` limit.
pub const DEFAULT_BACKWARD_LIMIT: usize = 0x8000;

/// Backward-search window used when mix-in recovers a donor stationary
/// `SND ` chunk, per spec.md §4.3 ("10 MiB hard cap for mix-in recovery").
pub const MIXIN_BACKWARD_LIMIT: usize = 10 * 1024 * 1024;

/// Seeks directly to `offset` and verifies a `SND ` magic sits there.
/// Used for articulation and VQM chunks, whose indexed offsets are exact.
pub fn locate_snd_exact(data: &[u8], offset: u64, context: &str) -> Result<u64> {
    let offset = offset as usize;
    if data.get(offset..offset + 4) == Some(b"SND ") {
        Ok(offset as u64)
    } else {
        Err(DdiError::SndNotFound { context: context.to_string(), offset: offset as u64 })
    }
}

/// Searches backward from `offset` for the nearest preceding `SND ` magic,
/// within `limit` bytes. Used for stationary chunks, whose recorded offset
/// usually lands a few bytes past the real chunk start.
pub fn locate_snd_backward(data: &[u8], offset: u64, limit: usize, context: &str) -> Result<u64> {
    match reverse_search(data, b"SND ", offset as usize, Some(limit)) {
        Some(pos) => Ok(pos as u64),
        None => Err(DdiError::SndNotFound { context: context.to_string(), offset }),
    }
}

/// Locates an exact `FRM2` chunk for an EpR back-pointer (articulation and
/// stationary EpR offsets are both exact seeks into the data file).
pub fn locate_frm2(data: &[u8], offset: u64, context: &str) -> Result<u64> {
    let off = offset as usize;
    if data.get(off..off + 4) == Some(b"FRM2") {
        Ok(offset)
    } else {
        Err(DdiError::Frm2NotFound { context: context.to_string(), offset })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_locate_succeeds_on_correct_offset() {
        let data = b"xxxxSND yyy";
        assert_eq!(locate_snd_exact(data, 4, "test").unwrap(), 4);
    }

    #[test]
    fn exact_locate_fails_on_wrong_offset() {
        let data = b"xxxxSND yyy";
        assert!(locate_snd_exact(data, 0, "test").is_err());
    }

    #[test]
    fn backward_locate_finds_drifted_offset() {
        // `reverse_search` never inspects index 0 (mirrors the Python
        // reference's `range(offset, 0, -1)`), so the real "SND " start must
        // sit at a nonzero offset for a backward search to find it.
        let mut data = vec![0u8];
        data.extend_from_slice(b"SND header-padding-bytes-here");
        data.extend_from_slice(&[0u8; 20]);
        // offset points a few bytes past the real "SND " start
        let drifted = 11u64;
        let found = locate_snd_backward(&data, drifted, DEFAULT_BACKWARD_LIMIT, "sta").unwrap();
        assert_eq!(found, 1);
    }

    #[test]
    fn backward_locate_respects_limit() {
        let mut data = vec![0u8; 100];
        data[0..4].copy_from_slice(b"SND ");
        let found = locate_snd_backward(&data, 50, 10, "sta");
        assert!(found.is_err());
    }

    #[test]
    fn frm2_locate_succeeds_on_correct_offset() {
        let data = b"....FRM2....";
        assert_eq!(locate_frm2(data, 4, "epr").unwrap(), 4);
    }
}
