//! Chunk reader (component D): decodes a `SND ` chunk header and exposes
//! its raw PCM payload, and reads whole `FRM2` chunks verbatim for the
//! EpR splice path pack/mix-in both use.

use crate::cursor::Cursor;
use crate::error::{DdiError, Result};

/// A decoded `SND ` chunk: 18-byte header (magic + length + sample rate +
/// channel count + one unknown `u32`) followed by raw little-endian PCM16.
#[derive(Debug, Clone)]
pub struct SndChunk {
    pub total_len: u32,
    pub sample_rate: u32,
    pub channels: u16,
    pub unknown: u32,
    pub payload: Vec<u8>,
}

pub const SND_HEADER_LEN: usize = 18;

impl SndChunk {
    /// Reads a `SND ` chunk starting exactly at `offset` in `data`.
    pub fn read_at(data: &[u8], offset: u64) -> Result<SndChunk> {
        let mut c = Cursor::at(data, offset as usize);
        c.expect_magic("SND ", "SND")?;
        let total_len = c.read_u32()?;
        let sample_rate = c.read_u32()?;
        let channels = c.read_u16()?;
        let unknown = c.read_u32()?;
        let payload_len = (total_len as usize)
            .checked_sub(SND_HEADER_LEN)
            .ok_or(DdiError::CorruptInput {
                path: format!("SND @ {offset}"),
                reason: format!("total_len {total_len} shorter than header ({SND_HEADER_LEN})"),
            })?;
        let payload = c.read_bytes(payload_len)?.to_vec();
        Ok(SndChunk { total_len, sample_rate, channels, unknown, payload })
    }

    /// Byte range `[offset, offset+total_len)` this chunk occupies.
    pub fn span(&self, offset: u64) -> (u64, u64) {
        (offset, offset + self.total_len as u64)
    }
}

/// Reads an entire `FRM2` chunk (magic + length-prefixed body) verbatim, for
/// copying into a new `.DAT` file without reinterpreting its contents.
pub fn read_frm2_raw(data: &[u8], offset: u64) -> Result<&[u8]> {
    let mut c = Cursor::at(data, offset as usize);
    c.expect_magic("FRM2", "FRM2")?;
    let len = c.read_u32()? as usize;
    let start = offset as usize;
    data.get(start..start + len).ok_or(DdiError::UnexpectedEof { pos: start, needed: len })
}

/// Reads an entire `SND ` chunk verbatim (magic + length-prefixed body),
/// for splicing into a new `.DAT` file without decoding its payload.
pub fn read_snd_raw(data: &[u8], offset: u64) -> Result<&[u8]> {
    let mut c = Cursor::at(data, offset as usize);
    c.expect_magic("SND ", "SND")?;
    let len = c.read_u32()? as usize;
    let start = offset as usize;
    data.get(start..start + len).ok_or(DdiError::UnexpectedEof { pos: start, needed: len })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_snd(payload: &[u8], sample_rate: u32, channels: u16) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"SND ");
        let total_len = (SND_HEADER_LEN + payload.len()) as u32;
        buf.extend_from_slice(&total_len.to_le_bytes());
        buf.extend_from_slice(&sample_rate.to_le_bytes());
        buf.extend_from_slice(&channels.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn reads_header_and_payload() {
        let payload = [1, 2, 3, 4, 5, 6];
        let buf = build_snd(&payload, 44100, 1);
        let chunk = SndChunk::read_at(&buf, 0).unwrap();
        assert_eq!(chunk.sample_rate, 44100);
        assert_eq!(chunk.channels, 1);
        assert_eq!(chunk.payload, payload);
    }

    #[test]
    fn span_covers_whole_chunk() {
        let buf = build_snd(&[0; 4], 44100, 1);
        let chunk = SndChunk::read_at(&buf, 10).unwrap();
        let (start, end) = chunk.span(10);
        assert_eq!(start, 10);
        assert_eq!(end, 10 + buf.len() as u64);
    }

    #[test]
    fn read_snd_raw_returns_whole_chunk_bytes() {
        let buf = build_snd(&[9; 3], 22050, 2);
        let raw = read_snd_raw(&buf, 0).unwrap();
        assert_eq!(raw, &buf[..]);
    }
}
