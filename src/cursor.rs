//! Byte-cursor primitives for reading the tagged binary index format, and a
//! companion patcher for writing fixed-width fields back in place.
//!
//! Grounded in `dtype.rs`'s `peek_magic!`/`peek_byte!`/`read_n_bytes!` macro
//! idiom, reworked as methods on an owned-position cursor over a borrowed
//! slice rather than a `Read + Seek` file handle, since the whole index is
//! read into memory up front.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{DdiError, Result};

/// A read-only cursor over a byte slice with little-endian primitive decoding.
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Cursor { data, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(DdiError::UnexpectedEof {
            pos: self.pos,
            needed: n,
        })?;
        if end > self.data.len() {
            return Err(DdiError::UnexpectedEof {
                pos: self.pos,
                needed: end - self.data.len(),
            });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Peeks `n` bytes without advancing the cursor.
    pub fn peek(&self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(DdiError::UnexpectedEof {
            pos: self.pos,
            needed: n,
        })?;
        if end > self.data.len() {
            return Err(DdiError::UnexpectedEof {
                pos: self.pos,
                needed: end - self.data.len(),
            });
        }
        Ok(&self.data[self.pos..end])
    }

    pub fn peek_magic(&self) -> Result<[u8; 4]> {
        let bytes = self.peek(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.take(N)?;
        let mut buf = [0u8; N];
        buf.copy_from_slice(bytes);
        Ok(buf)
    }

    /// Reads a 4-byte ASCII magic and asserts it matches `expected`.
    pub fn expect_magic(&mut self, expected: &'static str, section: &'static str) -> Result<()> {
        let bytes = self.read_array::<4>()?;
        if bytes.as_slice() != expected.as_bytes() {
            return Err(DdiError::AssertionFailed {
                pos: self.pos - 4,
                section,
                expected: format!("magic {expected:?}"),
                found: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        Ok(())
    }

    /// Asserts the next `n` bytes all equal `byte`.
    pub fn expect_fill(&mut self, n: usize, byte: u8, section: &'static str) -> Result<()> {
        let pos = self.pos;
        let bytes = self.take(n)?;
        if bytes.iter().any(|&b| b != byte) {
            return Err(DdiError::AssertionFailed {
                pos,
                section,
                expected: format!("{n} bytes of 0x{byte:02x}"),
                found: bytes_to_hex(bytes),
            });
        }
        Ok(())
    }

    pub fn expect_u32(&mut self, expected: u32, section: &'static str) -> Result<()> {
        let pos = self.pos;
        let found = self.read_u32()?;
        if found != expected {
            return Err(DdiError::AssertionFailed {
                pos,
                section,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    pub fn expect_bytes(&mut self, expected: &[u8], section: &'static str) -> Result<()> {
        let pos = self.pos;
        let found = self.take(expected.len())?;
        if found != expected {
            return Err(DdiError::AssertionFailed {
                pos,
                section,
                expected: bytes_to_hex(expected),
                found: bytes_to_hex(found),
            });
        }
        Ok(())
    }

    pub fn expect_u64(&mut self, expected: u64, section: &'static str) -> Result<()> {
        let pos = self.pos;
        let found = self.read_u64()?;
        if found != expected {
            return Err(DdiError::AssertionFailed {
                pos,
                section,
                expected: expected.to_string(),
                found: found.to_string(),
            });
        }
        Ok(())
    }

    /// Reads a 4-byte length prefix followed by that many bytes of ASCII text.
    pub fn read_pstring(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads the `ARR ` sub-block used throughout the format as a fixed
    /// one-entry array wrapper; returns its trailing 4-byte payload.
    pub fn read_arr(&mut self) -> Result<[u8; 4]> {
        self.expect_magic("ARR ", "ARR")?;
        let _reserved = self.read_u32()?;
        self.expect_u64(1, "ARR")?;
        self.read_array::<4>()
    }

    /// True end-of-data check.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}

/// Finds the first occurrence of `needle` in `haystack` at or after `from`.
pub fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Scans backward from `offset` (exclusive) looking for `needle`, stopping
/// after `limit` bytes of backward travel. Mirrors `reverse_search` /
/// `stream_reverse_search` in the Python reference: both start the search
/// `len(needle)` bytes before `offset` and walk one byte at a time.
pub fn reverse_search(haystack: &[u8], needle: &[u8], offset: usize, limit: Option<usize>) -> Option<usize> {
    let start = offset.checked_sub(needle.len())?;
    let limit = limit.unwrap_or(start);
    let mut i = start as isize;
    let floor = start as isize - limit as isize;
    while i > 0 && i >= floor {
        let idx = i as usize;
        if haystack.get(idx..idx + needle.len()) == Some(needle) {
            return Some(idx);
        }
        i -= 1;
    }
    None
}

/// A mutable byte buffer supporting fixed-width little-endian patch writes,
/// used exclusively by the offset-rewrite engine (component E).
pub struct Patcher<'a> {
    data: &'a mut Vec<u8>,
}

impl<'a> Patcher<'a> {
    pub fn new(data: &'a mut Vec<u8>) -> Self {
        Patcher { data }
    }

    pub fn write_u64_at(&mut self, site: u64, value: u64) -> Result<()> {
        let site = usize::try_from(site)?;
        let end = site.checked_add(8).ok_or(DdiError::UnexpectedEof { pos: site, needed: 8 })?;
        if end > self.data.len() {
            return Err(DdiError::UnexpectedEof { pos: site, needed: end - self.data.len() });
        }
        LittleEndian::write_u64(&mut self.data[site..end], value);
        Ok(())
    }

    pub fn write_u32_at(&mut self, site: u64, value: u32) -> Result<()> {
        let site = usize::try_from(site)?;
        let end = site.checked_add(4).ok_or(DdiError::UnexpectedEof { pos: site, needed: 4 })?;
        if end > self.data.len() {
            return Err(DdiError::UnexpectedEof { pos: site, needed: end - self.data.len() });
        }
        LittleEndian::write_u32(&mut self.data[site..end], value);
        Ok(())
    }

    pub fn splice(&mut self, start: usize, end: usize, replacement: &[u8]) {
        self.data.splice(start..end, replacement.iter().copied());
    }
}

/// Appends a little-endian `u64` to a growing buffer (used when building new
/// sections such as synthesized VQM blocks).
pub fn push_u64_le(buf: &mut Vec<u8>, value: u64) {
    let mut tmp = [0u8; 8];
    LittleEndian::write_u64(&mut tmp, value);
    buf.extend_from_slice(&tmp);
}

pub fn push_u32_le(buf: &mut Vec<u8>, value: u32) {
    let mut tmp = [0u8; 4];
    LittleEndian::write_u32(&mut tmp, value);
    buf.extend_from_slice(&tmp);
}

pub fn push_f32_le(buf: &mut Vec<u8>, value: f32) {
    let mut tmp = [0u8; 4];
    LittleEndian::write_f32(&mut tmp, value);
    buf.extend_from_slice(&tmp);
}

pub fn push_pstring(buf: &mut Vec<u8>, s: &str) {
    push_u32_le(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_primitives_in_sequence() {
        let data = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0xAB, 0xCD];
        let mut c = Cursor::new(&data);
        assert_eq!(c.read_u32().unwrap(), 1);
        assert_eq!(c.read_u16().unwrap(), 2);
        assert_eq!(c.read_u8().unwrap(), 0xAB);
        assert_eq!(c.read_u8().unwrap(), 0xCD);
    }

    #[test]
    fn peek_does_not_advance() {
        let data = b"PHDC\x00\x00\x00\x00";
        let c = Cursor::new(data);
        assert_eq!(&c.peek_magic().unwrap(), b"PHDC");
        assert_eq!(c.pos(), 0);
    }

    #[test]
    fn expect_magic_reports_position_and_found_bytes() {
        let data = b"XXXX";
        let mut c = Cursor::new(data);
        let err = c.expect_magic("PHDC", "phdc").unwrap_err();
        match err {
            DdiError::AssertionFailed { pos, found, .. } => {
                assert_eq!(pos, 0);
                assert_eq!(found, "XXXX");
            }
            _ => panic!("wrong error variant"),
        }
    }

    #[test]
    fn unexpected_eof_when_reading_past_end() {
        let data = [0u8; 2];
        let mut c = Cursor::new(&data);
        assert!(c.read_u32().is_err());
    }

    #[test]
    fn reverse_search_finds_nearest_preceding_match() {
        let data = b"ARR hello ARR world";
        // offset points just after the second "ARR " occurrence's header region
        let offset = 19;
        let found = reverse_search(data, b"ARR ", offset, None).unwrap();
        assert_eq!(&data[found..found + 4], b"ARR ");
    }

    #[test]
    fn patcher_writes_u64_in_place() {
        let mut buf = vec![0u8; 16];
        {
            let mut p = Patcher::new(&mut buf);
            p.write_u64_at(4, 0x1122334455667788).unwrap();
        }
        assert_eq!(
            &buf[4..12],
            &0x1122334455667788u64.to_le_bytes()[..]
        );
    }

    #[test]
    fn find_locates_first_occurrence() {
        let data = b"aaaSND bbbSND ccc";
        assert_eq!(find(data, b"SND ", 0), Some(3));
        assert_eq!(find(data, b"SND ", 4), Some(10));
    }
}
