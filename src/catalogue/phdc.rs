//! `PHDC`/`PHG2`/category parsing — the phoneme dictionary section.

use crate::cursor::Cursor;
use crate::error::{DdiError, Result};

#[derive(Debug, Clone)]
pub struct Phg2Category {
    pub name: String,
    pub entries: Vec<(u32, String)>,
}

/// A single entry in a `PHDC` category table. Most entries are a 7-byte
/// tagged hex blob (`0x40` tag byte observed in the reference data); the
/// rest are all-zero placeholders rendered as an empty value.
#[derive(Debug, Clone)]
pub enum CategoryEntry {
    Value(String),
    Empty,
}

#[derive(Debug, Clone)]
pub struct PhdcCategory {
    pub name: String,
    pub entries: Vec<CategoryEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct PhonemeDictionary {
    pub voiced: Vec<String>,
    pub unvoiced: Vec<String>,
    pub phg2: Vec<Phg2Category>,
    pub categories: Vec<PhdcCategory>,
}

impl PhonemeDictionary {
    pub fn is_unvoiced(&self, phoneme: &str) -> bool {
        self.unvoiced.iter().any(|p| p == phoneme) || matches!(phoneme, "Sil" | "Asp" | "?")
    }
}

pub fn read_phdc(c: &mut Cursor) -> Result<PhonemeDictionary> {
    let section_start = c.pos();
    c.expect_magic("PHDC", "PHDC")?;
    let phdc_size = c.read_u32()? as usize;
    c.expect_u32(4, "PHDC")?;
    let phoneme_num = c.read_u32()?;

    let mut voiced = Vec::new();
    let mut unvoiced = Vec::new();
    for _ in 0..phoneme_num {
        let bytes = c.read_bytes(0x1F)?;
        let tag = bytes[bytes.len() - 1];
        if tag != 0 && tag != 1 {
            return Err(DdiError::AssertionFailed {
                pos: c.pos() - 1,
                section: "PHDC.phoneme",
                expected: "0 or 1".to_string(),
                found: tag.to_string(),
            });
        }
        let text = String::from_utf8_lossy(&bytes[..bytes.len() - 1])
            .trim_end_matches('\0')
            .to_string();
        if tag == 0 {
            voiced.push(text);
        } else {
            unvoiced.push(text);
        }
    }

    let phg2_start = c.pos();
    c.expect_magic("PHG2", "PHG2")?;
    let phg2_size = c.read_u32()? as usize;
    let category_num = c.read_u32()?;
    let mut phg2 = Vec::new();
    for _ in 0..category_num {
        let name = c.read_pstring()?;
        let entry_num = c.read_u32()?;
        let mut entries = Vec::new();
        for _ in 0..entry_num {
            let idx = c.read_u32()?;
            let value = c.read_pstring()?;
            entries.push((idx, value));
        }
        c.expect_u32(0, "PHG2")?;
        phg2.push(Phg2Category { name, entries });
    }
    // phg2_size measures from phg2_start to the end of the PHG2 block.
    let phg2_len = c.pos() - phg2_start;
    debug_assert_eq!(phg2_len, phg2_size + 8, "PHG2 block length mismatch");

    let category_count = c.read_u32()?;
    let category_size = phdc_size
        .checked_sub(phg2_size)
        .and_then(|v| v.checked_sub(0x10))
        .and_then(|v| v.checked_sub(0x1F * phoneme_num as usize))
        .and_then(|v| v.checked_sub(4))
        .ok_or(DdiError::AssertionFailed {
            pos: section_start,
            section: "PHDC.category_size",
            expected: "phdc_size large enough for phg2+phonemes+header".to_string(),
            found: format!("phdc_size={phdc_size}, phg2_size={phg2_size}, phoneme_num={phoneme_num}"),
        })?;
    let category_bytes = c.read_bytes(category_size)?;

    let mut categories = Vec::new();
    let mut offset = 0usize;
    for _ in 0..category_count {
        let name_bytes = &category_bytes[offset..offset + 0x20];
        let name = String::from_utf8_lossy(name_bytes).trim_end_matches('\0').to_string();
        let marker = u32::from_le_bytes(category_bytes[offset + 0x20..offset + 0x24].try_into().unwrap());
        if marker != 4 {
            return Err(DdiError::AssertionFailed {
                pos: section_start + offset + 0x20,
                section: "PHDC.category",
                expected: "4".to_string(),
                found: marker.to_string(),
            });
        }
        offset += 0x24;
        let mut entries = Vec::new();
        while offset < category_bytes.len() && category_bytes[offset] == 0 {
            if category_bytes[offset + 7] == 0x40 {
                let value = &category_bytes[offset..offset + 7];
                let start_idx = value.iter().position(|&b| b != 0).unwrap_or(0);
                let hex = value[start_idx..]
                    .iter()
                    .map(|b| format!("{b:02x}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                entries.push(CategoryEntry::Value(hex));
            } else {
                let chunk = u64::from_le_bytes(category_bytes[offset..offset + 8].try_into().unwrap());
                if chunk != 0 {
                    return Err(DdiError::AssertionFailed {
                        pos: section_start + offset,
                        section: "PHDC.category",
                        expected: "0".to_string(),
                        found: chunk.to_string(),
                    });
                }
                entries.push(CategoryEntry::Empty);
            }
            offset += 8;
        }
        categories.push(PhdcCategory { name, entries });
    }

    Ok(PhonemeDictionary { voiced, unvoiced, phg2, categories })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    fn push_pstr(buf: &mut Vec<u8>, s: &str) {
        push_u32(buf, s.len() as u32);
        buf.extend_from_slice(s.as_bytes());
    }

    #[test]
    fn reads_a_minimal_phdc_block() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"PHDC");
        let size_pos = buf.len();
        push_u32(&mut buf, 0); // placeholder size, patched below
        push_u32(&mut buf, 4);
        push_u32(&mut buf, 2); // phoneme_num
        let mut phoneme_entry = |text: &str, tag: u8| {
            let mut entry = vec![0u8; 0x1F];
            entry[..text.len()].copy_from_slice(text.as_bytes());
            entry[0x1E] = tag;
            buf.extend_from_slice(&entry);
        };
        phoneme_entry("a", 0);
        phoneme_entry("k", 1);

        let phg2_start = buf.len();
        buf.extend_from_slice(b"PHG2");
        let phg2_size_pos = buf.len();
        push_u32(&mut buf, 0);
        push_u32(&mut buf, 1); // category_num
        push_pstr(&mut buf, "vowel");
        push_u32(&mut buf, 1); // entry_num
        push_u32(&mut buf, 0); // idx
        push_pstr(&mut buf, "a");
        push_u32(&mut buf, 0); // terminator
        let phg2_size = (buf.len() - phg2_start) as u32 - 8;
        buf[phg2_size_pos..phg2_size_pos + 4].copy_from_slice(&phg2_size.to_le_bytes());

        push_u32(&mut buf, 0); // category_count == 0, category_size == 0

        let phdc_size = (buf.len() - 4) as u32 - 4; // bytes after size field
        buf[size_pos..size_pos + 4].copy_from_slice(&phdc_size.to_le_bytes());

        let mut c = Cursor::new(&buf);
        let phdc = read_phdc(&mut c).unwrap();
        assert_eq!(phdc.voiced, vec!["a".to_string()]);
        assert_eq!(phdc.unvoiced, vec!["k".to_string()]);
        assert_eq!(phdc.phg2.len(), 1);
        assert_eq!(phdc.phg2[0].name, "vowel");
        assert_eq!(phdc.phg2[0].entries, vec![(0, "a".to_string())]);
        assert!(phdc.categories.is_empty());
    }

    #[test]
    fn unvoiced_classification_includes_special_tokens() {
        let dict = PhonemeDictionary {
            unvoiced: vec!["k".to_string(), "t".to_string()],
            ..Default::default()
        };
        assert!(dict.is_unvoiced("k"));
        assert!(dict.is_unvoiced("Sil"));
        assert!(dict.is_unvoiced("Asp"));
        assert!(!dict.is_unvoiced("a"));
    }
}
