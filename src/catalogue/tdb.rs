//! `TDB `/`TMM ` parsing — the timbre dictionary section.

use crate::cursor::Cursor;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct TimbreDictionary {
    /// `(timbre model index, phoneme)` pairs in on-disk order.
    pub entries: Vec<(u32, String)>,
}

const TMM_STRINGS: [&str; 3] = ["pitch", "dynamics", "opening"];

pub fn read_tdb(c: &mut Cursor) -> Result<TimbreDictionary> {
    c.expect_fill(8, 0xFF, "TDB")?;
    c.expect_magic("TDB ", "TDB")?;
    let _unknown = c.read_u32()?;
    c.expect_u64(1, "TDB")?;
    let tmm_num = c.read_u32()?;

    let mut entries = Vec::with_capacity(tmm_num as usize);
    for _ in 0..tmm_num {
        c.expect_fill(8, 0xFF, "TMM")?;
        c.expect_magic("TMM ", "TMM")?;
        let _unknown = c.read_u32()?;
        c.expect_u64(1, "TMM")?;
        let idx = c.read_u32()?;
        let str_num = c.read_u32()?;
        debug_assert_eq!(str_num, 3);
        for expected in TMM_STRINGS.iter().take(str_num as usize) {
            c.expect_fill(8, 0xFF, "TMM.string")?;
            let arr_tail = c.read_arr()?;
            debug_assert_eq!(u32::from_le_bytes(arr_tail), 0);
            let s = c.read_pstring()?;
            debug_assert_eq!(&s, expected);
        }
        let phoneme = c.read_pstring()?;
        entries.push((idx, phoneme));
    }
    let _timbre = c.read_pstring()?;
    Ok(TimbreDictionary { entries })
}
