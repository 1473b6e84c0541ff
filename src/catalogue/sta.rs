//! `STA `/`STAu`/`STAp` parsing — the stationary (steady-state) unit table.

use super::{EprRef, SndRef};
use crate::cursor::Cursor;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct StationaryParam {
    /// The `STAp` index string (kept as read; usually a small decimal).
    pub index: String,
    pub unknown1: [u8; 0x0a],
    pub pitch1: f32,
    pub pitch2: f32,
    pub unknown2: f32,
    pub dynamics: f32,
    pub unknown3: f32,
    pub snd_length: u32,
    pub epr: Vec<EprRef>,
    pub fs: u32,
    pub snd: SndRef,
    pub unknown4: [u8; 0x10],
}

#[derive(Debug, Clone)]
pub struct StationaryUnit {
    pub index: u32,
    pub phoneme: String,
    pub params: Vec<StationaryParam>,
}

pub fn read_sta(c: &mut Cursor) -> Result<Vec<StationaryUnit>> {
    c.expect_u64(0, "STA")?;
    let arr_tail = c.read_arr()?;
    debug_assert_eq!(u32::from_le_bytes(arr_tail), 1);
    c.expect_u64(0, "STA")?;

    c.expect_magic("STA ", "STA")?;
    let _unknown = c.read_u32()?;
    c.expect_u64(1, "STA")?;
    let stau_num = c.read_u32()?;

    let mut units = Vec::with_capacity(stau_num as usize);
    for _ in 0..stau_num {
        c.expect_u64(0, "STAu")?;
        c.expect_magic("STAu", "STAu")?;
        let _unknown = c.read_u32()?;
        c.expect_u32(1, "STAu")?;
        c.expect_u32(0, "STAu")?;
        let stau_idx = c.read_u32()?;
        c.expect_fill(8, 0xFF, "STAu")?;
        let stap_num = c.read_u32()?;

        let mut params = Vec::with_capacity(stap_num as usize);
        for _ in 0..stap_num {
            c.expect_u64(0, "STAp")?;
            c.expect_magic("STAp", "STAp")?;
            let _unknown = c.read_u32()?;
            c.expect_u32(0, "STAp")?;
            c.expect_u32(1, "STAp")?;
            let unknown1 = c.read_array::<0x0a>()?;
            let pitch1 = c.read_f32()?;
            let pitch2 = c.read_f32()?;
            let unknown2 = c.read_f32()?;
            let dynamics = c.read_f32()?;
            let unknown3 = c.read_f32()?;

            c.expect_u32(0, "STAp")?;
            c.expect_u32(2, "STAp")?;
            c.expect_u64(0x3D, "STAp")?;
            c.expect_magic("EMPT", "STAp")?;
            let _unknown = c.read_u32()?;
            let tag = c.read_pstring()?;
            debug_assert_eq!(tag, "SND");
            let snd_length = c.read_u32()?;
            c.expect_u32(0, "STAp")?;
            c.expect_magic("EMPT", "STAp")?;
            let _unknown = c.read_u32()?;
            let tag = c.read_pstring()?;
            debug_assert_eq!(tag, "EpR");
            let _epr_num_marker = c.read_u32()?;
            let epr_num = c.read_u32()?;
            let mut epr = Vec::with_capacity(epr_num as usize);
            for _ in 0..epr_num {
                let site = c.pos() as u64;
                let offset = c.read_u64()?;
                epr.push(EprRef { site, offset });
            }
            let fs = c.read_u32()?;
            c.expect_bytes(&[0x01, 0x00], "STAp")?;
            let identifier = c.read_u32()?;
            let site = c.pos() as u64;
            let offset = c.read_u64()?;
            let snd = SndRef { site, offset, identifier };

            let unknown4 = c.read_array::<0x10>()?;
            let index = c.read_pstring()?;

            params.push(StationaryParam {
                index,
                unknown1,
                pitch1,
                pitch2,
                unknown2,
                dynamics,
                unknown3,
                snd_length,
                epr,
                fs,
                snd,
                unknown4,
            });
        }
        params.sort_by(|a, b| a.index.cmp(&b.index));
        let phoneme = c.read_pstring()?;
        units.push(StationaryUnit { index: stau_idx, phoneme, params });
    }
    units.sort_by_key(|u| u.index);

    let tag = c.read_pstring()?;
    debug_assert_eq!(tag, "normal");
    let tag = c.read_pstring()?;
    debug_assert_eq!(tag, "stationary");

    Ok(units)
}
