//! `DBV ` parsing — the single database-version marker, bumped in place by
//! the mix-in orchestrator when a `vqm` stream is added to a bank that
//! didn't already have one.

use crate::cursor::Cursor;
use crate::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct DatabaseVersion {
    pub unknown: u32,
    /// 4 for AVANNA-derived banks, 5 otherwise, per the reference tool's
    /// comment; bumped by one when `vqm` mix-in adds a VQM section to a
    /// bank that had none.
    pub version: u32,
    /// Absolute byte position of the `version` field, i.e. `dbv_offset +
    /// 0x18` — the site `mixins_ddb.py` patches directly.
    pub version_site: u64,
}

pub fn read_dbv(c: &mut Cursor) -> Result<DatabaseVersion> {
    c.expect_u64(0, "DBV")?;
    c.expect_magic("DBV ", "DBV")?;
    let unknown = c.read_u32()?;
    c.expect_u64(1, "DBV")?;
    let version_site = c.pos() as u64;
    let version = c.read_u32()?;
    Ok(DatabaseVersion { unknown, version, version_site })
}
