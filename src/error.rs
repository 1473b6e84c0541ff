//! Error types shared across the whole crate.

use thiserror::Error;

/// Anything that can go wrong while parsing, rewriting, packing, extracting
/// or mixing in a voice bank.
#[derive(Error, Debug)]
pub enum DdiError {
    #[error("unexpected end of data at {pos} (0x{pos:x}), needed {needed} more byte(s)")]
    UnexpectedEof { pos: usize, needed: usize },

    #[error("assertion failed at {pos} (0x{pos:x}) in section {section}: expected {expected}, found {found}")]
    AssertionFailed {
        pos: usize,
        section: &'static str,
        expected: String,
        found: String,
    },

    #[error("section {section} not found in index")]
    SectionNotFound { section: &'static str },

    #[error("could not locate SND chunk for {context} near offset {offset} (0x{offset:x})")]
    SndNotFound { context: String, offset: u64 },

    #[error("could not locate FRM2 chunk for {context} at offset {offset} (0x{offset:x})")]
    Frm2NotFound { context: String, offset: u64 },

    #[error("source file missing for {phoneme_path}")]
    MissingSourceFile { phoneme_path: String },

    #[error("phoneme {phoneme:?} not found in donor stationary catalogue")]
    PhonemeNotFound { phoneme: String },

    #[error("input file {path} is corrupt: {reason}")]
    CorruptInput { path: String, reason: String },

    #[error("integer overflow/conversion error: {0}")]
    IntConversion(#[from] std::num::TryFromIntError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DdiError>;
