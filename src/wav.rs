//! WAV container writing. Out of scope for the core per the design ("standard
//! RIFF/WAV, no bespoke logic"), delegated entirely to `hound` the way the
//! wider corpus does for this exact task (see `tosmole`'s `fsb.rs`).

use std::path::Path;

use crate::chunk::SndChunk;
use crate::error::Result;

/// Writes a decoded `SND` chunk's payload as 16-bit PCM WAV.
pub fn write_wav(path: &Path, chunk: &SndChunk) -> Result<()> {
    let spec = hound::WavSpec {
        channels: chunk.channels,
        sample_rate: chunk.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for sample in chunk.payload.chunks_exact(2) {
        let value = i16::from_le_bytes([sample[0], sample[1]]);
        writer.write_sample(value)?;
    }
    writer.finalize()?;
    Ok(())
}

impl From<hound::Error> for crate::error::DdiError {
    fn from(err: hound::Error) -> Self {
        crate::error::DdiError::Io(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    }
}
