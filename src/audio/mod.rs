//! Audio persistence: per-speaker accumulation, duration inspection and
//! fixed-length chunking of WAV recordings

pub mod chunker;
pub mod inspect;
pub mod store;

pub use store::{AudioSegment, RecordingStore};

/// Sample rate of decoded Discord voice (48kHz)
pub const SAMPLE_RATE: u32 = 48_000;

/// Decoded Discord voice is interleaved stereo
pub const CHANNELS: u16 = 2;

/// WAV spec used for every recording and chunk (lossless 16-bit PCM)
#[must_use]
pub fn recording_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}
