//! Fixed-duration chunking of a recording
//!
//! Chunks carry the source's WavSpec and copy samples verbatim, so
//! re-chunking is lossless for the 16-bit PCM recordings the store writes.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Path of chunk `index` inside `dir`
#[must_use]
pub fn chunk_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("chunk_{index}.wav"))
}

/// Path of the transcript written beside chunk `index`
#[must_use]
pub fn transcript_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("chunk_{index}.txt"))
}

/// Split `path` into chunks of `chunk_len_ms` under `out_dir`
///
/// Writes `chunk_0.wav .. chunk_{n-1}.wav` where
/// `n = ceil(duration_ms / chunk_len_ms)`. Every chunk except possibly the
/// last holds exactly `chunk_len_ms` of audio; the last holds the remainder.
/// Creates `out_dir` if absent. Returns the number of chunks written.
///
/// # Errors
///
/// Returns error if the source cannot be decoded as 16-bit PCM, the chunk
/// length is zero, or a chunk cannot be written
pub fn split(path: &Path, out_dir: &Path, chunk_len_ms: u64) -> Result<usize> {
    if chunk_len_ms == 0 {
        return Err(Error::Audio("chunk length must be positive".to_string()));
    }

    let mut reader = hound::WavReader::open(path).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();
    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(Error::Audio(format!(
            "{} is not 16-bit PCM",
            path.display()
        )));
    }

    let frames_per_chunk = (u64::from(spec.sample_rate) * chunk_len_ms / 1000) as usize;
    if frames_per_chunk == 0 {
        return Err(Error::Audio(
            "chunk length shorter than one frame".to_string(),
        ));
    }
    let samples_per_chunk = frames_per_chunk * usize::from(spec.channels);

    std::fs::create_dir_all(out_dir)?;

    let samples: Vec<i16> = reader
        .samples::<i16>()
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| Error::Audio(e.to_string()))?;

    let mut count = 0;
    for (index, chunk) in samples.chunks(samples_per_chunk).enumerate() {
        let mut writer = hound::WavWriter::create(chunk_path(out_dir, index), spec)
            .map_err(|e| Error::Audio(e.to_string()))?;
        for &sample in chunk {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }
        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
        count = index + 1;
    }

    tracing::debug!(
        source = %path.display(),
        chunks = count,
        chunk_len_ms,
        "recording split"
    );
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * usize::from(channels) {
            #[allow(clippy::cast_possible_truncation)]
            writer.write_sample((i % 1000) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn exact_multiple_produces_full_chunks_only() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.wav");
        write_wav(&src, 1000, 1, 3000); // 3s at 1kHz

        let out = dir.path().join("out");
        let count = split(&src, &out, 1000).unwrap();
        assert_eq!(count, 3);

        for i in 0..3 {
            let reader = hound::WavReader::open(chunk_path(&out, i)).unwrap();
            assert_eq!(reader.duration(), 1000);
        }
        assert!(!chunk_path(&out, 3).exists());
    }

    #[test]
    fn remainder_lands_in_final_short_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.wav");
        write_wav(&src, 1000, 2, 2500); // 2.5s stereo

        let out = dir.path().join("out");
        let count = split(&src, &out, 1000).unwrap();
        assert_eq!(count, 3);

        let last = hound::WavReader::open(chunk_path(&out, 2)).unwrap();
        assert_eq!(last.duration(), 500);
    }

    #[test]
    fn empty_recording_yields_zero_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.wav");
        write_wav(&src, 1000, 1, 0);

        let out = dir.path().join("out");
        assert_eq!(split(&src, &out, 1000).unwrap(), 0);
        assert!(out.exists());
    }

    #[test]
    fn zero_chunk_length_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.wav");
        write_wav(&src, 1000, 1, 10);

        let err = split(&src, &dir.path().join("out"), 0).unwrap_err();
        assert!(matches!(err, Error::Audio(_)));
    }

    #[test]
    fn concatenated_chunks_reproduce_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.wav");
        write_wav(&src, 800, 2, 1900); // not a multiple of the chunk size

        let out = dir.path().join("out");
        let count = split(&src, &out, 1000).unwrap();

        let original: Vec<i16> = hound::WavReader::open(&src)
            .unwrap()
            .into_samples()
            .map(|s| s.unwrap())
            .collect();

        let mut rejoined = Vec::new();
        for i in 0..count {
            let reader = hound::WavReader::open(chunk_path(&out, i)).unwrap();
            rejoined.extend(reader.into_samples().map(|s: std::result::Result<i16, _>| s.unwrap()));
        }
        assert_eq!(rejoined, original);
    }
}
