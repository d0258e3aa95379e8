//! Duration inspection for stored recordings

use std::path::Path;

use crate::{Error, Result};

/// Duration of a WAV file in seconds
///
/// # Errors
///
/// Returns `Error::NoRecording` if the file does not exist and
/// `Error::Audio` if it is malformed or carries a zero sample rate
pub fn duration_secs(path: &Path) -> Result<f64> {
    if !path.exists() {
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        return Err(Error::NoRecording(name));
    }

    let reader = hound::WavReader::open(path).map_err(|e| Error::Audio(e.to_string()))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(Error::Audio(format!(
            "{} has a zero sample rate",
            path.display()
        )));
    }

    // duration() counts inter-channel frames, independent of channel count
    Ok(f64::from(reader.duration()) / f64::from(spec.sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::recording_spec;

    #[test]
    fn missing_file_reports_no_recording() {
        let dir = tempfile::tempdir().unwrap();
        let err = duration_secs(&dir.path().join("ghost.wav")).unwrap_err();
        assert!(matches!(err, Error::NoRecording(name) if name == "ghost"));
    }

    #[test]
    fn malformed_file_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.wav");
        std::fs::write(&path, b"not a wav at all").unwrap();
        assert!(matches!(duration_secs(&path), Err(Error::Audio(_))));
    }

    #[test]
    fn duration_counts_frames_not_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");

        // One second of stereo audio at the recording spec
        let spec = recording_spec();
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..spec.sample_rate * u32::from(spec.channels) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        let secs = duration_secs(&path).unwrap();
        assert!((secs - 1.0).abs() < 1e-9);
    }
}
