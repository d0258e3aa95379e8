//! Per-speaker recording accumulation
//!
//! Each speaker owns one WAV file under the recordings directory. Spans are
//! appended in arrival order and the file stays a valid WAV after every
//! append. Appends persist across capture sessions; a new `listen` never
//! truncates earlier audio.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::recording_spec;
use crate::{Error, Result};

/// A span of decoded PCM attributed to one speaker
#[derive(Debug)]
pub struct AudioSegment {
    /// Opaque speaker key (Discord user id rendered as a string)
    pub speaker_id: String,

    /// Interleaved 16-bit samples at the recording spec
    pub samples: Vec<i16>,
}

/// Owns the on-disk layout of recordings and chunk directories
#[derive(Debug, Clone)]
pub struct RecordingStore {
    root: PathBuf,
}

impl RecordingStore {
    /// Create a store rooted at `root` (created lazily on first append)
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root recordings directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the whole-session recording for a speaker
    #[must_use]
    pub fn recording_path(&self, speaker_id: &str) -> PathBuf {
        self.root.join(format!("{}.wav", sanitize(speaker_id)))
    }

    /// Directory that will hold a speaker's training chunks
    #[must_use]
    pub fn chunk_dir(&self, speaker_id: &str) -> PathBuf {
        self.root.join(sanitize(speaker_id))
    }

    /// Whether a recording exists for the speaker
    #[must_use]
    pub fn has_recording(&self, speaker_id: &str) -> bool {
        self.recording_path(speaker_id).exists()
    }

    /// Append a span of samples to the speaker's recording, creating the
    /// file on first use
    ///
    /// Blocking; call from a writer task or `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or the WAV cannot
    /// be written
    pub fn append(&self, speaker_id: &str, samples: &[i16]) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;

        let path = self.recording_path(speaker_id);
        let mut writer = if path.exists() {
            hound::WavWriter::append(&path).map_err(|e| Error::Audio(e.to_string()))?
        } else {
            hound::WavWriter::create(&path, recording_spec())
                .map_err(|e| Error::Audio(e.to_string()))?
        };

        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| Error::Audio(e.to_string()))?;
        }

        // Finalize rewrites the header so the file is valid after every span
        writer.finalize().map_err(|e| Error::Audio(e.to_string()))?;
        Ok(())
    }

    /// Spawn the single writer task that serializes all appends
    ///
    /// Every capture path funnels spans through the returned sender, so two
    /// concurrent sessions can never interleave writes within one file.
    /// Write failures are logged and the span dropped; the task keeps
    /// draining so one bad disk write does not stall capture.
    #[must_use]
    pub fn spawn_writer(self) -> (mpsc::UnboundedSender<AudioSegment>, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<AudioSegment>();

        let handle = tokio::spawn(async move {
            while let Some(segment) = rx.recv().await {
                let store = self.clone();
                let result = tokio::task::spawn_blocking(move || {
                    store.append(&segment.speaker_id, &segment.samples)
                })
                .await;

                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "failed to append audio span"),
                    Err(e) => tracing::error!(error = %e, "audio writer task panicked"),
                }
            }
            tracing::debug!("audio writer task finished");
        });

        (tx, handle)
    }
}

/// Restrict speaker keys to path-safe characters
fn sanitize(speaker_id: &str) -> String {
    speaker_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_creates_then_extends() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());

        store.append("42", &[1, 2, 3, 4]).unwrap();
        store.append("42", &[5, 6]).unwrap();

        let reader = hound::WavReader::open(store.recording_path("42")).unwrap();
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn speakers_get_independent_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());

        store.append("alice", &[1, 1]).unwrap();
        store.append("bob", &[2, 2]).unwrap();

        assert!(store.has_recording("alice"));
        assert!(store.has_recording("bob"));
        assert_ne!(store.recording_path("alice"), store.recording_path("bob"));
    }

    #[test]
    fn speaker_keys_are_path_safe() {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordingStore::new(dir.path());

        let path = store.recording_path("../../etc/passwd");
        assert!(path.starts_with(dir.path()));
        assert_eq!(path.file_name().unwrap(), "etcpasswd.wav");
    }
}
