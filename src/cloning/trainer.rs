//! Training trigger: gate on accumulated duration, split, transcribe and
//! upload
//!
//! Uploads use full-replace semantics: every remote recording under the
//! speaker's voice is deleted before the new chunk set goes up. A failed
//! chunk is skipped with a warning and the loop continues; there is no
//! rollback and no resumption checkpoint.

use crate::audio::{chunker, inspect, RecordingStore};
use crate::cloning::CloneApi;
use crate::stt::Transcriber;
use crate::{Error, Result};

/// Emotion label attached to every uploaded chunk until real labeling exists
const PLACEHOLDER_EMOTION: &str = "neutral";

/// Outcome of one training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Remote voice identifier the chunks were attached to
    pub voice_id: String,
    /// Seconds of audio that were split
    pub duration_secs: f64,
    /// Chunks written locally
    pub chunks_written: usize,
    /// Chunks uploaded with transcripts
    pub chunks_uploaded: usize,
    /// Chunks skipped after a transcription or upload failure
    pub chunks_skipped: usize,
}

/// Drives the capture-to-training-chunks pipeline for one speaker at a time
pub struct Trainer {
    store: RecordingStore,
    stt: Box<dyn Transcriber>,
    cloning: Box<dyn CloneApi>,
    chunk_len_ms: u64,
    min_training_secs: f64,
}

impl Trainer {
    /// Create a trainer over the given store and collaborators
    pub fn new(
        store: RecordingStore,
        stt: impl Transcriber + 'static,
        cloning: impl CloneApi + 'static,
        chunk_len_ms: u64,
        min_training_secs: f64,
    ) -> Self {
        Self {
            store,
            stt: Box::new(stt),
            cloning: Box::new(cloning),
            chunk_len_ms,
            min_training_secs,
        }
    }

    /// Check the duration gate for a speaker without side effects
    ///
    /// # Errors
    ///
    /// `Error::NoRecording` if nothing was captured,
    /// `Error::InsufficientAudio` below the threshold
    pub fn check_gate(&self, speaker_id: &str) -> Result<f64> {
        if !self.store.has_recording(speaker_id) {
            return Err(Error::NoRecording(speaker_id.to_string()));
        }
        let duration = inspect::duration_secs(&self.store.recording_path(speaker_id))?;
        if duration < self.min_training_secs {
            return Err(Error::InsufficientAudio {
                have_secs: duration,
                need_secs: self.min_training_secs,
            });
        }
        Ok(duration)
    }

    /// Run the full pipeline for one speaker
    ///
    /// # Errors
    ///
    /// Propagates gate failures, split failures, and voice registration
    /// failures; per-chunk transcription/upload failures are skipped and
    /// counted in the report instead
    pub async fn train(&self, speaker_id: &str, display_name: &str) -> Result<TrainingReport> {
        // Gate before any directory is created; a missing recording must
        // leave the filesystem untouched
        let duration_secs = self.check_gate(speaker_id)?;

        let recording = self.store.recording_path(speaker_id);
        let chunk_dir = self.store.chunk_dir(speaker_id);

        tracing::info!(
            speaker = speaker_id,
            duration_secs,
            chunk_len_ms = self.chunk_len_ms,
            "splitting recording"
        );
        let chunks_written = {
            let recording = recording.clone();
            let chunk_dir = chunk_dir.clone();
            let chunk_len_ms = self.chunk_len_ms;
            tokio::task::spawn_blocking(move || chunker::split(&recording, &chunk_dir, chunk_len_ms))
                .await
                .map_err(|e| Error::Audio(format!("splitter task failed: {e}")))??
        };

        let voice = self.cloning.find_or_create_voice(display_name).await?;

        // Full replace: drop whatever the service already holds for this voice
        for stale in self.cloning.list_recordings(&voice.uuid).await? {
            if let Err(e) = self.cloning.delete_recording(&voice.uuid, &stale.uuid).await {
                tracing::warn!(recording = %stale.uuid, error = %e, "failed to delete stale recording");
            }
        }

        let mut chunks_uploaded = 0;
        let mut chunks_skipped = 0;
        for index in 0..chunks_written {
            match self.upload_chunk(&voice.uuid, speaker_id, index).await {
                Ok(()) => chunks_uploaded += 1,
                Err(e) => {
                    // No rollback: earlier chunks stay on the remote side
                    tracing::warn!(speaker = speaker_id, index, error = %e, "chunk skipped");
                    chunks_skipped += 1;
                }
            }
        }

        tracing::info!(
            speaker = speaker_id,
            voice = %voice.uuid,
            chunks_written,
            chunks_uploaded,
            chunks_skipped,
            "training upload finished"
        );

        Ok(TrainingReport {
            voice_id: voice.uuid,
            duration_secs,
            chunks_written,
            chunks_uploaded,
            chunks_skipped,
        })
    }

    /// Transcribe one chunk, persist the transcript beside it, upload both
    async fn upload_chunk(&self, voice_id: &str, speaker_id: &str, index: usize) -> Result<()> {
        let chunk_dir = self.store.chunk_dir(speaker_id);
        let chunk = chunker::chunk_path(&chunk_dir, index);

        // Transcription is scoped to this one chunk file
        let transcript = self.stt.transcribe_file(&chunk).await?;
        tokio::fs::write(chunker::transcript_path(&chunk_dir, index), &transcript).await?;

        self.cloning
            .create_recording(
                voice_id,
                &chunk,
                &format!("chunk_{index}"),
                &transcript,
                true,
                PLACEHOLDER_EMOTION,
            )
            .await?;
        Ok(())
    }
}
