//! Training pipeline integration tests
//!
//! Tests the split/transcribe/upload flow with mock collaborators standing
//! in for the transcription and cloning services.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use mimic::audio::RecordingStore;
use mimic::cloning::{CloneApi, RemoteRecording, RemoteVoice, Trainer};
use mimic::stt::Transcriber;
use mimic::{Error, Result};
use tokio::sync::Mutex;

/// Mock transcriber with an optional per-file failure
struct MockTranscriber {
    fail_on: Option<&'static str>,
}

#[async_trait]
impl Transcriber for MockTranscriber {
    async fn transcribe_file(&self, path: &Path) -> Result<String> {
        let name = path.file_name().unwrap().to_string_lossy();
        if Some(name.as_ref()) == self.fail_on {
            return Err(Error::Stt(format!("no speech detected in {name}")));
        }
        Ok(format!("transcript of {name}"))
    }
}

/// Mock cloning service recording every call in order
struct MockCloneApi {
    existing: Vec<RemoteRecording>,
    ops: Arc<Mutex<Vec<String>>>,
}

impl MockCloneApi {
    fn new(existing: Vec<RemoteRecording>) -> Self {
        Self {
            existing,
            ops: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl CloneApi for MockCloneApi {
    async fn find_or_create_voice(&self, name: &str) -> Result<RemoteVoice> {
        self.ops.lock().await.push(format!("voice:{name}"));
        Ok(RemoteVoice {
            uuid: "voice-1".to_string(),
            name: name.to_string(),
        })
    }

    async fn list_recordings(&self, _voice_id: &str) -> Result<Vec<RemoteRecording>> {
        Ok(self.existing.clone())
    }

    async fn delete_recording(&self, _voice_id: &str, recording_id: &str) -> Result<()> {
        self.ops.lock().await.push(format!("delete:{recording_id}"));
        Ok(())
    }

    async fn create_recording(
        &self,
        _voice_id: &str,
        _audio_path: &Path,
        name: &str,
        transcript: &str,
        _is_active: bool,
        _emotion: &str,
    ) -> Result<RemoteRecording> {
        assert!(!transcript.is_empty());
        self.ops.lock().await.push(format!("upload:{name}"));
        Ok(RemoteRecording {
            uuid: format!("rec-{name}"),
            name: name.to_string(),
        })
    }
}

fn remote(uuid: &str) -> RemoteRecording {
    RemoteRecording {
        uuid: uuid.to_string(),
        name: uuid.to_string(),
    }
}

/// Write a mono 1kHz recording of `secs` seconds for `speaker`
fn write_recording(store: &RecordingStore, speaker: &str, secs: u32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 1000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    std::fs::create_dir_all(store.root()).unwrap();
    let mut writer = hound::WavWriter::create(store.recording_path(speaker), spec).unwrap();
    for i in 0..secs * spec.sample_rate {
        writer.write_sample((i % 100) as i16).unwrap();
    }
    writer.finalize().unwrap();
}

#[tokio::test]
async fn retraining_replaces_stale_remote_recordings() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordingStore::new(dir.path());
    write_recording(&store, "alice", 3);

    let cloning = MockCloneApi::new(vec![remote("old-1"), remote("old-2")]);
    let ops = cloning.ops.clone();
    let trainer = Trainer::new(
        store,
        MockTranscriber { fail_on: None },
        cloning,
        1000,
        1.0,
    );

    let report = trainer.train("alice", "Alice").await.unwrap();
    assert_eq!(report.chunks_written, 3);
    assert_eq!(report.chunks_uploaded, 3);
    assert_eq!(report.chunks_skipped, 0);

    // Every stale remote recording is deleted before any chunk goes up
    let ops = ops.lock().await;
    assert_eq!(
        *ops,
        vec![
            "voice:Alice",
            "delete:old-1",
            "delete:old-2",
            "upload:chunk_0",
            "upload:chunk_1",
            "upload:chunk_2",
        ]
    );
}

#[tokio::test]
async fn failed_chunk_is_skipped_and_counted() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordingStore::new(dir.path());
    write_recording(&store, "bob", 3);

    let cloning = MockCloneApi::new(Vec::new());
    let ops = cloning.ops.clone();
    let trainer = Trainer::new(
        store,
        MockTranscriber {
            fail_on: Some("chunk_1.wav"),
        },
        cloning,
        1000,
        1.0,
    );

    let report = trainer.train("bob", "Bob").await.unwrap();
    assert_eq!(report.chunks_written, 3);
    assert_eq!(report.chunks_uploaded, 2);
    assert_eq!(report.chunks_skipped, 1);

    // The failed chunk never reaches the service; the rest still do
    let ops = ops.lock().await;
    assert_eq!(*ops, vec!["voice:Bob", "upload:chunk_0", "upload:chunk_2"]);
}

#[tokio::test]
async fn transcripts_are_written_beside_uploaded_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let store = RecordingStore::new(dir.path());
    write_recording(&store, "carol", 2);

    let chunk_dir = store.chunk_dir("carol");
    let trainer = Trainer::new(
        store,
        MockTranscriber { fail_on: None },
        MockCloneApi::new(Vec::new()),
        1000,
        1.0,
    );

    trainer.train("carol", "Carol").await.unwrap();

    for i in 0..2 {
        let transcript = std::fs::read_to_string(chunk_dir.join(format!("chunk_{i}.txt"))).unwrap();
        assert_eq!(transcript, format!("transcript of chunk_{i}.wav"));
    }
}
