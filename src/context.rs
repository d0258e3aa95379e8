//! Shared application context
//!
//! One context is built at startup and handed to every handler; there is no
//! global mutable bot state. It owns the collaborator clients and the
//! per-guild capture sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{AudioSegment, RecordingStore};
use crate::cloning::{CloneClient, Trainer};
use crate::completion::CompletionClient;
use crate::config::Config;
use crate::stt::SpeechToText;
use crate::voice::SessionMap;
use crate::Result;

/// Collaborator handles and capture state shared by all handlers
pub struct AppContext {
    /// Startup configuration
    pub config: Config,

    /// Completion API client
    pub completion: CompletionClient,

    /// Capture-to-training pipeline
    pub trainer: Trainer,

    /// On-disk recording layout
    pub store: RecordingStore,

    /// Sender feeding the single audio writer task
    pub audio_tx: mpsc::UnboundedSender<AudioSegment>,

    /// Active capture sessions, one per guild; shared with the idle
    /// watchdog so a disconnect also retires the session
    pub sessions: SessionMap,
}

impl AppContext {
    /// Build the context and spawn the audio writer task
    ///
    /// # Errors
    ///
    /// Returns error if any collaborator client rejects its credentials
    pub fn new(config: Config) -> Result<(Arc<Self>, JoinHandle<()>)> {
        let store = RecordingStore::new(&config.recordings_dir);
        let (audio_tx, writer_task) = store.clone().spawn_writer();

        let completion =
            CompletionClient::new(config.openai_api_key.clone(), config.completion.clone())?;
        let stt = SpeechToText::new(config.openai_api_key.clone())?;
        let cloning = CloneClient::new(config.clone_api_key.clone(), config.clone_api_url.clone())?;
        let trainer = Trainer::new(
            store.clone(),
            stt,
            cloning,
            config.capture.chunk_len_ms,
            config.capture.min_training_secs,
        );

        let context = Arc::new(Self {
            config,
            completion,
            trainer,
            store,
            audio_tx,
            sessions: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
        });
        Ok((context, writer_task))
    }
}
