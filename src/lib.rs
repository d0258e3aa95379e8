//! Mimic - Discord companion bot with a voice-clone training pipeline
//!
//! This library provides:
//! - Text relay to an LLM completion API (commands and passive replies)
//! - Per-user voice capture into per-speaker WAV recordings
//! - A training pipeline that chunks a recording, transcribes each chunk
//!   and uploads the labeled chunks to an external voice-cloning service
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Discord                          │
//! │   commands  │  messages  │  voice packets (Opus)     │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │                    Mimic bot                         │
//! │   dispatch  │  capture  │  store  │  chunker         │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │              External collaborators                  │
//! │   completions  │  transcription  │  voice cloning    │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod audio;
pub mod bot;
pub mod cloning;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod stt;
pub mod voice;

pub use config::Config;
pub use context::AppContext;
pub use error::{Error, Result};
