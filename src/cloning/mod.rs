//! Voice-cloning pipeline: external service client and the training trigger

mod client;
mod trainer;

pub use client::{CloneApi, CloneClient, RemoteRecording, RemoteVoice};
pub use trainer::{Trainer, TrainingReport};
