//! Voice-cloning service client (Resemble-style REST API)

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

/// The slice of the cloning service the trainer depends on
///
/// Kept as a seam so the upload flow can be tested against a recording
/// double instead of the live service.
#[async_trait]
pub trait CloneApi: Send + Sync {
    /// Fetch the voice named `name`, creating it if absent
    async fn find_or_create_voice(&self, name: &str) -> Result<RemoteVoice>;

    /// List recordings attached to a voice
    async fn list_recordings(&self, voice_id: &str) -> Result<Vec<RemoteRecording>>;

    /// Delete one recording from a voice
    async fn delete_recording(&self, voice_id: &str, recording_id: &str) -> Result<()>;

    /// Upload one chunk with its transcript and emotion label
    async fn create_recording(
        &self,
        voice_id: &str,
        audio_path: &Path,
        name: &str,
        transcript: &str,
        is_active: bool,
        emotion: &str,
    ) -> Result<RemoteRecording>;
}

/// A voice identity on the cloning service
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVoice {
    /// Service-assigned identifier
    pub uuid: String,
    /// Human-readable name the voice was registered under
    pub name: String,
}

/// A recording attached to a remote voice
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRecording {
    /// Service-assigned identifier
    pub uuid: String,
    /// Name the recording was uploaded under
    pub name: String,
}

#[derive(Deserialize)]
struct ItemResponse<T> {
    item: T,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    items: Vec<T>,
}

/// Client for the external voice-cloning service
pub struct CloneClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl CloneClient {
    /// Create a new cloning client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(api_key: String, base_url: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "voice-cloning API key required".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn auth(&self) -> String {
        format!("Token {}", self.api_key)
    }

    /// List registered voices
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn list_voices(&self) -> Result<Vec<RemoteVoice>> {
        let response = self
            .client
            .get(format!("{}/voices", self.base_url))
            .header("Authorization", self.auth())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Cloning(format!("list voices {status}: {body}")));
        }

        let result: ListResponse<RemoteVoice> = response.json().await?;
        Ok(result.items)
    }

    /// Create a voice identity named `name`
    ///
    /// # Errors
    ///
    /// Returns error if the request fails
    pub async fn create_voice(&self, name: &str) -> Result<RemoteVoice> {
        let response = self
            .client
            .post(format!("{}/voices", self.base_url))
            .header("Authorization", self.auth())
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Cloning(format!("create voice {status}: {body}")));
        }

        let result: ItemResponse<RemoteVoice> = response.json().await?;
        tracing::info!(voice = %result.item.uuid, name, "voice created");
        Ok(result.item)
    }
}

#[async_trait]
impl CloneApi for CloneClient {
    async fn find_or_create_voice(&self, name: &str) -> Result<RemoteVoice> {
        if let Some(voice) = self
            .list_voices()
            .await?
            .into_iter()
            .find(|v| v.name == name)
        {
            tracing::debug!(voice = %voice.uuid, name, "reusing existing voice");
            return Ok(voice);
        }
        self.create_voice(name).await
    }

    async fn list_recordings(&self, voice_id: &str) -> Result<Vec<RemoteRecording>> {
        let response = self
            .client
            .get(format!("{}/voices/{voice_id}/recordings", self.base_url))
            .header("Authorization", self.auth())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Cloning(format!("list recordings {status}: {body}")));
        }

        let result: ListResponse<RemoteRecording> = response.json().await?;
        Ok(result.items)
    }

    async fn delete_recording(&self, voice_id: &str, recording_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(format!(
                "{}/voices/{voice_id}/recordings/{recording_id}",
                self.base_url
            ))
            .header("Authorization", self.auth())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Cloning(format!("delete recording {status}: {body}")));
        }

        tracing::debug!(voice = voice_id, recording = recording_id, "recording deleted");
        Ok(())
    }

    async fn create_recording(
        &self,
        voice_id: &str,
        audio_path: &Path,
        name: &str,
        transcript: &str,
        is_active: bool,
        emotion: &str,
    ) -> Result<RemoteRecording> {
        let audio = tokio::fs::read(audio_path).await?;

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio)
                    .file_name(name.to_string())
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Cloning(e.to_string()))?,
            )
            .text("name", name.to_string())
            .text("text", transcript.to_string())
            .text("is_active", is_active.to_string())
            .text("emotion", emotion.to_string());

        let response = self
            .client
            .post(format!("{}/voices/{voice_id}/recordings", self.base_url))
            .header("Authorization", self.auth())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Cloning(format!("create recording {status}: {body}")));
        }

        let result: ItemResponse<RemoteRecording> = response.json().await?;
        tracing::debug!(voice = voice_id, recording = %result.item.uuid, "chunk uploaded");
        Ok(result.item)
    }
}
