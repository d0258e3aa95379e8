//! Configuration for the mimic bot
//!
//! Everything is sourced from the environment (env > default). The three
//! credentials are required; startup fails fast with a configuration error
//! rather than proceeding with empty keys.

use std::path::PathBuf;

use crate::{Error, Result};

/// Default chunk length handed to the splitter, in milliseconds
pub const DEFAULT_CHUNK_LEN_MS: u64 = 10_000;

/// Minimum accumulated audio before training is allowed, in seconds
pub const DEFAULT_MIN_TRAINING_SECS: f64 = 300.0;

/// Mimic bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Discord bot token
    pub discord_token: String,

    /// OpenAI API key (completions + transcription)
    pub openai_api_key: String,

    /// Voice-cloning service API key
    pub clone_api_key: String,

    /// Voice-cloning service base URL
    pub clone_api_url: String,

    /// Directory holding per-speaker recordings and chunk directories
    pub recordings_dir: PathBuf,

    /// Completion API settings
    pub completion: CompletionConfig,

    /// Voice capture settings
    pub capture: CaptureConfig,

    /// Passive reply settings
    pub reply: ReplyConfig,

    /// Command prefix (e.g. "!")
    pub command_prefix: String,
}

/// Completion API settings
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Model identifier
    pub model: String,

    /// Maximum tokens per completion
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo-instruct".to_string(),
            max_tokens: 150,
            temperature: 0.5,
        }
    }
}

/// Voice capture settings
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Chunk length for the splitter, in milliseconds
    pub chunk_len_ms: u64,

    /// Minimum accumulated duration before training, in seconds
    pub min_training_secs: f64,

    /// Seconds of silence before the capture watchdog disconnects
    pub idle_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            chunk_len_ms: DEFAULT_CHUNK_LEN_MS,
            min_training_secs: DEFAULT_MIN_TRAINING_SECS,
            idle_timeout_secs: 180,
        }
    }
}

/// Passive reply settings
#[derive(Debug, Clone)]
pub struct ReplyConfig {
    /// Probability (0..1) of replying to an arbitrary message
    pub probability: f64,

    /// Channel names where mentions alone do not trigger a reply
    pub skip_channels: Vec<String>,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            probability: 0.01,
            skip_channels: vec!["general".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a required credential is missing or a
    /// numeric override fails to parse
    pub fn load() -> Result<Self> {
        let discord_token = required_env("DISCORD_TOKEN")?;
        let openai_api_key = required_env("OPENAI_API_KEY")?;
        let clone_api_key = required_env("VOICE_CLONE_API_KEY")?;

        let clone_api_url = std::env::var("VOICE_CLONE_API_URL")
            .unwrap_or_else(|_| "https://app.resemble.ai/api/v2".to_string());

        let recordings_dir = std::env::var("MIMIC_RECORDINGS_DIR")
            .map_or_else(|_| PathBuf::from("recordings"), PathBuf::from);

        let completion = CompletionConfig {
            model: std::env::var("MIMIC_COMPLETION_MODEL")
                .unwrap_or_else(|_| CompletionConfig::default().model),
            max_tokens: parsed_env("MIMIC_MAX_TOKENS", 150)?,
            temperature: parsed_env("MIMIC_TEMPERATURE", 0.5)?,
        };

        let capture = CaptureConfig {
            chunk_len_ms: parsed_env("MIMIC_CHUNK_LEN_MS", DEFAULT_CHUNK_LEN_MS)?,
            min_training_secs: parsed_env("MIMIC_MIN_TRAINING_SECS", DEFAULT_MIN_TRAINING_SECS)?,
            idle_timeout_secs: parsed_env("MIMIC_IDLE_TIMEOUT_SECS", 180)?,
        };

        let reply = ReplyConfig {
            probability: parsed_env("MIMIC_REPLY_PROBABILITY", 0.01)?,
            skip_channels: std::env::var("MIMIC_REPLY_SKIP_CHANNELS").map_or_else(
                |_| ReplyConfig::default().skip_channels,
                |s| s.split(',').map(|c| c.trim().to_string()).collect(),
            ),
        };

        let command_prefix =
            std::env::var("MIMIC_COMMAND_PREFIX").unwrap_or_else(|_| "!".to_string());

        Ok(Self {
            discord_token,
            openai_api_key,
            clone_api_key,
            clone_api_url,
            recordings_dir,
            completion,
            capture,
            reply,
            command_prefix,
        })
    }
}

/// Read a required environment variable, rejecting empty values
fn required_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}

/// Read an optional environment variable, parsing it into `T`
fn parsed_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {v}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_training_pipeline() {
        let capture = CaptureConfig::default();
        assert_eq!(capture.chunk_len_ms, 10_000);
        assert!((capture.min_training_secs - 300.0).abs() < f64::EPSILON);

        let completion = CompletionConfig::default();
        assert_eq!(completion.max_tokens, 150);
    }

    #[test]
    fn missing_credential_is_a_config_error() {
        // Use a name no other test or environment sets
        let err = required_env("MIMIC_TEST_UNSET_CREDENTIAL").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
