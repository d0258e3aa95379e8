//! Command parsing and dispatch
//!
//! Commands are parsed into a tag and matched to a handler operating on the
//! shared context. Handlers return the reply text; the caller owns error
//! reporting at the command boundary.

use std::sync::Arc;
use std::time::Duration;

use serenity::all::{Context, Message};
use songbird::CoreEvent;

use crate::voice::{end_session, spawn_watchdog, CaptureSession, VoiceReceiver};
use crate::{AppContext, Error, Result};

/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Join the caller's voice channel
    Join,
    /// Leave the current voice channel
    Leave,
    /// Start accumulating per-user audio
    Listen,
    /// Stop accumulating audio
    Stop,
    /// Split, transcribe and upload the caller's recording
    Train,
    /// Relay a prompt to the completion API
    Gpt(String),
}

impl Command {
    /// Parse `content` as a prefixed command, if it is one
    #[must_use]
    pub fn parse(prefix: &str, content: &str) -> Option<Self> {
        let rest = content.strip_prefix(prefix)?;
        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next()?.trim();
        let arg = parts.next().unwrap_or("").trim();

        match name {
            "join" => Some(Self::Join),
            "leave" => Some(Self::Leave),
            "listen" => Some(Self::Listen),
            "stop" => Some(Self::Stop),
            "train" => Some(Self::Train),
            "gpt" if !arg.is_empty() => Some(Self::Gpt(arg.to_string())),
            _ => None,
        }
    }
}

/// Run one command against the shared context, returning the reply text
///
/// # Errors
///
/// User-facing errors (`NotConnected`, `NoRecording`, `InsufficientAudio`)
/// carry the message to show; everything else is an internal failure
pub async fn dispatch(
    app: &Arc<AppContext>,
    ctx: &Context,
    msg: &Message,
    command: Command,
) -> Result<String> {
    match command {
        Command::Join => join(app, ctx, msg).await,
        Command::Leave => leave(app, ctx, msg).await,
        Command::Listen => listen(app, ctx, msg).await,
        Command::Stop => stop(app, msg).await,
        Command::Train => train(app, ctx, msg).await,
        Command::Gpt(prompt) => app.completion.complete(&prompt).await,
    }
}

fn require_guild(msg: &Message) -> Result<serenity::all::GuildId> {
    msg.guild_id
        .ok_or_else(|| Error::NotConnected("voice commands only work in a server".to_string()))
}

async fn songbird_manager(ctx: &Context) -> Result<Arc<songbird::Songbird>> {
    songbird::get(ctx)
        .await
        .ok_or_else(|| Error::Channel("voice client not initialised".to_string()))
}

async fn join(app: &Arc<AppContext>, ctx: &Context, msg: &Message) -> Result<String> {
    let guild_id = require_guild(msg)?;

    // Cache guard must not be held across an await
    let voice_channel = {
        let guild = ctx
            .cache
            .guild(guild_id)
            .ok_or_else(|| Error::Channel("guild not in cache".to_string()))?;
        guild
            .voice_states
            .get(&msg.author.id)
            .and_then(|state| state.channel_id)
    };
    let Some(channel) = voice_channel else {
        return Err(Error::NotConnected(
            "you are not in a voice channel".to_string(),
        ));
    };

    let manager = songbird_manager(ctx).await?;
    let call_lock = manager
        .join(guild_id, channel)
        .await
        .map_err(|e| Error::Channel(format!("failed to join voice channel: {e}")))?;

    let receiver = VoiceReceiver::new(app.audio_tx.clone());
    {
        let mut call = call_lock.lock().await;
        call.add_global_event(CoreEvent::SpeakingStateUpdate.into(), receiver.clone());
        call.add_global_event(CoreEvent::VoiceTick.into(), receiver.clone());
        call.add_global_event(CoreEvent::ClientDisconnect.into(), receiver.clone());
    }

    // Replacing an existing session drops it, cancelling any old watchdog
    app.sessions.lock().await.insert(
        guild_id,
        CaptureSession::new(guild_id, msg.channel_id, receiver),
    );

    tracing::info!(guild = %guild_id, channel = %channel, "joined voice channel");
    Ok("joined your voice channel".to_string())
}

async fn leave(app: &Arc<AppContext>, ctx: &Context, msg: &Message) -> Result<String> {
    let guild_id = require_guild(msg)?;

    if end_session(&app.sessions, guild_id).await.is_none() {
        return Err(Error::NotConnected("not in a voice channel".to_string()));
    }

    let manager = songbird_manager(ctx).await?;
    manager
        .remove(guild_id)
        .await
        .map_err(|e| Error::Channel(format!("failed to leave voice channel: {e}")))?;

    tracing::info!(guild = %guild_id, "left voice channel");
    Ok("left the voice channel".to_string())
}

async fn listen(app: &Arc<AppContext>, ctx: &Context, msg: &Message) -> Result<String> {
    let guild_id = require_guild(msg)?;
    let manager = songbird_manager(ctx).await?;

    let mut sessions = app.sessions.lock().await;
    let session = sessions.get_mut(&guild_id).ok_or_else(|| {
        Error::NotConnected("not in a voice channel, use join first".to_string())
    })?;

    if session.is_capturing() {
        return Ok("already listening".to_string());
    }

    let watchdog = spawn_watchdog(
        session.receiver.clone(),
        app.sessions.clone(),
        manager,
        ctx.http.clone(),
        guild_id,
        session.text_channel,
        Duration::from_secs(app.config.capture.idle_timeout_secs),
    );
    session.start_capture(watchdog);

    tracing::info!(guild = %guild_id, "capture started");
    Ok("listening...".to_string())
}

async fn stop(app: &Arc<AppContext>, msg: &Message) -> Result<String> {
    let guild_id = require_guild(msg)?;

    let mut sessions = app.sessions.lock().await;
    let session = sessions
        .get_mut(&guild_id)
        .ok_or_else(|| Error::NotConnected("not in a voice channel".to_string()))?;
    session.stop_capture();

    tracing::info!(guild = %guild_id, "capture stopped");
    Ok("stopped recording, audio saved".to_string())
}

async fn train(app: &Arc<AppContext>, ctx: &Context, msg: &Message) -> Result<String> {
    let speaker_id = msg.author.id.to_string();
    let display_name = msg
        .author
        .global_name
        .clone()
        .unwrap_or_else(|| msg.author.name.clone());

    // Gate first so threshold failures come back immediately
    let duration = app.trainer.check_gate(&speaker_id)?;

    let notice = format!(
        "training voice for {display_name} from {duration:.1}s of audio, this can take a while..."
    );
    if let Err(e) = msg.channel_id.say(&ctx.http, notice).await {
        tracing::warn!(error = %e, "failed to send training notice");
    }

    let report = app.trainer.train(&speaker_id, &display_name).await?;
    Ok(format!(
        "voice {} updated: {} of {} chunks uploaded ({} skipped)",
        report.voice_id, report.chunks_uploaded, report.chunks_written, report.chunks_skipped
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_command_tag() {
        assert_eq!(Command::parse("!", "!join"), Some(Command::Join));
        assert_eq!(Command::parse("!", "!leave"), Some(Command::Leave));
        assert_eq!(Command::parse("!", "!listen"), Some(Command::Listen));
        assert_eq!(Command::parse("!", "!stop"), Some(Command::Stop));
        assert_eq!(Command::parse("!", "!train"), Some(Command::Train));
        assert_eq!(
            Command::parse("!", "!gpt tell me a story"),
            Some(Command::Gpt("tell me a story".to_string()))
        );
    }

    #[test]
    fn ignores_unprefixed_and_unknown_input() {
        assert_eq!(Command::parse("!", "join"), None);
        assert_eq!(Command::parse("!", "!dance"), None);
        assert_eq!(Command::parse("!", "hello there"), None);
    }

    #[test]
    fn gpt_requires_a_prompt() {
        assert_eq!(Command::parse("!", "!gpt"), None);
        assert_eq!(Command::parse("!", "!gpt   "), None);
    }

    #[test]
    fn honors_a_custom_prefix() {
        assert_eq!(Command::parse("~", "~train"), Some(Command::Train));
        assert_eq!(Command::parse("~", "!train"), None);
    }
}
