//! Capture session lifecycle
//!
//! One session per guild, created on `join` and torn down on `leave`. The
//! idle watchdog is a cancellable task owned by the session: `stop` and
//! `leave` cancel it, so it can never outlive the capture it guards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serenity::all::{ChannelId, GuildId};
use songbird::Songbird;
use tokio_util::sync::CancellationToken;

use crate::voice::VoiceReceiver;

/// Shared per-guild session map, owned by the application context and
/// handed to the watchdog so an idle disconnect also retires the session
pub type SessionMap = Arc<tokio::sync::Mutex<HashMap<GuildId, CaptureSession>>>;

/// Remove a guild's session from the map, stopping any capture in progress
///
/// Returns the retired session, if one existed. Once this runs, voice
/// commands for the guild fall back to their not-connected replies.
pub async fn end_session(sessions: &SessionMap, guild_id: GuildId) -> Option<CaptureSession> {
    let mut session = sessions.lock().await.remove(&guild_id)?;
    session.stop_capture();
    Some(session)
}

/// State for one guild's voice capture
pub struct CaptureSession {
    /// Guild the bot joined
    pub guild_id: GuildId,

    /// Text channel that issued the commands, used for announcements
    pub text_channel: ChannelId,

    /// Shared receiver registered on the call
    pub receiver: VoiceReceiver,

    watchdog: Option<CancellationToken>,
}

impl CaptureSession {
    /// Create an idle session (joined, not yet listening)
    #[must_use]
    pub fn new(guild_id: GuildId, text_channel: ChannelId, receiver: VoiceReceiver) -> Self {
        Self {
            guild_id,
            text_channel,
            receiver,
            watchdog: None,
        }
    }

    /// Whether a `listen` is in progress
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.receiver.is_capturing()
    }

    /// Begin accumulating audio and arm the idle watchdog
    pub fn start_capture(&mut self, watchdog: CancellationToken) {
        self.stop_capture();
        self.receiver.set_capturing(true);
        self.watchdog = Some(watchdog);
    }

    /// Stop accumulating audio and disarm the watchdog
    pub fn stop_capture(&mut self) {
        self.receiver.set_capturing(false);
        if let Some(token) = self.watchdog.take() {
            token.cancel();
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(token) = self.watchdog.take() {
            token.cancel();
        }
    }
}

/// Spawn the idle watchdog for a capture
///
/// Checks every ten seconds; once no audio has arrived for `timeout`, the
/// bot retires the guild's session, leaves the voice channel and announces
/// the disconnect. The returned token cancels the task.
pub fn spawn_watchdog(
    receiver: VoiceReceiver,
    sessions: SessionMap,
    manager: Arc<Songbird>,
    http: Arc<serenity::http::Http>,
    guild_id: GuildId,
    text_channel: ChannelId,
    timeout: Duration,
) -> CancellationToken {
    let token = CancellationToken::new();
    let task_token = token.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        interval.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                () = task_token.cancelled() => {
                    tracing::debug!(guild = %guild_id, "idle watchdog cancelled");
                    return;
                }
                _ = interval.tick() => {
                    if receiver.idle_for() >= timeout {
                        break;
                    }
                }
            }
        }

        tracing::info!(guild = %guild_id, "capture idle, leaving voice channel");
        // Retire the session first so join/listen/leave issued after the
        // disconnect see no session rather than a half-dead one
        end_session(&sessions, guild_id).await;
        if let Err(e) = manager.remove(guild_id).await {
            tracing::warn!(guild = %guild_id, error = %e, "failed to leave on idle");
        }
        if let Err(e) = text_channel
            .say(&http, "disconnected due to inactivity, recording saved")
            .await
        {
            tracing::warn!(error = %e, "failed to announce idle disconnect");
        }
    });

    token
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn receiver() -> VoiceReceiver {
        let (tx, _rx) = mpsc::unbounded_channel();
        VoiceReceiver::new(tx)
    }

    #[tokio::test]
    async fn ending_a_session_retires_it_and_stops_capture() {
        let sessions: SessionMap = Arc::new(tokio::sync::Mutex::new(HashMap::new()));
        let guild = GuildId::new(1);
        let receiver = receiver();

        let mut session = CaptureSession::new(guild, ChannelId::new(2), receiver.clone());
        let token = CancellationToken::new();
        session.start_capture(token.clone());
        sessions.lock().await.insert(guild, session);

        let retired = end_session(&sessions, guild).await;
        assert!(retired.is_some());

        // Later commands find no session and the capture gate is closed
        assert!(sessions.lock().await.get(&guild).is_none());
        assert!(!receiver.is_capturing());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn ending_an_absent_session_is_a_no_op() {
        let sessions: SessionMap = Arc::new(tokio::sync::Mutex::new(HashMap::new()));
        assert!(end_session(&sessions, GuildId::new(9)).await.is_none());
    }
}
