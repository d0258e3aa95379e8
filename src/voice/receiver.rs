//! Songbird event handler that turns decoded voice packets into
//! per-speaker audio spans
//!
//! The receiver itself never touches the disk: spans are forwarded to the
//! store's single writer task, which serializes appends so concurrent
//! speakers can never interleave writes within one file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use songbird::events::context_data::VoiceTick;
use songbird::model::payload::{ClientDisconnect, Speaking};
use songbird::{Event, EventContext, EventHandler};
use tokio::sync::mpsc;

use crate::audio::AudioSegment;

struct ReceiverState {
    /// Gate flipped by the listen/stop commands
    capturing: AtomicBool,

    /// RTP source -> Discord user, learned from speaking-state updates
    ssrc_to_user: Mutex<HashMap<u32, u64>>,

    /// Last time any speaker delivered audio, read by the idle watchdog
    last_voice: Mutex<Instant>,

    tx: mpsc::UnboundedSender<AudioSegment>,
}

/// Receives decoded per-user audio from a voice call
#[derive(Clone)]
pub struct VoiceReceiver {
    inner: Arc<ReceiverState>,
}

impl VoiceReceiver {
    /// Create a receiver forwarding spans into `tx`
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<AudioSegment>) -> Self {
        Self {
            inner: Arc::new(ReceiverState {
                capturing: AtomicBool::new(false),
                ssrc_to_user: Mutex::new(HashMap::new()),
                last_voice: Mutex::new(Instant::now()),
                tx,
            }),
        }
    }

    /// Start or stop accumulating audio
    pub fn set_capturing(&self, capturing: bool) {
        self.inner.capturing.store(capturing, Ordering::SeqCst);
        if capturing {
            self.touch();
        }
    }

    /// Whether audio is currently being accumulated
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.inner.capturing.load(Ordering::SeqCst)
    }

    /// Time since a speaker last delivered audio
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.inner
            .last_voice
            .lock()
            .map_or(Duration::ZERO, |t| t.elapsed())
    }

    fn touch(&self) {
        if let Ok(mut t) = self.inner.last_voice.lock() {
            *t = Instant::now();
        }
    }

    fn map_speaker(&self, ssrc: u32, user_id: u64) {
        if let Ok(mut map) = self.inner.ssrc_to_user.lock() {
            map.insert(ssrc, user_id);
        }
    }

    fn forget_user(&self, user_id: u64) {
        if let Ok(mut map) = self.inner.ssrc_to_user.lock() {
            map.retain(|_, uid| *uid != user_id);
        }
    }

    fn user_for(&self, ssrc: u32) -> Option<u64> {
        self.inner
            .ssrc_to_user
            .lock()
            .ok()
            .and_then(|map| map.get(&ssrc).copied())
    }

    fn handle_tick(&self, tick: &VoiceTick) {
        if tick.speaking.is_empty() {
            return;
        }
        self.touch();

        if !self.is_capturing() {
            return;
        }

        for (&ssrc, data) in &tick.speaking {
            let Some(decoded) = &data.decoded_voice else {
                tracing::warn!(ssrc, "voice packet arrived without decoded audio");
                continue;
            };
            if decoded.is_empty() {
                continue;
            }

            // Packets from sources we have not yet mapped are dropped; the
            // speaking-state update always precedes sustained audio
            let Some(user_id) = self.user_for(ssrc) else {
                tracing::debug!(ssrc, "dropping span from unmapped source");
                continue;
            };

            let segment = AudioSegment {
                speaker_id: user_id.to_string(),
                samples: decoded.clone(),
            };
            if self.inner.tx.send(segment).is_err() {
                tracing::error!("audio writer channel closed, span dropped");
            }
        }
    }
}

#[async_trait]
impl EventHandler for VoiceReceiver {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        match ctx {
            EventContext::SpeakingStateUpdate(Speaking { ssrc, user_id, .. }) => {
                if let Some(user) = user_id {
                    self.map_speaker(*ssrc, user.0);
                } else {
                    tracing::warn!(ssrc, "speaking state update without a user id");
                }
            }
            EventContext::VoiceTick(tick) => self.handle_tick(tick),
            EventContext::ClientDisconnect(ClientDisconnect { user_id, .. }) => {
                self.forget_user(user_id.0);
            }
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capturing_gate_defaults_off() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let receiver = VoiceReceiver::new(tx);
        assert!(!receiver.is_capturing());

        receiver.set_capturing(true);
        assert!(receiver.is_capturing());

        receiver.set_capturing(false);
        assert!(!receiver.is_capturing());
    }

    #[test]
    fn disconnect_forgets_all_sources_for_a_user() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let receiver = VoiceReceiver::new(tx);

        receiver.map_speaker(1, 100);
        receiver.map_speaker(2, 100);
        receiver.map_speaker(3, 200);

        receiver.forget_user(100);
        assert_eq!(receiver.user_for(1), None);
        assert_eq!(receiver.user_for(2), None);
        assert_eq!(receiver.user_for(3), Some(200));
    }
}
