//! Voice channel capture: per-user audio receive and session lifecycle

mod receiver;
mod session;

pub use receiver::VoiceReceiver;
pub use session::{end_session, spawn_watchdog, CaptureSession, SessionMap};
