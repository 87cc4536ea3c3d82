mod capture;
pub mod config;
mod lifecycle;
pub mod orchestrator;
mod playback;
pub mod projector;

pub use config::VoiceConfig;
pub use orchestrator::{
    ConnectionStatus, RecordingStatus, SessionCommand, SessionEvent, SessionHandle, SessionState,
    VoiceSession, VoiceSessionBuilder,
};
pub use projector::{ConversationProjector, Projection};
