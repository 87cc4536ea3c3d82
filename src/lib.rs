//! Push-to-talk voice sessions against a realtime voice model.
//!
//! The [`integration::VoiceSession`] orchestrator owns the remote session, the
//! microphone and the speaker, and projects the remote conversation into a
//! displayable item list.

pub mod audio;
pub mod integration;
pub mod messages;
pub mod remote;
pub mod utils;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RealtalkError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Capture error: {0}")]
    CaptureError(String),

    #[error("Remote session error: {0}")]
    RemoteError(String),

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for RealtalkError {
    fn from(e: std::io::Error) -> Self {
        RealtalkError::IOError(e.to_string())
    }
}

impl RealtalkError {
    /// Check if this error is recoverable
    ///
    /// Recoverable errors leave the session usable; the user can simply retry
    /// the action that failed.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Connect can be re-invoked by the user
            RealtalkError::ConnectionError(_) => true,
            RealtalkError::CaptureError(_) => true,
            // Remote errors never force a disconnect
            RealtalkError::RemoteError(_) => true,
            RealtalkError::DecodeError(_) => true,
            RealtalkError::InvalidState(_) => true,
            RealtalkError::AudioDeviceError(_) => false,
            RealtalkError::AudioProcessingError(_) => true,
            RealtalkError::ConfigError(_) => false,
            RealtalkError::ChannelError(_) => false,
            RealtalkError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            RealtalkError::ConnectionError(_) => {
                "Could not connect the conversation. Please try again.".to_string()
            }
            RealtalkError::CaptureError(_) => {
                "Could not start the microphone. Please try again.".to_string()
            }
            RealtalkError::RemoteError(_) => {
                "The voice service reported an error.".to_string()
            }
            RealtalkError::DecodeError(_) => {
                "Audio for a message could not be prepared for playback.".to_string()
            }
            RealtalkError::InvalidState(_) => {
                "That action is not available right now.".to_string()
            }
            RealtalkError::AudioDeviceError(_) => {
                "Audio device error. Please check your microphone/speakers.".to_string()
            }
            RealtalkError::AudioProcessingError(_) => {
                "Audio processing failed. Please try again.".to_string()
            }
            RealtalkError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            RealtalkError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            RealtalkError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RealtalkError>;
