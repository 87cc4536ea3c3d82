//! Configuration for a voice session
//!
//! Plain defaults with builder-style overrides, optionally loaded from TOML.

use crate::{RealtalkError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sample rate of the realtime audio formats (PCM16 mono)
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

pub const DEFAULT_INSTRUCTIONS: &str = "You are a friendly voice assistant. \
Keep replies short and conversational, and speak naturally since everything \
you say is played back as audio.";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Session sample rate, used for capture, playback and decode
    pub sample_rate: u32,

    /// Behavior instructions installed on the remote session
    pub instructions: String,

    /// Input transcription model; `None` leaves user turns untranscribed
    pub transcription_model: Option<String>,

    /// Capacity of the command channel
    pub command_buffer: usize,

    /// Seconds of assistant audio the player can hold
    pub playback_buffer_secs: u32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            transcription_model: Some(DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            command_buffer: 100,
            playback_buffer_secs: 60,
        }
    }
}

impl VoiceConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)
            .map_err(|e| RealtalkError::ConfigError(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_transcription_model(mut self, model: impl Into<String>) -> Self {
        self.transcription_model = Some(model.into());
        self
    }

    /// Do not request input transcription
    pub fn without_transcription(mut self) -> Self {
        self.transcription_model = None;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(RealtalkError::ConfigError(
                "sample_rate must be greater than 0".into(),
            ));
        }
        if self.command_buffer == 0 {
            return Err(RealtalkError::ConfigError(
                "command_buffer must be greater than 0".into(),
            ));
        }
        if self.playback_buffer_secs == 0 {
            return Err(RealtalkError::ConfigError(
                "playback_buffer_secs must be greater than 0".into(),
            ));
        }
        if matches!(&self.transcription_model, Some(model) if model.trim().is_empty()) {
            return Err(RealtalkError::ConfigError(
                "transcription_model must not be empty".into(),
            ));
        }
        Ok(())
    }
}
