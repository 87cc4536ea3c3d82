use crate::audio::wav::WavFile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Message,
    FunctionCall,
    FunctionCallOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    InProgress,
    Completed,
    Incomplete,
}

/// Display-ready content of an item, accumulated from deltas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedContent {
    pub text: String,
    pub transcript: String,
    /// Raw PCM16 mono samples at the session rate
    pub audio: Vec<i16>,
    /// Playable file, attached once the item has completed
    #[serde(skip)]
    pub file: Option<Arc<WavFile>>,
}

/// One conversation turn as reported by the remote session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub id: String,
    pub kind: ItemKind,
    pub role: ItemRole,
    pub status: ItemStatus,
    pub formatted: FormattedContent,
}

impl ConversationItem {
    pub fn new(id: impl Into<String>, role: ItemRole) -> Self {
        Self {
            id: id.into(),
            kind: ItemKind::Message,
            role,
            status: ItemStatus::InProgress,
            formatted: FormattedContent::default(),
        }
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.formatted.text = text.into();
        self
    }

    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.formatted.transcript = transcript.into();
        self
    }

    pub fn with_audio(mut self, audio: Vec<i16>) -> Self {
        self.formatted.audio = audio;
        self
    }

    /// Returns a copy of this item with a decoded file attached.
    pub fn with_file(mut self, file: Arc<WavFile>) -> Self {
        self.formatted.file = Some(file);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == ItemStatus::Completed
    }

    pub fn has_audio(&self) -> bool {
        !self.formatted.audio.is_empty()
    }

    /// Text shown in a transcript view: text, else transcript, else a placeholder.
    pub fn display_text(&self) -> &str {
        if !self.formatted.text.is_empty() {
            &self.formatted.text
        } else if !self.formatted.transcript.is_empty() {
            &self.formatted.transcript
        } else {
            "(No content)"
        }
    }
}

/// Incremental update to an in-progress item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDelta {
    pub text: Option<String>,
    pub transcript: Option<String>,
    pub audio: Option<Vec<i16>>,
}

impl ItemDelta {
    pub fn audio(samples: Vec<i16>) -> Self {
        Self {
            audio: Some(samples),
            ..Default::default()
        }
    }

    pub fn transcript(transcript: impl Into<String>) -> Self {
        Self {
            transcript: Some(transcript.into()),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Audio payload, if the delta carries a non-empty one
    pub fn audio_payload(&self) -> Option<&[i16]> {
        self.audio.as_deref().filter(|a| !a.is_empty())
    }
}
