//! Remote session seam
//!
//! The orchestrator depends on a realtime voice client only through
//! [`RealtimeClient`]. Events reach the orchestrator through channels it
//! registers with [`RealtimeClient::subscribe`].

pub mod subscriptions;

pub use subscriptions::{SubscriberRegistry, SubscriptionId};

use crate::messages::{ConversationItem, ItemDelta};
use crate::{RealtalkError, Result};
use async_trait::async_trait;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

/// Event classes a client can be subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Error,
    ConversationInterrupted,
    ConversationUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Error => "error",
            EventKind::ConversationInterrupted => "conversation.interrupted",
            EventKind::ConversationUpdated => "conversation.updated",
        }
    }
}

/// Events emitted by the remote session
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// The remote session reported an error
    Error { message: String },

    /// The user started speaking over a response
    ConversationInterrupted,

    /// An item changed; `delta` holds what was appended, if anything
    ConversationUpdated {
        item: ConversationItem,
        delta: Option<ItemDelta>,
    },
}

impl RemoteEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RemoteEvent::Error { .. } => EventKind::Error,
            RemoteEvent::ConversationInterrupted => EventKind::ConversationInterrupted,
            RemoteEvent::ConversationUpdated { .. } => EventKind::ConversationUpdated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    pub model: String,
}

/// Partial session configuration sent with `session.update`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<InputAudioTranscription>,
}

impl SessionUpdate {
    pub fn instructions(instructions: impl Into<String>) -> Self {
        Self {
            instructions: Some(instructions.into()),
            ..Default::default()
        }
    }

    pub fn transcription(model: impl Into<String>) -> Self {
        Self {
            input_audio_transcription: Some(InputAudioTranscription {
                model: model.into(),
            }),
            ..Default::default()
        }
    }

    /// JSON body of the update, for clients that put it on the wire
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| RealtalkError::RemoteError(format!("Failed to encode session update: {}", e)))
    }
}

/// Duplex client for a realtime voice model.
#[async_trait(?Send)]
pub trait RealtimeClient {
    /// Open the remote session.
    async fn connect(&mut self) -> Result<()>;

    /// Close the remote session. Must be a no-op when already closed.
    async fn disconnect(&mut self) -> Result<()>;

    fn update_session(&mut self, update: SessionUpdate) -> Result<()>;

    /// Append one captured PCM16 frame to the input audio buffer.
    fn append_input_audio(&mut self, frame: &[i16]) -> Result<()>;

    /// Ask the model to respond to the audio appended so far.
    fn create_response(&mut self) -> Result<()>;

    /// Cancel the response producing `track_id`, truncated at `offset` samples.
    async fn cancel_response(&mut self, track_id: &str, offset: u64) -> Result<()>;

    fn delete_item(&mut self, id: &str) -> Result<()>;

    /// Deliver events of `kind` to `events` until unsubscribed.
    fn subscribe(&mut self, kind: EventKind, events: Sender<RemoteEvent>) -> SubscriptionId;

    fn unsubscribe(&mut self, id: SubscriptionId);

    /// Drop all session state and every subscription.
    fn reset(&mut self);

    /// Snapshot of the full conversation, in order.
    fn get_items(&self) -> Vec<ConversationItem>;
}
