//! Projects the remote conversation into the displayed item list
//!
//! Every update replaces the whole list with a fresh snapshot. Completed
//! items that carry audio get a decoded WAV file attached to a copy of the
//! item; the remote client's own items are never modified.

use crate::audio::device::AudioDecoder;
use crate::audio::wav::WavFile;
use crate::messages::ConversationItem;
use crate::RealtalkError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Result of one projection pass
#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub items: Vec<ConversationItem>,
    /// Per-item decode failures; the items are still in `items`
    pub errors: Vec<RealtalkError>,
}

pub struct ConversationProjector {
    sample_rate: u32,
    decoded: HashMap<String, Arc<WavFile>>,
    failed: HashSet<String>,
}

impl ConversationProjector {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            decoded: HashMap::new(),
            failed: HashSet::new(),
        }
    }

    /// Build the displayed list from a full snapshot.
    ///
    /// Decoded files are cached by item id, so projecting the same snapshot
    /// twice yields the same list and decodes nothing the second time.
    /// A failed decode is reported once and not retried.
    pub fn project(
        &mut self,
        snapshot: Vec<ConversationItem>,
        decoder: &dyn AudioDecoder,
    ) -> Projection {
        let live: HashSet<&str> = snapshot.iter().map(|item| item.id.as_str()).collect();
        self.decoded.retain(|id, _| live.contains(id.as_str()));
        self.failed.retain(|id| live.contains(id.as_str()));

        let mut errors = Vec::new();
        let items = snapshot
            .into_iter()
            .map(|item| {
                if !item.is_completed() || !item.has_audio() || item.formatted.file.is_some() {
                    return item;
                }

                if let Some(file) = self.decoded.get(&item.id) {
                    return item.with_file(Arc::clone(file));
                }

                if self.failed.contains(&item.id) {
                    return item;
                }

                match decoder.decode(&item.formatted.audio, self.sample_rate, self.sample_rate) {
                    Ok(file) => {
                        debug!(
                            "Decoded {:.2}s of audio for item {}",
                            file.duration_secs(),
                            item.id
                        );
                        let file = Arc::new(file);
                        self.decoded.insert(item.id.clone(), Arc::clone(&file));
                        item.with_file(file)
                    }
                    Err(e) => {
                        warn!("Failed to decode audio for item {}: {}", item.id, e);
                        self.failed.insert(item.id.clone());
                        errors.push(decode_error(&item.id, e));
                        item
                    }
                }
            })
            .collect();

        Projection { items, errors }
    }

    /// Forget every decoded file and failure
    pub fn clear(&mut self) {
        self.decoded.clear();
        self.failed.clear();
    }

    pub fn decoded_count(&self) -> usize {
        self.decoded.len()
    }
}

fn decode_error(item_id: &str, error: RealtalkError) -> RealtalkError {
    let detail = match error {
        RealtalkError::DecodeError(message) => message,
        other => other.to_string(),
    };
    RealtalkError::DecodeError(format!("item {}: {}", item_id, detail))
}
