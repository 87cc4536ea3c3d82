use super::types::{ConversationItem, ItemDelta, ItemStatus};
use parking_lot::RwLock;
use std::sync::Arc;

/// Ordered item list of a remote conversation.
///
/// Client implementations apply server events here and answer
/// `get_items()` from [`Conversation::get_all`].
#[derive(Debug, Clone)]
pub struct Conversation {
    items: Arc<RwLock<Vec<ConversationItem>>>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Insert a new item, or replace the item with the same id in place.
    pub fn upsert(&self, item: ConversationItem) {
        let mut items = self.items.write();
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => *existing = item,
            None => items.push(item),
        }
    }

    /// Append a delta to an item. Returns the updated item.
    pub fn apply_delta(&self, id: &str, delta: &ItemDelta) -> Option<ConversationItem> {
        let mut items = self.items.write();
        let item = items.iter_mut().find(|item| item.id == id)?;

        if let Some(text) = &delta.text {
            item.formatted.text.push_str(text);
        }
        if let Some(transcript) = &delta.transcript {
            item.formatted.transcript.push_str(transcript);
        }
        if let Some(audio) = &delta.audio {
            item.formatted.audio.extend_from_slice(audio);
        }

        Some(item.clone())
    }

    pub fn set_status(&self, id: &str, status: ItemStatus) -> Option<ConversationItem> {
        let mut items = self.items.write();
        let item = items.iter_mut().find(|item| item.id == id)?;
        item.status = status;
        Some(item.clone())
    }

    pub fn delete(&self, id: &str) -> bool {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|item| item.id != id);
        items.len() != before
    }

    pub fn get(&self, id: &str) -> Option<ConversationItem> {
        self.items.read().iter().find(|item| item.id == id).cloned()
    }

    pub fn get_all(&self) -> Vec<ConversationItem> {
        self.items.read().clone()
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
