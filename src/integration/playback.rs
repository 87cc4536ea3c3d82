//! Playback reconciliation: stream assistant audio to the speaker and cut
//! responses off exactly where the user stopped hearing them.

use crate::audio::device::TrackOffset;
use crate::integration::orchestrator::{remote_error, VoiceSession};
use crate::messages::{ConversationItem, ItemDelta};
use crate::Result;
use tracing::{debug, info};

impl VoiceSession {
    /// Feed an audio delta to the player, tagged with its item id
    pub(crate) fn on_audio_delta(&mut self, item: &ConversationItem, delta: &ItemDelta) {
        let Some(audio) = delta.audio_payload() else {
            return;
        };

        debug!("Audio delta of {} samples for item {}", audio.len(), item.id);
        if let Err(e) = self.playback.add_pcm16(audio, &item.id) {
            self.report(e);
        }
    }

    /// The remote session says the user is talking over the response
    pub(crate) async fn on_interrupted(&mut self) {
        info!("Conversation interrupted");
        // Errors are reported inside; nothing else to undo
        let _ = self.interrupt_and_cancel().await;
    }

    /// Halt playback and cancel the response that was audible at the point
    /// the player actually reached.
    ///
    /// Returns the interrupted track, if any.
    pub(crate) async fn interrupt_and_cancel(&mut self) -> Result<Option<TrackOffset>> {
        let interrupted = self
            .playback
            .interrupt()
            .await
            .map_err(|e| self.report(e))?;

        let Some(track) = interrupted else {
            debug!("Nothing was playing");
            return Ok(None);
        };

        info!(
            "Cancelling response for track {} at sample {}",
            track.track_id, track.offset
        );
        self.client
            .cancel_response(&track.track_id, track.offset)
            .await
            .map_err(|e| self.report(remote_error(e)))?;

        Ok(Some(track))
    }
}
