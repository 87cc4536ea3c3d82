//! Connection lifecycle: open and close the device pair and the remote
//! session as one unit.

use crate::integration::orchestrator::{
    ConnectionStatus, RecordingStatus, SessionEvent, SessionState, VoiceSession,
};
use crate::{RealtalkError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

impl VoiceSession {
    /// Begin capture, connect playback, then open the remote session.
    ///
    /// Each step must succeed before the next starts. On failure the session
    /// stays disconnected; steps that already succeeded are not rolled back
    /// (their owners close idempotently on the next disconnect).
    pub async fn connect(&mut self) -> Result<()> {
        if self.state.is_connected() {
            return Err(self.report(RealtalkError::InvalidState(
                "session is already connected".into(),
            )));
        }

        info!("Connecting voice session");

        if let Err(e) = self.open().await {
            self.state = SessionState::default();
            return Err(self.report(connection_error(e)));
        }

        self.state = SessionState {
            connection: ConnectionStatus::Connected,
            recording: RecordingStatus::Idle,
        };
        self.publish(SessionEvent::Connected);
        self.refresh_items();

        info!("Voice session connected");
        Ok(())
    }

    async fn open(&mut self) -> Result<()> {
        self.capture.begin().await?;
        debug!("Capture device begun");

        self.playback.connect().await?;
        debug!("Playback device connected");

        self.client.connect().await?;
        debug!("Remote session connected");

        Ok(())
    }

    /// Close the remote session, end capture and interrupt playback.
    ///
    /// Every step runs even if an earlier one fails. The session always ends
    /// up disconnected with an empty item list; the first failure, if any,
    /// is returned after all steps ran.
    pub async fn disconnect(&mut self) -> Result<()> {
        info!("Disconnecting voice session");

        self.state = SessionState::default();
        self.frame_rx = None;

        let mut first_error = None;

        if let Err(e) = self.client.disconnect().await {
            warn!("Remote disconnect failed: {}", e);
            first_error.get_or_insert(self.report(connection_error(e)));
        }

        if let Err(e) = self.capture.end().await {
            warn!("Ending capture failed: {}", e);
            first_error.get_or_insert(self.report(e));
        }

        if let Err(e) = self.playback.interrupt().await {
            warn!("Interrupting playback failed: {}", e);
            first_error.get_or_insert(self.report(e));
        }

        self.drain_remote_events();
        self.items = Arc::from(Vec::new());
        self.items_stale = false;
        self.projector.clear();
        self.publish(SessionEvent::ItemsUpdated(self.snapshot()));
        self.publish(SessionEvent::Disconnected);

        info!("Voice session disconnected");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn connection_error(err: RealtalkError) -> RealtalkError {
    match err {
        RealtalkError::ConnectionError(_) => err,
        other => RealtalkError::ConnectionError(other.to_string()),
    }
}
