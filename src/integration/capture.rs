//! Push-to-talk capture: everything recorded between `start_recording` and
//! `stop_recording` forms one user turn.

use crate::integration::orchestrator::{remote_error, RecordingStatus, SessionEvent, VoiceSession};
use crate::{RealtalkError, Result};
use crossbeam_channel::unbounded;
use tracing::{debug, info, warn};

impl VoiceSession {
    /// Silence the assistant, then open the microphone.
    ///
    /// Playback is interrupted first and, if a track was audible, its
    /// response is cancelled at the played offset. Capture only starts once
    /// that has completed.
    pub async fn start_recording(&mut self) -> Result<()> {
        if !self.state.is_connected() {
            return Err(self.report(RealtalkError::InvalidState(
                "cannot start recording while disconnected".into(),
            )));
        }
        if self.state.is_recording() {
            return Err(self.report(RealtalkError::InvalidState(
                "already recording".into(),
            )));
        }

        if let Err(e) = self.interrupt_and_cancel().await {
            // The user still gets the microphone
            warn!("Could not cancel in-flight response: {}", e);
        }

        let (frame_tx, frame_rx) = unbounded();
        if let Err(e) = self.capture.record(frame_tx).await {
            self.state.recording = RecordingStatus::Idle;
            let err = match e {
                RealtalkError::CaptureError(_) => e,
                other => RealtalkError::CaptureError(other.to_string()),
            };
            return Err(self.report(err));
        }

        self.frame_rx = Some(frame_rx);
        self.state.recording = RecordingStatus::Recording;
        self.publish(SessionEvent::RecordingStarted);

        info!("Started recording");
        Ok(())
    }

    /// Close the microphone and ask for a response to the turn.
    ///
    /// Frames captured before the pause are still forwarded, in order; the
    /// frame channel is then dropped so nothing later can be sent.
    pub async fn stop_recording(&mut self) -> Result<()> {
        if !self.state.is_recording() {
            return Err(self.report(RealtalkError::InvalidState(
                "not recording".into(),
            )));
        }

        let paused = self.capture.pause().await;

        let forwarded = self.forward_frames();
        self.frame_rx = None;
        self.state.recording = RecordingStatus::Idle;
        debug!("Flushed {} frames after pause", forwarded);

        if let Err(e) = paused {
            self.report(RealtalkError::CaptureError(format!(
                "Failed to pause capture: {}",
                e
            )));
        }

        self.publish(SessionEvent::RecordingStopped);

        info!("Recording stopped, creating response");
        self.client
            .create_response()
            .map_err(|e| self.report(remote_error(e)))
    }

    /// Send every captured frame waiting on the channel to the remote
    /// session, in capture order. Returns the number of frames sent.
    pub(crate) fn forward_frames(&mut self) -> usize {
        let Some(frame_rx) = &self.frame_rx else {
            return 0;
        };

        let mut forwarded = 0;
        let mut failures = Vec::new();
        for frame in frame_rx.try_iter() {
            match self.client.append_input_audio(&frame) {
                Ok(()) => forwarded += 1,
                Err(e) => failures.push(remote_error(e)),
            }
        }

        for err in failures {
            self.report(err);
        }
        forwarded
    }
}
