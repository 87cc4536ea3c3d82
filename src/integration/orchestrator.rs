//! Orchestrator for a push-to-talk voice session
//!
//! Owns the remote client, the capture and playback devices and the
//! displayed conversation. All orchestration runs on `&mut self` from one
//! task: remote events and captured frames queue up on channels and are
//! handled in order by [`VoiceSession::pump`].

use crate::audio::device::{AudioDecoder, AudioFrame, CaptureDevice, PlaybackDevice};
use crate::audio::wav::WavDecoder;
use crate::integration::config::VoiceConfig;
use crate::integration::projector::ConversationProjector;
use crate::messages::ConversationItem;
use crate::remote::{EventKind, RealtimeClient, RemoteEvent, SessionUpdate, SubscriptionId};
use crate::utils::channels::SessionChannels;
use crate::{RealtalkError, Result};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause between iterations of the command loop
const LOOP_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingStatus {
    #[default]
    Idle,
    Recording,
}

/// Connection and recording status of the session.
///
/// Recording is only ever active while connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    pub connection: ConnectionStatus,
    pub recording: RecordingStatus,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionStatus::Connected
    }

    pub fn is_recording(&self) -> bool {
        self.recording == RecordingStatus::Recording
    }
}

/// Actions the presentation layer can request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Connect,
    Disconnect,
    StartRecording,
    StopRecording,
    DeleteItem(String),
    /// Disconnect, tear down and leave the run loop
    Shutdown,
}

/// Events published to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    RecordingStarted,
    RecordingStopped,
    /// The displayed item list was replaced; shares the session's snapshot
    ItemsUpdated(Arc<[ConversationItem]>),
    /// Something failed; the session state has already been reset
    Error(RealtalkError),
    /// The run loop has exited
    Shutdown,
}

/// Handle for driving a running session from the UI
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: Sender<SessionCommand>,
    event_rx: Receiver<SessionEvent>,
}

impl SessionHandle {
    /// Send a command to the session
    pub fn send_command(&self, cmd: SessionCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| RealtalkError::ChannelError(format!("Failed to send command: {}", e)))
    }

    /// Try to receive an event from the session
    pub fn try_recv_event(&self) -> Option<SessionEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Get the event receiver
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }
}

/// The voice session orchestrator
pub struct VoiceSession {
    pub(crate) config: VoiceConfig,
    pub(crate) client: Box<dyn RealtimeClient>,
    pub(crate) capture: Box<dyn CaptureDevice>,
    pub(crate) playback: Box<dyn PlaybackDevice>,
    pub(crate) decoder: Box<dyn AudioDecoder>,
    pub(crate) state: SessionState,
    pub(crate) items: Arc<[ConversationItem]>,
    /// A `conversation.updated` arrived since the last snapshot
    pub(crate) items_stale: bool,
    pub(crate) projector: ConversationProjector,
    /// Frames of the current push-to-talk turn; `Some` only while recording
    pub(crate) frame_rx: Option<Receiver<AudioFrame>>,
    subscriptions: Vec<SubscriptionId>,
    remote_rx: Receiver<RemoteEvent>,
    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
    command_tx: Sender<SessionCommand>,
    command_rx: Receiver<SessionCommand>,
    torn_down: bool,
}

impl VoiceSession {
    /// Create a session with the hound-backed decoder
    pub fn new(
        config: VoiceConfig,
        client: Box<dyn RealtimeClient>,
        capture: Box<dyn CaptureDevice>,
        playback: Box<dyn PlaybackDevice>,
    ) -> Result<Self> {
        Self::with_decoder(config, client, capture, playback, Box::new(WavDecoder))
    }

    /// Create a session, configure the remote client and register listeners
    pub fn with_decoder(
        config: VoiceConfig,
        mut client: Box<dyn RealtimeClient>,
        capture: Box<dyn CaptureDevice>,
        playback: Box<dyn PlaybackDevice>,
        decoder: Box<dyn AudioDecoder>,
    ) -> Result<Self> {
        config.validate()?;

        let channels = SessionChannels::new(config.command_buffer);

        client.update_session(SessionUpdate::instructions(config.instructions.clone()))?;
        if let Some(model) = &config.transcription_model {
            // Without this the remote never transcribes user audio
            client.update_session(SessionUpdate::transcription(model.clone()))?;
        }

        let subscriptions = [
            EventKind::Error,
            EventKind::ConversationInterrupted,
            EventKind::ConversationUpdated,
        ]
        .into_iter()
        .map(|kind| client.subscribe(kind, channels.remote_tx.clone()))
        .collect();

        let mut session = Self {
            projector: ConversationProjector::new(config.sample_rate),
            config,
            client,
            capture,
            playback,
            decoder,
            state: SessionState::default(),
            items: Arc::from(Vec::new()),
            items_stale: false,
            frame_rx: None,
            subscriptions,
            remote_rx: channels.remote_rx,
            event_tx: channels.event_tx,
            event_rx: channels.event_rx,
            command_tx: channels.command_tx,
            command_rx: channels.command_rx,
            torn_down: false,
        };

        session.refresh_items();
        info!("Voice session ready");
        Ok(session)
    }

    pub fn builder() -> VoiceSessionBuilder {
        VoiceSessionBuilder::new()
    }

    /// Handle for sending commands to [`VoiceSession::run`]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            command_tx: self.command_tx.clone(),
            event_rx: self.event_rx.clone(),
        }
    }

    /// Receiver for session events
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// The displayed conversation, oldest first
    pub fn items(&self) -> &[ConversationItem] {
        &self.items
    }

    /// Shared handle on the displayed conversation
    pub fn snapshot(&self) -> Arc<[ConversationItem]> {
        Arc::clone(&self.items)
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Handle everything queued since the last call: captured frames first,
    /// then remote events in arrival order. Returns how much was handled.
    ///
    /// Any number of `conversation.updated` events in one pass produce a
    /// single snapshot, taken after the last of them.
    pub async fn pump(&mut self) -> usize {
        let mut handled = self.forward_frames();

        while let Ok(event) = self.remote_rx.try_recv() {
            self.handle_remote_event(event).await;
            handled += 1;
        }

        if self.items_stale && self.state.is_connected() {
            self.refresh_items();
        }
        self.items_stale = false;

        handled
    }

    pub(crate) async fn handle_remote_event(&mut self, event: RemoteEvent) {
        match event {
            RemoteEvent::Error { message } => {
                // Reported only; the session stays up
                self.report(RealtalkError::RemoteError(message));
            }
            RemoteEvent::ConversationInterrupted => {
                if !self.state.is_connected() {
                    debug!("Ignoring interruption while disconnected");
                    return;
                }
                self.on_interrupted().await;
            }
            RemoteEvent::ConversationUpdated { item, delta } => {
                if !self.state.is_connected() {
                    debug!("Ignoring update for item {} while disconnected", item.id);
                    return;
                }
                if let Some(delta) = &delta {
                    self.on_audio_delta(&item, delta);
                }
                self.items_stale = true;
            }
        }
    }

    /// Discard remote events that are still queued
    pub(crate) fn drain_remote_events(&mut self) -> usize {
        let stale = self.remote_rx.try_iter().count();
        if stale > 0 {
            debug!("Discarded {} queued remote events", stale);
        }
        stale
    }

    /// Replace the displayed list with a fresh snapshot of the remote conversation
    pub fn refresh_items(&mut self) {
        let snapshot = self.client.get_items();
        let projection = self.projector.project(snapshot, self.decoder.as_ref());

        for err in projection.errors {
            self.report(err);
        }

        self.items = Arc::from(projection.items);
        self.items_stale = false;
        self.publish(SessionEvent::ItemsUpdated(self.snapshot()));
    }

    /// Ask the remote session to delete an item.
    ///
    /// The displayed list changes when the remote reports the deletion.
    pub fn delete_item(&mut self, id: &str) -> Result<()> {
        if !self.state.is_connected() {
            return Err(self.report(RealtalkError::InvalidState(
                "cannot delete items while disconnected".into(),
            )));
        }

        info!("Deleting conversation item {}", id);
        self.client
            .delete_item(id)
            .map_err(|e| self.report(remote_error(e)))
    }

    /// Log `err`, publish it and hand it back for returning
    pub(crate) fn report(&self, err: RealtalkError) -> RealtalkError {
        if err.is_recoverable() {
            warn!("{}", err);
        } else {
            error!("{}", err);
        }
        self.publish(SessionEvent::Error(err.clone()));
        err
    }

    /// Publish to the presentation layer. Never drops: the channel is
    /// unbounded and the session holds a receiver itself.
    pub(crate) fn publish(&self, event: SessionEvent) {
        if let Err(e) = self.event_tx.send(event) {
            debug!("No listener for {} event", event_name(&e.0));
        }
    }

    /// Release every subscription and reset the remote client.
    ///
    /// Runs at most once; later calls (including from `Drop`) do nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        for id in self.subscriptions.drain(..) {
            self.client.unsubscribe(id);
        }
        self.client.reset();
        self.frame_rx = None;

        info!("Voice session torn down");
    }

    async fn dispatch(&mut self, cmd: SessionCommand) -> Result<()> {
        match cmd {
            SessionCommand::Connect => self.connect().await,
            SessionCommand::Disconnect => self.disconnect().await,
            SessionCommand::StartRecording => self.start_recording().await,
            SessionCommand::StopRecording => self.stop_recording().await,
            SessionCommand::DeleteItem(id) => self.delete_item(&id),
            SessionCommand::Shutdown => Ok(()),
        }
    }

    /// Run the command loop until [`SessionCommand::Shutdown`] or until every
    /// handle is dropped, then disconnect and tear down.
    pub async fn run(&mut self) {
        info!("Voice session loop started");

        loop {
            match self.command_rx.try_recv() {
                Ok(SessionCommand::Shutdown) => {
                    info!("Voice session shutdown requested");
                    break;
                }
                Ok(cmd) => {
                    debug!("Handling command {:?}", cmd);
                    // Failures are already published as events
                    let _ = self.dispatch(cmd).await;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    warn!("Command channel disconnected");
                    break;
                }
            }

            self.pump().await;

            tokio::time::sleep(LOOP_INTERVAL).await;
        }

        if self.state.is_connected() {
            let _ = self.disconnect().await;
        }
        self.teardown();
        self.publish(SessionEvent::Shutdown);

        info!("Voice session loop stopped");
    }
}

impl Drop for VoiceSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub(crate) fn remote_error(err: RealtalkError) -> RealtalkError {
    match err {
        RealtalkError::RemoteError(_) => err,
        other => RealtalkError::RemoteError(other.to_string()),
    }
}

fn event_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::Connected => "Connected",
        SessionEvent::Disconnected => "Disconnected",
        SessionEvent::RecordingStarted => "RecordingStarted",
        SessionEvent::RecordingStopped => "RecordingStopped",
        SessionEvent::ItemsUpdated(_) => "ItemsUpdated",
        SessionEvent::Error(_) => "Error",
        SessionEvent::Shutdown => "Shutdown",
    }
}

/// Builder for creating a voice session
pub struct VoiceSessionBuilder {
    config: VoiceConfig,
    client: Option<Box<dyn RealtimeClient>>,
    capture: Option<Box<dyn CaptureDevice>>,
    playback: Option<Box<dyn PlaybackDevice>>,
    decoder: Option<Box<dyn AudioDecoder>>,
}

impl VoiceSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: VoiceConfig::default(),
            client: None,
            capture: None,
            playback: None,
            decoder: None,
        }
    }

    pub fn with_config(mut self, config: VoiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_client(mut self, client: impl RealtimeClient + 'static) -> Self {
        self.client = Some(Box::new(client));
        self
    }

    pub fn with_capture(mut self, capture: impl CaptureDevice + 'static) -> Self {
        self.capture = Some(Box::new(capture));
        self
    }

    pub fn with_playback(mut self, playback: impl PlaybackDevice + 'static) -> Self {
        self.playback = Some(Box::new(playback));
        self
    }

    pub fn with_decoder(mut self, decoder: impl AudioDecoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Use the default microphone and speaker
    #[cfg(feature = "audio-io")]
    pub fn with_default_devices(self) -> Self {
        let rate = self.config.sample_rate;
        let buffer_secs = self.config.playback_buffer_secs;
        self.with_capture(crate::audio::input::MicRecorder::new(rate))
            .with_playback(crate::audio::output::StreamPlayer::new(rate, buffer_secs))
    }

    pub fn build(self) -> Result<VoiceSession> {
        let client = self
            .client
            .ok_or_else(|| RealtalkError::ConfigError("A realtime client is required".into()))?;
        let capture = self
            .capture
            .ok_or_else(|| RealtalkError::ConfigError("A capture device is required".into()))?;
        let playback = self
            .playback
            .ok_or_else(|| RealtalkError::ConfigError("A playback device is required".into()))?;
        let decoder = self.decoder.unwrap_or_else(|| Box::new(WavDecoder));

        VoiceSession::with_decoder(self.config, client, capture, playback, decoder)
    }
}

impl Default for VoiceSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
