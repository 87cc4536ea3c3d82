//! Recording test doubles for the session collaborators
//!
//! Every double appends to one shared call log so tests can assert on the
//! exact order of operations across the client and both devices.

#![allow(dead_code)]

use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use realtalk::audio::{
    AudioDecoder, AudioFrame, CaptureDevice, PlaybackDevice, TrackOffset, WavFile,
};
use realtalk::integration::{SessionEvent, VoiceConfig, VoiceSession, VoiceSessionBuilder};
use realtalk::messages::{Conversation, ConversationItem, ItemDelta};
use realtalk::remote::{
    EventKind, RealtimeClient, RemoteEvent, SessionUpdate, SubscriberRegistry, SubscriptionId,
};
use realtalk::{RealtalkError, Result};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    UpdateSession(SessionUpdate),
    Subscribe(EventKind),
    Unsubscribe,
    Reset,
    ClientConnect,
    ClientDisconnect,
    AppendInputAudio(Vec<i16>),
    CreateResponse,
    CancelResponse(String, u64),
    DeleteItem(String),
    CaptureBegin,
    CaptureRecord,
    CapturePause,
    CaptureEnd,
    PlaybackConnect,
    AddPcm16(String, Vec<i16>),
    PlaybackInterrupt,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

// ---------------------------------------------------------------------------
// Remote client

#[derive(Default)]
struct ClientState {
    registry: SubscriberRegistry,
    conversation: Conversation,
    fail_connect: bool,
    fail_disconnect: bool,
}

pub struct MockClient {
    log: CallLog,
    state: Arc<Mutex<ClientState>>,
}

/// Test-side control over a [`MockClient`] owned by the session
#[derive(Clone)]
pub struct ClientControl {
    state: Arc<Mutex<ClientState>>,
}

impl ClientControl {
    /// Deliver an event to the session's subscriptions
    pub fn emit(&self, event: RemoteEvent) -> usize {
        self.state.lock().registry.dispatch(&event)
    }

    /// Store `item` in the remote conversation, then announce it
    pub fn update(&self, item: ConversationItem, delta: Option<ItemDelta>) -> usize {
        let mut state = self.state.lock();
        state.conversation.upsert(item.clone());
        state
            .registry
            .dispatch(&RemoteEvent::ConversationUpdated { item, delta })
    }

    pub fn conversation(&self) -> Conversation {
        self.state.lock().conversation.clone()
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }

    pub fn fail_disconnect(&self, fail: bool) {
        self.state.lock().fail_disconnect = fail;
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().registry.len()
    }
}

#[async_trait(?Send)]
impl RealtimeClient for MockClient {
    async fn connect(&mut self) -> Result<()> {
        self.log.lock().push(Call::ClientConnect);
        if self.state.lock().fail_connect {
            return Err(RealtalkError::ConnectionError("handshake refused".into()));
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.log.lock().push(Call::ClientDisconnect);
        let state = self.state.lock();
        state.conversation.clear();
        if state.fail_disconnect {
            return Err(RealtalkError::RemoteError("socket already gone".into()));
        }
        Ok(())
    }

    fn update_session(&mut self, update: SessionUpdate) -> Result<()> {
        self.log.lock().push(Call::UpdateSession(update));
        Ok(())
    }

    fn append_input_audio(&mut self, frame: &[i16]) -> Result<()> {
        self.log.lock().push(Call::AppendInputAudio(frame.to_vec()));
        Ok(())
    }

    fn create_response(&mut self) -> Result<()> {
        self.log.lock().push(Call::CreateResponse);
        Ok(())
    }

    async fn cancel_response(&mut self, track_id: &str, offset: u64) -> Result<()> {
        self.log
            .lock()
            .push(Call::CancelResponse(track_id.to_string(), offset));
        Ok(())
    }

    fn delete_item(&mut self, id: &str) -> Result<()> {
        self.log.lock().push(Call::DeleteItem(id.to_string()));
        Ok(())
    }

    fn subscribe(&mut self, kind: EventKind, events: Sender<RemoteEvent>) -> SubscriptionId {
        self.log.lock().push(Call::Subscribe(kind));
        self.state.lock().registry.subscribe(kind, events)
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        self.log.lock().push(Call::Unsubscribe);
        self.state.lock().registry.unsubscribe(id);
    }

    fn reset(&mut self) {
        self.log.lock().push(Call::Reset);
        let mut state = self.state.lock();
        state.registry.clear();
        state.conversation.clear();
    }

    fn get_items(&self) -> Vec<ConversationItem> {
        self.state.lock().conversation.get_all()
    }
}

// ---------------------------------------------------------------------------
// Capture device

#[derive(Default)]
struct CaptureState {
    frames: Option<Sender<AudioFrame>>,
    recording: bool,
    fail_begin: bool,
    fail_record: bool,
}

pub struct MockCapture {
    log: CallLog,
    state: Arc<Mutex<CaptureState>>,
}

#[derive(Clone)]
pub struct CaptureControl {
    state: Arc<Mutex<CaptureState>>,
}

impl CaptureControl {
    /// Deliver a frame the way a well-behaved device would: only while recording
    pub fn emit(&self, frame: Vec<i16>) -> bool {
        let state = self.state.lock();
        match (&state.frames, state.recording) {
            (Some(frames), true) => frames.send(frame).is_ok(),
            _ => false,
        }
    }

    /// Deliver a frame even after a pause, like a device with a late callback
    pub fn emit_late(&self, frame: Vec<i16>) -> bool {
        let state = self.state.lock();
        state
            .frames
            .as_ref()
            .is_some_and(|frames| frames.send(frame).is_ok())
    }

    pub fn fail_begin(&self, fail: bool) {
        self.state.lock().fail_begin = fail;
    }

    pub fn fail_record(&self, fail: bool) {
        self.state.lock().fail_record = fail;
    }
}

#[async_trait(?Send)]
impl CaptureDevice for MockCapture {
    async fn begin(&mut self) -> Result<()> {
        self.log.lock().push(Call::CaptureBegin);
        if self.state.lock().fail_begin {
            return Err(RealtalkError::AudioDeviceError("microphone permission denied".into()));
        }
        Ok(())
    }

    async fn record(&mut self, frames: Sender<AudioFrame>) -> Result<()> {
        self.log.lock().push(Call::CaptureRecord);
        let mut state = self.state.lock();
        if state.fail_record {
            return Err(RealtalkError::AudioDeviceError("input stream unavailable".into()));
        }
        state.frames = Some(frames);
        state.recording = true;
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.log.lock().push(Call::CapturePause);
        // Keep the sender so late callbacks can be simulated
        self.state.lock().recording = false;
        Ok(())
    }

    async fn end(&mut self) -> Result<()> {
        self.log.lock().push(Call::CaptureEnd);
        let mut state = self.state.lock();
        state.recording = false;
        state.frames = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Playback device

#[derive(Default)]
struct PlaybackState {
    interrupts: VecDeque<Option<TrackOffset>>,
    fail_connect: bool,
}

pub struct MockPlayback {
    log: CallLog,
    state: Arc<Mutex<PlaybackState>>,
}

#[derive(Clone)]
pub struct PlaybackControl {
    state: Arc<Mutex<PlaybackState>>,
}

impl PlaybackControl {
    /// Result of the next `interrupt()`; later calls report nothing playing
    pub fn next_interrupt(&self, track: Option<TrackOffset>) {
        self.state.lock().interrupts.push_back(track);
    }

    pub fn fail_connect(&self, fail: bool) {
        self.state.lock().fail_connect = fail;
    }
}

#[async_trait(?Send)]
impl PlaybackDevice for MockPlayback {
    async fn connect(&mut self) -> Result<()> {
        self.log.lock().push(Call::PlaybackConnect);
        if self.state.lock().fail_connect {
            return Err(RealtalkError::AudioDeviceError("no output device".into()));
        }
        Ok(())
    }

    fn add_pcm16(&mut self, samples: &[i16], track_id: &str) -> Result<()> {
        self.log
            .lock()
            .push(Call::AddPcm16(track_id.to_string(), samples.to_vec()));
        Ok(())
    }

    async fn interrupt(&mut self) -> Result<Option<TrackOffset>> {
        self.log.lock().push(Call::PlaybackInterrupt);
        Ok(self.state.lock().interrupts.pop_front().flatten())
    }
}

// ---------------------------------------------------------------------------
// Decoders

pub struct BrokenDecoder;

impl AudioDecoder for BrokenDecoder {
    fn decode(&self, _: &[i16], _: u32, _: u32) -> Result<WavFile> {
        Err(RealtalkError::DecodeError("truncated pcm payload".into()))
    }
}

// ---------------------------------------------------------------------------
// Harness

pub struct Harness {
    pub session: VoiceSession,
    pub log: CallLog,
    pub client: ClientControl,
    pub capture: CaptureControl,
    pub playback: PlaybackControl,
    pub events: Receiver<SessionEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(|builder| builder)
    }

    pub fn with_decoder(decoder: impl AudioDecoder + 'static) -> Self {
        Self::build(move |builder| builder.with_decoder(decoder))
    }

    fn build(configure: impl FnOnce(VoiceSessionBuilder) -> VoiceSessionBuilder) -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let client_state = Arc::new(Mutex::new(ClientState::default()));
        let capture_state = Arc::new(Mutex::new(CaptureState::default()));
        let playback_state = Arc::new(Mutex::new(PlaybackState::default()));

        let client = MockClient {
            log: Arc::clone(&log),
            state: Arc::clone(&client_state),
        };
        let capture = MockCapture {
            log: Arc::clone(&log),
            state: Arc::clone(&capture_state),
        };
        let playback = MockPlayback {
            log: Arc::clone(&log),
            state: Arc::clone(&playback_state),
        };

        let builder = VoiceSession::builder()
            .with_config(VoiceConfig::default().with_instructions("Be brief."))
            .with_client(client)
            .with_capture(capture)
            .with_playback(playback);
        let session = configure(builder).build().expect("session should build");
        let events = session.events();

        Self {
            session,
            log,
            client: ClientControl {
                state: client_state,
            },
            capture: CaptureControl {
                state: capture_state,
            },
            playback: PlaybackControl {
                state: playback_state,
            },
            events,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().clear();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.log.lock().iter().filter(|c| *c == call).count()
    }

    /// Position of the first call matching `pred`
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.log.lock().iter().position(|c| pred(c))
    }

    pub fn appended_frames(&self) -> Vec<Vec<i16>> {
        self.log
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::AppendInputAudio(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn drain_events(&self) -> Vec<SessionEvent> {
        self.events.try_iter().collect()
    }

    pub async fn connected() -> Self {
        let mut harness = Self::new();
        harness.session.connect().await.expect("connect should succeed");
        harness.clear_calls();
        harness.drain_events();
        harness
    }
}
