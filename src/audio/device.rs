//! Audio device seams consumed by the voice session
//!
//! The session never talks to hardware directly. It drives a capture device,
//! a playback device and a decoder through these traits, which lets the cpal
//! implementations in this crate be swapped for test doubles.

use crate::audio::wav::WavFile;
use crate::Result;
use async_trait::async_trait;
use crossbeam_channel::Sender;

/// One block of PCM16 mono samples at the session sample rate.
pub type AudioFrame = Vec<i16>;

/// Where playback stood when it was interrupted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackOffset {
    /// Track (item id) that was audible
    pub track_id: String,
    /// Samples of that track actually played, at the session sample rate
    pub offset: u64,
}

impl TrackOffset {
    pub fn new(track_id: impl Into<String>, offset: u64) -> Self {
        Self {
            track_id: track_id.into(),
            offset,
        }
    }
}

/// Microphone side.
#[async_trait(?Send)]
pub trait CaptureDevice {
    /// Acquire the input device.
    async fn begin(&mut self) -> Result<()>;

    /// Start delivering frames, in capture order, to `frames`.
    async fn record(&mut self, frames: Sender<AudioFrame>) -> Result<()>;

    /// Stop delivering frames. No frame is sent once this returns.
    async fn pause(&mut self) -> Result<()>;

    /// Release the input device.
    async fn end(&mut self) -> Result<()>;
}

/// Speaker side.
#[async_trait(?Send)]
pub trait PlaybackDevice {
    /// Acquire the output device.
    async fn connect(&mut self) -> Result<()>;

    /// Queue PCM16 samples for playback under `track_id`.
    fn add_pcm16(&mut self, samples: &[i16], track_id: &str) -> Result<()>;

    /// Halt playback and drop everything queued.
    ///
    /// Returns the track that was playing and how far into it playback got,
    /// or `None` when nothing was playing.
    async fn interrupt(&mut self) -> Result<Option<TrackOffset>>;
}

/// Turns raw PCM16 into a playable file.
pub trait AudioDecoder {
    fn decode(&self, samples: &[i16], source_rate: u32, target_rate: u32) -> Result<WavFile>;
}
