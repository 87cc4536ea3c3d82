use crate::audio::buffer::TrackQueue;
use crate::audio::device::{PlaybackDevice, TrackOffset};
use crate::audio::resampler::{pcm16_to_f32, AudioResampler};
use crate::{RealtalkError, Result};
use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SampleRate, Stream, StreamConfig};
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

/// Streaming speaker output on the default cpal output device.
///
/// Audio is queued per track at the session rate, so played offsets need no
/// conversion. The output callback converts to the device rate with one
/// resampler that lives as long as the stream.
pub struct StreamPlayer {
    session_rate: u32,
    device_rate: u32,
    queue: TrackQueue,
    stream: Option<Stream>,
}

impl StreamPlayer {
    /// Create a player that can buffer `buffer_secs` seconds of audio
    pub fn new(session_rate: u32, buffer_secs: u32) -> Self {
        let capacity = (session_rate * buffer_secs.max(1)) as usize;
        Self {
            session_rate,
            device_rate: session_rate,
            queue: TrackQueue::new(capacity),
            stream: None,
        }
    }

    /// Shared handle on the playback queue
    pub fn queue(&self) -> TrackQueue {
        self.queue.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    pub fn device_rate(&self) -> u32 {
        self.device_rate
    }
}

/// Pulls session-rate samples off the queue and renders device frames.
struct OutputFeed {
    queue: TrackQueue,
    resampler: Option<AudioResampler>,
    scratch: Vec<i16>,
    /// Converted samples not yet written to the device
    ready: VecDeque<f32>,
    generation: u64,
}

impl OutputFeed {
    fn new(queue: TrackQueue, session_rate: u32, device_rate: u32) -> Result<Self> {
        let resampler = if session_rate == device_rate {
            None
        } else {
            Some(AudioResampler::new(session_rate, device_rate)?)
        };
        let generation = queue.generation();

        Ok(Self {
            queue,
            resampler,
            scratch: Vec::new(),
            ready: VecDeque::new(),
            generation,
        })
    }

    /// Fill an interleaved device buffer, padding with silence
    fn render(&mut self, data: &mut [f32], channels: usize) {
        let frames = data.len() / channels.max(1);

        // Audio converted before an interrupt must not play after it
        let generation = self.queue.generation();
        if generation != self.generation {
            self.generation = generation;
            self.ready.clear();
            if let Some(resampler) = self.resampler.as_mut() {
                resampler.reset();
            }
        }

        match self.resampler.as_mut() {
            None => {
                self.scratch.resize(frames, 0);
                let available = self.queue.fill(&mut self.scratch[..frames]);
                self.ready
                    .extend(pcm16_to_f32(&self.scratch[..available]));
            }
            Some(resampler) => {
                while self.ready.len() < frames {
                    let chunk = resampler.chunk_size();
                    self.scratch.resize(chunk, 0);
                    let got = self.queue.fill(&mut self.scratch[..chunk]);
                    if got == 0 {
                        break;
                    }
                    // A short read is the end of the audio; the padding is silence
                    self.scratch[got..chunk].fill(0);

                    match resampler.push(&pcm16_to_f32(&self.scratch[..chunk])) {
                        Ok(block) => self.ready.extend(block),
                        Err(e) => {
                            warn!("Dropping output block: {}", e);
                            break;
                        }
                    }
                }
            }
        }

        for frame in data.chunks_mut(channels.max(1)) {
            frame.fill(self.ready.pop_front().unwrap_or(0.0));
        }
    }
}

fn pick_output_config(device: &Device, session_rate: u32) -> Result<StreamConfig> {
    let native = device
        .supported_output_configs()
        .map_err(|e| RealtalkError::AudioDeviceError(format!("Failed to query output configs: {}", e)))?
        .find(|range| {
            range.sample_format() == SampleFormat::F32
                && range.min_sample_rate().0 <= session_rate
                && range.max_sample_rate().0 >= session_rate
        });

    if let Some(range) = native {
        return Ok(range.with_sample_rate(SampleRate(session_rate)).into());
    }

    let config = device
        .default_output_config()
        .map_err(|e| RealtalkError::AudioDeviceError(format!("Failed to get output config: {}", e)))?;
    Ok(config.into())
}

#[async_trait(?Send)]
impl PlaybackDevice for StreamPlayer {
    async fn connect(&mut self) -> Result<()> {
        // New session: forget tracks of the previous one
        self.queue.reset();
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| RealtalkError::AudioDeviceError("No output device available".into()))?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = pick_output_config(&device, self.session_rate)?;
        let channels = config.channels as usize;
        let mut feed = OutputFeed::new(self.queue.clone(), self.session_rate, config.sample_rate.0)?;

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    feed.render(data, channels);
                },
                err_fn,
                None,
            )
            .map_err(|e| RealtalkError::AudioDeviceError(format!("Failed to build output stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| RealtalkError::AudioDeviceError(format!("Failed to start output stream: {}", e)))?;

        self.device_rate = config.sample_rate.0;
        self.stream = Some(stream);

        info!("Started audio playback at {} Hz", self.device_rate);
        Ok(())
    }

    fn add_pcm16(&mut self, samples: &[i16], track_id: &str) -> Result<()> {
        let queued = self.queue.push(track_id, samples);
        debug!("Queued {} samples for track {}", queued, track_id);
        Ok(())
    }

    async fn interrupt(&mut self) -> Result<Option<TrackOffset>> {
        Ok(self.queue.interrupt().map(|(track_id, offset)| {
            info!("Playback interrupted on track {} at sample {}", track_id, offset);
            TrackOffset { track_id, offset }
        }))
    }
}

impl Drop for StreamPlayer {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            info!("Stopped audio playback");
        }
    }
}
