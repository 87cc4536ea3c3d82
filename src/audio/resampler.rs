use crate::{RealtalkError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use tracing::debug;

/// Frames fed to the sinc resampler per call
const CHUNK_SIZE: usize = 1024;

/// Mono sample-rate converter between the session rate and a device rate.
///
/// Hold one per stream: [`AudioResampler::push`] keeps filter state and any
/// partial chunk between calls, so consecutive blocks join without seams.
pub struct AudioResampler {
    resampler: SincFixedIn<f32>,
    input_rate: u32,
    output_rate: u32,
    /// Input not yet forming a full chunk
    pending: Vec<f32>,
}

impl AudioResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(RealtalkError::ConfigError(
                "Sample rates must be greater than 0".into(),
            ));
        }

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let resampler = SincFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            2.0,
            params,
            CHUNK_SIZE,
            1,
        )
        .map_err(|e| {
            RealtalkError::AudioProcessingError(format!("Failed to create resampler: {}", e))
        })?;

        debug!("Created resampler: {} Hz -> {} Hz", input_rate, output_rate);

        Ok(Self {
            resampler,
            input_rate,
            output_rate,
            pending: Vec::with_capacity(CHUNK_SIZE),
        })
    }

    /// Frames consumed per internal processing step
    pub fn chunk_size(&self) -> usize {
        self.resampler.input_frames_max()
    }

    /// Feed a block from a continuous stream.
    ///
    /// Only whole chunks are processed; the remainder waits for the next
    /// call, so the output may be shorter than one block or empty.
    pub fn push(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.pending.extend_from_slice(input);

        let chunk_size = self.chunk_size();
        let mut output = Vec::new();
        let mut consumed = 0;
        while self.pending.len() - consumed >= chunk_size {
            let chunk = &self.pending[consumed..consumed + chunk_size];
            let processed = self
                .resampler
                .process(&[chunk], None)
                .map_err(|e| RealtalkError::AudioProcessingError(format!("Resampling failed: {}", e)))?;
            output.extend_from_slice(&processed[0]);
            consumed += chunk_size;
        }
        self.pending.drain(..consumed);

        Ok(output)
    }

    /// Finish the stream: zero-pad and convert the held remainder, then
    /// reset so the next `push` starts a fresh stream.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        if self.pending.is_empty() {
            self.resampler.reset();
            return Ok(Vec::new());
        }

        let held = self.pending.len();
        let mut chunk = std::mem::take(&mut self.pending);
        chunk.resize(self.chunk_size(), 0.0);

        let processed = self
            .resampler
            .process(&[&chunk[..]], None)
            .map_err(|e| RealtalkError::AudioProcessingError(format!("Resampling failed: {}", e)))?;

        let ratio = self.output_rate as f64 / self.input_rate as f64;
        let keep = ((held as f64) * ratio).ceil() as usize;
        let produced = &processed[0];

        chunk.clear();
        self.pending = chunk;
        self.resampler.reset();

        Ok(produced[..keep.min(produced.len())].to_vec())
    }

    /// Drop held input and filter state
    pub fn reset(&mut self) {
        self.pending.clear();
        self.resampler.reset();
    }

    /// Resample a complete block of mono samples
    pub fn resample(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        let mut output = self.push(input)?;
        output.extend(self.flush()?);

        debug!("Resampled {} samples -> {} samples", input.len(), output.len());
        Ok(output)
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }
}

/// Resample PCM16 mono audio in one step; a no-op when the rates match
pub fn resample_pcm16(input: &[i16], input_rate: u32, output_rate: u32) -> Result<Vec<i16>> {
    if input_rate == output_rate {
        return Ok(input.to_vec());
    }

    let mut resampler = AudioResampler::new(input_rate, output_rate)?;
    let resampled = resampler.resample(&pcm16_to_f32(input))?;
    Ok(f32_to_pcm16(&resampled))
}

pub fn pcm16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / i16::MAX as f32).collect()
}

pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}
