use crate::audio::device::AudioDecoder;
use crate::audio::resampler::resample_pcm16;
use crate::{RealtalkError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, info};

/// A complete in-memory RIFF/WAVE file.
#[derive(Debug, Clone, PartialEq)]
pub struct WavFile {
    pub bytes: Vec<u8>,
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of samples per channel
    pub samples: usize,
}

impl WavFile {
    pub fn duration_secs(&self) -> f32 {
        self.samples as f32 / self.sample_rate as f32
    }

    /// Write the file to disk
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        info!("Wrote {} bytes of WAV data to {:?}", self.bytes.len(), path.as_ref());
        Ok(())
    }
}

/// Encode PCM16 samples as a 16-bit WAV file
///
/// # Arguments
/// * `samples` - Interleaved PCM16 samples
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Number of channels
pub fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Result<WavFile> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut bytes = Vec::with_capacity(44 + samples.len() * 2);
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec)
            .map_err(|e| RealtalkError::DecodeError(format!("Failed to create WAV writer: {}", e)))?;

        let mut sample_writer = writer.get_i16_writer(samples.len() as u32);
        for &sample in samples {
            sample_writer.write_sample(sample);
        }
        sample_writer
            .flush()
            .map_err(|e| RealtalkError::DecodeError(format!("Failed to write samples: {}", e)))?;

        writer
            .finalize()
            .map_err(|e| RealtalkError::DecodeError(format!("Failed to finalize WAV data: {}", e)))?;
    }

    Ok(WavFile {
        bytes,
        sample_rate,
        channels,
        samples: samples.len() / channels.max(1) as usize,
    })
}

/// Decode raw PCM16 mono audio into a playable WAV file
///
/// Resamples from `source_rate` to `target_rate` first when they differ.
pub fn decode_pcm16(samples: &[i16], source_rate: u32, target_rate: u32) -> Result<WavFile> {
    if samples.is_empty() {
        return Err(RealtalkError::DecodeError("No audio to decode".into()));
    }

    let resampled = resample_pcm16(samples, source_rate, target_rate)
        .map_err(|e| RealtalkError::DecodeError(e.to_string()))?;

    let file = encode_wav(&resampled, target_rate, 1)?;
    debug!(
        "Decoded {} samples into {:.2}s of WAV audio",
        samples.len(),
        file.duration_secs()
    );
    Ok(file)
}

/// Read PCM16 samples back out of WAV bytes
///
/// # Returns
/// * Tuple of (samples, sample_rate, channels)
pub fn read_wav_bytes(bytes: &[u8]) -> Result<(Vec<i16>, u32, u16)> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| RealtalkError::DecodeError(format!("Failed to open WAV data: {}", e)))?;

    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(RealtalkError::AudioProcessingError(format!(
            "Unsupported WAV format: {} bits {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }

    let samples = reader
        .samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| RealtalkError::DecodeError(format!("Failed to read sample: {}", e)))?;

    Ok((samples, spec.sample_rate, spec.channels))
}

/// [`AudioDecoder`] backed by hound
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, samples: &[i16], source_rate: u32, target_rate: u32) -> Result<WavFile> {
        decode_pcm16(samples, source_rate, target_rate)
    }
}
