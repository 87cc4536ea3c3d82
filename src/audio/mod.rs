pub mod buffer;
pub mod device;
#[cfg(feature = "audio-io")]
pub mod input;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod resampler;
pub mod wav;

pub use buffer::TrackQueue;
pub use device::{AudioDecoder, AudioFrame, CaptureDevice, PlaybackDevice, TrackOffset};
#[cfg(feature = "audio-io")]
pub use input::MicRecorder;
#[cfg(feature = "audio-io")]
pub use output::StreamPlayer;
pub use resampler::{resample_pcm16, AudioResampler};
pub use wav::{decode_pcm16, encode_wav, read_wav_bytes, WavDecoder, WavFile};
