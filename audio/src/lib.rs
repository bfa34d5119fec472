//! Audio input conditioning for voice authentication.
//!
//! This crate turns audio files into analysis-ready waveforms:
//!
//! - `decode`: file → mono f32 PCM (`hound` for WAV, `symphonia` for
//!   compressed containers)
//! - `resampler`: sample rate conversion (rubato FFT resampler)
//! - `trim`: removal of leading/trailing low-energy regions
//!
//! # Example
//!
//! ```no_run
//! use voxgate_audio::{decode_file, trim_silence, TrimConfig};
//!
//! let wave = decode_file("hello.wav".as_ref())?.resample(16000)?;
//! let voiced = trim_silence(wave.samples(), &TrimConfig::default());
//! println!("{} voiced samples", voiced.len());
//! # Ok::<(), voxgate_audio::AudioError>(())
//! ```

pub mod decode;
mod error;
pub mod resampler;
pub mod trim;
mod waveform;

pub use decode::{collect_audio_files, decode_file, decode_wav_bytes, is_audio_file, write_wav};
pub use error::AudioError;
pub use resampler::resample;
pub use trim::{trim_silence, voiced_range, TrimConfig};
pub use waveform::Waveform;
