//! Speaker features for voice authentication.
//!
//! The [`Extractor`] turns a waveform into a [`FeatureSequence`] of stacked
//! MFCC, delta and delta-delta vectors with channel mean normalization:
//!
//! 1. Resample to the working rate and trim silence (`voxgate-audio`)
//! 2. Pre-emphasis, 25 ms Hamming frames every 10 ms, 512-point FFT
//! 3. Triangular mel filterbank, dB energies, orthonormal DCT-II
//! 4. Regression deltas and delta-deltas (half-width 4)
//! 5. Per-channel mean subtraction
//!
//! [`FeatureCache`] memoizes sequences by file, and [`batch`] runs bulk
//! extraction on a bounded worker pool. [`summary`] computes the per-file
//! statistics used for tabular export and feature ranking.

pub mod batch;
mod cache;
mod config;
mod delta;
mod error;
mod extractor;
mod fft;
mod mel;
mod mfcc;
mod sequence;
pub mod summary;

pub use batch::{extract_all, extract_ok, run_pool};
pub use cache::FeatureCache;
pub use config::FeatureConfig;
pub use delta::deltas;
pub use error::FeatureError;
pub use extractor::Extractor;
pub use mfcc::Mfcc;
pub use sequence::FeatureSequence;
