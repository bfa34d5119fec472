//! Sample rate conversion using rubato.
//!
//! Whole-buffer conversion for offline analysis. The signal is pushed through
//! a rubato FFT resampler in fixed-size chunks, zero-padded at the tail, and
//! the resampler's output delay is removed so the result lines up with the
//! input.

use rubato::{FftFixedInOut, Resampler};
use tracing::debug;

use crate::AudioError;

/// Input frames per processing block.
const CHUNK_SIZE: usize = 1024;

/// Resamples mono f32 samples from `from_rate` to `to_rate`.
///
/// The output holds `round(len * to_rate / from_rate)` samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == 0 {
        return Err(AudioError::InvalidSampleRate(from_rate));
    }
    if to_rate == 0 {
        return Err(AudioError::InvalidSampleRate(to_rate));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 1)?;
    let delay = resampler.output_delay();
    let expected = output_len(samples.len(), from_rate, to_rate);

    let mut out = Vec::with_capacity(expected + delay + CHUNK_SIZE);
    let mut chunk: Vec<f32> = Vec::with_capacity(resampler.input_frames_max());
    let mut pos = 0usize;

    while out.len() < expected + delay {
        let need = resampler.input_frames_next();
        chunk.clear();
        if pos < samples.len() {
            let end = (pos + need).min(samples.len());
            chunk.extend_from_slice(&samples[pos..end]);
        }
        // Zero-pad the final block and the flush blocks.
        chunk.resize(need, 0.0);
        pos += need;

        let processed = resampler.process(&[&chunk], None)?;
        match processed.first() {
            Some(channel) if !channel.is_empty() => out.extend_from_slice(channel),
            _ => {
                return Err(AudioError::Resample(
                    "resampler produced no output".to_string(),
                ));
            }
        }
    }

    out.drain(..delay.min(out.len()));
    out.truncate(expected);
    debug!(
        from_rate,
        to_rate,
        input = samples.len(),
        output = out.len(),
        "resampled"
    );
    Ok(out)
}

fn output_len(input_len: usize, from_rate: u32, to_rate: u32) -> usize {
    ((input_len as u128 * to_rate as u128 + from_rate as u128 / 2) / from_rate as u128) as usize
}
