use crate::{resampler, AudioError};

/// Mono PCM audio as f32 samples in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Creates a waveform from mono samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Converts to the given sample rate. Returns `self` unchanged when the
    /// rate already matches.
    pub fn resample(self, sample_rate: u32) -> Result<Self, AudioError> {
        if self.sample_rate == sample_rate {
            return Ok(self);
        }
        let samples = resampler::resample(&self.samples, self.sample_rate, sample_rate)?;
        Ok(Self::new(samples, sample_rate))
    }
}
