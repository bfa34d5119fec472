//! Synthetic speech for end-to-end tests.
//!
//! A voice is a glottal pulse train (harmonics of `f0` with a 1/k tilt)
//! shaped by three formant resonances. Each vowel has its own formants and
//! each voice scales them, so two voices saying the same vowel differ in
//! both pitch and timbre. Takes of the same phrase vary in pitch, timing
//! and noise.

#![allow(dead_code)]

use std::f64::consts::PI;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use voxgate_audio::{write_wav, Waveform};

pub const SAMPLE_RATE: u32 = 16000;

#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub f0: f64,
    pub formant_scale: f64,
}

pub const X: Voice = Voice { f0: 110.0, formant_scale: 1.0 };
pub const Y: Voice = Voice { f0: 220.0, formant_scale: 1.2 };
pub const Z1: Voice = Voice { f0: 150.0, formant_scale: 1.1 };
pub const Z2: Voice = Voice { f0: 95.0, formant_scale: 0.9 };
pub const Z3: Voice = Voice { f0: 190.0, formant_scale: 1.15 };
/// Never enrolled anywhere.
pub const W: Voice = Voice { f0: 250.0, formant_scale: 1.25 };

/// Enrolled passphrase.
pub const PHRASE: &[char] = &['a', 'e', 'i', 'o'];
/// Same vowels, different order.
pub const OTHER_PHRASE: &[char] = &['o', 'i', 'e', 'a'];

const VOWEL_SECONDS: f64 = 0.25;
const CROSSFADE_SECONDS: f64 = 0.04;
const PAD_SECONDS: f64 = 0.2;
const BLOCK: usize = 160;

fn formants(vowel: char) -> [f64; 3] {
    match vowel {
        'a' => [730.0, 1090.0, 2440.0],
        'e' => [530.0, 1840.0, 2480.0],
        'i' => [270.0, 2290.0, 3010.0],
        'o' => [570.0, 840.0, 2410.0],
        _ => [300.0, 870.0, 2240.0],
    }
}

/// Harmonic amplitudes of `voice` saying `vowel`.
fn harmonic_amps(voice: Voice, vowel: char, harmonics: usize) -> Vec<f64> {
    let f = formants(vowel);
    (1..=harmonics)
        .map(|k| {
            let freq = k as f64 * voice.f0;
            let gain: f64 = f
                .iter()
                .zip([1.0, 0.8, 0.5])
                .map(|(&fc, w)| {
                    let centre = fc * voice.formant_scale;
                    let bw = 60.0 + 0.05 * centre;
                    w / (1.0 + ((freq - centre) / bw).powi(2))
                })
                .sum();
            gain / k as f64
        })
        .collect()
}

/// One take of `voice` saying `vowels`, padded with low-level noise.
pub fn utterance(voice: Voice, vowels: &[char], take: u64) -> Waveform {
    let seed = (voice.f0 as u64) * 1000 + (voice.formant_scale * 100.0) as u64 + take * 7919
        + vowels.first().map_or(0, |&c| c as u64) * 31;
    let mut rng = StdRng::seed_from_u64(seed);

    let sr = SAMPLE_RATE as f64;
    let f0 = voice.f0 * (1.0 + 0.04 * (rng.gen_range(0.0f64..1.0) - 0.5));
    let harmonics = ((7600.0 / f0) as usize).max(1);
    let amps: Vec<Vec<f64>> = vowels
        .iter()
        .map(|&v| harmonic_amps(voice, v, harmonics))
        .collect();

    let mut bounds = Vec::with_capacity(vowels.len() + 1);
    bounds.push(0.0);
    for _ in vowels {
        let dur = VOWEL_SECONDS * (0.9 + 0.2 * rng.gen_range(0.0f64..1.0));
        bounds.push(bounds.last().copied().unwrap_or(0.0) + dur);
    }
    let voiced_seconds = bounds.last().copied().unwrap_or(0.0);
    let voiced_len = (voiced_seconds * sr) as usize;

    let mut voiced = Vec::with_capacity(voiced_len);
    let mut phase = 0.0f64;
    let mut block_amps = vec![0.0; harmonics];
    for n in 0..voiced_len {
        let t = n as f64 / sr;
        if n % BLOCK == 0 {
            let seg = bounds
                .windows(2)
                .position(|w| t < w[1])
                .unwrap_or(vowels.len() - 1);
            let into = t - bounds[seg];
            let alpha = if seg > 0 && into < CROSSFADE_SECONDS {
                into / CROSSFADE_SECONDS
            } else {
                1.0
            };
            for (k, a) in block_amps.iter_mut().enumerate() {
                let prev = if seg > 0 { amps[seg - 1][k] } else { amps[seg][k] };
                *a = prev + alpha * (amps[seg][k] - prev);
            }
        }

        let inst_f0 = f0 * (1.0 + 0.01 * (2.0 * PI * 5.0 * t).sin()) * (1.0 - 0.05 * t);
        phase += 2.0 * PI * inst_f0 / sr;
        let s: f64 = block_amps
            .iter()
            .enumerate()
            .map(|(k, a)| a * ((k + 1) as f64 * phase).sin())
            .sum();

        let ramp = (t / 0.02).min((voiced_seconds - t) / 0.02).clamp(0.0, 1.0);
        voiced.push(s * ramp);
    }

    let peak = voiced.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1e-9);
    let pad = (PAD_SECONDS * sr) as usize;
    let mut samples = Vec::with_capacity(voiced_len + 2 * pad);
    let mut noise = || 0.002 * (rng.gen_range(0.0f64..1.0) - 0.5);
    samples.extend((0..pad).map(|_| noise() as f32));
    samples.extend(voiced.iter().map(|v| (0.5 * v / peak + noise()) as f32));
    samples.extend((0..pad).map(|_| noise() as f32));

    Waveform::new(samples, SAMPLE_RATE)
}

/// Temporary directory of generated recordings.
pub struct Corpus {
    dir: TempDir,
}

impl Corpus {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes `wave` as `name` and returns its path.
    pub fn write(&self, name: &str, wave: &Waveform) -> PathBuf {
        let path = self.path(name);
        write_wav(&path, wave).unwrap();
        path
    }

    /// Writes one take and returns its path.
    pub fn take(&self, label: &str, voice: Voice, vowels: &[char], take: u64) -> PathBuf {
        let phrase: String = vowels.iter().collect();
        let name = format!("{label}_{phrase}_{take}.wav");
        self.write(&name, &utterance(voice, vowels, take))
    }
}
