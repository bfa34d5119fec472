//! Audio file decoding to mono f32 PCM.
//!
//! WAV files are read with `hound`. Everything else goes through the
//! `symphonia` probe (mp3, aac/m4a and whatever else is compiled in).
//! Multi-channel audio is downmixed by averaging channels.

use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use crate::{AudioError, Waveform};

/// File extensions recognized as audio by [`collect_audio_files`].
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "aac", "mp4", "flac", "ogg"];

/// Decodes an audio file into a mono waveform at its native sample rate.
pub fn decode_file(path: &Path) -> Result<Waveform, AudioError> {
    if !path.is_file() {
        return Err(AudioError::FileNotFound(path.to_path_buf()));
    }

    let ext = extension(path);
    let wave = if ext.as_deref() == Some("wav") {
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        decode_wav(std::io::BufReader::new(file))?
    } else {
        decode_symphonia(path, ext.as_deref())?
    };

    debug!(
        path = %path.display(),
        sample_rate = wave.sample_rate(),
        samples = wave.len(),
        "decoded audio"
    );
    Ok(wave)
}

/// Decodes an in-memory WAV file.
pub fn decode_wav_bytes(data: &[u8]) -> Result<Waveform, AudioError> {
    decode_wav(Cursor::new(data))
}

/// Writes a waveform as 16-bit PCM mono WAV.
pub fn write_wav(path: &Path, wave: &Waveform) -> Result<(), AudioError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: wave.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &s in wave.samples() {
        let v = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        writer.write_sample(v)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Returns true if the path has a recognized audio extension.
pub fn is_audio_file(path: &Path) -> bool {
    extension(path).is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// Recursively lists audio files under `dir`, sorted by path. Symbolic
/// links are skipped.
pub fn collect_audio_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_symlink() {
                debug!(path = %path.display(), "skipping symlink");
            } else if file_type.is_dir() {
                pending.push(path);
            } else if is_audio_file(&path) {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn open_error(path: &Path, e: std::io::Error) -> AudioError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AudioError::FileNotFound(path.to_path_buf())
    } else {
        AudioError::Decode(format!("open {}: {e}", path.display()))
    }
}

fn decode_wav<R: Read>(reader: R) -> Result<Waveform, AudioError> {
    let mut reader = hound::WavReader::new(reader)?;
    let spec = reader.spec();
    if spec.channels == 0 {
        return Err(AudioError::UnsupportedFormat("wav with zero channels".into()));
    }

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AudioError::UnsupportedFormat(format!(
                    "{}-bit integer wav",
                    spec.bits_per_sample
                )));
            }
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()?
        }
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
    };

    Ok(Waveform::new(
        downmix(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}

fn decode_symphonia(path: &Path, ext: Option<&str>) -> Result<Waveform, AudioError> {
    let file = File::open(path).map_err(|e| open_error(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = ext {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| match e {
            SymphError::Unsupported(what) => AudioError::UnsupportedFormat(what.to_string()),
            other => AudioError::UnsupportedFormat(other.to_string()),
        })?;

    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| AudioError::UnsupportedFormat("no default audio track".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("unknown sample rate".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(format!("no decoder: {e}")))?;

    let mut out: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(AudioError::Decode(format!("read packet: {e}"))),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            // Corrupt packets are skipped; the stream may recover.
            Err(SymphError::DecodeError(_)) => continue,
            Err(e) => return Err(AudioError::Decode(format!("decode packet: {e}"))),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count();
        let frames = decoded.frames();
        let needs_new = sample_buf
            .as_ref()
            .is_none_or(|b| b.capacity() < frames.saturating_mul(channels));
        if needs_new {
            sample_buf = Some(SampleBuffer::<f32>::new(frames as u64, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            out.extend(downmix(buf.samples(), channels));
        }
    }

    Ok(Waveform::new(out, sample_rate))
}

/// Averages interleaved channels down to mono.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
