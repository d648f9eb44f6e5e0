//! Decoded audio clips.
//!
//! A clip is an immutable block of interleaved `f32` samples shared through an
//! `Arc`. Clips carry a [`ClipId`] so the music player can tell whether two
//! descriptors point at the same track.

use std::io::{BufReader, Cursor};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use rodio::{Decoder, Source};
use tinysound_common::{AudioError, AudioResult, ClipId};
use tracing::debug;

/// Default sample rate used for generated clips.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Default channel count used for generated clips.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Decoded, immutable audio data.
#[derive(Debug)]
pub struct AudioClip {
    id: ClipId,
    name: String,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
    duration: Duration,
}

impl AudioClip {
    /// Create a clip from interleaved samples.
    #[must_use]
    pub fn from_samples(
        name: impl Into<String>,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        let channels = channels.max(1);
        let sample_rate = sample_rate.max(1);
        let frames = samples.len() / channels as usize;
        let duration = Duration::from_secs_f64(frames as f64 / f64::from(sample_rate));

        Self {
            id: ClipId::next(),
            name: name.into(),
            samples: Arc::new(samples),
            sample_rate,
            channels,
            duration,
        }
    }

    /// Create a silent clip of the given length.
    ///
    /// Useful for headless hosts that only need timing.
    #[must_use]
    pub fn silent(name: impl Into<String>, duration: Duration) -> Self {
        let frames = (duration.as_secs_f64() * f64::from(DEFAULT_SAMPLE_RATE)).round() as usize;
        Self::from_samples(
            name,
            vec![0.0; frames * DEFAULT_CHANNELS as usize],
            DEFAULT_SAMPLE_RATE,
            DEFAULT_CHANNELS,
        )
    }

    /// Generate a sine tone. Used by the demo binary.
    #[must_use]
    pub fn tone(name: impl Into<String>, frequency: f32, duration: Duration, amplitude: f32) -> Self {
        let frames = (duration.as_secs_f64() * f64::from(DEFAULT_SAMPLE_RATE)).round() as usize;
        let mut samples = Vec::with_capacity(frames * DEFAULT_CHANNELS as usize);
        let step = std::f32::consts::TAU * frequency / DEFAULT_SAMPLE_RATE as f32;
        for frame in 0..frames {
            let value = (step * frame as f32).sin() * amplitude;
            for _ in 0..DEFAULT_CHANNELS {
                samples.push(value);
            }
        }
        Self::from_samples(name, samples, DEFAULT_SAMPLE_RATE, DEFAULT_CHANNELS)
    }

    /// Load and decode an audio file (WAV, MP3, ...).
    pub fn load(path: impl AsRef<Path>) -> AudioResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| AudioError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| AudioError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        let clip = Self::from_decoder(name, decoder);
        debug!("Loaded clip {:?} from {}", clip.id, path.display());
        Ok(clip)
    }

    /// Decode a clip from in-memory file data.
    pub fn from_memory(name: impl Into<String>, data: &[u8]) -> AudioResult<Self> {
        let decoder = Decoder::new(Cursor::new(data.to_vec()))
            .map_err(|e| AudioError::DecodeFailed(e.to_string()))?;
        Ok(Self::from_decoder(name, decoder))
    }

    fn from_decoder<R>(name: impl Into<String>, decoder: Decoder<R>) -> Self
    where
        R: std::io::Read + std::io::Seek + Send + Sync + 'static,
    {
        let sample_rate = decoder.sample_rate();
        let channels = decoder.channels();
        let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();
        Self::from_samples(name, samples, sample_rate, channels)
    }

    /// Clip identity.
    #[must_use]
    pub const fn id(&self) -> ClipId {
        self.id
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Interleaved samples.
    #[must_use]
    pub fn samples(&self) -> &Arc<Vec<f32>> {
        &self.samples
    }

    /// Sample rate in Hz.
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Playback length at pitch 1.0.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}
