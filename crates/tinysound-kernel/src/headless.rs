//! Headless backend.
//!
//! Simulates playback without an output device: each voice has a playhead
//! that moves by `dt * pitch` on [`AudioBackend::update`], and non-looping
//! voices stop when they reach the end of their clip. Mixer parameter writes
//! are recorded so they can be inspected.
//!
//! `HeadlessBackend` is a cheap handle; clones share the same voices and
//! parameters, so a host can keep one to inspect state after handing another
//! to the audio manager.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;
use tinysound_common::{AudioError, AudioResult};
use tracing::debug;

use crate::backend::{AudioBackend, ParameterSink, VoiceSettings, VoiceSink};
use crate::clip::AudioClip;
use crate::sound::{AudioBus, SpatialSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transport {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug)]
struct HeadlessVoiceState {
    clip: Option<Arc<AudioClip>>,
    settings: VoiceSettings,
    transport: Transport,
    playhead: f32,
}

impl HeadlessVoiceState {
    fn new() -> Self {
        Self {
            clip: None,
            settings: VoiceSettings::default(),
            transport: Transport::Stopped,
            playhead: 0.0,
        }
    }

    fn advance(&mut self, dt: f32) {
        if self.transport != Transport::Playing {
            return;
        }
        let length = match &self.clip {
            Some(clip) => clip.duration().as_secs_f32(),
            None => {
                self.transport = Transport::Stopped;
                return;
            },
        };

        self.playhead += dt * self.settings.pitch;
        if self.playhead >= length {
            if self.settings.looping && length > 0.0 {
                self.playhead %= length;
            } else {
                self.playhead = 0.0;
                self.transport = Transport::Stopped;
            }
        }
    }
}

/// A simulated voice.
#[derive(Debug)]
pub struct HeadlessVoice {
    state: Arc<Mutex<HeadlessVoiceState>>,
}

impl VoiceSink for HeadlessVoice {
    fn set_clip(&mut self, clip: Option<Arc<AudioClip>>) {
        let mut state = self.state.lock();
        state.settings.clip = clip.as_ref().map(|c| c.id());
        state.clip = clip;
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.lock().settings.volume = volume;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.state.lock().settings.pitch = pitch;
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.lock().settings.looping = looping;
    }

    fn set_spatial(&mut self, spatial: SpatialSettings) {
        self.state.lock().settings.spatial = spatial;
    }

    fn set_output(&mut self, bus: Option<AudioBus>) {
        self.state.lock().settings.output = bus;
    }

    fn set_position(&mut self, position: Vec3) {
        self.state.lock().settings.position = position;
    }

    fn play(&mut self) {
        let mut state = self.state.lock();
        state.playhead = 0.0;
        state.transport = if state.clip.is_some() {
            Transport::Playing
        } else {
            Transport::Stopped
        };
    }

    fn stop(&mut self) {
        let mut state = self.state.lock();
        state.playhead = 0.0;
        state.transport = Transport::Stopped;
    }

    fn pause(&mut self) {
        let mut state = self.state.lock();
        if state.transport == Transport::Playing {
            state.transport = Transport::Paused;
        }
    }

    fn unpause(&mut self) {
        let mut state = self.state.lock();
        if state.transport == Transport::Paused {
            state.transport = Transport::Playing;
        }
    }

    fn is_playing(&self) -> bool {
        self.state.lock().transport == Transport::Playing
    }

    fn playback_position(&self) -> f32 {
        self.state.lock().playhead
    }

    fn settings(&self) -> VoiceSettings {
        self.state.lock().settings.clone()
    }
}

#[derive(Debug, Default)]
struct Shared {
    voices: Vec<Arc<Mutex<HeadlessVoiceState>>>,
    parameters: HashMap<String, f32>,
    missing: HashSet<String>,
    parameter_writes: usize,
    voice_limit: Option<usize>,
}

/// Device-free backend with simulated timing.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    shared: Arc<Mutex<Shared>>,
}

impl HeadlessBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse voice creation past `limit` voices, as a constrained device would.
    pub fn set_voice_limit(&self, limit: Option<usize>) {
        self.shared.lock().voice_limit = limit;
    }

    /// Make a parameter name unknown to the mixer.
    pub fn remove_parameter(&self, name: &str) {
        let mut shared = self.shared.lock();
        shared.parameters.remove(name);
        shared.missing.insert(name.to_string());
    }

    /// Last value written to a parameter, in decibels.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.shared.lock().parameters.get(name).copied()
    }

    /// Total number of successful parameter writes.
    #[must_use]
    pub fn parameter_writes(&self) -> usize {
        self.shared.lock().parameter_writes
    }

    /// Number of voices created so far.
    #[must_use]
    pub fn voices_created(&self) -> usize {
        self.shared.lock().voices.len()
    }

    /// Number of voices currently playing.
    #[must_use]
    pub fn playing_voices(&self) -> usize {
        self.shared
            .lock()
            .voices
            .iter()
            .filter(|v| v.lock().transport == Transport::Playing)
            .count()
    }
}

impl ParameterSink for HeadlessBackend {
    fn set_parameter(&mut self, name: &str, db: f32) -> bool {
        let mut shared = self.shared.lock();
        if shared.missing.contains(name) {
            return false;
        }
        shared.parameters.insert(name.to_string(), db);
        shared.parameter_writes += 1;
        true
    }
}

impl AudioBackend for HeadlessBackend {
    fn create_voice(&mut self) -> AudioResult<Box<dyn VoiceSink>> {
        let mut shared = self.shared.lock();
        if let Some(limit) = shared.voice_limit {
            if shared.voices.len() >= limit {
                return Err(AudioError::VoiceCreationFailed(format!(
                    "headless voice limit of {limit} reached"
                )));
            }
        }

        let state = Arc::new(Mutex::new(HeadlessVoiceState::new()));
        shared.voices.push(Arc::clone(&state));
        debug!("Created headless voice {}", shared.voices.len() - 1);
        Ok(Box::new(HeadlessVoice { state }))
    }

    fn update(&mut self, dt: f32) {
        let shared = self.shared.lock();
        for voice in &shared.voices {
            voice.lock().advance(dt);
        }
    }

    fn parameters(&mut self) -> &mut dyn ParameterSink {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn clip(secs: f32) -> Arc<AudioClip> {
        Arc::new(AudioClip::silent("test", Duration::from_secs_f32(secs)))
    }

    #[test]
    fn test_voice_finishes_after_duration() {
        let mut backend = HeadlessBackend::new();
        let mut voice = backend.create_voice().expect("should create voice");
        voice.set_clip(Some(clip(1.0)));
        voice.play();
        assert!(voice.is_playing());

        backend.update(0.5);
        assert!(voice.is_playing());
        assert!((voice.playback_position() - 0.5).abs() < 0.001);

        backend.update(0.6);
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_pitch_scales_playhead() {
        let mut backend = HeadlessBackend::new();
        let mut voice = backend.create_voice().expect("should create voice");
        voice.set_clip(Some(clip(1.0)));
        voice.set_pitch(2.0);
        voice.play();
        backend.update(0.6);
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_looping_voice_wraps() {
        let mut backend = HeadlessBackend::new();
        let mut voice = backend.create_voice().expect("should create voice");
        voice.set_clip(Some(clip(1.0)));
        voice.set_looping(true);
        voice.play();
        backend.update(2.5);
        assert!(voice.is_playing());
        assert!((voice.playback_position() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_pause_keeps_playhead() {
        let mut backend = HeadlessBackend::new();
        let mut voice = backend.create_voice().expect("should create voice");
        voice.set_clip(Some(clip(10.0)));
        voice.play();
        backend.update(3.0);
        voice.pause();
        backend.update(3.0);
        assert!(!voice.is_playing());
        assert!((voice.playback_position() - 3.0).abs() < 0.001);

        voice.unpause();
        assert!(voice.is_playing());
        voice.stop();
        assert!(voice.playback_position().abs() < f32::EPSILON);
    }

    #[test]
    fn test_play_without_clip_does_nothing() {
        let mut backend = HeadlessBackend::new();
        let mut voice = backend.create_voice().expect("should create voice");
        voice.play();
        assert!(!voice.is_playing());
    }

    #[test]
    fn test_voice_limit() {
        let mut backend = HeadlessBackend::new();
        backend.set_voice_limit(Some(1));
        assert!(backend.create_voice().is_ok());
        assert!(matches!(
            backend.create_voice(),
            Err(AudioError::VoiceCreationFailed(_))
        ));
    }

    #[test]
    fn test_parameters_recorded() {
        let mut backend = HeadlessBackend::new();
        let view = backend.clone();
        assert!(backend.set_parameter("MusicVolume", -6.0));
        assert_eq!(view.parameter("MusicVolume"), Some(-6.0));

        view.remove_parameter("MusicVolume");
        assert!(!backend.set_parameter("MusicVolume", 0.0));
        assert_eq!(view.parameter("MusicVolume"), None);
        assert_eq!(view.parameter_writes(), 1);
    }
}
