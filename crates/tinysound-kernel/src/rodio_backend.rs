//! Device output through rodio.
//!
//! ```text
//! ┌──────────────┐      ┌───────────────┐      ┌──────────────┐
//! │ RodioBackend │──────│ Sink per voice│──────│ OutputStream │
//! │ (bus gains)  │      │ (RodioVoice)  │      │   (device)   │
//! └──────────────┘      └───────────────┘      └──────────────┘
//! ```
//!
//! rodio has no mixer graph, so bus parameters are folded into each sink's
//! volume: `voice volume * master gain * routed bus gain`. Changing a bus
//! parameter re-applies the product to every voice. Spatial settings and
//! positions are recorded but not rendered.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use parking_lot::{Mutex, RwLock};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use tinysound_common::{db_to_linear, AudioError, AudioResult};
use tracing::{debug, info};

use crate::backend::{AudioBackend, ParameterSink, VoiceSettings, VoiceSink};
use crate::bus_mixer::BusRouting;
use crate::clip::AudioClip;
use crate::sound::{AudioBus, SpatialSettings};

/// Streams a clip's shared sample buffer, optionally looping.
pub struct ClipSource {
    samples: Arc<Vec<f32>>,
    position: usize,
    channels: u16,
    sample_rate: u32,
    looping: bool,
}

impl ClipSource {
    /// Source over `clip` that reads its buffer in place.
    #[must_use]
    pub fn new(clip: &AudioClip, looping: bool) -> Self {
        Self {
            samples: Arc::clone(clip.samples()),
            position: 0,
            channels: clip.channels(),
            sample_rate: clip.sample_rate(),
            looping,
        }
    }
}

impl Iterator for ClipSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.samples.len() {
            if !self.looping || self.samples.is_empty() {
                return None;
            }
            self.position = 0;
        }
        let sample = self.samples[self.position];
        self.position += 1;
        Some(sample)
    }
}

impl Source for ClipSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        if self.looping {
            return None;
        }
        let frames = self.samples.len() / self.channels.max(1) as usize;
        Some(Duration::from_secs_f64(
            frames as f64 / f64::from(self.sample_rate.max(1)),
        ))
    }
}

impl std::fmt::Debug for ClipSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClipSource")
            .field("position", &self.position)
            .field("len", &self.samples.len())
            .field("looping", &self.looping)
            .finish_non_exhaustive()
    }
}

/// Linear gain per bus, derived from the decibel parameters.
#[derive(Debug, Clone, Copy)]
struct BusGains {
    master: f32,
    music: f32,
    sound: f32,
}

impl BusGains {
    fn for_output(&self, output: Option<AudioBus>) -> f32 {
        match output {
            Some(AudioBus::Music) => self.master * self.music,
            Some(AudioBus::Sound) => self.master * self.sound,
            Some(AudioBus::All) | None => self.master,
        }
    }
}

impl Default for BusGains {
    fn default() -> Self {
        Self {
            master: 1.0,
            music: 1.0,
            sound: 1.0,
        }
    }
}

struct RodioVoiceState {
    sink: Sink,
    clip: Option<Arc<AudioClip>>,
    settings: VoiceSettings,
}

impl RodioVoiceState {
    fn apply_volume(&self, gains: &BusGains) {
        self.sink
            .set_volume(self.settings.volume * gains.for_output(self.settings.output));
    }
}

/// A voice backed by one rodio [`Sink`].
pub struct RodioVoice {
    state: Arc<Mutex<RodioVoiceState>>,
    gains: Arc<RwLock<BusGains>>,
}

impl std::fmt::Debug for RodioVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioVoice")
            .field("settings", &self.state.lock().settings)
            .finish_non_exhaustive()
    }
}

impl VoiceSink for RodioVoice {
    fn set_clip(&mut self, clip: Option<Arc<AudioClip>>) {
        let mut state = self.state.lock();
        state.settings.clip = clip.as_ref().map(|c| c.id());
        state.clip = clip;
    }

    fn set_volume(&mut self, volume: f32) {
        let mut state = self.state.lock();
        state.settings.volume = volume;
        state.apply_volume(&self.gains.read());
    }

    fn set_pitch(&mut self, pitch: f32) {
        let mut state = self.state.lock();
        state.settings.pitch = pitch;
        state.sink.set_speed(pitch);
    }

    fn set_looping(&mut self, looping: bool) {
        self.state.lock().settings.looping = looping;
    }

    fn set_spatial(&mut self, spatial: SpatialSettings) {
        self.state.lock().settings.spatial = spatial;
    }

    fn set_output(&mut self, bus: Option<AudioBus>) {
        let mut state = self.state.lock();
        state.settings.output = bus;
        state.apply_volume(&self.gains.read());
    }

    fn set_position(&mut self, position: Vec3) {
        self.state.lock().settings.position = position;
    }

    fn play(&mut self) {
        let state = self.state.lock();
        state.sink.clear();
        let Some(clip) = state.clip.as_ref() else {
            return;
        };

        state
            .sink
            .append(ClipSource::new(clip, state.settings.looping));
        state.sink.set_speed(state.settings.pitch);
        state.apply_volume(&self.gains.read());
        state.sink.play();
    }

    fn stop(&mut self) {
        self.state.lock().sink.clear();
    }

    fn pause(&mut self) {
        self.state.lock().sink.pause();
    }

    fn unpause(&mut self) {
        let state = self.state.lock();
        if !state.sink.empty() {
            state.sink.play();
        }
    }

    fn is_playing(&self) -> bool {
        let state = self.state.lock();
        !state.sink.empty() && !state.sink.is_paused()
    }

    fn playback_position(&self) -> f32 {
        self.state.lock().sink.get_pos().as_secs_f32()
    }

    fn settings(&self) -> VoiceSettings {
        self.state.lock().settings.clone()
    }
}

/// Real audio output on the default device.
pub struct RodioBackend {
    /// The output stream (must be kept alive).
    _stream: OutputStream,
    handle: OutputStreamHandle,
    routing: BusRouting,
    gains: Arc<RwLock<BusGains>>,
    voices: Vec<Arc<Mutex<RodioVoiceState>>>,
}

impl std::fmt::Debug for RodioBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioBackend")
            .field("routing", &self.routing)
            .field("gains", &*self.gains.read())
            .field("voices", &self.voices.len())
            .finish_non_exhaustive()
    }
}

impl RodioBackend {
    /// Open the default output device.
    ///
    /// `routing` names the parameters this backend answers to; any other
    /// parameter name is reported missing.
    pub fn new(routing: BusRouting) -> AudioResult<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| AudioError::DeviceInitFailed(e.to_string()))?;

        info!("Audio device initialized");

        Ok(Self {
            _stream: stream,
            handle,
            routing,
            gains: Arc::new(RwLock::new(BusGains::default())),
            voices: Vec::new(),
        })
    }

    /// Number of voices created so far.
    #[must_use]
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

impl ParameterSink for RodioBackend {
    fn set_parameter(&mut self, name: &str, db: f32) -> bool {
        let Some(bus) = self.routing.bus_for(name) else {
            return false;
        };

        let gain = db_to_linear(db);
        let gains = {
            let mut gains = self.gains.write();
            match bus {
                AudioBus::All => gains.master = gain,
                AudioBus::Music => gains.music = gain,
                AudioBus::Sound => gains.sound = gain,
            }
            *gains
        };

        for voice in &self.voices {
            voice.lock().apply_volume(&gains);
        }
        true
    }
}

impl AudioBackend for RodioBackend {
    fn create_voice(&mut self) -> AudioResult<Box<dyn VoiceSink>> {
        let sink =
            Sink::try_new(&self.handle).map_err(|e| AudioError::VoiceCreationFailed(e.to_string()))?;
        sink.pause();

        let state = Arc::new(Mutex::new(RodioVoiceState {
            sink,
            clip: None,
            settings: VoiceSettings::default(),
        }));
        self.voices.push(Arc::clone(&state));
        debug!("Created rodio voice {}", self.voices.len() - 1);

        Ok(Box::new(RodioVoice {
            state,
            gains: Arc::clone(&self.gains),
        }))
    }

    fn parameters(&mut self) -> &mut dyn ParameterSink {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_gains_for_output() {
        let gains = BusGains {
            master: 0.5,
            music: 0.5,
            sound: 1.0,
        };
        assert!((gains.for_output(Some(AudioBus::Music)) - 0.25).abs() < f32::EPSILON);
        assert!((gains.for_output(Some(AudioBus::Sound)) - 0.5).abs() < f32::EPSILON);
        assert!((gains.for_output(None) - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_clip_source_shares_buffer() {
        let clip = AudioClip::from_samples("pair", vec![0.1, 0.2, 0.3, 0.4], 4, 2);
        let source = ClipSource::new(&clip, false);
        assert_eq!(Arc::strong_count(clip.samples()), 2);
        assert_eq!(source.channels(), 2);
        assert_eq!(source.total_duration(), Some(Duration::from_millis(500)));
        assert_eq!(source.collect::<Vec<_>>(), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_clip_source_loops() {
        let clip = AudioClip::from_samples("loop", vec![1.0, 2.0], 10, 1);
        let mut source = ClipSource::new(&clip, true);
        assert_eq!(source.total_duration(), None);
        let taken: Vec<f32> = source.by_ref().take(5).collect();
        assert_eq!(taken, vec![1.0, 2.0, 1.0, 2.0, 1.0]);

        let empty = AudioClip::from_samples("empty", Vec::new(), 10, 1);
        assert_eq!(ClipSource::new(&empty, true).next(), None);
    }

    #[test]
    fn test_backend_creation_reports_errors() {
        // CI machines usually have no output device; either outcome is fine,
        // but a failure must surface as DeviceInitFailed.
        match RodioBackend::new(BusRouting::default()) {
            Ok(mut backend) => {
                assert!(!backend.set_parameter("Unknown", 0.0));
                assert!(backend.set_parameter("MasterVolume", -6.0));
            },
            Err(e) => assert!(matches!(e, AudioError::DeviceInitFailed(_))),
        }
    }
}
