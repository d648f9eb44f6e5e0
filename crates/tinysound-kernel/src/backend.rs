//! Rendering backend seam.
//!
//! The core never touches a device directly. It asks an [`AudioBackend`] for
//! voices, configures them through [`VoiceSink`], and drives bus levels through
//! [`ParameterSink`]. Two implementations ship with the kernel:
//! [`RodioBackend`](crate::rodio_backend::RodioBackend) for real output and
//! [`HeadlessBackend`](crate::headless::HeadlessBackend) for servers and tests.

use std::sync::Arc;

use glam::Vec3;
use tinysound_common::{AudioResult, ClipId};

use crate::clip::AudioClip;
use crate::sound::{AudioBus, SpatialSettings};

/// Snapshot of everything the core has set on a voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    /// Bound clip.
    pub clip: Option<ClipId>,
    /// Linear volume (0.0-1.0).
    pub volume: f32,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Whether playback loops.
    pub looping: bool,
    /// Spatial parameters.
    pub spatial: SpatialSettings,
    /// Output routing.
    pub output: Option<AudioBus>,
    /// World position.
    pub position: Vec3,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            clip: None,
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            spatial: SpatialSettings::FLAT,
            output: None,
            position: Vec3::ZERO,
        }
    }
}

/// One playback channel owned by a backend.
pub trait VoiceSink {
    /// Bind a clip (or clear it).
    fn set_clip(&mut self, clip: Option<Arc<AudioClip>>);
    /// Set linear volume.
    fn set_volume(&mut self, volume: f32);
    /// Set pitch multiplier.
    fn set_pitch(&mut self, pitch: f32);
    /// Set looping.
    fn set_looping(&mut self, looping: bool);
    /// Set spatial blend and distance range.
    fn set_spatial(&mut self, spatial: SpatialSettings);
    /// Route to a bus, or to nothing.
    fn set_output(&mut self, bus: Option<AudioBus>);
    /// Move the voice in the world.
    fn set_position(&mut self, position: Vec3);

    /// Start the bound clip from the beginning.
    fn play(&mut self);
    /// Stop and rewind.
    fn stop(&mut self);
    /// Pause, keeping the playhead.
    fn pause(&mut self);
    /// Resume from the playhead.
    fn unpause(&mut self);

    /// True while audibly playing (false when paused or finished).
    fn is_playing(&self) -> bool;
    /// Playhead in seconds.
    fn playback_position(&self) -> f32;
    /// Current settings.
    fn settings(&self) -> VoiceSettings;
}

/// Destination for named mixer levels (decibels).
pub trait ParameterSink {
    /// Set a named parameter. Returns false if the parameter does not exist.
    fn set_parameter(&mut self, name: &str, db: f32) -> bool;
}

/// Factory for voices plus the mixer parameter surface.
pub trait AudioBackend: ParameterSink {
    /// Create a new voice.
    fn create_voice(&mut self) -> AudioResult<Box<dyn VoiceSink>>;

    /// Advance backend-side time. Real devices run on their own clock.
    fn update(&mut self, _dt: f32) {}

    /// This backend as a parameter sink.
    fn parameters(&mut self) -> &mut dyn ParameterSink;
}

impl<B: AudioBackend + ?Sized> ParameterSink for Box<B> {
    fn set_parameter(&mut self, name: &str, db: f32) -> bool {
        (**self).set_parameter(name, db)
    }
}

impl<B: AudioBackend + ?Sized> AudioBackend for Box<B> {
    fn create_voice(&mut self) -> AudioResult<Box<dyn VoiceSink>> {
        (**self).create_voice()
    }

    fn update(&mut self, dt: f32) {
        (**self).update(dt);
    }

    fn parameters(&mut self) -> &mut dyn ParameterSink {
        self
    }
}
