//! Sound descriptors and buses.
//!
//! A [`SoundDescriptor`] is the static description of a playable sound: which
//! clip, which bus it routes to, default volume and pitch, spatial settings,
//! and the limits the playback gate enforces. Descriptors are created by the
//! asset layer and shared read-only as [`SoundRef`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tinysound_common::{clamp01, clamp_pitch, ClipId, SoundId};

use crate::clip::AudioClip;

/// Shared, immutable reference to a sound descriptor.
pub type SoundRef = Arc<SoundDescriptor>;

/// Logical mute/volume group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AudioBus {
    /// Everything. Muting it silences every other bus.
    All,
    /// The music player's bus.
    Music,
    /// One-shot and looping sound effects.
    #[default]
    Sound,
}

impl AudioBus {
    /// Get all buses.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::All, Self::Music, Self::Sound]
    }

    /// Returns true if muting `self` affects sounds routed to `routed`.
    #[must_use]
    pub fn covers(self, routed: Self) -> bool {
        self == Self::All || self == routed
    }
}

impl std::fmt::Display for AudioBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Music => write!(f, "Music"),
            Self::Sound => write!(f, "Sound"),
        }
    }
}

/// Spatial parameters applied to a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialSettings {
    /// 0 = fully 2D, 1 = fully positional.
    pub blend: f32,
    /// Distance at which attenuation starts.
    pub min_distance: f32,
    /// Distance past which the sound stops attenuating.
    pub max_distance: f32,
}

impl SpatialSettings {
    /// Non-positional settings written when a sound is not spatial.
    pub const FLAT: Self = Self {
        blend: 0.0,
        min_distance: 1.0,
        max_distance: 500.0,
    };
}

impl Default for SpatialSettings {
    fn default() -> Self {
        Self::FLAT
    }
}

/// Static description of a playable sound.
///
/// Not `Clone`: a descriptor's [`SoundId`] is its identity, and cooldown and
/// instance bookkeeping are keyed by it.
#[derive(Debug)]
pub struct SoundDescriptor {
    id: SoundId,
    /// Clip to play. `None` means the asset failed to load; playback is refused.
    pub clip: Option<Arc<AudioClip>>,
    /// Routing bus.
    pub bus: AudioBus,
    /// Default volume (0.0-1.0).
    pub volume: f32,
    /// Default pitch (0.1-3.0).
    pub pitch: f32,
    /// Whether the sound loops.
    pub looping: bool,
    /// Apply random pitch jitter on each play.
    pub random_pitch: bool,
    /// Jitter amplitude; each play offsets pitch uniformly in `±pitch_jitter`.
    pub pitch_jitter: f32,
    /// Play positionally.
    pub spatial: bool,
    /// Spatial blend (0.0-1.0) used when spatial.
    pub spatial_blend: f32,
    /// Minimum attenuation distance.
    pub min_distance: f32,
    /// Maximum attenuation distance.
    pub max_distance: f32,
    /// Max simultaneous instances (0 = unlimited).
    pub max_simultaneous: u32,
    /// Min seconds between triggers (0 = no cooldown).
    pub cooldown: f32,
}

impl SoundDescriptor {
    /// Create a descriptor for a clip with default settings.
    #[must_use]
    pub fn new(clip: Arc<AudioClip>) -> Self {
        Self::with_clip(Some(clip))
    }

    /// Create a descriptor whose clip may be missing.
    #[must_use]
    pub fn with_clip(clip: Option<Arc<AudioClip>>) -> Self {
        Self {
            id: SoundId::next(),
            clip,
            bus: AudioBus::Sound,
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            random_pitch: false,
            pitch_jitter: 0.05,
            spatial: false,
            spatial_blend: 1.0,
            min_distance: 1.0,
            max_distance: 25.0,
            max_simultaneous: 6,
            cooldown: 0.0,
        }
    }

    /// Descriptor identity.
    #[must_use]
    pub const fn id(&self) -> SoundId {
        self.id
    }

    /// Identity of the clip, if any.
    #[must_use]
    pub fn clip_id(&self) -> Option<ClipId> {
        self.clip.as_ref().map(|c| c.id())
    }

    /// Wrap into a shared reference.
    #[must_use]
    pub fn into_ref(self) -> SoundRef {
        Arc::new(self)
    }

    /// Set the routing bus.
    #[must_use]
    pub const fn with_bus(mut self, bus: AudioBus) -> Self {
        self.bus = bus;
        self
    }

    /// Set the default volume.
    #[must_use]
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = clamp01(volume);
        self
    }

    /// Set the default pitch.
    #[must_use]
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = clamp_pitch(pitch);
        self
    }

    /// Set whether the sound loops.
    #[must_use]
    pub const fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Enable random pitch with the given jitter (clamped to 0.0-0.5).
    #[must_use]
    pub fn with_pitch_jitter(mut self, jitter: f32) -> Self {
        self.random_pitch = true;
        self.pitch_jitter = jitter.clamp(0.0, 0.5);
        self
    }

    /// Make the sound positional.
    #[must_use]
    pub const fn with_spatial(mut self, blend: f32, min_distance: f32, max_distance: f32) -> Self {
        self.spatial = true;
        self.spatial_blend = blend;
        self.min_distance = min_distance;
        self.max_distance = max_distance;
        self
    }

    /// Set the simultaneous-instance cap (0 = unlimited).
    #[must_use]
    pub const fn with_max_simultaneous(mut self, max: u32) -> Self {
        self.max_simultaneous = max;
        self
    }

    /// Set the retrigger cooldown in seconds.
    #[must_use]
    pub fn with_cooldown(mut self, seconds: f32) -> Self {
        self.cooldown = seconds.max(0.0);
        self
    }

    /// Spatial settings a voice should use, after clamping.
    ///
    /// Blend is clamped to 0..1, min distance floored at 0.01 and max distance
    /// kept at least 0.01 past min.
    #[must_use]
    pub fn spatial_settings(&self) -> SpatialSettings {
        let min_distance = self.min_distance.max(tinysound_common::MIN_SPATIAL_DISTANCE);
        SpatialSettings {
            blend: clamp01(self.spatial_blend),
            min_distance,
            max_distance: self
                .max_distance
                .max(min_distance + tinysound_common::MIN_SPATIAL_DISTANCE),
        }
    }
}
