//! Per-call playback overrides.

use std::sync::{Arc, Weak};

use glam::Vec3;
use tinysound_common::{clamp01, clamp_pitch};

/// Something with a world position a voice can follow.
pub trait PositionSource {
    /// Current world position.
    fn position(&self) -> Vec3;
}

impl PositionSource for parking_lot::Mutex<Vec3> {
    fn position(&self) -> Vec3 {
        *self.lock()
    }
}

impl PositionSource for Vec3 {
    fn position(&self) -> Vec3 {
        *self
    }
}

/// Optional adjustments applied on top of a descriptor for one play call.
///
/// Every field is absent by default, and an absent field changes nothing.
#[derive(Clone, Default)]
pub struct PlayOptions {
    /// Multiplies the descriptor volume.
    pub volume_mul: Option<f32>,
    /// Added after the multiplier.
    pub volume_add: Option<f32>,
    /// Multiplies the (jittered) descriptor pitch.
    pub pitch_mul: Option<f32>,
    /// Added after the multiplier.
    pub pitch_add: Option<f32>,
    /// Place the voice here once at start.
    pub position: Option<Vec3>,
    /// Track this target every tick until playback ends or it is dropped.
    pub follow: Option<Weak<dyn PositionSource>>,
    /// Force spatial playback on or off.
    pub spatial_override: Option<bool>,
}

impl PlayOptions {
    /// Options that place the sound at a position.
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Options that make the sound follow a target.
    ///
    /// Only a weak reference is kept, so the sound never extends the
    /// target's lifetime.
    #[must_use]
    pub fn following<T: PositionSource + 'static>(target: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(target);
        Self {
            follow: Some(weak),
            ..Self::default()
        }
    }

    /// Set the volume multiplier.
    #[must_use]
    pub const fn with_volume(mut self, mul: f32) -> Self {
        self.volume_mul = Some(mul);
        self
    }

    /// Set the volume offset.
    #[must_use]
    pub const fn with_volume_add(mut self, add: f32) -> Self {
        self.volume_add = Some(add);
        self
    }

    /// Set the pitch multiplier.
    #[must_use]
    pub const fn with_pitch(mut self, mul: f32) -> Self {
        self.pitch_mul = Some(mul);
        self
    }

    /// Set the pitch offset.
    #[must_use]
    pub const fn with_pitch_add(mut self, add: f32) -> Self {
        self.pitch_add = Some(add);
        self
    }

    /// Force spatial playback on or off.
    #[must_use]
    pub const fn with_spatial(mut self, spatial: bool) -> Self {
        self.spatial_override = Some(spatial);
        self
    }

    /// Final volume: multiply, then add, then clamp to 0..1.
    #[must_use]
    pub fn effective_volume(&self, base: f32) -> f32 {
        clamp01(base * self.volume_mul.unwrap_or(1.0) + self.volume_add.unwrap_or(0.0))
    }

    /// Final pitch: multiply, then add, then clamp to 0.1..3.
    #[must_use]
    pub fn effective_pitch(&self, base: f32) -> f32 {
        clamp_pitch(base * self.pitch_mul.unwrap_or(1.0) + self.pitch_add.unwrap_or(0.0))
    }

    /// Whether to play positionally, given the descriptor's default.
    #[must_use]
    pub fn is_spatial(&self, descriptor_default: bool) -> bool {
        self.spatial_override.unwrap_or(descriptor_default)
    }
}

impl std::fmt::Debug for PlayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayOptions")
            .field("volume_mul", &self.volume_mul)
            .field("volume_add", &self.volume_add)
            .field("pitch_mul", &self.pitch_mul)
            .field("pitch_add", &self.pitch_add)
            .field("position", &self.position)
            .field("follow", &self.follow.as_ref().map(|w| w.strong_count() > 0))
            .field("spatial_override", &self.spatial_override)
            .finish()
    }
}
