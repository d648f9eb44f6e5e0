//! Bus mute flags and volume levels.
//!
//! Each [`AudioBus`] has its own mute flag and linear volume. Levels reach the
//! backend as decibels through a named mixer parameter per bus; a muted bus
//! always writes the floor level, whatever volume is stored.

use serde::{Deserialize, Serialize};
use tinysound_common::{clamp01, linear_to_db_with_floor, MUTE_FLOOR_DB};
use tracing::debug;

use crate::backend::ParameterSink;
use crate::sound::AudioBus;

/// Mute flag and linear volume for one bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusState {
    /// Whether the bus is muted.
    pub muted: bool,
    /// Linear volume (0.0-1.0).
    pub volume: f32,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            muted: false,
            volume: 1.0,
        }
    }
}

/// Mixer parameter name for each bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusRouting {
    /// Parameter for [`AudioBus::All`].
    pub master: String,
    /// Parameter for [`AudioBus::Music`].
    pub music: String,
    /// Parameter for [`AudioBus::Sound`].
    pub sound: String,
}

impl BusRouting {
    /// Parameter name for a bus.
    #[must_use]
    pub fn parameter(&self, bus: AudioBus) -> &str {
        match bus {
            AudioBus::All => &self.master,
            AudioBus::Music => &self.music,
            AudioBus::Sound => &self.sound,
        }
    }

    /// Bus driven by a parameter name, if any.
    #[must_use]
    pub fn bus_for(&self, parameter: &str) -> Option<AudioBus> {
        AudioBus::all()
            .into_iter()
            .find(|&bus| self.parameter(bus) == parameter)
    }
}

impl Default for BusRouting {
    fn default() -> Self {
        Self {
            master: "MasterVolume".to_string(),
            music: "MusicVolume".to_string(),
            sound: "SfxVolume".to_string(),
        }
    }
}

/// Per-bus state and the linear-to-decibel mapping.
#[derive(Debug, Clone)]
pub struct BusMixer {
    all: BusState,
    music: BusState,
    sound: BusState,
    routing: BusRouting,
    floor_db: f32,
}

impl BusMixer {
    /// Create a mixer with every bus unmuted at full volume.
    #[must_use]
    pub fn new(routing: BusRouting, floor_db: f32) -> Self {
        Self {
            all: BusState::default(),
            music: BusState::default(),
            sound: BusState::default(),
            routing,
            floor_db,
        }
    }

    /// Parameter routing.
    #[must_use]
    pub fn routing(&self) -> &BusRouting {
        &self.routing
    }

    /// Decibel level written for full attenuation.
    #[must_use]
    pub const fn floor_db(&self) -> f32 {
        self.floor_db
    }

    /// State of a bus.
    #[must_use]
    pub fn state(&self, bus: AudioBus) -> BusState {
        match bus {
            AudioBus::All => self.all,
            AudioBus::Music => self.music,
            AudioBus::Sound => self.sound,
        }
    }

    fn state_mut(&mut self, bus: AudioBus) -> &mut BusState {
        match bus {
            AudioBus::All => &mut self.all,
            AudioBus::Music => &mut self.music,
            AudioBus::Sound => &mut self.sound,
        }
    }

    /// Set a bus's mute flag. Returns true if it changed.
    pub fn set_muted(&mut self, bus: AudioBus, muted: bool) -> bool {
        let state = self.state_mut(bus);
        let changed = state.muted != muted;
        state.muted = muted;
        changed
    }

    /// The bus's own mute flag.
    #[must_use]
    pub fn is_muted(&self, bus: AudioBus) -> bool {
        self.state(bus).muted
    }

    /// False if a sound routed to `bus` is silenced by its own or the master mute.
    #[must_use]
    pub fn is_audible_for(&self, bus: AudioBus) -> bool {
        !self.all.muted && !self.state(bus).muted
    }

    /// Store a clamped volume. Returns the stored value.
    pub fn set_volume01(&mut self, bus: AudioBus, volume: f32) -> f32 {
        let volume = clamp01(volume);
        self.state_mut(bus).volume = volume;
        volume
    }

    /// Stored volume of a bus.
    #[must_use]
    pub fn volume01(&self, bus: AudioBus) -> f32 {
        self.state(bus).volume
    }

    /// Map a linear level to decibels using this mixer's floor.
    #[must_use]
    pub fn to_db(&self, volume01: f32) -> f32 {
        linear_to_db_with_floor(volume01, self.floor_db)
    }

    /// Level a bus's parameter should carry right now.
    #[must_use]
    pub fn level_db(&self, bus: AudioBus) -> f32 {
        let state = self.state(bus);
        if state.muted {
            self.floor_db
        } else {
            self.to_db(state.volume)
        }
    }

    /// Push one bus's level to the backend. Missing parameters are skipped.
    pub fn apply(&self, bus: AudioBus, sink: &mut dyn ParameterSink) -> bool {
        let name = self.routing.parameter(bus);
        let applied = sink.set_parameter(name, self.level_db(bus));
        if !applied {
            debug!(%bus, parameter = name, "Mixer parameter missing, skipped");
        }
        applied
    }

    /// Push every bus's level to the backend.
    pub fn apply_all(&self, sink: &mut dyn ParameterSink) {
        for bus in AudioBus::all() {
            self.apply(bus, sink);
        }
    }

    /// Wrap a sink so writes to a muted bus's parameter are held back.
    pub fn gate<'a>(&'a self, sink: &'a mut dyn ParameterSink) -> MuteGatedSink<'a> {
        MuteGatedSink { mixer: self, sink }
    }
}

/// A [`ParameterSink`] that keeps muted buses at the floor level.
///
/// Writes to a parameter owned by a muted bus are dropped; everything else
/// passes through.
pub struct MuteGatedSink<'a> {
    mixer: &'a BusMixer,
    sink: &'a mut dyn ParameterSink,
}

impl ParameterSink for MuteGatedSink<'_> {
    fn set_parameter(&mut self, name: &str, db: f32) -> bool {
        if let Some(bus) = self.mixer.routing.bus_for(name) {
            if self.mixer.is_muted(bus) {
                debug!(%bus, parameter = name, "Bus muted, holding floor level");
                return true;
            }
        }
        self.sink.set_parameter(name, db)
    }
}

impl Default for BusMixer {
    fn default() -> Self {
        Self::new(BusRouting::default(), MUTE_FLOOR_DB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;

    #[test]
    fn test_gate_holds_muted_parameter() {
        let mut backend = HeadlessBackend::new();
        let view = backend.clone();
        let mut mixer = BusMixer::default();
        mixer.set_muted(AudioBus::Music, true);
        mixer.apply_all(&mut backend);

        let mut gated = mixer.gate(&mut backend);
        assert!(gated.set_parameter("MusicVolume", 0.0));
        assert!(gated.set_parameter("SfxVolume", -6.0));
        assert!(gated.set_parameter("Reverb", -3.0));

        assert_eq!(view.parameter("MusicVolume"), Some(MUTE_FLOOR_DB));
        assert_eq!(view.parameter("SfxVolume"), Some(-6.0));
    }

    #[test]
    fn test_volume_clamped() {
        let mut mixer = BusMixer::default();
        assert!((mixer.set_volume01(AudioBus::Sound, 1.7) - 1.0).abs() < f32::EPSILON);
        assert!(mixer.set_volume01(AudioBus::Sound, -0.3).abs() < f32::EPSILON);
        assert!(mixer.volume01(AudioBus::Sound).abs() < f32::EPSILON);
    }

    #[test]
    fn test_master_mute_covers_everything() {
        let mut mixer = BusMixer::default();
        assert!(mixer.set_muted(AudioBus::All, true));
        assert!(!mixer.is_audible_for(AudioBus::Sound));
        assert!(!mixer.is_audible_for(AudioBus::Music));
        assert!(!mixer.is_muted(AudioBus::Sound));
    }

    #[test]
    fn test_bus_mute_is_local() {
        let mut mixer = BusMixer::default();
        mixer.set_muted(AudioBus::Sound, true);
        assert!(!mixer.is_audible_for(AudioBus::Sound));
        assert!(mixer.is_audible_for(AudioBus::Music));
        assert!(!mixer.set_muted(AudioBus::Sound, true));
    }

    #[test]
    fn test_level_db() {
        let mut mixer = BusMixer::default();
        mixer.set_volume01(AudioBus::Music, 0.5);
        assert!((mixer.level_db(AudioBus::Music) - (-6.0206)).abs() < 0.001);
        mixer.set_volume01(AudioBus::Music, 0.0);
        assert!((mixer.level_db(AudioBus::Music) - MUTE_FLOOR_DB).abs() < f32::EPSILON);
    }

    #[test]
    fn test_muted_bus_writes_floor() {
        let mut backend = HeadlessBackend::new();
        let view = backend.clone();
        let mut mixer = BusMixer::default();
        mixer.set_volume01(AudioBus::Sound, 0.8);
        mixer.set_muted(AudioBus::Sound, true);
        assert!(mixer.apply(AudioBus::Sound, &mut backend));
        assert_eq!(view.parameter("SfxVolume"), Some(MUTE_FLOOR_DB));
        assert!((mixer.volume01(AudioBus::Sound) - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_parameter_skipped() {
        let mut backend = HeadlessBackend::new();
        backend.remove_parameter("MusicVolume");
        let mixer = BusMixer::default();
        assert!(!mixer.apply(AudioBus::Music, &mut backend));
        mixer.apply_all(&mut backend);
        assert_eq!(backend.parameter("MasterVolume"), Some(0.0));
        assert_eq!(backend.parameter("MusicVolume"), None);
    }

    #[test]
    fn test_routing_lookup() {
        let routing = BusRouting::default();
        assert_eq!(routing.parameter(AudioBus::All), "MasterVolume");
        assert_eq!(routing.bus_for("SfxVolume"), Some(AudioBus::Sound));
        assert_eq!(routing.bus_for("Reverb"), None);
    }
}
