//! Service traits handed to collaborators.
//!
//! Emitters, toggles, and state bridges receive one of these explicitly
//! instead of reaching for a global manager.

use tinysound_kernel::{AudioBus, AudioHandle, SoundRef};

use crate::options::PlayOptions;

/// Read-only mute state.
pub trait MuteQuery {
    /// Whether a bus's own mute flag is set.
    fn is_muted(&self, bus: AudioBus) -> bool;
}

/// Everything a collaborator may ask of the audio manager.
pub trait AudioService: MuteQuery {
    /// Play a sound. Returns the invalid handle when refused.
    fn play(&mut self, sound: &SoundRef, options: &PlayOptions) -> AudioHandle;

    /// Stop a session early. Stale handles are ignored.
    fn stop(&mut self, handle: AudioHandle);

    /// Mute or unmute a bus.
    fn set_muted(&mut self, bus: AudioBus, muted: bool);

    /// Set a bus's linear volume (clamped to 0..1).
    fn set_volume01(&mut self, bus: AudioBus, volume: f32);

    /// A bus's stored linear volume.
    fn volume01(&self, bus: AudioBus) -> f32;

    /// Play, resume, or restart music.
    fn music_play(&mut self, music: &SoundRef, volume01: f32, restart_if_same: bool);

    /// Pause music.
    fn music_pause(&mut self);

    /// Stop music.
    fn music_stop(&mut self);

    /// Lift the startup playback lock. Idempotent.
    fn unlock_playback(&mut self);
}
