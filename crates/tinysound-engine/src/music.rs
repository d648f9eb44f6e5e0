//! Single-track music player.
//!
//! The player owns one dedicated voice outside the pool. Pausing keeps the
//! playhead so that replaying the same clip resumes where it left off.

use tinysound_common::{clamp01, clamp_pitch};
use tinysound_kernel::{AudioBus, BusMixer, SoundRef, SpatialSettings, VoiceSink};
use tracing::debug;

/// Music playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MusicState {
    /// No music playing.
    #[default]
    Stopped,
    /// Music is playing.
    Playing,
    /// Music is paused, position kept.
    Paused,
}

/// Plays one music track at a time on a dedicated voice.
pub struct MusicPlayer {
    voice: Box<dyn VoiceSink>,
    current: Option<SoundRef>,
    state: MusicState,
}

impl MusicPlayer {
    /// Wrap a voice. The voice is configured as a flat, music-bus voice.
    #[must_use]
    pub fn new(mut voice: Box<dyn VoiceSink>) -> Self {
        voice.set_spatial(SpatialSettings::FLAT);
        voice.set_output(Some(AudioBus::Music));
        voice.set_looping(true);
        Self {
            voice,
            current: None,
            state: MusicState::Stopped,
        }
    }

    /// Play a track. Returns false if it was refused.
    ///
    /// Refused while the master or music bus is muted, or when the descriptor
    /// has no clip. A paused track with the same clip resumes in place unless
    /// `restart_if_same` is set; anything else starts from the beginning.
    pub fn play(
        &mut self,
        music: &SoundRef,
        volume01: f32,
        restart_if_same: bool,
        mixer: &BusMixer,
    ) -> bool {
        let Some(clip) = music.clip.clone() else {
            debug!(sound = ?music.id(), "Music has no clip, ignoring");
            return false;
        };
        if !mixer.is_audible_for(AudioBus::Music) {
            debug!("Music bus muted, ignoring play");
            return false;
        }

        let volume = clamp01(music.volume * volume01);
        let same_clip = self
            .current
            .as_ref()
            .is_some_and(|current| current.clip_id() == Some(clip.id()));

        if self.state == MusicState::Paused && same_clip && !restart_if_same {
            self.voice.set_volume(volume);
            self.voice.unpause();
            self.state = MusicState::Playing;
            debug!("Resumed music");
            return true;
        }

        self.voice.stop();
        self.voice.set_clip(Some(clip));
        self.voice.set_looping(music.looping);
        self.voice.set_pitch(clamp_pitch(music.pitch));
        self.voice.set_volume(volume);
        self.voice.set_output(Some(AudioBus::Music));
        self.voice.play();

        self.current = Some(SoundRef::clone(music));
        self.state = MusicState::Playing;
        debug!(sound = ?music.id(), "Started music");
        true
    }

    /// Pause if playing, keeping the position.
    pub fn pause(&mut self) {
        if self.state != MusicState::Playing || self.current.is_none() {
            return;
        }
        self.voice.pause();
        self.state = MusicState::Paused;
    }

    /// Stop and discard the position.
    pub fn stop(&mut self) {
        self.voice.stop();
        self.state = MusicState::Stopped;
    }

    /// Move a finished non-looping track to `Stopped`.
    pub fn tick(&mut self) {
        if self.state == MusicState::Playing && !self.voice.is_playing() {
            debug!("Music track ended");
            self.state = MusicState::Stopped;
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MusicState {
        self.state
    }

    /// True while playing.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state == MusicState::Playing
    }

    /// True while paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == MusicState::Paused
    }

    /// The last track started.
    #[must_use]
    pub fn current(&self) -> Option<&SoundRef> {
        self.current.as_ref()
    }

    /// Playhead of the music voice, in seconds.
    #[must_use]
    pub fn position(&self) -> f32 {
        self.voice.playback_position()
    }

    /// Read access to the music voice.
    #[must_use]
    pub fn voice(&self) -> &dyn VoiceSink {
        self.voice.as_ref()
    }
}

impl std::fmt::Debug for MusicPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicPlayer")
            .field("state", &self.state)
            .field("current", &self.current.as_ref().map(|s| s.id()))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tinysound_kernel::{AudioBackend, AudioClip, HeadlessBackend, SoundDescriptor};

    fn track(clip: &Arc<AudioClip>) -> SoundRef {
        SoundDescriptor::new(Arc::clone(clip))
            .with_bus(AudioBus::Music)
            .with_looping(true)
            .with_volume(0.8)
            .into_ref()
    }

    fn player(backend: &mut HeadlessBackend) -> MusicPlayer {
        MusicPlayer::new(backend.create_voice().expect("voice"))
    }

    fn clip(secs: u64) -> Arc<AudioClip> {
        Arc::new(AudioClip::silent("theme", Duration::from_secs(secs)))
    }

    #[test]
    fn test_play_pause_resume_keeps_position() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        let mixer = BusMixer::default();
        let theme = track(&clip(60));

        assert!(music.play(&theme, 1.0, false, &mixer));
        backend.update(10.0);
        music.pause();
        assert_eq!(music.state(), MusicState::Paused);
        backend.update(5.0);

        assert!(music.play(&theme, 0.5, false, &mixer));
        assert_eq!(music.state(), MusicState::Playing);
        assert!((music.position() - 10.0).abs() < 0.01);
        assert!((music.voice().settings().volume - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_same_clip_different_descriptor_resumes() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        let mixer = BusMixer::default();
        let shared = clip(60);
        let a = track(&shared);
        let b = track(&shared);

        music.play(&a, 1.0, false, &mixer);
        backend.update(3.0);
        music.pause();
        music.play(&b, 1.0, false, &mixer);
        assert!((music.position() - 3.0).abs() < 0.01);
    }

    #[test]
    fn test_restart_if_same() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        let mixer = BusMixer::default();
        let theme = track(&clip(60));

        music.play(&theme, 1.0, false, &mixer);
        backend.update(10.0);
        music.pause();
        music.play(&theme, 1.0, true, &mixer);
        assert!(music.position().abs() < f32::EPSILON);
    }

    #[test]
    fn test_play_while_playing_restarts() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        let mixer = BusMixer::default();
        let theme = track(&clip(60));
        let other = track(&clip(60));

        music.play(&theme, 1.0, false, &mixer);
        backend.update(4.0);
        music.play(&other, 1.0, false, &mixer);
        assert!(music.position().abs() < f32::EPSILON);
        assert_eq!(music.current().map(|s| s.id()), Some(other.id()));
    }

    #[test]
    fn test_muted_bus_refuses() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        let mut mixer = BusMixer::default();
        mixer.set_muted(AudioBus::Music, true);
        assert!(!music.play(&track(&clip(60)), 1.0, false, &mixer));

        mixer.set_muted(AudioBus::Music, false);
        mixer.set_muted(AudioBus::All, true);
        assert!(!music.play(&track(&clip(60)), 1.0, false, &mixer));
        assert_eq!(music.state(), MusicState::Stopped);
    }

    #[test]
    fn test_missing_clip_refused() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        let empty = SoundDescriptor::with_clip(None).into_ref();
        assert!(!music.play(&empty, 1.0, false, &BusMixer::default()));
    }

    #[test]
    fn test_pause_only_when_playing() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        music.pause();
        assert_eq!(music.state(), MusicState::Stopped);
    }

    #[test]
    fn test_stop_discards_position() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        let mixer = BusMixer::default();
        let theme = track(&clip(60));

        music.play(&theme, 1.0, false, &mixer);
        backend.update(8.0);
        music.pause();
        music.stop();
        assert_eq!(music.state(), MusicState::Stopped);

        music.play(&theme, 1.0, false, &mixer);
        assert!(music.position().abs() < f32::EPSILON);
    }

    #[test]
    fn test_non_looping_track_ends() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        let mixer = BusMixer::default();
        let jingle = SoundDescriptor::new(clip(2)).into_ref();

        music.play(&jingle, 1.0, false, &mixer);
        backend.update(3.0);
        music.tick();
        assert_eq!(music.state(), MusicState::Stopped);
    }

    #[test]
    fn test_music_routed_to_music_bus() {
        let mut backend = HeadlessBackend::new();
        let mut music = player(&mut backend);
        music.play(&track(&clip(60)), 1.0, false, &BusMixer::default());
        let settings = music.voice().settings();
        assert_eq!(settings.output, Some(AudioBus::Music));
        assert!(settings.spatial.blend.abs() < f32::EPSILON);
    }
}
