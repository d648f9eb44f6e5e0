//! The audio manager.
//!
//! Composes the voice pool, playback gate, bus mixer, fade controller, and
//! music player behind one synchronous API. All state changes happen inside
//! calls on the host's thread; work that spans frames (completion monitors,
//! follow syncs, fades, music end detection) advances in [`AudioManager::tick`].
//!
//! Every play request walks the same admission path:
//!
//! ```text
//! clip? ─▶ unlocked? ─▶ bus audible? ─▶ cooldown ─▶ concurrency ─▶ voice
//!                                       (commits)
//! ```
//!
//! A refusal at any step returns [`AudioHandle::invalid`]. Only the cooldown
//! step leaves a trace: its timestamp stays committed even when a later step
//! refuses.

use ahash::AHashMap;
use tinysound_kernel::{
    AudioBackend, AudioBus, AudioHandle, BusMixer, Clock, FadeCallback, FadeController,
    PlaybackGate, SoundRef, SpatialSettings, VoicePool, VoiceSettings,
};
use tracing::{debug, info, warn};

use crate::config::AudioManagerConfig;
use crate::music::{MusicPlayer, MusicState};
use crate::options::PlayOptions;
use crate::service::{AudioService, MuteQuery};
use crate::tasks::{CompletionMonitor, FollowSync, MonitorPoll};

/// Bounded audio playback manager.
pub struct AudioManager {
    config: AudioManagerConfig,
    backend: Box<dyn AudioBackend>,
    clock: Box<dyn Clock>,
    pool: VoicePool,
    gate: PlaybackGate,
    mixer: BusMixer,
    fades: FadeController,
    music: Option<MusicPlayer>,
    monitors: Vec<CompletionMonitor>,
    follows: Vec<FollowSync>,
    /// Bus fades awaiting completion, by fade key.
    bus_fades: AHashMap<String, (u64, AudioBus)>,
    locked: bool,
    rng: fastrand::Rng,
}

impl AudioManager {
    /// Create a manager, warm the pool, and push starting bus levels.
    pub fn new(
        mut config: AudioManagerConfig,
        backend: impl AudioBackend + 'static,
        clock: impl Clock + 'static,
    ) -> Self {
        config.validate();

        let mut backend: Box<dyn AudioBackend> = Box::new(backend);
        let mut mixer = BusMixer::new(config.routing(), config.mute_floor_db);
        mixer.set_volume01(AudioBus::All, config.master_volume);
        mixer.set_volume01(AudioBus::Music, config.music_volume);
        mixer.set_volume01(AudioBus::Sound, config.sound_volume);
        mixer.apply_all(backend.parameters());

        let mut pool = VoicePool::new(config.max_voices, config.steal_oldest_when_full);
        let warmed = pool.warm(backend.as_mut(), config.initial_voices);

        let rng = config
            .rng_seed
            .map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);

        info!(
            "Audio manager ready: {} voices warmed, capacity {}, unlock required: {}",
            warmed, config.max_voices, config.require_unlock
        );

        Self {
            locked: config.require_unlock,
            fades: FadeController::new(config.mute_floor_db),
            config,
            backend,
            clock: Box::new(clock),
            pool,
            gate: PlaybackGate::new(),
            mixer,
            music: None,
            monitors: Vec::new(),
            follows: Vec::new(),
            bus_fades: AHashMap::new(),
            rng,
        }
    }

    // === Playback ===

    /// Play a sound. Returns the invalid handle when refused.
    pub fn play(&mut self, sound: &SoundRef, options: &PlayOptions) -> AudioHandle {
        let Some(clip) = sound.clip.clone() else {
            debug!(sound = ?sound.id(), "Refused: no clip");
            return AudioHandle::invalid();
        };
        if self.locked {
            debug!(sound = ?sound.id(), "Refused: playback locked");
            return AudioHandle::invalid();
        }
        if !self.mixer.is_audible_for(sound.bus) {
            debug!(sound = ?sound.id(), bus = %sound.bus, "Refused: bus muted");
            return AudioHandle::invalid();
        }
        if !self.gate.check_and_record_cooldown(sound, self.clock.now()) {
            debug!(sound = ?sound.id(), "Refused: cooling down");
            return AudioHandle::invalid();
        }
        if !self.gate.check_concurrency(sound) {
            debug!(sound = ?sound.id(), "Refused: instance cap reached");
            return AudioHandle::invalid();
        }

        let Some(acquired) = self.pool.acquire(self.backend.as_mut()) else {
            debug!(sound = ?sound.id(), "Refused: no voice available");
            return AudioHandle::invalid();
        };
        if let Some(stolen) = acquired.stolen {
            self.gate.record_end(stolen.id());
        }

        let mut pitch = sound.pitch;
        if sound.random_pitch && sound.pitch_jitter > 0.0 {
            pitch += (self.rng.f32() * 2.0 - 1.0) * sound.pitch_jitter;
        }
        let spatial = if options.is_spatial(sound.spatial) {
            sound.spatial_settings()
        } else {
            SpatialSettings::FLAT
        };
        let follow = options.follow.clone();
        let start_position = options
            .position
            .or_else(|| follow.as_ref().and_then(|w| w.upgrade()).map(|t| t.position()));

        if let Some(voice) = self.pool.voice_mut(acquired.voice) {
            voice.set_clip(Some(clip));
            voice.set_output(Some(sound.bus));
            voice.set_volume(options.effective_volume(sound.volume));
            voice.set_pitch(options.effective_pitch(pitch));
            voice.set_looping(sound.looping);
            voice.set_spatial(spatial);
            if let Some(position) = start_position {
                voice.set_position(position);
            }
            voice.play();
        }

        let handle = self.pool.mark_busy(acquired.voice, SoundRef::clone(sound));
        self.gate.record_start(sound.id());

        if !sound.looping {
            self.monitors.push(CompletionMonitor::new(handle));
        }
        if let Some(target) = follow {
            self.follows.push(FollowSync::new(handle, target));
        }

        debug!(sound = ?sound.id(), voice = %handle.voice(), "Playing");
        handle
    }

    /// Stop a session early. Stale handles are ignored.
    pub fn stop(&mut self, handle: AudioHandle) {
        if self.release(handle) {
            debug!(voice = %handle.voice(), "Stopped");
        }
    }

    /// Release every busy pool voice.
    pub fn stop_all(&mut self) {
        let voices: Vec<_> = self.pool.busy_voices().collect();
        for voice in voices {
            if let Some(sound) = self.pool.release(voice) {
                self.gate.record_end(sound.id());
            }
        }
    }

    /// The single release path for stop, completion, and mute.
    fn release(&mut self, handle: AudioHandle) -> bool {
        if !self.pool.is_valid(handle) {
            return false;
        }
        if let Some(sound) = self.pool.release(handle.voice()) {
            self.gate.record_end(sound.id());
        }
        true
    }

    /// Release busy voices whose sound routes to a bus covered by `bus`.
    fn stop_routed(&mut self, bus: AudioBus) -> usize {
        let voices: Vec<_> = self
            .pool
            .busy_voices()
            .filter(|&voice| {
                self.pool
                    .binding(voice)
                    .is_some_and(|sound| bus.covers(sound.bus))
            })
            .collect();

        for &voice in &voices {
            if let Some(sound) = self.pool.release(voice) {
                self.gate.record_end(sound.id());
            }
        }
        voices.len()
    }

    /// Whether a session is still bound to its voice.
    #[must_use]
    pub fn is_valid(&self, handle: AudioHandle) -> bool {
        self.pool.is_valid(handle)
    }

    /// Whether a session is live and audibly playing.
    #[must_use]
    pub fn is_playing(&self, handle: AudioHandle) -> bool {
        self.pool.is_valid(handle)
            && self
                .pool
                .voice(handle.voice())
                .is_some_and(|voice| voice.is_playing())
    }

    /// Settings applied to a live session's voice.
    #[must_use]
    pub fn voice_settings(&self, handle: AudioHandle) -> Option<VoiceSettings> {
        if !self.pool.is_valid(handle) {
            return None;
        }
        self.pool.voice(handle.voice()).map(|voice| voice.settings())
    }

    // === Buses ===

    /// Mute or unmute a bus.
    ///
    /// Muting stops every pool voice routed to an affected bus and pauses the
    /// music if the music bus is affected. Unmuting restores the stored level
    /// but never resumes music.
    pub fn set_muted(&mut self, bus: AudioBus, muted: bool) {
        if !self.mixer.set_muted(bus, muted) {
            return;
        }

        if muted {
            let parameter = self.mixer.routing().parameter(bus).to_string();
            self.fades.stop_fade(&parameter);
            self.bus_fades.remove(&parameter);

            let stopped = self.stop_routed(bus);
            if bus.covers(AudioBus::Music) {
                if let Some(music) = self.music.as_mut() {
                    music.pause();
                }
            }
            info!(%bus, stopped, "Bus muted");
        } else {
            info!(%bus, "Bus unmuted");
        }

        self.mixer.apply(bus, self.backend.parameters());
    }

    /// Whether a bus's own mute flag is set.
    #[must_use]
    pub fn is_muted(&self, bus: AudioBus) -> bool {
        self.mixer.is_muted(bus)
    }

    /// Set a bus's linear volume, cancelling any fade on it.
    ///
    /// The level reaches the backend only while the bus is unmuted.
    pub fn set_volume01(&mut self, bus: AudioBus, volume: f32) {
        let parameter = self.mixer.routing().parameter(bus).to_string();
        self.fades.stop_fade(&parameter);
        self.bus_fades.remove(&parameter);

        let stored = self.mixer.set_volume01(bus, volume);
        debug!(%bus, volume = stored, "Bus volume set");
        if !self.mixer.is_muted(bus) {
            self.mixer.apply(bus, self.backend.parameters());
        }
    }

    /// A bus's stored linear volume.
    #[must_use]
    pub fn volume01(&self, bus: AudioBus) -> f32 {
        self.mixer.volume01(bus)
    }

    /// Fade a bus to `to01`.
    ///
    /// Starts from the level a running fade on the bus last wrote, otherwise
    /// from the stored level. The stored level becomes `to01` when the fade
    /// completes. Muted buses just take the new level.
    pub fn fade_bus_volume(&mut self, bus: AudioBus, to01: f32, duration: f32) {
        if self.mixer.is_muted(bus) {
            self.mixer.set_volume01(bus, to01);
            return;
        }

        let parameter = self.mixer.routing().parameter(bus).to_string();
        let from01 = self
            .fades
            .current_level(&parameter)
            .unwrap_or_else(|| self.mixer.volume01(bus));
        let token = self.fades.fade(
            None,
            &parameter,
            from01,
            to01,
            duration,
            None,
            &mut self.mixer.gate(self.backend.parameters()),
        );

        if duration <= 0.0 {
            self.bus_fades.remove(&parameter);
            self.mixer.set_volume01(bus, to01);
        } else {
            self.bus_fades.insert(parameter, (token, bus));
        }
    }

    // === Fades ===

    /// Fade any named parameter. The key defaults to the parameter name.
    ///
    /// Writes to a muted bus's parameter are held at the floor level.
    pub fn fade(
        &mut self,
        key: Option<&str>,
        parameter: &str,
        from01: f32,
        to01: f32,
        duration: f32,
        on_complete: Option<FadeCallback>,
    ) {
        self.fades.fade(
            key,
            parameter,
            from01,
            to01,
            duration,
            on_complete,
            &mut self.mixer.gate(self.backend.parameters()),
        );
    }

    /// Cancel a fade, keeping the last written level.
    pub fn stop_fade(&mut self, key: &str) {
        self.fades.stop_fade(key);
        self.bus_fades.remove(key);
    }

    /// Whether a fade runs on `key`.
    #[must_use]
    pub fn is_fading(&self, key: &str) -> bool {
        self.fades.is_active(key)
    }

    // === Music ===

    fn ensure_music(&mut self) {
        if self.music.is_some() {
            return;
        }
        match self.backend.create_voice() {
            Ok(voice) => self.music = Some(MusicPlayer::new(voice)),
            Err(e) => warn!("Could not create music voice: {e}"),
        }
    }

    /// Play, resume, or restart music. Returns false if refused.
    pub fn music_play(&mut self, music: &SoundRef, volume01: f32, restart_if_same: bool) -> bool {
        if self.locked {
            debug!("Refused music: playback locked");
            return false;
        }
        self.ensure_music();
        match self.music.as_mut() {
            Some(player) => player.play(music, volume01, restart_if_same, &self.mixer),
            None => false,
        }
    }

    /// Pause music, keeping the position.
    pub fn music_pause(&mut self) {
        if let Some(player) = self.music.as_mut() {
            player.pause();
        }
    }

    /// Stop music.
    pub fn music_stop(&mut self) {
        if let Some(player) = self.music.as_mut() {
            player.stop();
        }
    }

    /// The music player, once music has been requested.
    #[must_use]
    pub fn music(&self) -> Option<&MusicPlayer> {
        self.music.as_ref()
    }

    /// Current music state.
    #[must_use]
    pub fn music_state(&self) -> MusicState {
        self.music.as_ref().map_or(MusicState::Stopped, MusicPlayer::state)
    }

    // === Lifecycle ===

    /// Lift the startup playback lock. Idempotent.
    pub fn unlock_playback(&mut self) {
        if self.locked {
            self.locked = false;
            info!("Playback unlocked");
        }
    }

    /// Whether playback is still locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Advance backend time, fades, follow syncs, music, and completion
    /// monitors, in that order.
    pub fn tick(&mut self, dt: f32) {
        self.backend.update(dt);

        let completions = self
            .fades
            .tick(dt, &mut self.mixer.gate(self.backend.parameters()));
        for done in completions {
            if let Some(&(token, bus)) = self.bus_fades.get(&done.key) {
                if token == done.token {
                    self.bus_fades.remove(&done.key);
                    self.mixer.set_volume01(bus, done.target);
                }
            }
        }

        self.follows.retain_mut(|follow| follow.tick(&mut self.pool));

        if let Some(music) = self.music.as_mut() {
            music.tick();
        }

        let monitors = std::mem::take(&mut self.monitors);
        for monitor in monitors {
            match monitor.poll(&self.pool) {
                MonitorPoll::Running => self.monitors.push(monitor),
                MonitorPoll::Finished => {
                    self.release(monitor.handle());
                },
                MonitorPoll::Stale => {},
            }
        }
    }

    // === Stats ===

    /// Busy pool voices.
    #[must_use]
    pub const fn busy_voices(&self) -> usize {
        self.pool.busy_count()
    }

    /// Free pool voices.
    #[must_use]
    pub fn free_voices(&self) -> usize {
        self.pool.free_count()
    }

    /// Pool voices created so far.
    #[must_use]
    pub fn total_voices(&self) -> usize {
        self.pool.total_count()
    }

    /// Live sessions of a descriptor.
    #[must_use]
    pub fn live_instances(&self, sound: &SoundRef) -> u32 {
        self.gate.live_count(sound.id())
    }

    /// Pending completion monitors and follow syncs.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.monitors.len() + self.follows.len()
    }

    /// The validated configuration in use.
    #[must_use]
    pub fn config(&self) -> &AudioManagerConfig {
        &self.config
    }

    /// Bus state.
    #[must_use]
    pub fn mixer(&self) -> &BusMixer {
        &self.mixer
    }
}

impl std::fmt::Debug for AudioManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioManager")
            .field("pool", &self.pool)
            .field("mixer", &self.mixer)
            .field("music", &self.music)
            .field("monitors", &self.monitors.len())
            .field("follows", &self.follows.len())
            .field("locked", &self.locked)
            .finish_non_exhaustive()
    }
}

impl MuteQuery for AudioManager {
    fn is_muted(&self, bus: AudioBus) -> bool {
        AudioManager::is_muted(self, bus)
    }
}

impl AudioService for AudioManager {
    fn play(&mut self, sound: &SoundRef, options: &PlayOptions) -> AudioHandle {
        AudioManager::play(self, sound, options)
    }

    fn stop(&mut self, handle: AudioHandle) {
        AudioManager::stop(self, handle);
    }

    fn set_muted(&mut self, bus: AudioBus, muted: bool) {
        AudioManager::set_muted(self, bus, muted);
    }

    fn set_volume01(&mut self, bus: AudioBus, volume: f32) {
        AudioManager::set_volume01(self, bus, volume);
    }

    fn volume01(&self, bus: AudioBus) -> f32 {
        AudioManager::volume01(self, bus)
    }

    fn music_play(&mut self, music: &SoundRef, volume01: f32, restart_if_same: bool) {
        AudioManager::music_play(self, music, volume01, restart_if_same);
    }

    fn music_pause(&mut self) {
        AudioManager::music_pause(self);
    }

    fn music_stop(&mut self) {
        AudioManager::music_stop(self);
    }

    fn unlock_playback(&mut self) {
        AudioManager::unlock_playback(self);
    }
}
