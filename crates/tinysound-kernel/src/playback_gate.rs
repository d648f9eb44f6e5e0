//! Per-descriptor admission: cooldowns and concurrency caps.
//!
//! The gate never touches voices. It only remembers when each descriptor last
//! played and how many of its sessions are live, keyed by [`SoundId`].

use ahash::AHashMap;
use tinysound_common::SoundId;

use crate::sound::SoundDescriptor;

/// Cooldown and live-instance bookkeeping.
#[derive(Debug, Default)]
pub struct PlaybackGate {
    last_played: AHashMap<SoundId, f64>,
    live: AHashMap<SoundId, u32>,
}

impl PlaybackGate {
    /// Create an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit unless the descriptor is still cooling down.
    ///
    /// An admitted call records `now` as the last play time, even if the
    /// request is rejected later for another reason.
    pub fn check_and_record_cooldown(&mut self, sound: &SoundDescriptor, now: f64) -> bool {
        let cooldown = f64::from(sound.cooldown);
        if cooldown > 0.0 {
            if let Some(last) = self.last_played.get(&sound.id()) {
                if now - last < cooldown {
                    return false;
                }
            }
        }
        self.last_played.insert(sound.id(), now);
        true
    }

    /// Admit unless the descriptor already has its maximum live instances.
    #[must_use]
    pub fn check_concurrency(&self, sound: &SoundDescriptor) -> bool {
        sound.max_simultaneous == 0 || self.live_count(sound.id()) < sound.max_simultaneous
    }

    /// Count a newly started session.
    pub fn record_start(&mut self, sound: SoundId) {
        *self.live.entry(sound).or_insert(0) += 1;
    }

    /// Count a released session. Never goes below zero.
    pub fn record_end(&mut self, sound: SoundId) {
        if let Some(count) = self.live.get_mut(&sound) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.live.remove(&sound);
            }
        }
    }

    /// Live sessions for a descriptor.
    #[must_use]
    pub fn live_count(&self, sound: SoundId) -> u32 {
        self.live.get(&sound).copied().unwrap_or(0)
    }

    /// Forget every timestamp and count.
    pub fn clear(&mut self) {
        self.last_played.clear();
        self.live.clear();
    }
}
