//! Observable per-bus mute state.
//!
//! UI and settings code write mute flags into a `SoundState`; interested
//! parties subscribe and receive `(bus, muted)` notifications over a channel.
//! A `SoundStateBridge` forwards those notifications into the audio service
//! once per frame, so the UI never talks to the manager directly.
//!
//! ```text
//! MuteToggle ──set_muted──▶ SoundState ──(bus, muted)──▶ SoundStateBridge
//!                                │                              │ pump()
//!                                └──▶ other subscribers          ▼
//!                                                         AudioService
//! ```

use ahash::AHashMap;
use crossbeam_channel::{unbounded, Receiver, Sender};
use tinysound_engine::AudioService;
use tinysound_kernel::AudioBus;
use tracing::debug;

/// A mute flag change.
pub type MuteChange = (AudioBus, bool);

struct Subscriber {
    bus: Option<AudioBus>,
    sender: Sender<MuteChange>,
}

/// Per-bus mute flags with change notification.
///
/// Subscribing immediately delivers the current value. Afterwards only real
/// changes are sent. Subscribers whose receiver was dropped are pruned on
/// the next notification.
#[derive(Default)]
pub struct SoundState {
    muted: AHashMap<AudioBus, bool>,
    subscribers: Vec<Subscriber>,
}

impl SoundState {
    /// Create a state with every bus unmuted.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current flag for a bus. Unknown buses read as unmuted.
    #[must_use]
    pub fn is_muted(&self, bus: AudioBus) -> bool {
        self.muted.get(&bus).copied().unwrap_or(false)
    }

    /// Set a bus flag, notifying subscribers if it changed.
    pub fn set_muted(&mut self, bus: AudioBus, muted: bool) {
        let previous = self.muted.insert(bus, muted).unwrap_or(false);
        if previous == muted {
            return;
        }
        debug!(%bus, muted, "Sound state changed");
        self.subscribers.retain(|sub| {
            if sub.bus.is_some_and(|b| b != bus) {
                return true;
            }
            sub.sender.send((bus, muted)).is_ok()
        });
    }

    /// Flip a bus flag and return the new value.
    pub fn toggle(&mut self, bus: AudioBus) -> bool {
        let muted = !self.is_muted(bus);
        self.set_muted(bus, muted);
        muted
    }

    /// Watch one bus.
    pub fn subscribe(&mut self, bus: AudioBus) -> Receiver<MuteChange> {
        self.add_subscriber(Some(bus))
    }

    /// Watch every bus.
    pub fn subscribe_all(&mut self) -> Receiver<MuteChange> {
        self.add_subscriber(None)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn add_subscriber(&mut self, bus: Option<AudioBus>) -> Receiver<MuteChange> {
        let (sender, receiver) = unbounded();
        let buses: Vec<AudioBus> = match bus {
            Some(bus) => vec![bus],
            None => AudioBus::all().to_vec(),
        };
        for bus in buses {
            let _ = sender.send((bus, self.is_muted(bus)));
        }
        self.subscribers.push(Subscriber { bus, sender });
        receiver
    }
}

impl std::fmt::Debug for SoundState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundState")
            .field("muted", &self.muted)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

/// Forwards `SoundState` changes into an audio service.
#[derive(Debug)]
pub struct SoundStateBridge {
    receiver: Receiver<MuteChange>,
}

impl SoundStateBridge {
    /// Subscribe to every bus of `state`.
    pub fn new(state: &mut SoundState) -> Self {
        Self {
            receiver: state.subscribe_all(),
        }
    }

    /// Apply pending changes. Returns how many were applied.
    pub fn pump(&self, service: &mut dyn AudioService) -> usize {
        let mut applied = 0;
        for (bus, muted) in self.receiver.try_iter() {
            service.set_muted(bus, muted);
            applied += 1;
        }
        applied
    }

    /// Changes waiting to be applied.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tinysound_engine::{AudioManager, AudioManagerConfig, MusicState, PlayOptions};
    use tinysound_kernel::{AudioClip, HeadlessBackend, ManualClock, SoundDescriptor};

    fn manager() -> AudioManager {
        AudioManager::new(
            AudioManagerConfig {
                initial_voices: 0,
                max_voices: 4,
                ..Default::default()
            },
            HeadlessBackend::new(),
            ManualClock::new(),
        )
    }

    #[test]
    fn test_subscribe_delivers_current_value() {
        let mut state = SoundState::new();
        state.set_muted(AudioBus::Music, true);
        let rx = state.subscribe(AudioBus::Music);
        assert_eq!(rx.try_recv(), Ok((AudioBus::Music, true)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_only_changes_are_sent() {
        let mut state = SoundState::new();
        let rx = state.subscribe(AudioBus::Sound);
        let _ = rx.try_recv();

        state.set_muted(AudioBus::Sound, false);
        assert!(rx.try_recv().is_err());

        state.set_muted(AudioBus::Sound, true);
        state.set_muted(AudioBus::Sound, true);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![(AudioBus::Sound, true)]);
    }

    #[test]
    fn test_bus_filter() {
        let mut state = SoundState::new();
        let rx = state.subscribe(AudioBus::Music);
        let _ = rx.try_recv();
        state.set_muted(AudioBus::Sound, true);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscriber_pruned() {
        let mut state = SoundState::new();
        let rx = state.subscribe_all();
        let _keep = state.subscribe(AudioBus::All);
        drop(rx);
        state.set_muted(AudioBus::All, true);
        assert_eq!(state.subscriber_count(), 1);
    }

    #[test]
    fn test_toggle() {
        let mut state = SoundState::new();
        assert!(state.toggle(AudioBus::All));
        assert!(state.is_muted(AudioBus::All));
        assert!(!state.toggle(AudioBus::All));
    }

    #[test]
    fn test_bridge_applies_changes() {
        let mut audio = manager();
        let mut state = SoundState::new();
        let bridge = SoundStateBridge::new(&mut state);

        // initial snapshot: three unmuted buses
        assert_eq!(bridge.pump(&mut audio), 3);

        state.set_muted(AudioBus::Sound, true);
        assert_eq!(bridge.pending(), 1);
        assert!(!audio.is_muted(AudioBus::Sound));
        assert_eq!(bridge.pump(&mut audio), 1);
        assert!(audio.is_muted(AudioBus::Sound));
    }

    #[test]
    fn test_bridge_music_mute_pauses_music() {
        let mut audio = manager();
        let mut state = SoundState::new();
        let bridge = SoundStateBridge::new(&mut state);
        bridge.pump(&mut audio);

        let theme = SoundDescriptor::new(Arc::new(AudioClip::silent(
            "theme",
            Duration::from_secs(30),
        )))
        .with_bus(AudioBus::Music)
        .with_looping(true)
        .into_ref();
        assert!(audio.music_play(&theme, 1.0, false));

        state.set_muted(AudioBus::Music, true);
        bridge.pump(&mut audio);
        assert_eq!(audio.music_state(), MusicState::Paused);

        // sound effects still play
        let sfx = SoundDescriptor::new(Arc::new(AudioClip::silent(
            "sfx",
            Duration::from_secs(1),
        )))
        .into_ref();
        assert!(audio.play(&sfx, &PlayOptions::default()).is_issued());
    }
}
