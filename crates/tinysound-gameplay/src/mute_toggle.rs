//! Mute toggle widget model.
//!
//! Holds what a settings screen draws for one bus: the toggle's on/off value
//! and whether the "muted" icon is shown. It either drives the audio service
//! directly or writes into a shared `SoundState` and mirrors it back.

use crossbeam_channel::Receiver;
use tinysound_engine::{AudioService, MuteQuery};
use tinysound_kernel::AudioBus;
use tracing::debug;

use crate::sound_state::{MuteChange, SoundState};

/// Toggle state for one bus.
#[derive(Debug)]
pub struct MuteToggle {
    bus: AudioBus,
    is_on: bool,
    icon_visible: bool,
    updates: Option<Receiver<MuteChange>>,
}

impl MuteToggle {
    /// Create an unmuted toggle for a bus.
    #[must_use]
    pub const fn new(bus: AudioBus) -> Self {
        Self {
            bus,
            is_on: false,
            icon_visible: false,
            updates: None,
        }
    }

    /// The bus this toggle controls.
    #[must_use]
    pub const fn bus(&self) -> AudioBus {
        self.bus
    }

    /// Toggle value. On means muted.
    #[must_use]
    pub const fn is_on(&self) -> bool {
        self.is_on
    }

    /// Whether the muted icon is shown.
    #[must_use]
    pub const fn icon_visible(&self) -> bool {
        self.icon_visible
    }

    /// User flipped the toggle: mute the bus on the service.
    pub fn set_on(&mut self, is_on: bool, service: &mut dyn AudioService) {
        service.set_muted(self.bus, is_on);
        self.show(is_on);
    }

    /// Mirror the service's current flag without issuing a change.
    pub fn sync(&mut self, query: &dyn MuteQuery) {
        self.show(query.is_muted(self.bus));
    }

    /// Follow a shared state from now on. Picks up its current value.
    pub fn bind(&mut self, state: &mut SoundState) {
        self.updates = Some(state.subscribe(self.bus));
        self.refresh();
    }

    /// Stop following the shared state.
    pub fn unbind(&mut self) {
        self.updates = None;
    }

    /// User flipped the toggle: write into the shared state.
    pub fn set_on_state(&mut self, is_on: bool, state: &mut SoundState) {
        state.set_muted(self.bus, is_on);
        if self.updates.is_some() {
            self.refresh();
        } else {
            self.show(is_on);
        }
    }

    /// Apply queued state changes. Returns true if the display changed.
    pub fn refresh(&mut self) -> bool {
        let Some(updates) = &self.updates else {
            return false;
        };
        let Some((_, muted)) = updates.try_iter().last() else {
            return false;
        };
        let changed = muted != self.is_on;
        self.show(muted);
        changed
    }

    fn show(&mut self, muted: bool) {
        if self.is_on != muted {
            debug!(bus = %self.bus, muted, "Mute toggle updated");
        }
        self.is_on = muted;
        self.icon_visible = muted;
    }
}
