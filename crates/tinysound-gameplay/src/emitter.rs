//! Sound emitters.
//!
//! An emitter binds a sound and default play options to a spot in the world
//! (a button, a prop, a character) so callers only say "play".

use tinysound_engine::{AudioService, PlayOptions};
use tinysound_kernel::{AudioHandle, SoundRef};
use tracing::trace;

/// Plays one configured sound through an injected service.
#[derive(Debug, Clone, Default)]
pub struct SoundEmitter {
    sound: Option<SoundRef>,
    options: PlayOptions,
    last: AudioHandle,
}

impl SoundEmitter {
    /// Create an emitter. `None` makes every `play` a no-op.
    #[must_use]
    pub fn new(sound: Option<SoundRef>) -> Self {
        Self {
            sound,
            options: PlayOptions::default(),
            last: AudioHandle::invalid(),
        }
    }

    /// Set the options used by `play`.
    #[must_use]
    pub fn with_options(mut self, options: PlayOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the bound sound.
    pub fn set_sound(&mut self, sound: Option<SoundRef>) {
        self.sound = sound;
    }

    /// The bound sound.
    #[must_use]
    pub fn sound(&self) -> Option<&SoundRef> {
        self.sound.as_ref()
    }

    /// Default options.
    #[must_use]
    pub const fn options(&self) -> &PlayOptions {
        &self.options
    }

    /// Play with the default options.
    pub fn play(&mut self, service: &mut dyn AudioService) -> AudioHandle {
        let options = self.options.clone();
        self.play_with(service, &options)
    }

    /// Play with explicit options.
    pub fn play_with(
        &mut self,
        service: &mut dyn AudioService,
        options: &PlayOptions,
    ) -> AudioHandle {
        let Some(sound) = &self.sound else {
            trace!("Emitter has no sound bound");
            return AudioHandle::invalid();
        };
        let handle = service.play(sound, options);
        if handle.is_issued() {
            self.last = handle;
        }
        handle
    }

    /// Stop the most recent session started here. Stale handles are ignored.
    pub fn stop(&mut self, service: &mut dyn AudioService) {
        if self.last.is_issued() {
            service.stop(self.last);
            self.last = AudioHandle::invalid();
        }
    }

    /// Handle of the most recent admitted play.
    #[must_use]
    pub const fn last_handle(&self) -> AudioHandle {
        self.last
    }
}
