//! Playback handles.

use tinysound_common::{SoundId, VoiceId};

/// Reference to one in-flight playback session.
///
/// A handle pairs a voice with the generation it had when the session was
/// bound and the descriptor it was bound to. The pool bumps a voice's
/// generation on every bind and release, so a handle goes stale the moment
/// its voice is released, whether stopped, finished, or stolen. Using a stale
/// handle is always a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioHandle {
    voice: VoiceId,
    generation: u32,
    sound: SoundId,
}

impl AudioHandle {
    /// Create a handle. Only the voice pool issues live handles.
    #[must_use]
    pub(crate) const fn new(voice: VoiceId, generation: u32, sound: SoundId) -> Self {
        Self {
            voice,
            generation,
            sound,
        }
    }

    /// The sentinel returned by rejected play requests.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            voice: VoiceId::new(u32::MAX),
            generation: 0,
            sound: SoundId::NULL,
        }
    }

    /// True unless this is the rejection sentinel.
    ///
    /// This does not say the session is still live; ask the manager for that.
    #[must_use]
    pub const fn is_issued(&self) -> bool {
        self.sound.is_valid()
    }

    /// Voice the session was bound to.
    #[must_use]
    pub const fn voice(&self) -> VoiceId {
        self.voice
    }

    /// Voice generation at bind time.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Descriptor the session was playing.
    #[must_use]
    pub const fn sound(&self) -> SoundId {
        self.sound
    }
}

impl Default for AudioHandle {
    fn default() -> Self {
        Self::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_handle() {
        let handle = AudioHandle::invalid();
        assert!(!handle.is_issued());
        assert_eq!(handle, AudioHandle::default());
    }

    #[test]
    fn test_issued_handle() {
        let sound = SoundId::next();
        let handle = AudioHandle::new(VoiceId::new(3), 2, sound);
        assert!(handle.is_issued());
        assert_eq!(handle.voice().index(), 3);
        assert_eq!(handle.generation(), 2);
        assert_eq!(handle.sound(), sound);
    }
}
