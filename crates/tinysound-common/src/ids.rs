//! ID types for sounds, clips, and voices.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for sound descriptor IDs.
static SOUND_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Global counter for clip IDs.
static CLIP_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a sound descriptor.
///
/// Every descriptor gets a fresh ID when it is built, so two descriptors with
/// identical settings are still distinct sounds for cooldown and instance
/// bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SoundId(u64);

impl SoundId {
    /// Allocates a new unique sound ID.
    #[must_use]
    pub fn next() -> Self {
        Self(SOUND_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Null sound ID, carried by invalid handles.
    pub const NULL: Self = Self(0);

    /// Checks if this is a real (non-null) sound ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Identity of a loaded audio clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipId(u64);

impl ClipId {
    /// Allocates a new unique clip ID.
    #[must_use]
    pub fn next() -> Self {
        Self(CLIP_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Slot index of a voice inside a voice pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoiceId(u32);

impl VoiceId {
    /// Creates a voice ID from a slot index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}
