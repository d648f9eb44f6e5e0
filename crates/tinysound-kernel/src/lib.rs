//! # TinySound Kernel
//!
//! Bounded voice scheduling and bus mixing.
//!
//! This crate provides the parts of TinySound with real invariants:
//! - Voice pool with strict oldest-first stealing
//! - Playback gate (per-descriptor cooldowns and concurrency caps)
//! - Bus mixer (mute flags, linear volume, decibel mapping)
//! - Fade controller with generation-token cancellation
//! - The backend seam plus rodio and headless backends
//!
//! ## Architecture
//!
//! ```text
//!   play request
//!        │
//!        ▼
//! ┌──────────────┐ admit ┌───────────┐ voice ┌──────────────┐
//! │ PlaybackGate │──────▶│ VoicePool │──────▶│ AudioBackend │
//! └──────────────┘       └───────────┘       └──────────────┘
//!                                                   ▲
//!        ┌──────────┐  ┌────────────────┐           │
//!        │ BusMixer │  │ FadeController │───────────┘
//!        └──────────┘  └────────────────┘  (parameters, dB)
//! ```
//!
//! Nothing here owns time. Hosts drive everything through explicit ticks.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod bus_mixer;
pub mod clip;
pub mod clock;
pub mod fade;
pub mod handle;
pub mod headless;
pub mod playback_gate;
pub mod rodio_backend;
pub mod sound;
pub mod voice_pool;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::backend::*;
    pub use crate::bus_mixer::*;
    pub use crate::clip::*;
    pub use crate::clock::*;
    pub use crate::fade::*;
    pub use crate::handle::*;
    pub use crate::headless::*;
    pub use crate::playback_gate::*;
    pub use crate::rodio_backend::*;
    pub use crate::sound::*;
    pub use crate::voice_pool::*;
}

pub use prelude::*;
