//! # TinySound Gameplay
//!
//! Gameplay-side audio glue built on the `AudioService` seam.
//!
//! This crate provides:
//! - `SoundEmitter`: a bound sound plus default play options
//! - `MuteToggle`: the model behind a per-bus mute switch
//! - `SoundState` / `SoundStateBridge`: observable mute flags forwarded to
//!   the audio service once per frame
//!
//! Nothing here holds a global manager. Every call takes the service it
//! talks to.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod emitter;
pub mod mute_toggle;
pub mod sound_state;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::emitter::*;
    pub use crate::mute_toggle::*;
    pub use crate::sound_state::*;
}

pub use prelude::*;
