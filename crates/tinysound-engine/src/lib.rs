//! # TinySound Engine
//!
//! The audio manager hosts talk to.
//!
//! This crate ties the kernel together:
//! - `AudioManager`: admission, voice configuration, release, bus control
//! - `MusicPlayer`: one dedicated music voice with pause/resume
//! - `PlayOptions`: per-call volume, pitch, position, and follow overrides
//! - `AudioManagerConfig`: TOML-backed settings
//! - `AudioService` / `MuteQuery`: the seam handed to collaborators
//!
//! ## Frame loop
//!
//! ```text
//! host frame ──▶ manager.tick(dt)
//!                  ├─ backend.update(dt)
//!                  ├─ fades
//!                  ├─ follow syncs
//!                  ├─ music end detection
//!                  └─ completion monitors ──▶ release
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod manager;
pub mod music;
pub mod options;
pub mod service;
pub mod tasks;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::manager::*;
    pub use crate::music::*;
    pub use crate::options::*;
    pub use crate::service::*;
    pub use crate::tasks::*;
}

pub use prelude::*;
