//! # TinySound Common
//!
//! Common types and utilities shared by every TinySound crate.
//!
//! This crate provides:
//! - Identity types (`SoundId`, `ClipId`, `VoiceId`)
//! - Level math (linear/decibel mapping, clamps, interpolation)
//! - The error type for fallible setup paths
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod level;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::level::*;
}

pub use prelude::*;
