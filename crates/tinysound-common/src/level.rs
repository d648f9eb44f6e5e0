//! Level math shared by the mixer, fades, and voice configuration.
//!
//! Bus sliders and fades work on a linear 0..1 scale. Mixer parameters are
//! driven in decibels, so every write goes through [`linear_to_db`].

/// Decibel value written for silence.
pub const MUTE_FLOOR_DB: f32 = -80.0;

/// Linear levels at or below this threshold map to the floor.
pub const SILENCE_THRESHOLD: f32 = 0.0001;

/// Lowest pitch a voice will be driven at.
pub const MIN_PITCH: f32 = 0.1;

/// Highest pitch a voice will be driven at.
pub const MAX_PITCH: f32 = 3.0;

/// Smallest min-distance accepted for a spatial voice.
pub const MIN_SPATIAL_DISTANCE: f32 = 0.01;

/// Clamps a value into `[0, 1]`. NaN maps to 0.
#[must_use]
pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Clamps a pitch into the playable range.
#[must_use]
pub fn clamp_pitch(pitch: f32) -> f32 {
    if pitch.is_nan() {
        1.0
    } else {
        pitch.clamp(MIN_PITCH, MAX_PITCH)
    }
}

/// Linear interpolation between `a` and `b`.
#[must_use]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Converts a linear level to decibels using the default floor.
#[must_use]
pub fn linear_to_db(v01: f32) -> f32 {
    linear_to_db_with_floor(v01, MUTE_FLOOR_DB)
}

/// Converts a linear level to decibels.
///
/// The input is clamped into `[0, 1]`; anything at or below
/// [`SILENCE_THRESHOLD`] returns `floor_db` instead of `-inf`.
#[must_use]
pub fn linear_to_db_with_floor(v01: f32, floor_db: f32) -> f32 {
    let v01 = clamp01(v01);
    if v01 <= SILENCE_THRESHOLD {
        return floor_db;
    }
    20.0 * v01.log10()
}

/// Converts decibels back to a linear gain. Values at or below the floor are silent.
#[must_use]
pub fn db_to_linear(db: f32) -> f32 {
    if db <= MUTE_FLOOR_DB {
        return 0.0;
    }
    10.0_f32.powf(db / 20.0)
}
