//! Keyed, cancellable parameter fades.
//!
//! Every key owns a monotonically increasing token. Starting or stopping a
//! fade bumps the key's token; a running fade compares its captured token each
//! step and quietly drops out on mismatch, leaving whatever level it last
//! wrote. When no key is given the parameter name is the key, so two fades on
//! one parameter always preempt each other.

use ahash::AHashMap;
use tinysound_common::{clamp01, lerp, linear_to_db_with_floor, MUTE_FLOOR_DB};
use tracing::debug;

use crate::backend::ParameterSink;

/// Invoked once when a fade reaches its target.
pub type FadeCallback = Box<dyn FnOnce()>;

/// A fade that ran to completion during a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FadeCompletion {
    /// Cancellation key.
    pub key: String,
    /// Token the fade ran under.
    pub token: u64,
    /// Parameter that was faded.
    pub parameter: String,
    /// Final linear level.
    pub target: f32,
}

struct FadeTask {
    key: String,
    token: u64,
    parameter: String,
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    level: f32,
    on_complete: Option<FadeCallback>,
}

/// Runs fades against a [`ParameterSink`].
pub struct FadeController {
    tokens: AHashMap<String, u64>,
    tasks: Vec<FadeTask>,
    floor_db: f32,
}

impl FadeController {
    /// Create a controller writing `floor_db` for silent levels.
    #[must_use]
    pub fn new(floor_db: f32) -> Self {
        Self {
            tokens: AHashMap::new(),
            tasks: Vec::new(),
            floor_db,
        }
    }

    fn bump(&mut self, key: &str) -> u64 {
        let token = self.tokens.entry(key.to_string()).or_insert(0);
        *token += 1;
        *token
    }

    fn write(&self, sink: &mut dyn ParameterSink, parameter: &str, level01: f32) {
        // missing parameters are a silent no-op
        sink.set_parameter(parameter, linear_to_db_with_floor(level01, self.floor_db));
    }

    /// Start a fade, cancelling any fade sharing its key.
    ///
    /// `from01` is written immediately. A non-positive duration completes on
    /// the spot. Returns the fade's token.
    #[allow(clippy::too_many_arguments)]
    pub fn fade(
        &mut self,
        key: Option<&str>,
        parameter: &str,
        from01: f32,
        to01: f32,
        duration: f32,
        on_complete: Option<FadeCallback>,
        sink: &mut dyn ParameterSink,
    ) -> u64 {
        let key = key.unwrap_or(parameter);
        let token = self.bump(key);
        let (from01, to01) = (clamp01(from01), clamp01(to01));
        debug!(key, parameter, from01, to01, duration, "Starting fade");

        if duration <= 0.0 {
            self.write(sink, parameter, to01);
            if let Some(callback) = on_complete {
                callback();
            }
            return token;
        }

        self.write(sink, parameter, from01);
        self.tasks.push(FadeTask {
            key: key.to_string(),
            token,
            parameter: parameter.to_string(),
            from: from01,
            to: to01,
            duration,
            elapsed: 0.0,
            level: from01,
            on_complete,
        });
        token
    }

    /// Cancel the fade on `key`, leaving the last written level in place.
    pub fn stop_fade(&mut self, key: &str) {
        if self.tokens.contains_key(key) {
            self.bump(key);
        }
    }

    /// Cancel every fade.
    pub fn stop_all(&mut self) {
        for token in self.tokens.values_mut() {
            *token += 1;
        }
        self.tasks.clear();
    }

    /// True while a live fade runs on `key`.
    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        let Some(&current) = self.tokens.get(key) else {
            return false;
        };
        self.tasks
            .iter()
            .any(|task| task.key == key && task.token == current)
    }

    /// Level last written by the live fade on `key`.
    #[must_use]
    pub fn current_level(&self, key: &str) -> Option<f32> {
        let current = self.tokens.get(key)?;
        self.tasks
            .iter()
            .find(|task| task.key == key && task.token == *current)
            .map(|task| task.level)
    }

    /// Number of fades still running (cancelled ones are pruned on tick).
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| self.tokens.get(&task.key) == Some(&task.token))
            .count()
    }

    /// Advance every fade by `dt` seconds.
    ///
    /// Finished fades write their exact target, fire their callback once, and
    /// are reported back. Superseded fades are dropped without writing.
    pub fn tick(&mut self, dt: f32, sink: &mut dyn ParameterSink) -> Vec<FadeCompletion> {
        let mut completed = Vec::new();
        let tasks = std::mem::take(&mut self.tasks);
        let mut remaining = Vec::with_capacity(tasks.len());

        for mut task in tasks {
            if self.tokens.get(&task.key) != Some(&task.token) {
                continue;
            }

            task.elapsed += dt.max(0.0);
            let k = clamp01(task.elapsed / task.duration);
            if k >= 1.0 {
                self.write(sink, &task.parameter, task.to);
                if let Some(callback) = task.on_complete.take() {
                    callback();
                }
                completed.push(FadeCompletion {
                    key: task.key,
                    token: task.token,
                    parameter: task.parameter,
                    target: task.to,
                });
            } else {
                task.level = lerp(task.from, task.to, k);
                self.write(sink, &task.parameter, task.level);
                remaining.push(task);
            }
        }

        self.tasks = remaining;
        completed
    }
}

impl Default for FadeController {
    fn default() -> Self {
        Self::new(MUTE_FLOOR_DB)
    }
}

impl std::fmt::Debug for FadeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadeController")
            .field("keys", &self.tokens.len())
            .field("tasks", &self.tasks.len())
            .field("floor_db", &self.floor_db)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessBackend;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, FadeCallback) {
        let count = Rc::new(Cell::new(0));
        let inner = Rc::clone(&count);
        (count, Box::new(move || inner.set(inner.get() + 1)))
    }

    #[test]
    fn test_fade_reaches_exact_target() {
        let mut backend = HeadlessBackend::new();
        let view = backend.clone();
        let mut fades = FadeController::default();
        let (count, callback) = counter();

        fades.fade(Some("music"), "MusicVolume", 0.0, 1.0, 1.0, Some(callback), &mut backend);
        assert_eq!(view.parameter("MusicVolume"), Some(MUTE_FLOOR_DB));

        fades.tick(0.5, &mut backend);
        let mid = view.parameter("MusicVolume").expect("written");
        assert!((mid - (-6.0206)).abs() < 0.001);
        assert_eq!(count.get(), 0);

        let done = fades.tick(0.5, &mut backend);
        assert_eq!(view.parameter("MusicVolume"), Some(0.0));
        assert_eq!(count.get(), 1);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].key, "music");

        fades.tick(0.5, &mut backend);
        assert_eq!(count.get(), 1);
        assert_eq!(fades.active_count(), 0);
    }

    #[test]
    fn test_current_level_tracks_last_write() {
        let mut backend = HeadlessBackend::new();
        let mut fades = FadeController::default();
        assert_eq!(fades.current_level("MusicVolume"), None);

        fades.fade(None, "MusicVolume", 1.0, 0.0, 2.0, None, &mut backend);
        assert_eq!(fades.current_level("MusicVolume"), Some(1.0));

        fades.tick(1.5, &mut backend);
        let level = fades.current_level("MusicVolume").expect("running");
        assert!((level - 0.25).abs() < 1e-6);

        fades.stop_fade("MusicVolume");
        assert_eq!(fades.current_level("MusicVolume"), None);
    }

    #[test]
    fn test_same_key_preempts() {
        let mut backend = HeadlessBackend::new();
        let view = backend.clone();
        let mut fades = FadeController::default();
        let (first, first_cb) = counter();
        let (second, second_cb) = counter();

        fades.fade(Some("k"), "SfxVolume", 0.0, 1.0, 1.0, Some(first_cb), &mut backend);
        fades.tick(0.5, &mut backend);
        fades.fade(Some("k"), "SfxVolume", 1.0, 0.0, 1.0, Some(second_cb), &mut backend);
        assert!(fades.is_active("k"));

        fades.tick(1.0, &mut backend);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
        assert_eq!(view.parameter("SfxVolume"), Some(MUTE_FLOOR_DB));
    }

    #[test]
    fn test_key_defaults_to_parameter() {
        let mut backend = HeadlessBackend::new();
        let mut fades = FadeController::default();
        let (first, first_cb) = counter();

        fades.fade(None, "MasterVolume", 0.0, 1.0, 1.0, Some(first_cb), &mut backend);
        assert!(fades.is_active("MasterVolume"));
        fades.fade(None, "MasterVolume", 1.0, 0.5, 1.0, None, &mut backend);
        fades.tick(2.0, &mut backend);
        assert_eq!(first.get(), 0);
    }

    #[test]
    fn test_stop_fade_keeps_last_level() {
        let mut backend = HeadlessBackend::new();
        let view = backend.clone();
        let mut fades = FadeController::default();
        let (count, callback) = counter();

        fades.fade(None, "MusicVolume", 0.0, 1.0, 1.0, Some(callback), &mut backend);
        fades.tick(0.5, &mut backend);
        let level = view.parameter("MusicVolume");
        fades.stop_fade("MusicVolume");
        assert!(!fades.is_active("MusicVolume"));

        fades.tick(1.0, &mut backend);
        assert_eq!(view.parameter("MusicVolume"), level);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut backend = HeadlessBackend::new();
        let view = backend.clone();
        let mut fades = FadeController::default();
        let (count, callback) = counter();

        fades.fade(None, "SfxVolume", 1.0, 0.25, 0.0, Some(callback), &mut backend);
        assert_eq!(count.get(), 1);
        assert!(!fades.is_active("SfxVolume"));
        let db = view.parameter("SfxVolume").expect("written");
        assert!((db - linear_to_db_with_floor(0.25, MUTE_FLOOR_DB)).abs() < 1e-6);
    }

    #[test]
    fn test_missing_parameter_still_completes() {
        let mut backend = HeadlessBackend::new();
        backend.remove_parameter("Reverb");
        let mut fades = FadeController::default();
        let (count, callback) = counter();

        fades.fade(None, "Reverb", 0.0, 1.0, 0.2, Some(callback), &mut backend);
        fades.tick(0.3, &mut backend);
        assert_eq!(count.get(), 1);
        assert_eq!(backend.parameter("Reverb"), None);
    }
}
