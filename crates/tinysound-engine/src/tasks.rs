//! Per-frame work attached to a playback session.
//!
//! Both tasks hold only a handle, so a stolen or stopped session turns them
//! into no-ops that report themselves finished on the next tick.

use std::sync::Weak;

use tinysound_kernel::{AudioHandle, VoicePool};

use crate::options::PositionSource;

/// Outcome of polling a [`CompletionMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorPoll {
    /// Still playing.
    Running,
    /// Playback ended naturally; the session should be released.
    Finished,
    /// The session was already released elsewhere.
    Stale,
}

/// Watches a non-looping session until its voice stops.
#[derive(Debug, Clone, Copy)]
pub struct CompletionMonitor {
    handle: AudioHandle,
}

impl CompletionMonitor {
    /// Monitor a session.
    #[must_use]
    pub const fn new(handle: AudioHandle) -> Self {
        Self { handle }
    }

    /// The monitored session.
    #[must_use]
    pub const fn handle(&self) -> AudioHandle {
        self.handle
    }

    /// Check the voice once.
    #[must_use]
    pub fn poll(&self, pool: &VoicePool) -> MonitorPoll {
        if !pool.is_valid(self.handle) {
            return MonitorPoll::Stale;
        }
        match pool.voice(self.handle.voice()) {
            Some(voice) if voice.is_playing() => MonitorPoll::Running,
            _ => MonitorPoll::Finished,
        }
    }
}

/// Copies a target's position onto a voice every tick.
pub struct FollowSync {
    handle: AudioHandle,
    target: Weak<dyn PositionSource>,
    finished: bool,
}

impl FollowSync {
    /// Follow `target` for the lifetime of a session.
    #[must_use]
    pub fn new(handle: AudioHandle, target: Weak<dyn PositionSource>) -> Self {
        Self {
            handle,
            target,
            finished: false,
        }
    }

    /// True once the session or the target is gone.
    #[must_use]
    pub const fn finished(&self) -> bool {
        self.finished
    }

    /// Sync the position once. Returns false when finished.
    pub fn tick(&mut self, pool: &mut VoicePool) -> bool {
        if self.finished {
            return false;
        }
        if !pool.is_valid(self.handle) {
            self.finished = true;
            return false;
        }
        let Some(target) = self.target.upgrade() else {
            self.finished = true;
            return false;
        };
        let Some(voice) = pool.voice_mut(self.handle.voice()) else {
            self.finished = true;
            return false;
        };
        if !voice.is_playing() {
            self.finished = true;
            return false;
        }

        voice.set_position(target.position());
        true
    }
}

impl std::fmt::Debug for FollowSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FollowSync")
            .field("handle", &self.handle)
            .field("target_alive", &(self.target.strong_count() > 0))
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;
    use tinysound_kernel::{AudioBackend, AudioClip, HeadlessBackend, SoundDescriptor, SoundRef};

    fn start(pool: &mut VoicePool, backend: &mut HeadlessBackend, sound: &SoundRef) -> AudioHandle {
        let acquired = pool.acquire(backend).expect("voice");
        let voice = pool.voice_mut(acquired.voice).expect("voice");
        voice.set_clip(sound.clip.clone());
        voice.play();
        pool.mark_busy(acquired.voice, Arc::clone(sound))
    }

    fn sound(secs: f32) -> SoundRef {
        let clip = Arc::new(AudioClip::silent("tick", Duration::from_secs_f32(secs)));
        SoundDescriptor::new(clip).into_ref()
    }

    #[test]
    fn test_monitor_reports_finish() {
        let mut backend = HeadlessBackend::new();
        let mut pool = VoicePool::new(2, true);
        let handle = start(&mut pool, &mut backend, &sound(1.0));
        let monitor = CompletionMonitor::new(handle);

        assert_eq!(monitor.poll(&pool), MonitorPoll::Running);
        backend.update(1.5);
        assert_eq!(monitor.poll(&pool), MonitorPoll::Finished);

        pool.release(handle.voice());
        assert_eq!(monitor.poll(&pool), MonitorPoll::Stale);
    }

    #[test]
    fn test_follow_tracks_target() {
        let mut backend = HeadlessBackend::new();
        let mut pool = VoicePool::new(2, true);
        let handle = start(&mut pool, &mut backend, &sound(5.0));
        let target = Arc::new(Mutex::new(Vec3::new(1.0, 0.0, 0.0)));
        let weak: Weak<dyn PositionSource> = Arc::downgrade(&target) as Weak<dyn PositionSource>;
        let mut follow = FollowSync::new(handle, weak);

        assert!(follow.tick(&mut pool));
        *target.lock() = Vec3::new(4.0, 5.0, 6.0);
        assert!(follow.tick(&mut pool));
        let position = pool.voice(handle.voice()).expect("voice").settings().position;
        assert_eq!(position, Vec3::new(4.0, 5.0, 6.0));

        drop(target);
        assert!(!follow.tick(&mut pool));
        assert!(follow.finished());
    }

    #[test]
    fn test_follow_stops_with_session() {
        let mut backend = HeadlessBackend::new();
        let mut pool = VoicePool::new(2, true);
        let handle = start(&mut pool, &mut backend, &sound(5.0));
        let target = Arc::new(Vec3::ONE);
        let weak: Weak<dyn PositionSource> = Arc::downgrade(&target) as Weak<dyn PositionSource>;
        let mut follow = FollowSync::new(handle, weak);

        pool.release(handle.voice());
        assert!(!follow.tick(&mut pool));
        assert!(follow.finished());
    }
}
