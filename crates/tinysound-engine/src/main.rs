//! # TinySound Demo
//!
//! Exercises the audio manager for a few seconds: a looping music bed, bursts
//! of one-shots that hit the instance cap and the pool limit, a music-bus
//! mute and resume, and a master fade-out.
//!
//! Uses the default output device when one is available and falls back to
//! the headless backend otherwise. Pass `--headless` to force it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tinysound_engine::{AudioManager, AudioManagerConfig, PlayOptions};
use tinysound_kernel::{
    AudioBackend, AudioBus, AudioClip, HeadlessBackend, ManualClock, RodioBackend,
    SoundDescriptor,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Simulated frame length.
const FRAME: Duration = Duration::from_millis(16);

/// Main entry point.
fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("tinysound=info".parse()?))
        .init();

    info!("TinySound demo starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = AudioManagerConfig::load();
    let headless = std::env::args().any(|arg| arg == "--headless");

    let backend: Box<dyn AudioBackend> = if headless {
        Box::new(HeadlessBackend::new())
    } else {
        match RodioBackend::new(config.routing()) {
            Ok(backend) => Box::new(backend),
            Err(e) => {
                warn!("No audio device ({e}), running headless");
                Box::new(HeadlessBackend::new())
            },
        }
    };

    let clock = ManualClock::new();
    let mut manager = AudioManager::new(config, backend, clock.clone());
    manager.unlock_playback();
    run(&mut manager, &clock, !headless);

    info!("TinySound demo finished");
    Ok(())
}

fn run(manager: &mut AudioManager, clock: &ManualClock, realtime: bool) {
    let theme = SoundDescriptor::new(Arc::new(AudioClip::tone(
        "theme",
        220.0,
        Duration::from_secs(4),
        0.2,
    )))
    .with_bus(AudioBus::Music)
    .with_looping(true)
    .into_ref();

    let blip = SoundDescriptor::new(Arc::new(AudioClip::tone(
        "blip",
        880.0,
        Duration::from_millis(150),
        0.3,
    )))
    .with_pitch_jitter(0.1)
    .with_max_simultaneous(3)
    .with_cooldown(0.05)
    .into_ref();

    manager.music_play(&theme, 0.8, false);

    let frames = 6_000 / FRAME.as_millis() as u32;
    let mut last = Instant::now();
    for frame in 0..frames {
        match frame {
            // one-shot bursts, some refused by the cap and the cooldown
            f if f % 20 == 0 && f < 120 => {
                for _ in 0..5 {
                    manager.play(&blip, &PlayOptions::default().with_volume(0.7));
                }
                info!(
                    busy = manager.busy_voices(),
                    live = manager.live_instances(&blip),
                    "Burst"
                );
            },
            150 => manager.set_muted(AudioBus::Music, true),
            220 => {
                manager.set_muted(AudioBus::Music, false);
                manager.music_play(&theme, 0.8, false);
                info!(state = ?manager.music_state(), "Music resumed");
            },
            280 => manager.fade_bus_volume(AudioBus::All, 0.0, 2.0),
            _ => {},
        }

        let dt = if realtime {
            std::thread::sleep(FRAME.saturating_sub(last.elapsed()));
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32();
            last = now;
            dt
        } else {
            FRAME.as_secs_f32()
        };
        clock.advance(f64::from(dt));
        manager.tick(dt);
    }

    manager.music_stop();
    manager.stop_all();
    info!(
        total = manager.total_voices(),
        free = manager.free_voices(),
        "Pool at shutdown"
    );
}
