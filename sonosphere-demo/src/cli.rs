use anyhow::{Context, Result};
use sonosphere::{
    CatalogueSource, JsonCatalogueSource, PlaybackCommand, Preparable, SonoConfig, SonoEngine,
    SonoEvent, SonoWorld, Vec3,
};
use std::time::{Duration, Instant};

const CONFIGURATION: &str = r#"{
    "configuration": {
        "primaryAngle": 8.0,
        "secondaryAngle": 30.0,
        "timeToFocus": 4.0,
        "minAngleBetweenSounds": 25.0,
        "maxMediaPlayers": 3,
        "maxIdleSensorDifference": 0.01,
        "maxIdleSeconds": 20.0,
        "selectRandomly": false,
        "numRandomlySelected": 0
    }
}"#;

const SOUNDS: &str = r#"{
    "sounds": [
        {"id": 1, "directionX": 1.0, "directionY": 0.0, "directionZ": 0.0,
         "location": "sounds/dawn_chorus.mp3", "description": "Dawn chorus",
         "category": "Birds", "cdNumber": "EC 12", "cdName": "Woodland",
         "trackNumber": 4, "selected": true, "onPhone": false},
        {"id": 2, "directionX": 0.9, "directionY": 0.35, "directionZ": 0.0,
         "location": "sounds/stream.mp3", "description": "Mountain stream",
         "category": "Water", "cdNumber": "EC 3", "cdName": "Rivers",
         "trackNumber": 1, "selected": true, "onPhone": false},
        {"id": 3, "directionX": 0.0, "directionY": 1.0, "directionZ": 0.0,
         "location": "sounds/broken.mp3", "description": "Steam train",
         "category": "Transport", "cdNumber": "EC 7", "cdName": "Railways",
         "trackNumber": 9, "selected": true, "onPhone": false},
        {"id": 4, "directionX": null, "directionY": null, "directionZ": null,
         "location": "sounds/market.mp3", "description": "Street market",
         "category": "Crowds", "cdNumber": "EC 21", "cdName": "Cities",
         "trackNumber": 2, "selected": true, "onPhone": false},
        {"id": 5, "directionX": 0.0, "directionY": 0.0, "directionZ": 0.0,
         "location": "sounds/nowhere.mp3", "description": "Misplaced",
         "category": "Test", "cdNumber": "EC 0", "cdName": "None",
         "trackNumber": 0, "selected": true, "onPhone": false}
    ]
}"#;

pub enum CatalogueInput {
    Builtin,
    Files {
        configuration: String,
        sounds: String,
    },
}

impl CatalogueInput {
    fn source(&self) -> Result<JsonCatalogueSource> {
        match self {
            Self::Builtin => Ok(JsonCatalogueSource::from_strings(CONFIGURATION, SOUNDS)),
            Self::Files {
                configuration,
                sounds,
            } => JsonCatalogueSource::from_files(configuration, sounds)
                .with_context(|| format!("Failed to read {} / {}", configuration, sounds)),
        }
    }
}

fn bootstrap(input: &CatalogueInput) -> Result<SonoWorld> {
    let source = input.source()?;
    log::info!(
        "Catalogue has {} entries",
        source.fetch_sounds().map(|s| s.len()).unwrap_or(0)
    );
    let base = SonoConfig::new()
        .pre_focus_delay(Duration::from_millis(500))
        .reveal_seed(7);
    let world = SonoWorld::bootstrap(&source, base).context("Failed to start the experience")?;
    for target in world.targets() {
        log::info!(
            "{} sound {} at {:?}: {}",
            target.id(),
            target.sound_id(),
            target.direction(),
            target.locator()
        );
    }
    Ok(world)
}

/// Pretend audio layer: prepares succeed immediately unless the locator
/// contains "broken".
fn answer(command: PlaybackCommand) {
    match command {
        PlaybackCommand::Prepare {
            resource,
            locator,
            ticket,
        } => {
            if locator.contains("broken") {
                log::info!("[audio] {} cannot decode {}", resource, locator);
                ticket.on_failed(format!("cannot decode {}", locator));
            } else {
                log::info!("[audio] {} prepared {}", resource, locator);
                ticket.on_ready();
            }
        }
        PlaybackCommand::Play { resource, gain } => {
            log::info!("[audio] {} play at {:.2}", resource, gain)
        }
        PlaybackCommand::SetGain { resource, gain } => {
            log::debug!("[audio] {} gain {:.2}", resource, gain)
        }
        PlaybackCommand::Stop { resource } => log::info!("[audio] {} stop", resource),
        PlaybackCommand::SetBedMode(mode) => log::info!("[audio] bed {:?}", mode),
        PlaybackCommand::SetBedGain { gain } => log::debug!("[audio] bed gain {:.2}", gain),
    }
}

fn report(event: &SonoEvent) {
    match event {
        SonoEvent::RevealProgress { text, .. } => log::info!("[host] \"{}\"", text),
        SonoEvent::HapticPulse => log::info!("[host] *buzz*"),
        other if other.is_error() => log::warn!("[host] {:?}", other),
        other => log::info!("[host] {:?}", other),
    }
}

/// Aim sweeping from -X round to +X in the XY plane.
fn sweep(progress: f32) -> Vec3 {
    let theta = std::f32::consts::PI * (1.0 - progress.clamp(0.0, 1.0));
    Vec3::new(theta.cos(), theta.sin(), 0.0)
}

/// Runs a scripted session on a simulated clock: sweep onto a target, dwell
/// until focused, then hold still until the experience pauses.
pub fn run_scripted(input: &CatalogueInput) -> Result<()> {
    let mut world = bootstrap(input)?;
    let commands = world.command_receiver();
    let start = Instant::now();
    let frame = Duration::from_millis(50);

    let mut clock = start;
    let pump = |world: &mut SonoWorld, aim: Vec3, clock: Instant| -> Result<()> {
        world.push_aim(aim, clock)?;
        for command in commands.try_iter() {
            answer(command);
        }
        world.advance(clock);
        for command in commands.try_iter() {
            answer(command);
        }
        for event in world.poll_events() {
            report(&event);
        }
        Ok(())
    };

    log::info!("=== Sweeping ===");
    for step in 0..=80 {
        let aim = sweep(step as f32 / 80.0);
        pump(&mut world, aim, clock)?;
        if step % 10 == 0 {
            log::info!("angles: {}", world.angles_summary());
        }
        clock += frame;
    }

    log::info!("=== Dwelling ===");
    for step in 0..200 {
        let wobble = if step % 2 == 0 { 0.003 } else { -0.003 };
        pump(&mut world, Vec3::new(1.0, wobble, 0.0), clock)?;
        clock += frame;
        if world.is_paused() {
            break;
        }
    }
    log::info!(
        "Focus: {:?}, pool: {:?}, bed gain {:.2}",
        world.focus_state(),
        world.pool().counts(),
        world.bed_gain()
    );

    log::info!("=== Holding still ===");
    while !world.is_paused() {
        pump(&mut world, Vec3::X, clock)?;
        clock += frame;
    }
    log::info!(
        "Paused after {:.1}s simulated ({} samples)",
        (clock - start).as_secs_f32(),
        world.samples_processed()
    );

    world.resume();
    pump(&mut world, sweep(0.5), clock)?;
    log::info!("Resumed, bed gain {:.2}", world.bed_gain());
    Ok(())
}

/// Runs the engine on its driver thread against a real clock for a few seconds.
pub fn run_threaded(input: &CatalogueInput) -> Result<()> {
    let world = bootstrap(input)?;
    let mut engine = SonoEngine::new(world);
    let commands = engine.command_receiver();

    let audio = std::thread::Builder::new()
        .name("demo-audio".into())
        .spawn(move || {
            for command in commands.iter() {
                answer(command);
            }
        })?;

    engine.start()?;
    let frames = 120;
    for step in 0..frames {
        engine.submit_aim(sweep((step as f32 / 40.0).min(1.0)))?;
        std::thread::sleep(Duration::from_millis(50));
        for event in engine.poll_events() {
            report(&event);
        }
    }

    let world = engine.into_world()?;
    log::info!(
        "Processed {} samples, focus {:?}",
        world.samples_processed(),
        world.focus_state()
    );
    drop(world);

    if audio.join().is_err() {
        log::error!("Audio thread panicked");
    }
    Ok(())
}
