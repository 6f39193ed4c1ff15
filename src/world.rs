use crate::allocator::{AllocationSummary, Allocator};
use crate::bed::BackgroundBed;
use crate::catalogue::{CatalogueSource, TargetSpec, select_targets};
use crate::config::SonoConfig;
use crate::error::{Result, SonoError};
use crate::events::SonoEvent;
use crate::focus::{FocusState, FocusStateMachine};
use crate::gain::GainModel;
use crate::idle::IdleMonitor;
use crate::math::{Vec3, normalize_direction};
use crate::playback::{BedMode, Outbox, PlaybackCommand};
use crate::pool::ResourcePool;
use crate::ranker::{angles_summary, rank};
use crate::target::{SoundTarget, TargetId};
use crossbeam_channel::Receiver;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Instant;

/// Owns every target and the playback pool and runs the per-sample pipeline.
///
/// `SonoWorld` is the single writer for all engine state. Each call to
/// [`SonoWorld::push_aim`] performs one complete tick:
///
/// 1. merge queued prepare completions into the pool
/// 2. recompute every target's angular distance and re-rank
/// 3. revoke then acquire playback channels
/// 4. set channel gains, evaluate focus, set the ambience gain
///
/// Timers (idle countdown, reveal schedule) are deadlines advanced by
/// [`SonoWorld::advance`] on the same thread, so there is nothing to cancel
/// asynchronously.
///
/// # Architecture
///
/// - **Driver thread**: owns the `SonoWorld`, feeds aim samples and clock ticks
/// - **Playback collaborator**: drains [`PlaybackCommand`]s and answers prepare tickets
/// - **Host**: drains [`SonoEvent`]s for reveal text, haptics and pause state
pub struct SonoWorld {
    config: SonoConfig,
    targets: Vec<SoundTarget>,
    ranking: Vec<TargetId>,
    pool: ResourcePool,
    allocator: Allocator,
    gain: GainModel,
    focus: FocusStateMachine,
    idle: IdleMonitor,
    bed: BackgroundBed,
    outbox: Outbox,
    paused: bool,
    samples_processed: u64,
}

impl SonoWorld {
    /// Builds a world over already-resolved targets.
    ///
    /// Specs whose direction cannot be normalised are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `SonoError::Configuration` if `config` fails validation.
    pub fn new(config: SonoConfig, specs: Vec<TargetSpec>) -> Result<Self> {
        config.validate()?;

        let mut targets = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = TargetId(targets.len());
            match SoundTarget::new(id, spec.sound_id, spec.direction, spec.locator, spec.metadata) {
                Ok(target) => targets.push(target),
                Err(e) => log::warn!("Skipping sound {}: {}", spec.sound_id, e),
            }
        }

        let ranking = rank(&targets);
        let outbox = Outbox::new();
        let bed = BackgroundBed::new(&config);
        outbox.command(PlaybackCommand::SetBedMode(bed.mode()));
        outbox.command(PlaybackCommand::SetBedGain { gain: bed.gain() });

        log::info!(
            "World created with {} targets and {} playback channels",
            targets.len(),
            config.max_concurrent_resources
        );

        Ok(Self {
            pool: ResourcePool::new(config.max_concurrent_resources),
            allocator: Allocator::new(&config),
            gain: GainModel::new(&config),
            focus: FocusStateMachine::new(&config),
            idle: IdleMonitor::new(config.idle_sensor_epsilon, config.idle_timeout),
            bed,
            outbox,
            targets,
            ranking,
            config,
            paused: false,
            samples_processed: 0,
        })
    }

    /// Fetches configuration and catalogue from `source` and builds the world.
    ///
    /// Local-only settings (bed floor, pre-focus delay, reveal seed) are taken
    /// from `base`. No retry is attempted.
    ///
    /// # Errors
    ///
    /// - `SonoError::NetworkFailure` if either fetch fails or no configuration is served
    /// - `SonoError::Configuration` if the served configuration is invalid
    /// - `SonoError::EmptyCatalogue` if no playable target remains after selection
    pub fn bootstrap<S: CatalogueSource + ?Sized>(source: &S, base: SonoConfig) -> Result<Self> {
        let response = source.fetch_configuration().map_err(network_failure)?;
        let wire = response.configuration.ok_or_else(|| {
            SonoError::NetworkFailure("server returned no configuration".to_string())
        })?;
        let config = wire.into_config(base)?;

        let entries = source.fetch_sounds().map_err(network_failure)?;
        let mut rng = match config.reveal_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let specs = select_targets(&entries, config.selection_mode, &mut rng);

        let world = Self::new(config, specs)?;
        if world.targets.is_empty() {
            return Err(SonoError::EmptyCatalogue);
        }
        Ok(world)
    }

    /// Runs one tick for a new aim direction.
    ///
    /// Ignored while paused. The direction need not be unit length. An idle
    /// countdown that expired before `now` pauses the world and the sample is
    /// dropped, so activity can never cancel a pause that was already due.
    ///
    /// # Errors
    ///
    /// Returns `SonoError::InvalidDirection` for a zero or non-finite vector;
    /// no state is changed in that case.
    pub fn push_aim(&mut self, direction: Vec3, now: Instant) -> Result<()> {
        if self.paused {
            return Ok(());
        }
        let aim = normalize_direction(direction)?;

        if self.idle.poll(now) {
            self.pause();
            return Ok(());
        }

        self.samples_processed += 1;
        self.idle.observe(aim, now);
        self.tick(aim, now)
    }

    fn tick(&mut self, aim: Vec3, now: Instant) -> Result<()> {
        self.allocator
            .settle(&mut self.pool, &mut self.targets, &self.outbox);

        for target in &mut self.targets {
            target.update_distance(aim)?;
        }
        self.ranking = rank(&self.targets);

        let summary = self.allocator.reconcile(
            &self.ranking,
            &mut self.targets,
            &mut self.pool,
            &self.outbox,
        );
        log_summary(&summary);

        self.gain.apply(
            &self.targets,
            &mut self.pool,
            self.focus.solo_target(),
            &self.outbox,
        );

        let before = self.focus.state();
        self.focus
            .evaluate(&self.ranking, &self.targets, now, &self.outbox);
        let focused_now = self.focus.advance(now, &self.outbox);
        if focused_now || self.focus.state().target() != before.target() {
            self.apply_gains();
        }

        self.update_bed();
        Ok(())
    }

    /// Advances clock-driven work: prepare completions, the idle countdown and
    /// the reveal schedule.
    pub fn advance(&mut self, now: Instant) {
        if self.paused {
            return;
        }

        self.allocator
            .settle(&mut self.pool, &mut self.targets, &self.outbox);
        self.apply_gains();

        if self.idle.poll(now) {
            self.pause();
            return;
        }

        if self.focus.advance(now, &self.outbox) {
            self.apply_gains();
            self.update_bed();
        }
    }

    /// Enters the paused state: focus cleared, channels muted, idle ambience.
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        log::info!("Pausing after inactivity");
        self.paused = true;
        self.focus.clear(&self.outbox);
        self.gain.silence(&mut self.pool, &self.outbox);
        self.bed.switch_mode(BedMode::Idle, 1.0, &self.outbox);
        self.idle.reset();
        self.outbox.event(SonoEvent::Paused);
    }

    /// Leaves the paused state; gains are restored by the next aim sample.
    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        log::info!("Resuming");
        self.paused = false;
        self.bed.switch_mode(BedMode::Active, 0.0, &self.outbox);
        self.idle.reset();
        self.outbox.event(SonoEvent::Resumed);
    }

    /// Drains every event emitted since the last call.
    ///
    /// The event queue is unbounded and only emptied here (or through
    /// [`SonoWorld::event_receiver`]). Hosts must drain it regularly; a
    /// focus session alone queues one `RevealProgress` per character.
    pub fn poll_events(&mut self) -> Vec<SonoEvent> {
        self.outbox.event_receiver().try_iter().collect()
    }

    /// Receiving end of the playback command queue, for the playback collaborator.
    pub fn command_receiver(&self) -> Receiver<PlaybackCommand> {
        self.outbox.command_receiver().clone()
    }

    /// Receiving end of the event queue; [`SonoWorld::poll_events`] drains the same queue.
    /// Events accumulate until some receiver takes them.
    pub fn event_receiver(&self) -> Receiver<SonoEvent> {
        self.outbox.event_receiver().clone()
    }

    pub fn config(&self) -> &SonoConfig {
        &self.config
    }

    pub fn targets(&self) -> &[SoundTarget] {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> Option<&SoundTarget> {
        self.targets.get(id.index())
    }

    /// Target ids nearest first, as of the last tick.
    pub fn ranking(&self) -> &[TargetId] {
        &self.ranking
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn focus_state(&self) -> FocusState {
        self.focus.state()
    }

    /// Revealed metadata text of the current focus session, blanks for hidden characters.
    pub fn revealed_text(&self) -> Option<String> {
        self.focus.session().map(|s| s.revealed_text())
    }

    pub fn bed_gain(&self) -> f32 {
        self.bed.gain()
    }

    pub fn bed_mode(&self) -> BedMode {
        self.bed.mode()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    /// Space-separated whole-degree distances in rank order.
    pub fn angles_summary(&self) -> String {
        angles_summary(&self.targets, &self.ranking)
    }

    fn apply_gains(&mut self) {
        self.gain.apply(
            &self.targets,
            &mut self.pool,
            self.focus.solo_target(),
            &self.outbox,
        );
    }

    fn update_bed(&mut self) {
        let nearest = self
            .ranking
            .first()
            .map(|id| self.targets[id.index()].angular_distance_deg);
        self.bed
            .update(nearest, self.focus.is_active(), &self.outbox);
    }
}

fn network_failure(error: SonoError) -> SonoError {
    match error {
        SonoError::NetworkFailure(_) => error,
        other => SonoError::NetworkFailure(other.to_string()),
    }
}

fn log_summary(summary: &AllocationSummary) {
    if *summary != AllocationSummary::default() {
        log::debug!(
            "Allocation: {} released, {} deferred, {} acquired, {} starved",
            summary.released,
            summary.deferred,
            summary.acquired,
            summary.starved
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::JsonCatalogueSource;
    use crate::pool::{Preparable, ResourceState};
    use crate::target::SoundMetadata;
    use std::time::Duration;

    fn config() -> SonoConfig {
        SonoConfig::new()
            .primary_angle(5.0)
            .secondary_angle(30.0)
            .max_concurrent_resources(2)
            .reveal_seed(7)
    }

    fn specs() -> Vec<TargetSpec> {
        vec![
            TargetSpec::new(1, Vec3::X, "one.mp3", SoundMetadata::new("One", "", "")),
            TargetSpec::new(2, Vec3::Y, "two.mp3", SoundMetadata::new("Two", "", "")),
            TargetSpec::new(3, Vec3::ZERO, "bad.mp3", SoundMetadata::default()),
        ]
    }

    fn answer_prepares(world: &SonoWorld) {
        for command in world.command_receiver().try_iter() {
            if let PlaybackCommand::Prepare { ticket, .. } = command {
                ticket.on_ready();
            }
        }
    }

    #[test]
    fn test_new_skips_invalid_directions() {
        let world = SonoWorld::new(config(), specs()).unwrap();
        assert_eq!(world.targets().len(), 2);
        assert_eq!(world.bed_mode(), BedMode::Active);
        assert!(!world.is_paused());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let result = SonoWorld::new(config().max_concurrent_resources(0), specs());
        assert!(matches!(result, Err(SonoError::Configuration(_))));
    }

    #[test]
    fn test_push_aim_rejects_zero_vector() {
        let mut world = SonoWorld::new(config(), specs()).unwrap();
        let result = world.push_aim(Vec3::ZERO, Instant::now());
        assert!(matches!(result, Err(SonoError::InvalidDirection(_))));
        assert_eq!(world.samples_processed(), 0);
    }

    #[test]
    fn test_prepared_channel_plays_at_proximity_gain() {
        let mut world = SonoWorld::new(config(), specs()).unwrap();
        let now = Instant::now();

        world.push_aim(Vec3::new(1.0, 0.1, 0.0), now).unwrap();
        assert_eq!(world.pool().counts().preparing, 1);
        answer_prepares(&world);

        world.advance(now);
        let resource = world.targets()[0].resource().unwrap();
        let channel = world.pool().get(resource).unwrap();
        assert_eq!(channel.state(), ResourceState::Playing);
        let expected = GainModel::new(&config()).proximity_gain(world.targets()[0].angular_distance_deg());
        assert!((channel.gain() - expected).abs() < 1e-6);
        assert!(channel.gain() > 0.0625 && channel.gain() < 1.0);
    }

    #[test]
    fn test_angles_summary_in_rank_order() {
        let mut world = SonoWorld::new(config(), specs()).unwrap();
        world.push_aim(Vec3::Y, Instant::now()).unwrap();
        assert_eq!(world.angles_summary(), "0 90");
    }

    #[test]
    fn test_aim_samples_alone_pause_after_timeout() {
        let mut world = SonoWorld::new(config(), specs()).unwrap();
        let start = Instant::now();

        for second in 0..=40 {
            world
                .push_aim(Vec3::Z, start + Duration::from_secs(second))
                .unwrap();
        }

        assert!(world.is_paused());
        assert_eq!(world.samples_processed(), 30);
        assert!(world.poll_events().contains(&SonoEvent::Paused));
    }

    #[test]
    fn test_movement_after_deadline_does_not_cancel_pause() {
        let mut world = SonoWorld::new(config(), specs()).unwrap();
        let start = Instant::now();

        world.push_aim(Vec3::Z, start).unwrap();
        world.push_aim(Vec3::X, start + Duration::from_secs(31)).unwrap();

        assert!(world.is_paused());
        assert_eq!(world.samples_processed(), 1);
        assert_eq!(world.focus_state(), FocusState::Idle);
    }

    #[test]
    fn test_leaving_primary_while_nearest_restores_bed() {
        let mut world = SonoWorld::new(config(), specs()).unwrap();
        let start = Instant::now();

        world.push_aim(Vec3::X, start).unwrap();
        assert!(matches!(world.focus_state(), FocusState::Focusing { .. }));
        assert_eq!(world.bed_gain(), 0.0);

        let off = 6f32.to_radians();
        world
            .push_aim(Vec3::new(off.cos(), 0.0, off.sin()), start)
            .unwrap();

        assert_eq!(world.ranking()[0], world.targets()[0].id());
        assert_eq!(world.focus_state(), FocusState::Idle);
        assert!(world.revealed_text().is_none());

        let distance = world.targets()[0].angular_distance_deg();
        let expected = BackgroundBed::new(&config()).volume(Some(distance), false);
        assert!((world.bed_gain() - expected).abs() < 1e-6);
        assert!(world.bed_gain() > 0.2 && world.bed_gain() < 1.0);
    }

    #[test]
    fn test_poll_events_drains_queue() {
        let mut world = SonoWorld::new(config(), specs()).unwrap();
        world.push_aim(Vec3::X, Instant::now()).unwrap();

        assert!(!world.poll_events().is_empty());
        assert!(world.poll_events().is_empty());
        assert!(world.event_receiver().is_empty());
    }

    #[test]
    fn test_pause_and_resume() {
        let mut world = SonoWorld::new(config(), specs()).unwrap();
        let start = Instant::now();

        world.push_aim(Vec3::X, start).unwrap();
        assert!(world.focus_state().target().is_some());
        world.advance(start + Duration::from_secs(31));

        assert!(world.is_paused());
        assert_eq!(world.focus_state(), FocusState::Idle);
        assert_eq!(world.bed_mode(), BedMode::Idle);
        assert_eq!(world.bed_gain(), 1.0);

        world.push_aim(Vec3::Y, start + Duration::from_secs(32)).unwrap();
        assert_eq!(world.samples_processed(), 1);

        world.resume();
        assert_eq!(world.bed_mode(), BedMode::Active);
        assert_eq!(world.bed_gain(), 0.0);

        let events = world.poll_events();
        assert!(events.contains(&SonoEvent::Paused));
        assert_eq!(events.last(), Some(&SonoEvent::Resumed));
    }

    #[test]
    fn test_bootstrap_null_configuration_is_network_failure() {
        let source = JsonCatalogueSource::from_strings(r#"{"configuration": null}"#, r#"{"sounds": []}"#);
        let result = SonoWorld::bootstrap(&source, SonoConfig::default());
        assert!(matches!(result, Err(SonoError::NetworkFailure(_))));
    }

    #[test]
    fn test_bootstrap_malformed_sounds_is_network_failure() {
        let source = JsonCatalogueSource::from_strings(CONFIGURATION, "not json");
        let result = SonoWorld::bootstrap(&source, SonoConfig::default());
        assert!(matches!(result, Err(SonoError::NetworkFailure(_))));
    }

    #[test]
    fn test_bootstrap_empty_catalogue() {
        let source = JsonCatalogueSource::from_strings(CONFIGURATION, r#"{"sounds": []}"#);
        let result = SonoWorld::bootstrap(&source, SonoConfig::default());
        assert!(matches!(result, Err(SonoError::EmptyCatalogue)));
    }

    #[test]
    fn test_bootstrap_builds_selected_targets() {
        let sounds = r#"{"sounds": [
            {"id": 1, "directionX": 1.0, "directionY": 0.0, "directionZ": 0.0,
             "location": "a.mp3", "selected": true},
            {"id": 2, "directionX": 0.0, "directionY": 1.0, "directionZ": 0.0,
             "location": "b.mp3", "selected": false}
        ]}"#;
        let source = JsonCatalogueSource::from_strings(CONFIGURATION, sounds);
        let world = SonoWorld::bootstrap(&source, SonoConfig::default()).unwrap();
        assert_eq!(world.targets().len(), 1);
        assert_eq!(world.config().max_concurrent_resources, 3);
    }

    const CONFIGURATION: &str = r#"{"configuration": {
        "primaryAngle": 5.0, "secondaryAngle": 30.0, "timeToFocus": 4.0,
        "maxMediaPlayers": 3, "maxIdleSensorDifference": 0.01, "maxIdleSeconds": 30.0
    }}"#;
}
