use crate::error::{Result, SonoError};
use crate::events::SonoEvent;
use crate::idle::AimSample;
use crate::math::Vec3;
use crate::playback::PlaybackCommand;
use crate::world::SonoWorld;
use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Period of the clock that advances idle and reveal deadlines.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Pause,
    Resume,
    Shutdown,
}

/// Drives a [`SonoWorld`] on a dedicated thread.
///
/// Aim samples, control requests and clock ticks are multiplexed onto the one
/// thread that owns the world, so ticks never interleave.
pub struct SonoEngine {
    tick_interval: Duration,
    world: Option<SonoWorld>,
    handle: Option<JoinHandle<Option<SonoWorld>>>,
    aim_sender: Sender<AimSample>,
    aim_receiver: Receiver<AimSample>,
    control_sender: Sender<Control>,
    control_receiver: Receiver<Control>,
    command_receiver: Receiver<PlaybackCommand>,
    event_receiver: Receiver<SonoEvent>,
    is_running: Arc<AtomicBool>,
    ticks_processed: Arc<AtomicUsize>,
    next_sequence: u64,
}

impl SonoEngine {
    pub fn new(world: SonoWorld) -> Self {
        Self::with_tick_interval(world, DEFAULT_TICK_INTERVAL)
    }

    pub fn with_tick_interval(world: SonoWorld, tick_interval: Duration) -> Self {
        let (aim_sender, aim_receiver) = unbounded();
        let (control_sender, control_receiver) = unbounded();
        Self {
            tick_interval,
            command_receiver: world.command_receiver(),
            event_receiver: world.event_receiver(),
            world: Some(world),
            handle: None,
            aim_sender,
            aim_receiver,
            control_sender,
            control_receiver,
            is_running: Arc::new(AtomicBool::new(false)),
            ticks_processed: Arc::new(AtomicUsize::new(0)),
            next_sequence: 0,
        }
    }

    /// Start the driver thread
    ///
    /// The world stays with the engine until the thread has been spawned, so a
    /// failed start can be retried.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        if self.world.is_none() {
            return Err(SonoError::Engine("World is not available".into()));
        }

        let (handoff_sender, handoff_receiver) = bounded::<SonoWorld>(1);
        let aim_receiver = self.aim_receiver.clone();
        let control_receiver = self.control_receiver.clone();
        let ticks_processed = self.ticks_processed.clone();
        let tick_interval = self.tick_interval;

        let handle = std::thread::Builder::new()
            .name("sonosphere-driver".into())
            .spawn(move || {
                let mut world = handoff_receiver.recv().ok()?;
                run(
                    &mut world,
                    &aim_receiver,
                    &control_receiver,
                    &ticks_processed,
                    tick_interval,
                );
                Some(world)
            })?;

        if let Some(world) = self.world.take() {
            if let Err(e) = handoff_sender.send(world) {
                self.world = Some(e.into_inner());
                let _ = handle.join();
                return Err(SonoError::Engine("Driver thread exited before start".into()));
            }
        }

        self.handle = Some(handle);
        self.is_running.store(true, Ordering::Relaxed);
        log::info!("Driver thread started ({:?} tick)", tick_interval);
        Ok(())
    }

    /// Stop the driver thread, processing any aim samples already queued.
    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        self.is_running.store(false, Ordering::Relaxed);

        self.control_sender
            .send(Control::Shutdown)
            .map_err(|e| SonoError::Engine(format!("Failed to send shutdown: {}", e)))?;
        let world = handle
            .join()
            .map_err(|_| SonoError::Engine("Driver thread panicked".into()))?
            .ok_or_else(|| SonoError::Engine("Driver thread never received the world".into()))?;
        self.world = Some(world);
        log::info!("Driver thread stopped");
        Ok(())
    }

    /// Stops the engine and hands the world back.
    pub fn into_world(mut self) -> Result<SonoWorld> {
        self.stop()?;
        self.world
            .take()
            .ok_or_else(|| SonoError::Engine("World is not available".into()))
    }

    /// Queue an aim direction for the next tick
    pub fn submit_aim(&mut self, direction: Vec3) -> Result<()> {
        let sample = AimSample::new(direction, self.next_sequence);
        self.next_sequence += 1;
        self.aim_sender
            .send(sample)
            .map_err(|e| SonoError::Engine(format!("Failed to send aim sample: {}", e)))
    }

    /// Sender for sensor threads that number their own samples.
    pub fn aim_sender(&self) -> Sender<AimSample> {
        self.aim_sender.clone()
    }

    pub fn pause(&self) -> Result<()> {
        self.control(Control::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.control(Control::Resume)
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Number of aim samples processed since creation
    pub fn ticks_processed(&self) -> usize {
        self.ticks_processed.load(Ordering::Relaxed)
    }

    pub fn poll_events(&self) -> Vec<SonoEvent> {
        self.event_receiver.try_iter().collect()
    }

    pub fn command_receiver(&self) -> Receiver<PlaybackCommand> {
        self.command_receiver.clone()
    }

    fn control(&self, control: Control) -> Result<()> {
        self.control_sender
            .send(control)
            .map_err(|e| SonoError::Engine(format!("Failed to send {:?}: {}", control, e)))
    }
}

impl Drop for SonoEngine {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::error!("Failed to stop engine: {}", e);
        }
    }
}

fn run(
    world: &mut SonoWorld,
    aims: &Receiver<AimSample>,
    controls: &Receiver<Control>,
    ticks_processed: &AtomicUsize,
    tick_interval: Duration,
) {
    let ticker = crossbeam_channel::tick(tick_interval);
    let mut last_sequence: Option<u64> = None;

    let mut process = |world: &mut SonoWorld, sample: AimSample| {
        if last_sequence.is_some_and(|last| sample.sequence <= last) {
            log::debug!("Dropping out-of-order aim sample {}", sample.sequence);
            return;
        }
        last_sequence = Some(sample.sequence);
        match world.push_aim(sample.direction, Instant::now()) {
            Ok(()) => {
                ticks_processed.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => log::warn!("Rejected aim sample {}: {}", sample.sequence, e),
        }
    };

    loop {
        select! {
            recv(aims) -> msg => match msg {
                Ok(sample) => process(world, sample),
                Err(_) => break,
            },
            recv(controls) -> msg => match msg {
                Ok(Control::Pause) => world.pause(),
                Ok(Control::Resume) => world.resume(),
                Ok(Control::Shutdown) | Err(_) => {
                    for sample in aims.try_iter() {
                        process(world, sample);
                    }
                    break;
                }
            },
            recv(ticker) -> _ => world.advance(Instant::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::TargetSpec;
    use crate::config::SonoConfig;
    use crate::target::SoundMetadata;

    fn world() -> SonoWorld {
        let specs = vec![
            TargetSpec::new(1, Vec3::X, "one.mp3", SoundMetadata::new("One", "", "")),
            TargetSpec::new(2, Vec3::Z, "two.mp3", SoundMetadata::new("Two", "", "")),
        ];
        SonoWorld::new(SonoConfig::new().reveal_seed(1), specs).unwrap()
    }

    #[test]
    fn test_start_stop() {
        let mut engine = SonoEngine::new(world());
        assert!(!engine.is_running());
        engine.start().unwrap();
        assert!(engine.is_running());
        engine.start().unwrap();
        engine.stop().unwrap();
        assert!(!engine.is_running());
        engine.stop().unwrap();
    }

    #[test]
    fn test_restart_after_stop_keeps_world() {
        let mut engine = SonoEngine::new(world());
        engine.start().unwrap();
        engine.submit_aim(Vec3::X).unwrap();
        engine.stop().unwrap();

        engine.start().unwrap();
        assert!(engine.is_running());
        engine.submit_aim(Vec3::Z).unwrap();

        let world = engine.into_world().unwrap();
        assert_eq!(world.samples_processed(), 2);
        assert_eq!(world.ranking()[0].index(), 1);
    }

    #[test]
    fn test_queued_samples_processed_before_shutdown() {
        let mut engine = SonoEngine::new(world());
        engine.start().unwrap();
        for _ in 0..10 {
            engine.submit_aim(Vec3::X).unwrap();
        }
        engine.submit_aim(Vec3::ZERO).unwrap();

        let world = engine.into_world().unwrap();
        assert_eq!(world.samples_processed(), 10);
        assert_eq!(world.ranking()[0].index(), 0);
    }

    #[test]
    fn test_out_of_order_samples_dropped() {
        let mut engine = SonoEngine::new(world());
        let sender = engine.aim_sender();
        sender.send(AimSample::new(Vec3::X, 5)).unwrap();
        sender.send(AimSample::new(Vec3::Z, 3)).unwrap();
        engine.start().unwrap();

        let world = engine.into_world().unwrap();
        assert_eq!(world.samples_processed(), 1);
        assert_eq!(world.ranking()[0].index(), 0);
    }

    #[test]
    fn test_events_visible_from_engine() {
        let mut engine = SonoEngine::new(world());
        engine.start().unwrap();
        engine.submit_aim(Vec3::X).unwrap();
        engine.stop().unwrap();
        assert_eq!(engine.ticks_processed(), 1);

        let events = engine.poll_events();
        assert!(events.iter().any(|e| matches!(e, SonoEvent::FocusStarted { .. })));
    }
}
