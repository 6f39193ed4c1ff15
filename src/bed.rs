//! Ambience bed gain.

use crate::config::SonoConfig;
use crate::playback::{BedMode, Outbox, PlaybackCommand};

pub struct BackgroundBed {
    secondary_angle_deg: f32,
    floor: f32,
    mode: BedMode,
    gain: f32,
}

impl BackgroundBed {
    pub fn new(config: &SonoConfig) -> Self {
        Self {
            secondary_angle_deg: config.secondary_angle_deg,
            floor: config.bed_floor,
            mode: BedMode::Active,
            gain: 1.0,
        }
    }

    /// Ambience level for the nearest target distance.
    ///
    /// Muted while a focus session exists, full when nothing is within the
    /// secondary angle, and tapered down to the floor as the aim closes in.
    pub fn volume(&self, nearest_distance_deg: Option<f32>, focus_active: bool) -> f32 {
        if focus_active {
            return 0.0;
        }
        match nearest_distance_deg {
            Some(d) if d < self.secondary_angle_deg => (self.floor
                + (1.0 - self.floor) * (d / self.secondary_angle_deg))
                .clamp(self.floor, 1.0),
            _ => 1.0,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn mode(&self) -> BedMode {
        self.mode
    }

    pub(crate) fn update(&mut self, nearest_distance_deg: Option<f32>, focus_active: bool, outbox: &Outbox) {
        let gain = self.volume(nearest_distance_deg, focus_active);
        self.set_gain(gain, outbox);
    }

    /// Switches the ambience loop and sets its starting gain.
    pub(crate) fn switch_mode(&mut self, mode: BedMode, gain: f32, outbox: &Outbox) {
        if self.mode != mode {
            log::debug!("Background bed {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            outbox.command(PlaybackCommand::SetBedMode(mode));
        }
        self.set_gain(gain, outbox);
    }

    fn set_gain(&mut self, gain: f32, outbox: &Outbox) {
        if (gain - self.gain).abs() > f32::EPSILON {
            self.gain = gain;
            outbox.command(PlaybackCommand::SetBedGain { gain });
        }
    }
}
