//! Per-channel gain from angular proximity and focus.

use crate::config::SonoConfig;
use crate::playback::{Outbox, PlaybackCommand};
use crate::pool::{ResourcePool, ResourceState};
use crate::target::{SoundTarget, TargetId};

/// Gains closer than this to the last commanded value are not re-sent.
const GAIN_EPSILON: f32 = 1e-4;

pub struct GainModel {
    secondary_angle_deg: f32,
}

impl GainModel {
    pub fn new(config: &SonoConfig) -> Self {
        Self {
            secondary_angle_deg: config.secondary_angle_deg,
        }
    }

    /// `2^(4(x-1))` with `x = 1 - distance / secondary`: 1.0 on axis, 0.0625 at
    /// the edge of audibility.
    pub fn proximity_gain(&self, angular_distance_deg: f32) -> f32 {
        let x = (1.0 - angular_distance_deg / self.secondary_angle_deg).clamp(0.0, 1.0);
        2f32.powf(4.0 * (x - 1.0)).clamp(0.0, 1.0)
    }

    /// Gain for `target`. While a target is soloed every other channel is muted.
    pub fn gain_for(&self, target: TargetId, angular_distance_deg: f32, solo: Option<TargetId>) -> f32 {
        match solo {
            Some(focused) if focused == target => 1.0,
            Some(_) => 0.0,
            None => self.proximity_gain(angular_distance_deg),
        }
    }

    /// Sends a gain for every playing channel whose value changed.
    pub(crate) fn apply(
        &self,
        targets: &[SoundTarget],
        pool: &mut ResourcePool,
        solo: Option<TargetId>,
        outbox: &Outbox,
    ) {
        for target in targets {
            let Some(resource_id) = target.resource else {
                continue;
            };
            let Some(resource) = pool.get(resource_id) else {
                continue;
            };
            if resource.state() != ResourceState::Playing {
                continue;
            }

            let gain = self.gain_for(target.id(), target.angular_distance_deg, solo);
            if (gain - resource.gain()).abs() > GAIN_EPSILON {
                pool.set_gain(resource_id, gain);
                outbox.command(PlaybackCommand::SetGain {
                    resource: resource_id,
                    gain,
                });
            }
        }
    }

    /// Mutes every playing channel, used when the experience pauses.
    pub(crate) fn silence(&self, pool: &mut ResourcePool, outbox: &Outbox) {
        let playing: Vec<_> = pool
            .resources()
            .filter(|r| r.state() == ResourceState::Playing && r.gain() > 0.0)
            .map(|r| r.id())
            .collect();
        for resource in playing {
            pool.set_gain(resource, 0.0);
            outbox.command(PlaybackCommand::SetGain {
                resource,
                gain: 0.0,
            });
        }
    }
}
