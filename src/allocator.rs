//! Reconciles ranked targets against the playback pool.
//!
//! Each tick runs two phases in a fixed order. Revocation first takes channels
//! away from targets that fell out of the top-N or beyond the secondary angle,
//! so that anything freed is available to the acquisition phase of the same
//! tick. A channel still preparing is never torn down: it is flagged and
//! released the moment its prepare completes.

use crate::config::SonoConfig;
use crate::error::SonoError;
use crate::events::SonoEvent;
use crate::playback::{Outbox, PlaybackCommand};
use crate::pool::{PrepareOutcome, ResourceId, ResourcePool, ResourceState};
use crate::target::{SoundTarget, TargetId};
use std::collections::HashSet;

/// What a single reconcile pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationSummary {
    pub released: usize,
    pub deferred: usize,
    pub acquired: usize,
    pub starved: usize,
}

pub struct Allocator {
    capacity: usize,
    secondary_angle_deg: f32,
    starved: HashSet<TargetId>,
}

impl Allocator {
    pub fn new(config: &SonoConfig) -> Self {
        Self {
            capacity: config.max_concurrent_resources,
            secondary_angle_deg: config.secondary_angle_deg,
            starved: HashSet::new(),
        }
    }

    /// A target may hold a channel only while ranked inside capacity and in range.
    pub fn is_admitted(&self, rank: usize, angular_distance_deg: f32) -> bool {
        rank < self.capacity && angular_distance_deg <= self.secondary_angle_deg
    }

    /// Merges queued prepare results into pool and target state.
    pub(crate) fn settle(
        &mut self,
        pool: &mut ResourcePool,
        targets: &mut [SoundTarget],
        outbox: &Outbox,
    ) {
        for completion in pool.drain_completions() {
            let id = completion.resource;
            let Some(resource) = pool.get(id) else {
                continue;
            };
            let owner = resource.owner();
            let release_pending = resource.release_pending();

            match completion.outcome {
                PrepareOutcome::Ready if release_pending => {
                    log::debug!("Prepare of {} completed, applying deferred release", id);
                    if let Err(e) = pool.mark_ready(id).and_then(|_| pool.release(id)) {
                        log::error!("Deferred release of {} failed: {}", id, e);
                        continue;
                    }
                    disown(targets, owner, id);
                    outbox.command(PlaybackCommand::Stop { resource: id });
                }
                PrepareOutcome::Ready => {
                    if let Err(e) = pool.mark_ready(id) {
                        log::error!("Could not mark {} ready: {}", id, e);
                        continue;
                    }
                    outbox.command(PlaybackCommand::Play {
                        resource: id,
                        gain: 0.0,
                    });
                    if let Err(e) = pool.mark_playing(id) {
                        log::error!("Could not mark {} playing: {}", id, e);
                        continue;
                    }
                    pool.set_gain(id, 0.0);
                    log::debug!("{} playing for {:?}", id, owner);
                }
                PrepareOutcome::Failed(reason) => {
                    log::warn!(
                        "{} (owner {:?})",
                        SonoError::PrepareFailed {
                            resource: id,
                            reason: reason.clone()
                        },
                        owner
                    );
                    if let Err(e) = pool.abandon(id) {
                        log::error!("Could not return {} to the pool: {}", id, e);
                        continue;
                    }
                    disown(targets, owner, id);
                    if let Some(target) = owner {
                        outbox.event(SonoEvent::PrepareFailed {
                            target,
                            resource: id,
                            reason,
                        });
                    }
                }
            }
        }
    }

    /// Runs revocation then acquisition over `ranking`.
    pub(crate) fn reconcile(
        &mut self,
        ranking: &[TargetId],
        targets: &mut [SoundTarget],
        pool: &mut ResourcePool,
        outbox: &Outbox,
    ) -> AllocationSummary {
        let mut summary = AllocationSummary::default();

        for (rank, id) in ranking.iter().enumerate() {
            let target = &mut targets[id.index()];
            if self.is_admitted(rank, target.angular_distance_deg) {
                continue;
            }
            self.starved.remove(id);

            let Some(resource_id) = target.resource else {
                continue;
            };
            let Some(resource) = pool.get(resource_id) else {
                continue;
            };

            match resource.state() {
                ResourceState::Ready | ResourceState::Playing => {
                    if let Err(e) = pool.release(resource_id) {
                        log::error!("Release of {} failed: {}", resource_id, e);
                        continue;
                    }
                    target.resource = None;
                    outbox.command(PlaybackCommand::Stop {
                        resource: resource_id,
                    });
                    summary.released += 1;
                    log::debug!(
                        "Revoked {} from {} (rank {}, {:.1} deg)",
                        resource_id,
                        id,
                        rank,
                        target.angular_distance_deg
                    );
                }
                ResourceState::Preparing if !resource.release_pending() => {
                    if let Err(e) = pool.defer_release(resource_id) {
                        log::error!("Deferral of {} failed: {}", resource_id, e);
                        continue;
                    }
                    summary.deferred += 1;
                    log::debug!("{} still preparing, release deferred", resource_id);
                }
                _ => {}
            }
        }

        for (rank, id) in ranking.iter().enumerate() {
            let target = &mut targets[id.index()];
            // Ranking is ascending, so nothing after this point is admitted.
            if !self.is_admitted(rank, target.angular_distance_deg) {
                break;
            }

            if let Some(resource_id) = target.resource {
                if pool.get(resource_id).is_some_and(|r| r.release_pending()) {
                    log::debug!("{} back in range, keeping {}", id, resource_id);
                    pool.reclaim(resource_id);
                }
                self.starved.remove(id);
                continue;
            }

            match pool.try_acquire(*id) {
                Ok((resource_id, ticket)) => {
                    target.resource = Some(resource_id);
                    self.starved.remove(id);
                    outbox.command(PlaybackCommand::Prepare {
                        resource: resource_id,
                        locator: target.locator().to_string(),
                        ticket,
                    });
                    summary.acquired += 1;
                    log::debug!("Assigned {} to {} (rank {})", resource_id, id, rank);
                }
                Err(e) => {
                    summary.starved += 1;
                    if self.starved.insert(*id) {
                        log::debug!("{} for {} (rank {})", e, id, rank);
                        outbox.event(SonoEvent::ResourceUnavailable { target: *id });
                    }
                }
            }
        }

        summary
    }
}

fn disown(targets: &mut [SoundTarget], owner: Option<TargetId>, resource: ResourceId) {
    if let Some(target) = owner.and_then(|id| targets.get_mut(id.index())) {
        if target.resource == Some(resource) {
            target.resource = None;
        }
    }
}
