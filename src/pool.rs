//! Fixed-capacity pool of playback channels.
//!
//! Every channel cycles `Idle -> Preparing -> Ready -> Playing -> Idle` for the
//! lifetime of the pool. Preparation is asynchronous: the playback collaborator
//! receives a [`PrepareTicket`] and reports back through it. Reports are queued
//! and only merged into pool state by the tick owner, so a completion can never
//! race an allocation decision.

use crate::error::{Result, SonoError};
use crate::target::TargetId;
use crossbeam_channel::{Receiver, Sender};
use std::collections::VecDeque;

/// Handle to one playback channel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u32);

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// In the free set, owned by the pool
    Idle,
    /// Lent to a target, waiting on the collaborator
    Preparing,
    /// Prepared, not yet started
    Ready,
    /// Looping at some gain
    Playing,
}

#[derive(Debug, Clone)]
pub struct PlaybackResource {
    id: ResourceId,
    state: ResourceState,
    owner: Option<TargetId>,
    lease: u64,
    release_on_ready: bool,
    gain: f32,
}

impl PlaybackResource {
    fn new(id: ResourceId) -> Self {
        Self {
            id,
            state: ResourceState::Idle,
            owner: None,
            lease: 0,
            release_on_ready: false,
            gain: 0.0,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Target the channel is lent to; `None` while idle.
    pub fn owner(&self) -> Option<TargetId> {
        self.owner
    }

    /// Whether the channel will be returned as soon as its prepare completes.
    pub fn release_pending(&self) -> bool {
        self.release_on_ready
    }

    /// Last gain commanded to the collaborator.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

/// Result reported by the playback collaborator for one prepare request.
#[derive(Debug, Clone, PartialEq)]
pub enum PrepareOutcome {
    Ready,
    Failed(String),
}

#[derive(Debug)]
pub(crate) struct PrepareCompletion {
    pub resource: ResourceId,
    pub lease: u64,
    pub outcome: PrepareOutcome,
}

/// Capability handed to whoever performs the asynchronous prepare.
pub trait Preparable {
    fn on_ready(self);
    fn on_failed(self, reason: String);
}

/// One-shot completion handle for a prepare request.
///
/// Dropping the ticket without reporting counts as a failure so the channel
/// always returns to the pool.
#[derive(Debug)]
pub struct PrepareTicket {
    resource: ResourceId,
    lease: u64,
    sender: Option<Sender<PrepareCompletion>>,
}

impl PrepareTicket {
    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    fn report(&mut self, outcome: PrepareOutcome) {
        if let Some(sender) = self.sender.take() {
            let completion = PrepareCompletion {
                resource: self.resource,
                lease: self.lease,
                outcome,
            };
            if sender.send(completion).is_err() {
                log::debug!("Pool gone before prepare of {} completed", self.resource);
            }
        }
    }
}

impl Preparable for PrepareTicket {
    fn on_ready(mut self) {
        self.report(PrepareOutcome::Ready);
    }

    fn on_failed(mut self, reason: String) {
        self.report(PrepareOutcome::Failed(reason));
    }
}

impl Drop for PrepareTicket {
    fn drop(&mut self) {
        self.report(PrepareOutcome::Failed("prepare abandoned".into()));
    }
}

/// Number of channels in each state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolCounts {
    pub idle: usize,
    pub preparing: usize,
    pub ready: usize,
    pub playing: usize,
}

impl PoolCounts {
    pub fn total(&self) -> usize {
        self.idle + self.preparing + self.ready + self.playing
    }
}

pub struct ResourcePool {
    resources: Vec<PlaybackResource>,
    free: VecDeque<ResourceId>,
    completion_sender: Sender<PrepareCompletion>,
    completion_receiver: Receiver<PrepareCompletion>,
}

impl ResourcePool {
    pub fn new(capacity: usize) -> Self {
        let resources: Vec<_> = (0..capacity)
            .map(|i| PlaybackResource::new(ResourceId(i as u32)))
            .collect();
        let free = resources.iter().map(PlaybackResource::id).collect();
        let (completion_sender, completion_receiver) = crossbeam_channel::unbounded();

        Self {
            resources,
            free,
            completion_sender,
            completion_receiver,
        }
    }

    pub fn capacity(&self) -> usize {
        self.resources.len()
    }

    pub fn available(&self) -> usize {
        self.free.len()
    }

    pub fn get(&self, id: ResourceId) -> Option<&PlaybackResource> {
        self.resources.get(id.0 as usize)
    }

    pub fn resources(&self) -> impl Iterator<Item = &PlaybackResource> {
        self.resources.iter()
    }

    /// Lends an idle channel to `owner`, moving it to `Preparing`.
    ///
    /// Returns `None` when every channel is lent out; never blocks.
    pub fn acquire(&mut self, owner: TargetId) -> Option<(ResourceId, PrepareTicket)> {
        let id = self.free.pop_front()?;
        let resource = &mut self.resources[id.0 as usize];
        resource.state = ResourceState::Preparing;
        resource.owner = Some(owner);
        resource.lease += 1;
        resource.release_on_ready = false;
        resource.gain = 0.0;

        let ticket = PrepareTicket {
            resource: id,
            lease: resource.lease,
            sender: Some(self.completion_sender.clone()),
        };
        Some((id, ticket))
    }

    /// Like [`ResourcePool::acquire`], reporting exhaustion as an error.
    pub fn try_acquire(&mut self, owner: TargetId) -> Result<(ResourceId, PrepareTicket)> {
        self.acquire(owner).ok_or(SonoError::ResourceUnavailable)
    }

    /// Returns a `Ready` or `Playing` channel to the free set.
    ///
    /// Releasing a `Preparing` channel is refused; callers defer with
    /// [`ResourcePool::defer_release`] instead.
    pub fn release(&mut self, id: ResourceId) -> Result<()> {
        let resource = self.resource_mut(id)?;
        match resource.state {
            ResourceState::Ready | ResourceState::Playing => {
                Self::reset(resource);
                self.free.push_back(id);
                Ok(())
            }
            state => Err(SonoError::Engine(format!(
                "cannot release {} while {:?}",
                id, state
            ))),
        }
    }

    /// Flags a `Preparing` channel to be released the moment its prepare completes.
    pub(crate) fn defer_release(&mut self, id: ResourceId) -> Result<()> {
        let resource = self.resource_mut(id)?;
        if resource.state != ResourceState::Preparing {
            return Err(SonoError::Engine(format!(
                "deferred release of {} while {:?}",
                id, resource.state
            )));
        }
        resource.release_on_ready = true;
        Ok(())
    }

    /// Withdraws a pending deferred release; the owner wants the channel after all.
    pub(crate) fn reclaim(&mut self, id: ResourceId) {
        if let Some(resource) = self.resources.get_mut(id.0 as usize) {
            resource.release_on_ready = false;
        }
    }

    pub(crate) fn mark_ready(&mut self, id: ResourceId) -> Result<()> {
        self.transition(id, ResourceState::Preparing, ResourceState::Ready)
    }

    pub(crate) fn mark_playing(&mut self, id: ResourceId) -> Result<()> {
        self.transition(id, ResourceState::Ready, ResourceState::Playing)
    }

    /// Returns a channel whose prepare failed to the free set.
    pub(crate) fn abandon(&mut self, id: ResourceId) -> Result<()> {
        let resource = self.resource_mut(id)?;
        if resource.state != ResourceState::Preparing {
            return Err(SonoError::Engine(format!(
                "abandon of {} while {:?}",
                id, resource.state
            )));
        }
        Self::reset(resource);
        self.free.push_back(id);
        Ok(())
    }

    pub(crate) fn set_gain(&mut self, id: ResourceId, gain: f32) {
        if let Some(resource) = self.resources.get_mut(id.0 as usize) {
            resource.gain = gain;
        }
    }

    /// Takes every queued completion whose lease is still current.
    pub(crate) fn drain_completions(&self) -> Vec<PrepareCompletion> {
        self.completion_receiver
            .try_iter()
            .filter(|completion| match self.get(completion.resource) {
                Some(resource)
                    if resource.state == ResourceState::Preparing
                        && resource.lease == completion.lease =>
                {
                    true
                }
                _ => {
                    log::debug!(
                        "Ignoring stale completion for {} (lease {})",
                        completion.resource,
                        completion.lease
                    );
                    false
                }
            })
            .collect()
    }

    pub fn counts(&self) -> PoolCounts {
        let mut counts = PoolCounts::default();
        for resource in &self.resources {
            match resource.state {
                ResourceState::Idle => counts.idle += 1,
                ResourceState::Preparing => counts.preparing += 1,
                ResourceState::Ready => counts.ready += 1,
                ResourceState::Playing => counts.playing += 1,
            }
        }
        counts
    }

    fn resource_mut(&mut self, id: ResourceId) -> Result<&mut PlaybackResource> {
        self.resources
            .get_mut(id.0 as usize)
            .ok_or_else(|| SonoError::Engine(format!("unknown {}", id)))
    }

    fn transition(&mut self, id: ResourceId, from: ResourceState, to: ResourceState) -> Result<()> {
        let resource = self.resource_mut(id)?;
        if resource.state != from {
            return Err(SonoError::Engine(format!(
                "{} expected {:?}, found {:?}",
                id, from, resource.state
            )));
        }
        resource.state = to;
        Ok(())
    }

    fn reset(resource: &mut PlaybackResource) {
        resource.state = ResourceState::Idle;
        resource.owner = None;
        resource.release_on_ready = false;
        resource.gain = 0.0;
    }
}
