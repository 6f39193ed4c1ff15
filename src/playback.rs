//! Commands issued to the playback collaborator.
//!
//! The engine never decodes or renders audio itself. It emits
//! [`PlaybackCommand`]s over a channel and the collaborator applies them to
//! real output channels, reporting prepare results back through the
//! [`PrepareTicket`] carried by `Prepare`.

use crate::events::SonoEvent;
use crate::pool::{PrepareTicket, ResourceId};
use crossbeam_channel::{Receiver, Sender};

/// Which ambience loop the background bed should be playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedMode {
    /// Shown while paused, at full gain
    Idle,
    /// Shown while the experience runs, gain driven by proximity
    Active,
}

#[derive(Debug)]
pub enum PlaybackCommand {
    /// Begin asynchronous preparation of `locator` on a channel
    Prepare {
        resource: ResourceId,
        locator: String,
        ticket: PrepareTicket,
    },
    /// Start looping a prepared channel
    Play { resource: ResourceId, gain: f32 },
    /// Change the gain of a playing channel
    SetGain { resource: ResourceId, gain: f32 },
    /// Stop and reset a channel
    Stop { resource: ResourceId },
    /// Switch the ambience loop
    SetBedMode(BedMode),
    /// Change the ambience gain
    SetBedGain { gain: f32 },
}

impl PlaybackCommand {
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            Self::Prepare { resource, .. }
            | Self::Play { resource, .. }
            | Self::SetGain { resource, .. }
            | Self::Stop { resource } => Some(*resource),
            Self::SetBedMode(_) | Self::SetBedGain { .. } => None,
        }
    }
}

/// Outbound side of the engine: playback commands and consumer events.
///
/// Both receivers are held alongside the senders, so sends never fail while
/// the owner is alive.
pub(crate) struct Outbox {
    command_sender: Sender<PlaybackCommand>,
    command_receiver: Receiver<PlaybackCommand>,
    event_sender: Sender<SonoEvent>,
    event_receiver: Receiver<SonoEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        let (command_sender, command_receiver) = crossbeam_channel::unbounded();
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();
        Self {
            command_sender,
            command_receiver,
            event_sender,
            event_receiver,
        }
    }

    pub fn command(&self, command: PlaybackCommand) {
        if let Err(e) = self.command_sender.send(command) {
            log::error!("Failed to queue playback command: {}", e);
        }
    }

    pub fn event(&self, event: SonoEvent) {
        if let Err(e) = self.event_sender.send(event) {
            log::error!("Failed to queue event: {}", e);
        }
    }

    pub fn command_receiver(&self) -> &Receiver<PlaybackCommand> {
        &self.command_receiver
    }

    pub fn event_receiver(&self) -> &Receiver<SonoEvent> {
        &self.event_receiver
    }
}
