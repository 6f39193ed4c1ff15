//! Event types for Sonosphere

use crate::pool::ResourceId;
use crate::target::TargetId;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum SonoEvent {
    FocusStarted {
        target: TargetId,
        session: Uuid,
    },
    RevealProgress {
        target: TargetId,
        session: Uuid,
        /// Full text with unrevealed characters replaced by spaces
        text: String,
        revealed: usize,
        total: usize,
    },
    Focused {
        target: TargetId,
        session: Uuid,
    },
    /// One-shot haptic cue, emitted on reaching `Focused`
    HapticPulse,
    FocusCleared {
        target: TargetId,
        session: Uuid,
    },
    Paused,
    Resumed,
    PrepareFailed {
        target: TargetId,
        resource: ResourceId,
        reason: String,
    },
    ResourceUnavailable {
        target: TargetId,
    },
}

impl SonoEvent {
    pub fn target(&self) -> Option<TargetId> {
        match self {
            Self::FocusStarted { target, .. }
            | Self::RevealProgress { target, .. }
            | Self::Focused { target, .. }
            | Self::FocusCleared { target, .. }
            | Self::PrepareFailed { target, .. }
            | Self::ResourceUnavailable { target } => Some(*target),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::PrepareFailed { .. } | Self::ResourceUnavailable { .. }
        )
    }

    pub fn is_focus_event(&self) -> bool {
        matches!(
            self,
            Self::FocusStarted { .. }
                | Self::RevealProgress { .. }
                | Self::Focused { .. }
                | Self::FocusCleared { .. }
        )
    }
}
