//! Dwell-driven focus and progressive metadata reveal.
//!
//! ```text
//!   Idle --(nearest within primary)--> Focusing --(all characters shown)--> Focused
//!    ^                                    |                                    |
//!    +---(left primary / nearest changed)-+-------------(left primary)---------+
//! ```
//!
//! While focusing, one character of the target's metadata is revealed every
//! `time_to_focus / len` after an initial `pre_focus_delay`. Characters are
//! drawn from a shuffled permutation so each index appears exactly once.

use crate::config::SonoConfig;
use crate::events::SonoEvent;
use crate::playback::Outbox;
use crate::target::{SoundTarget, TargetId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Character used in place of a not-yet-revealed character.
pub const HIDDEN_CHAR: char = ' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    Idle,
    Focusing { target: TargetId, remaining: usize },
    Focused { target: TargetId },
}

impl FocusState {
    pub fn target(&self) -> Option<TargetId> {
        match self {
            Self::Idle => None,
            Self::Focusing { target, .. } | Self::Focused { target } => Some(*target),
        }
    }
}

/// Reveal progress for the current target. Exists only while focusing or focused.
#[derive(Debug, Clone)]
pub struct FocusSession {
    id: Uuid,
    target: TargetId,
    started_at: Instant,
    text: Vec<char>,
    revealed: Vec<bool>,
    /// Indices still to reveal; drawn from the back
    pending: Vec<usize>,
    step: Duration,
    next_reveal_at: Option<Instant>,
    focused: bool,
}

impl FocusSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn target(&self) -> TargetId {
        self.target
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn total(&self) -> usize {
        self.text.len()
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Full text with unrevealed characters blanked.
    pub fn revealed_text(&self) -> String {
        self.text
            .iter()
            .zip(&self.revealed)
            .map(|(c, shown)| if *shown { *c } else { HIDDEN_CHAR })
            .collect()
    }

    fn reveal_next(&mut self) -> Option<usize> {
        let index = self.pending.pop()?;
        self.revealed[index] = true;
        Some(index)
    }
}

pub struct FocusStateMachine {
    primary_angle_deg: f32,
    time_to_focus: Duration,
    pre_focus_delay: Duration,
    rng: StdRng,
    session: Option<FocusSession>,
}

impl FocusStateMachine {
    pub fn new(config: &SonoConfig) -> Self {
        let rng = match config.reveal_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            primary_angle_deg: config.primary_angle_deg,
            time_to_focus: config.time_to_focus,
            pre_focus_delay: config.pre_focus_delay,
            rng,
            session: None,
        }
    }

    pub fn state(&self) -> FocusState {
        match &self.session {
            None => FocusState::Idle,
            Some(s) if s.focused => FocusState::Focused { target: s.target },
            Some(s) => FocusState::Focusing {
                target: s.target,
                remaining: s.remaining(),
            },
        }
    }

    pub fn session(&self) -> Option<&FocusSession> {
        self.session.as_ref()
    }

    /// True while focusing or focused.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Target to solo for as long as a session exists, focusing or focused.
    pub fn solo_target(&self) -> Option<TargetId> {
        self.session.as_ref().map(|s| s.target)
    }

    /// When the next character is due, if a reveal is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.session.as_ref().and_then(|s| s.next_reveal_at)
    }

    /// Applies exit then entry transitions for the current ranking.
    pub(crate) fn evaluate(
        &mut self,
        ranking: &[TargetId],
        targets: &[SoundTarget],
        now: Instant,
        outbox: &Outbox,
    ) {
        let nearest = ranking.first().copied();

        if let Some(session) = &self.session {
            let distance = targets[session.target.index()].angular_distance_deg;
            let left_primary = distance > self.primary_angle_deg;
            let displaced = !session.focused && nearest != Some(session.target);
            if left_primary || displaced {
                log::debug!(
                    "Leaving focus on {} ({:.1} deg, displaced: {})",
                    session.target,
                    distance,
                    displaced
                );
                self.clear(outbox);
            }
        }

        if self.session.is_none() {
            if let Some(id) = nearest {
                let target = &targets[id.index()];
                if target.angular_distance_deg <= self.primary_angle_deg {
                    self.start(target, now, outbox);
                }
            }
        }
    }

    /// Reveals every character that has come due by `now`.
    ///
    /// Returns true if the session reached `Focused` during this call.
    pub(crate) fn advance(&mut self, now: Instant, outbox: &Outbox) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        let mut revealed_any = false;
        while let Some(due) = session.next_reveal_at {
            if due > now {
                break;
            }
            if session.reveal_next().is_some() {
                revealed_any = true;
            }
            session.next_reveal_at = if session.pending.is_empty() {
                None
            } else {
                Some(due + session.step)
            };
        }

        if revealed_any {
            outbox.event(SonoEvent::RevealProgress {
                target: session.target,
                session: session.id,
                text: session.revealed_text(),
                revealed: session.total() - session.remaining(),
                total: session.total(),
            });
        }

        if !session.focused && session.pending.is_empty() && session.next_reveal_at.is_none() {
            session.focused = true;
            log::info!("Focused on {}", session.target);
            outbox.event(SonoEvent::Focused {
                target: session.target,
                session: session.id,
            });
            outbox.event(SonoEvent::HapticPulse);
            return true;
        }
        false
    }

    /// Ends any session, cancelling the pending reveal schedule.
    pub(crate) fn clear(&mut self, outbox: &Outbox) {
        if let Some(session) = self.session.take() {
            log::info!("Focus on {} cleared", session.target);
            outbox.event(SonoEvent::FocusCleared {
                target: session.target,
                session: session.id,
            });
        }
    }

    fn start(&mut self, target: &SoundTarget, now: Instant, outbox: &Outbox) {
        let text: Vec<char> = target.metadata().reveal_text().chars().collect();
        let mut pending: Vec<usize> = (0..text.len()).collect();
        pending.shuffle(&mut self.rng);

        let step = if text.is_empty() {
            Duration::ZERO
        } else {
            self.time_to_focus / text.len() as u32
        };

        let session = FocusSession {
            id: Uuid::new_v4(),
            target: target.id(),
            started_at: now,
            revealed: vec![false; text.len()],
            text,
            pending,
            step,
            next_reveal_at: Some(now + self.pre_focus_delay),
            focused: false,
        };

        log::info!(
            "Focusing on {} ({} characters, {:?} per character)",
            session.target,
            session.total(),
            step
        );
        outbox.event(SonoEvent::FocusStarted {
            target: session.target,
            session: session.id,
        });
        self.session = Some(session);
    }
}
