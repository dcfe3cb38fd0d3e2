//! Moderation lifecycle events
//!
//! `Moderating` is raised before a record is built and may be vetoed;
//! `Moderated` follows every attempt that got past driver resolution.

use super::{Moderatable, Moderation};
use crate::drivers::ModerationDriver;
use std::sync::Arc;
use tracing::debug;

/// Listener decision on a `Moderating` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verdict {
    #[default]
    Continue,
    Stop,
}

pub struct Moderating<'a> {
    pub entity: &'a dyn Moderatable,
    pub driver: &'a dyn ModerationDriver,
}

pub struct Moderated<'a> {
    pub entity: &'a dyn Moderatable,
    pub driver: &'a dyn ModerationDriver,
    /// `None` when the driver stored nothing
    pub moderation: Option<&'a Moderation>,
}

pub trait ModerationListener: Send + Sync {
    fn moderating(&self, _event: &Moderating<'_>) -> Verdict {
        Verdict::Continue
    }

    fn moderated(&self, _event: &Moderated<'_>) {}
}

#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn ModerationListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&mut self, listener: Arc<dyn ModerationListener>) {
        self.listeners.push(listener);
    }

    /// `false` as soon as one listener vetoes
    pub fn moderating(&self, event: &Moderating<'_>) -> bool {
        let vetoed = self
            .listeners
            .iter()
            .any(|listener| listener.moderating(event) == Verdict::Stop);

        if vetoed {
            debug!("Moderation of {} vetoed", event.entity.entity_ref());
        }
        !vetoed
    }

    pub fn moderated(&self, event: &Moderated<'_>) {
        for listener in &self.listeners {
            listener.moderated(event);
        }
    }
}
