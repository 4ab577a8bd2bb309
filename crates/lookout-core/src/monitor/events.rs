//! Transition events and the bounded log that keeps the latest of them

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::Serialize;
use strum::{Display, IntoStaticStr};

use crate::monitor::EffectKey;

pub const EVENT_LOG_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, IntoStaticStr)]
pub enum TransitionKind {
    #[strum(serialize = "+")]
    Enter,
    #[strum(serialize = "-")]
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionEvent {
    pub timestamp: DateTime<Local>,
    pub kind: TransitionKind,
    pub key: EffectKey,
    pub name: String,
    pub reacted: bool,
}

/// Ring buffer of recent transitions; oldest dropped first
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<TransitionEvent>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: TransitionEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Oldest first
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TransitionEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&TransitionEvent> {
        self.events.back()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
