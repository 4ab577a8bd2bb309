//! Differential state monitor for status-effect collections
//!
//! Each tick the monitor reads a count-prefixed array of fixed-size records,
//! diffs the plausible ones against the previous tick by [`EffectKey`], and
//! reacts to newly entered effects. The two collections (buffs and debuffs)
//! are tracked by independent monitors that share no state.
//!
//! ```text
//!            count in 1..=max            count 0 / > max
//!   Idle ───────────────────────► Tracking ────────────────► Idle
//!                                    │  ▲                (bulk clear,
//!                                    └──┘ diff            no exits)
//! ```

mod decode;
mod events;

use std::collections::HashSet;

use chrono::Local;
use serde::Serialize;
use strum::{Display, IntoStaticStr};
use tracing::{debug, trace};

use crate::memory::ReadMemory;
use crate::reaction::ReactionDispatcher;

pub use decode::{CollectionLayout, EffectKey, EffectRecord, decode_effect};
pub use events::{EVENT_LOG_CAPACITY, EventLog, TransitionEvent, TransitionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
pub enum CollectionKind {
    #[strum(serialize = "BUFF")]
    Buffs,
    #[strum(serialize = "CC")]
    Debuffs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Display)]
pub enum MonitorState {
    #[default]
    Idle,
    Tracking,
}

/// What changed during one tick
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickReport {
    pub entered: Vec<EffectKey>,
    pub exited: Vec<EffectKey>,
    pub reacted: Vec<EffectKey>,
    /// The collection was cleared in bulk this tick
    pub invalidated: bool,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.entered.is_empty() && self.exited.is_empty() && !self.invalidated
    }
}

pub struct EffectMonitor {
    kind: CollectionKind,
    layout: CollectionLayout,
    enabled: bool,
    state: MonitorState,
    known: HashSet<EffectKey>,
    effects: Vec<EffectRecord>,
    raw_count: u32,
    collection_base: u64,
    events: EventLog,
    dispatcher: ReactionDispatcher,
}

impl EffectMonitor {
    pub fn new(
        kind: CollectionKind,
        layout: CollectionLayout,
        dispatcher: ReactionDispatcher,
    ) -> Self {
        Self {
            kind,
            layout,
            enabled: true,
            state: MonitorState::Idle,
            known: HashSet::new(),
            effects: Vec::new(),
            raw_count: 0,
            collection_base: 0,
            events: EventLog::default(),
            dispatcher,
        }
    }

    /// Sample the collection at `base` and react to new entries.
    ///
    /// A zero base or a failed bulk read leaves all state as it was; those
    /// are transient faults, not an empty collection.
    pub fn tick<R: ReadMemory + ?Sized>(&mut self, reader: &R, base: u64) -> TickReport {
        let mut report = TickReport::default();
        if !self.enabled || base == 0 {
            return report;
        }
        self.collection_base = base;

        let count = reader.read_u32(base + self.layout.count_offset);
        self.raw_count = count;
        if !self.layout.count_is_valid(count) {
            report.invalidated = self.invalidate();
            return report;
        }

        let len = self.layout.read_len(count);
        let Ok(bytes) = reader.read_bytes(base + self.layout.array_offset, len) else {
            trace!("[{}] bulk read of {} bytes failed", self.kind, len);
            return report;
        };

        let mut decoded = self.decode_all(&bytes, count as usize);
        self.state = MonitorState::Tracking;

        // An identity listed in several slots counts once, at its first slot.
        let mut current = HashSet::with_capacity(decoded.len());
        decoded.retain(|effect| current.insert(effect.key));

        for effect in &decoded {
            if self.known.contains(&effect.key) {
                continue;
            }

            let reaction = self.dispatcher.react(effect.key.rule_key());
            report.entered.push(effect.key);
            if reaction.triggered {
                report.reacted.push(effect.key);
            }
            debug!("[{}] + {} {}", self.kind, effect.key, effect.name);
            self.push_event(TransitionKind::Enter, effect.key, &effect.name, reaction.triggered);
        }

        let mut vanished: Vec<EffectKey> = self.known.difference(&current).copied().collect();
        vanished.sort();
        for key in vanished {
            let name = self.name_of(&key);
            debug!("[{}] - {} {}", self.kind, key, name);
            self.push_event(TransitionKind::Exit, key, &name, false);
            report.exited.push(key);
        }

        self.known = current;
        self.effects = decoded;
        report
    }

    fn decode_all(&self, bytes: &[u8], wanted: usize) -> Vec<EffectRecord> {
        let mut decoded = Vec::with_capacity(wanted.min(self.layout.max_records));
        for (slot, record) in bytes.chunks_exact(self.layout.record_size.max(1)).enumerate() {
            if decoded.len() >= wanted {
                break;
            }
            match decode_effect(record, slot, &self.layout) {
                Ok(Some(mut effect)) => {
                    effect.name = self.name_of(&effect.key);
                    decoded.push(effect);
                }
                Ok(None) => {}
                Err(e) => {
                    trace!("[{}] slot {}: {}", self.kind, slot, e);
                }
            }
        }
        decoded
    }

    /// Clear everything without emitting exits; returns whether anything
    /// was known.
    fn invalidate(&mut self) -> bool {
        self.state = MonitorState::Idle;
        self.effects.clear();
        if self.known.is_empty() {
            return false;
        }
        debug!(
            "[{}] collection invalidated (count {}), dropping {} known",
            self.kind,
            self.raw_count,
            self.known.len()
        );
        self.known.clear();
        true
    }

    fn name_of(&self, key: &EffectKey) -> String {
        self.dispatcher
            .rules()
            .name(key.rule_key())
            .unwrap_or_default()
            .to_string()
    }

    fn push_event(&mut self, kind: TransitionKind, key: EffectKey, name: &str, reacted: bool) {
        self.events.push(TransitionEvent {
            timestamp: Local::now(),
            kind,
            key,
            name: name.to_string(),
            reacted,
        });
    }

    /// Forget all tracked effects (e.g. on detach)
    pub fn reset(&mut self) {
        self.state = MonitorState::Idle;
        self.known.clear();
        self.effects.clear();
        self.raw_count = 0;
        self.collection_base = 0;
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn effects(&self) -> &[EffectRecord] {
        &self.effects
    }

    pub fn known(&self) -> &HashSet<EffectKey> {
        &self.known
    }

    pub fn raw_count(&self) -> u32 {
        self.raw_count
    }

    pub fn collection_base(&self) -> u64 {
        self.collection_base
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn dispatcher(&self) -> &ReactionDispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut ReactionDispatcher {
        &mut self.dispatcher
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
