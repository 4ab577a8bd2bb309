//! Reaction dispatch
//!
//! A dispatcher maps an effect identity to a whitelisted key combo and hands
//! it to an [`ActionExecutor`] on a detached worker thread, so the hot path
//! never blocks on key injection. A single debounce timer per dispatcher
//! limits how often any reaction fires.

mod keys;
mod rules;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::memory::layout::{reaction, timing};

pub use keys::{
    KeyCombo, SIDED_MODIFIERS, VK_ALT, VK_CONTROL, VK_LALT, VK_LCONTROL, VK_LSHIFT, VK_RALT,
    VK_RCONTROL, VK_RSHIFT, VK_SHIFT, modifier_covers,
};
pub use rules::{RuleTable, WhitelistRule, default_buff_rules, default_cc_rules};

/// A key combo to press `repeat` times, `interval` apart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseAction {
    pub name: String,
    pub combo: KeyCombo,
    pub repeat: u32,
    pub interval: Duration,
}

/// Transport that turns a [`ResponseAction`] into input
pub trait ActionExecutor: Send + Sync {
    fn invoke(&self, action: &ResponseAction) -> Result<()>;
}

/// Logs actions instead of performing them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExecutor;

impl ActionExecutor for LogExecutor {
    fn invoke(&self, action: &ResponseAction) -> Result<()> {
        info!(
            "[dry-run] {} -> {} x{}",
            action.name, action.combo, action.repeat
        );
        Ok(())
    }
}

/// Dispatch timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionConfig {
    pub debounce_ms: u64,
    pub repeat: u32,
    pub interval_ms: u64,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: timing::DEBOUNCE_MS,
            repeat: reaction::REPEAT,
            interval_ms: reaction::INTERVAL_MS,
        }
    }
}

impl ReactionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Outcome of one [`ReactionDispatcher::react`] call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reaction {
    pub triggered: bool,
    pub name: String,
}

impl Reaction {
    fn skipped(name: Option<&str>) -> Self {
        Self {
            triggered: false,
            name: name.unwrap_or_default().to_string(),
        }
    }
}

/// Run an action on a detached thread, logging executor failures there
pub(crate) fn spawn_action(executor: &Arc<dyn ActionExecutor>, action: ResponseAction) {
    let executor = Arc::clone(executor);
    let spawned = thread::Builder::new()
        .name("reaction".to_string())
        .spawn(move || {
            if let Err(e) = executor.invoke(&action) {
                warn!("Action '{}' ({}) failed: {}", action.name, action.combo, e);
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn reaction worker: {}", e);
    }
}

pub struct ReactionDispatcher {
    label: String,
    rules: RuleTable,
    settings: ReactionConfig,
    executor: Arc<dyn ActionExecutor>,
    enabled: bool,
    last_dispatch: Option<Instant>,
    reactions: u64,
}

impl ReactionDispatcher {
    pub fn new(
        label: impl Into<String>,
        rules: RuleTable,
        settings: ReactionConfig,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        Self {
            label: label.into(),
            rules,
            settings,
            executor,
            enabled: true,
            last_dispatch: None,
            reactions: 0,
        }
    }

    pub fn react(&mut self, identity: u32) -> Reaction {
        self.react_at(identity, Instant::now())
    }

    /// React to `identity` as of `now`.
    ///
    /// The debounce timestamp is taken before the worker is spawned and is
    /// kept even if the executor later fails.
    pub fn react_at(&mut self, identity: u32, now: Instant) -> Reaction {
        if !self.enabled {
            return Reaction::skipped(self.rules.name(identity));
        }
        let Some((rule, combo)) = self.rules.lookup(identity) else {
            return Reaction::skipped(None);
        };
        if let Some(last) = self.last_dispatch
            && now.saturating_duration_since(last) < self.settings.debounce()
        {
            debug!("[{}] {} ({}) debounced", self.label, rule.name, identity);
            return Reaction::skipped(Some(&rule.name));
        }

        let action = ResponseAction {
            name: rule.name.clone(),
            combo: combo.clone(),
            repeat: self.settings.repeat,
            interval: self.settings.interval(),
        };
        self.last_dispatch = Some(now);
        self.reactions += 1;
        info!(
            "[{}] {} ({}) -> react {}",
            self.label, action.name, identity, action.combo
        );

        let name = action.name.clone();
        spawn_action(&self.executor, action);
        Reaction {
            triggered: true,
            name,
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: RuleTable) {
        self.rules = rules;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn reactions(&self) -> u64 {
        self.reactions
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}
