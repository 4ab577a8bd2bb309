//! Threshold reactions on the observer's own vital (potions)

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::reaction::{ActionExecutor, KeyCombo, ResponseAction, spawn_action};

/// One threshold rule; earlier rules take priority
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalRule {
    pub name: String,
    #[serde(rename = "use")]
    pub response: String,
    /// Fires when current/max is at or below this fraction
    pub threshold: f32,
    pub cooldown_ms: u64,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl VitalRule {
    pub fn new(name: &str, response: &str, threshold: f32, cooldown: Duration) -> Self {
        Self {
            name: name.to_string(),
            response: response.to_string(),
            threshold,
            cooldown_ms: cooldown.as_millis() as u64,
            enabled: true,
        }
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

pub fn default_vital_rules() -> Vec<VitalRule> {
    vec![
        VitalRule::new("Nui's Nova", "F2", 0.20, Duration::from_secs(30)),
        VitalRule::new("Desert Fire", "F1", 0.60, Duration::from_millis(1500)),
    ]
}

struct ArmedRule {
    rule: VitalRule,
    combo: KeyCombo,
    last_used: Option<Instant>,
    uses: u64,
}

pub struct VitalReactor {
    rules: Vec<ArmedRule>,
    executor: Arc<dyn ActionExecutor>,
    enabled: bool,
}

impl VitalReactor {
    /// Rules whose combo does not parse are dropped with a warning
    pub fn new(rules: Vec<VitalRule>, executor: Arc<dyn ActionExecutor>) -> Self {
        let rules = rules
            .into_iter()
            .filter_map(|rule| match KeyCombo::parse(&rule.response) {
                Ok(combo) => Some(ArmedRule {
                    rule,
                    combo,
                    last_used: None,
                    uses: 0,
                }),
                Err(e) => {
                    warn!("Vital rule '{}' ignored: {}", rule.name, e);
                    None
                }
            })
            .collect();

        Self {
            rules,
            executor,
            enabled: true,
        }
    }

    pub fn check(&mut self, current: u32, max: u32) -> Option<String> {
        self.check_at(current, max, Instant::now())
    }

    /// Fire the first eligible rule, if any, and return its name
    pub fn check_at(&mut self, current: u32, max: u32, now: Instant) -> Option<String> {
        if !self.enabled || max == 0 {
            return None;
        }
        let fraction = current as f32 / max as f32;

        let armed = self.rules.iter_mut().find(|armed| {
            armed.rule.enabled
                && fraction <= armed.rule.threshold
                && armed
                    .last_used
                    .is_none_or(|last| now.saturating_duration_since(last) >= armed.rule.cooldown())
        })?;

        armed.last_used = Some(now);
        armed.uses += 1;
        info!(
            "[VITAL] {} at {:.0}% -> {}",
            armed.rule.name,
            fraction * 100.0,
            armed.combo
        );
        spawn_action(
            &self.executor,
            ResponseAction {
                name: armed.rule.name.clone(),
                combo: armed.combo.clone(),
                repeat: 1,
                interval: Duration::ZERO,
            },
        );
        Some(armed.rule.name.clone())
    }

    /// Times a rule has fired, by name
    pub fn uses(&self, name: &str) -> u64 {
        self.rules
            .iter()
            .find(|armed| armed.rule.name == name)
            .map_or(0, |armed| armed.uses)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
