//! Whitelist rule tables backed by JSON files

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::reaction::KeyCombo;

/// One whitelisted effect. The serialized field names are a stable external
/// format shared with hand-edited files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistRule {
    #[serde(rename = "type")]
    pub identity: u32,
    pub name: String,
    #[serde(rename = "use")]
    pub response: String,
}

impl WhitelistRule {
    pub fn new(identity: u32, name: &str, response: &str) -> Self {
        Self {
            identity,
            name: name.to_string(),
            response: response.to_string(),
        }
    }
}

/// Rules indexed by identity.
///
/// Every rule names its identity; only rules whose response parses are
/// indexed for reactions.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<WhitelistRule>,
    names: HashMap<u32, usize>,
    actions: HashMap<u32, (usize, KeyCombo)>,
}

impl RuleTable {
    pub fn from_rules(rules: Vec<WhitelistRule>) -> Self {
        let mut names = HashMap::with_capacity(rules.len());
        let mut actions = HashMap::with_capacity(rules.len());

        for (i, rule) in rules.iter().enumerate() {
            names.insert(rule.identity, i);
            match KeyCombo::parse(&rule.response) {
                Ok(combo) => {
                    actions.insert(rule.identity, (i, combo));
                }
                Err(e) => warn!(
                    "Rule '{}' ({}) will not react: {}",
                    rule.name, rule.identity, e
                ),
            }
        }

        Self {
            rules,
            names,
            actions,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let rules: Vec<WhitelistRule> = serde_json::from_str(&content)?;
        Ok(Self::from_rules(rules))
    }

    /// Load `path`, creating it from `defaults` if it does not exist.
    ///
    /// A file that exists but does not parse is left untouched and the
    /// defaults are used for this run.
    pub fn load_or_create(path: impl AsRef<Path>, defaults: &[WhitelistRule]) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(table) => {
                info!("Loaded {} rules from {}", table.len(), path.display());
                table
            }
            Err(e) if e.is_not_found() => {
                let table = Self::from_rules(defaults.to_vec());
                match table.save(path) {
                    Ok(()) => info!(
                        "Created {} with {} default rules",
                        path.display(),
                        table.len()
                    ),
                    Err(e) => warn!("Failed to write {}: {}", path.display(), e),
                }
                table
            }
            Err(e) => {
                warn!("Failed to load {}: {}. Using defaults", path.display(), e);
                Self::from_rules(defaults.to_vec())
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.rules)?;
        fs::write(path.as_ref(), json)?;
        debug!("Saved {} rules to {}", self.rules.len(), path.as_ref().display());
        Ok(())
    }

    /// Rule and parsed combo for an identity, if it can react
    pub fn lookup(&self, identity: u32) -> Option<(&WhitelistRule, &KeyCombo)> {
        let (i, combo) = self.actions.get(&identity)?;
        Some((&self.rules[*i], combo))
    }

    pub fn name(&self, identity: u32) -> Option<&str> {
        self.names
            .get(&identity)
            .map(|&i| self.rules[i].name.as_str())
    }

    pub fn rules(&self) -> &[WhitelistRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of rules that can react
    pub fn reactive_len(&self) -> usize {
        self.actions.len()
    }
}

pub fn default_buff_rules() -> Vec<WhitelistRule> {
    vec![
        WhitelistRule::new(87, "Hell Spear", "F10"),
        WhitelistRule::new(243, "stun", "SHIFT+1"),
        WhitelistRule::new(156, "Fear", "CTRL+2"),
        WhitelistRule::new(21402, "Deafened", "ALT+F1"),
        WhitelistRule::new(8000210, "Clash Dummy", "SHIFT+5"),
        WhitelistRule::new(21, "Tripped (Strong)", "CTRL+SHIFT+1"),
        WhitelistRule::new(141, "Tripped", "9"),
        WhitelistRule::new(6860, "Impaled", "SHIFT+F10"),
        WhitelistRule::new(18396, "Skewer", "F10"),
        WhitelistRule::new(2458, "Snare (charge)", "F11"),
        WhitelistRule::new(6829, "Throw Dagger", "CTRL+F11"),
        WhitelistRule::new(501, "Shield Slam", "F10"),
        WhitelistRule::new(3601, "Overrun", "SHIFT+F12"),
    ]
}

pub fn default_cc_rules() -> Vec<WhitelistRule> {
    vec![
        WhitelistRule::new(3601, "stun", "F12"),
        WhitelistRule::new(509, "knockdown", "SHIFT+F12"),
        WhitelistRule::new(4622, "sleep", "CTRL+F11"),
        WhitelistRule::new(6800, "fear", "F12"),
        WhitelistRule::new(20121, "silence", "SHIFT+1"),
        WhitelistRule::new(22290, "root", "CTRL+2"),
    ]
}
