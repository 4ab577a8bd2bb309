//! Runtime configuration loaded from TOML.
//!
//! Every section falls back to built-in defaults, so a config file only
//! needs the values it overrides. Static offsets live under `[layout]` and
//! are expected to change between client builds.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::chain::{ChainRoot, PointerChain};
use crate::entity::{EntityLayout, VitalFields};
use crate::error::Result;
use crate::memory::AddressRange;
use crate::memory::layout::{effects, mana, observer, timing};
use crate::monitor::CollectionLayout;
use crate::reaction::ReactionConfig;
use crate::scan::ScanProfile;
use crate::vitals::{VitalRule, default_vital_rules};

/// Inclusive value range used by plausibility checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

impl<T: PartialOrd> Bounds<T> {
    pub fn contains(&self, value: T) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub name: String,
    /// Module whose base the static offsets are relative to
    pub module: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            name: "archeage.exe".to_string(),
            module: "x2game.dll".to_string(),
        }
    }
}

/// Static offsets of the observed client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameLayout {
    pub valid_range: AddressRange,
    pub observer_root: u64,
    pub observer_hops: Vec<u64>,
    /// From the observer root to the effect holder
    pub effect_hops: Vec<u64>,
    pub mana_root: u64,
    pub mana_hops: Vec<u64>,
    pub mana: VitalFields,
    pub entity: EntityLayout,
    pub buffs: CollectionLayout,
    pub debuffs: CollectionLayout,
}

impl Default for GameLayout {
    fn default() -> Self {
        Self {
            valid_range: AddressRange::default(),
            observer_root: observer::ROOT,
            observer_hops: vec![0x0, observer::ENTITY],
            effect_hops: vec![0x0, observer::ENTITY, 0x38, effects::HOLDER],
            mana_root: mana::ROOT,
            mana_hops: mana::HOPS.to_vec(),
            mana: VitalFields {
                current: mana::CURRENT,
                max: mana::MAX,
            },
            entity: EntityLayout::default(),
            buffs: CollectionLayout::buffs(),
            debuffs: CollectionLayout::debuffs(),
        }
    }
}

impl GameLayout {
    /// Observer entity; re-walked every tick
    pub fn observer_chain(&self) -> PointerChain {
        PointerChain::new("observer", ChainRoot::Module(self.observer_root))
            .hops(&self.observer_hops)
    }

    /// Effect holder shared by both collections, cached for `ttl`
    pub fn effects_chain(&self, name: &str, ttl: Duration) -> PointerChain {
        PointerChain::new(name, ChainRoot::Module(self.observer_root))
            .hops(&self.effect_hops)
            .ttl(ttl)
    }

    pub fn mana_chain(&self) -> PointerChain {
        PointerChain::new("mana", ChainRoot::Module(self.mana_root)).hops(&self.mana_hops)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub tick_ms: u64,
    pub buff_ttl_ms: u64,
    pub debuff_ttl_ms: u64,
    pub scan_interval_ms: u64,
    /// Vitals are checked every Nth tick
    pub vital_check_every: u64,
    pub attach_retry_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_ms: timing::TICK_INTERVAL_MS,
            buff_ttl_ms: timing::BUFF_ROOT_TTL_MS,
            debuff_ttl_ms: timing::DEBUFF_ROOT_TTL_MS,
            scan_interval_ms: timing::SCAN_INTERVAL_MS,
            vital_check_every: timing::VITAL_CHECK_EVERY,
            attach_retry_ms: timing::ATTACH_RETRY_MS,
        }
    }
}

impl TimingConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn buff_ttl(&self) -> Duration {
        Duration::from_millis(self.buff_ttl_ms)
    }

    pub fn debuff_ttl(&self) -> Duration {
        Duration::from_millis(self.debuff_ttl_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn attach_retry(&self) -> Duration {
        Duration::from_millis(self.attach_retry_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub buff_rules: PathBuf,
    pub cc_rules: PathBuf,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            buff_rules: PathBuf::from("buff_whitelist.json"),
            cc_rules: PathBuf::from("cc_whitelist.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VitalsConfig {
    pub enabled: bool,
    pub rules: Vec<VitalRule>,
}

impl Default for VitalsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rules: default_vital_rules(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub process: ProcessConfig,
    pub timing: TimingConfig,
    pub reaction: ReactionConfig,
    pub rules: RulesConfig,
    pub vitals: VitalsConfig,
    pub scan: ScanProfile,
    pub layout: GameLayout,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Config = toml::from_str(&content)?;
        debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Load `path`, or use defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(e) if e.is_not_found() => {
                debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("Failed to load {}: {}. Using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_bounds_inclusive() {
        let b = Bounds::new(1, 50_000);
        assert!(b.contains(1));
        assert!(b.contains(50_000));
        assert!(!b.contains(0));
        assert!(!b.contains(50_001));
    }

    #[test]
    fn test_default_chains() {
        let layout = GameLayout::default();
        let observer = layout.observer_chain();
        assert_eq!(observer.root, ChainRoot::Module(0xE9_DC54));
        assert_eq!(observer.hops, vec![0x0, 0x10]);
        assert_eq!(observer.ttl_ms, 0);

        let debuffs = layout.effects_chain("debuff_root", Duration::from_millis(50));
        assert_eq!(debuffs.hops, vec![0x0, 0x10, 0x38, 0x1898]);
        assert_eq!(debuffs.ttl_ms, 50);

        assert_eq!(layout.mana_chain().hops.len(), 7);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookout.toml");
        let content = concat!(
            "[timing]\ntick_ms = 8\n\n",
            "[reaction]\ndebounce_ms = 250\n\n",
            "[layout]\nobserver_root = 0x1000\n",
        );
        fs::write(&path, content).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.timing.tick_ms, 8);
        assert_eq!(config.timing.debuff_ttl_ms, 50);
        assert_eq!(config.reaction.debounce_ms, 250);
        assert_eq!(config.reaction.repeat, 5);
        assert_eq!(config.layout.observer_root, 0x1000);
        assert_eq!(config.layout.debuffs, CollectionLayout::debuffs());
        assert_eq!(config.process.name, "archeage.exe");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookout.toml");

        let mut config = Config::default();
        config.scan.max_radius = 500.0;
        config.vitals.rules.truncate(1);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            Config::load_or_default(dir.path().join("absent.toml")),
            Config::default()
        );
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lookout.toml");
        fs::write(&path, "[timing\n").unwrap();
        assert_eq!(Config::load_or_default(&path), Config::default());
    }
}
