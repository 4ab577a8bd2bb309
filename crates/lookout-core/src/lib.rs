//! # lookout-core
//!
//! Core library for the lookout memory observer.
//!
//! This crate provides:
//! - Windows process memory access behind the `ReadMemory` seam
//! - Pointer-chain resolution with per-chain TTL caching
//! - Heuristic entity scanning with a background orchestrator
//! - Differential monitoring of status-effect collections
//! - Whitelisted, debounced key reactions and vital thresholds

pub mod chain;
pub mod config;
pub mod entity;
pub mod error;
pub mod memory;
pub mod monitor;
pub mod reaction;
pub mod scan;
pub mod shutdown;
pub mod tracker;
pub mod vitals;

pub use chain::{CacheEntry, ChainResolver, ChainRoot, PointerChain};
pub use config::{Bounds, Config, GameLayout, ProcessConfig, RulesConfig, TimingConfig};
pub use entity::{Classification, EntityLayout, ObjectRecord, Vec3, VitalPair, read_observer};
pub use error::{Error, Result};
pub use memory::{AddressRange, MemoryReader, ModuleInfo, ProcessHandle, ReadMemory, WriteMemory};
pub use monitor::{
    CollectionKind, CollectionLayout, EffectKey, EffectMonitor, EffectRecord, EventLog,
    MonitorState, TickReport, TransitionEvent, TransitionKind,
};
pub use reaction::{
    ActionExecutor, KeyCombo, LogExecutor, Reaction, ReactionConfig, ReactionDispatcher,
    ResponseAction, RuleTable, WhitelistRule,
};
pub use scan::{EntityScanner, ScanOrchestrator, ScanProfile, ScanRegion, scan_objects};
pub use shutdown::ShutdownSignal;
pub use tracker::{TickSummary, Tracker};
pub use vitals::{VitalReactor, VitalRule};
