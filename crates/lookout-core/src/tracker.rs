//! Hot-path coordinator
//!
//! One [`Tracker::tick`] resolves the chains, samples the observer, diffs
//! both effect collections (debuffs first), checks vitals every Nth tick and
//! lets the scan orchestrator start a background pass.

use std::sync::Arc;

use tracing::{debug, info};

use crate::chain::{ChainResolver, PointerChain};
use crate::config::{Config, GameLayout, TimingConfig};
use crate::entity::{ObjectRecord, VitalPair, read_observer, read_vital_pair};
use crate::memory::ReadMemory;
use crate::monitor::{CollectionKind, EffectMonitor, TickReport};
use crate::reaction::{
    ActionExecutor, ReactionDispatcher, RuleTable, default_buff_rules, default_cc_rules,
};
use crate::scan::ScanOrchestrator;
use crate::shutdown::ShutdownSignal;
use crate::vitals::VitalReactor;

/// Outcome of one tick
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickSummary {
    pub debuffs: TickReport,
    pub buffs: TickReport,
    /// Name of the vital rule that fired, if any
    pub vital: Option<String>,
    pub scan_started: bool,
}

pub struct Tracker {
    layout: GameLayout,
    timing: TimingConfig,
    resolver: ChainResolver,
    observer_chain: PointerChain,
    debuff_chain: PointerChain,
    buff_chain: PointerChain,
    mana_chain: PointerChain,
    debuffs: EffectMonitor,
    buffs: EffectMonitor,
    vitals: VitalReactor,
    orchestrator: ScanOrchestrator,
    observer: Option<ObjectRecord>,
    mana: VitalPair,
    ticks: u64,
}

impl Tracker {
    /// Build a tracker, loading (or creating) the rule files named in
    /// `config`.
    pub fn new(config: &Config, executor: Arc<dyn ActionExecutor>) -> Self {
        let buff_rules = RuleTable::load_or_create(&config.rules.buff_rules, &default_buff_rules());
        let cc_rules = RuleTable::load_or_create(&config.rules.cc_rules, &default_cc_rules());
        Self::with_rules(config, buff_rules, cc_rules, executor)
    }

    pub fn with_rules(
        config: &Config,
        buff_rules: RuleTable,
        cc_rules: RuleTable,
        executor: Arc<dyn ActionExecutor>,
    ) -> Self {
        let layout = config.layout.clone();
        let timing = config.timing;

        let debuffs = EffectMonitor::new(
            CollectionKind::Debuffs,
            layout.debuffs.clone(),
            ReactionDispatcher::new("CC", cc_rules, config.reaction, Arc::clone(&executor)),
        );
        let buffs = EffectMonitor::new(
            CollectionKind::Buffs,
            layout.buffs.clone(),
            ReactionDispatcher::new("BUFF", buff_rules, config.reaction, Arc::clone(&executor)),
        );

        let mut vitals = VitalReactor::new(config.vitals.rules.clone(), executor);
        vitals.set_enabled(config.vitals.enabled);

        let orchestrator = ScanOrchestrator::new(
            config.scan.clone(),
            layout.entity.clone(),
            layout.valid_range,
            timing.scan_interval(),
        );

        Self {
            resolver: ChainResolver::new(layout.valid_range),
            observer_chain: layout.observer_chain(),
            debuff_chain: layout.effects_chain("debuff_root", timing.debuff_ttl()),
            buff_chain: layout.effects_chain("buff_root", timing.buff_ttl()),
            mana_chain: layout.mana_chain(),
            layout,
            timing,
            debuffs,
            buffs,
            vitals,
            orchestrator,
            observer: None,
            mana: VitalPair::default(),
            ticks: 0,
        }
    }

    pub fn tick<R>(&mut self, reader: &Arc<R>) -> TickSummary
    where
        R: ReadMemory + Send + Sync + 'static,
    {
        let mem: &R = reader;
        let mut summary = TickSummary::default();

        self.observer = read_observer(
            mem,
            &mut self.resolver,
            &self.observer_chain,
            &self.layout.entity,
        );

        let debuff_base = self.resolver.resolve(mem, &self.debuff_chain);
        summary.debuffs = self.debuffs.tick(mem, debuff_base);
        let buff_base = self.resolver.resolve(mem, &self.buff_chain);
        summary.buffs = self.buffs.tick(mem, buff_base);

        let every = self.timing.vital_check_every.max(1);
        if self.ticks % every == 0 {
            self.mana =
                read_vital_pair(mem, &mut self.resolver, &self.mana_chain, &self.layout.mana);
            if let Some(observer) = &self.observer {
                summary.vital = self.vitals.check(observer.vital, observer.max_vital);
            }
        }

        summary.scan_started = self.orchestrator.poll(reader, self.observer.as_ref());
        self.ticks += 1;
        summary
    }

    /// Tick until shutdown or until the process stops answering.
    ///
    /// `on_tick` runs after every tick with mutable access, so callers can
    /// apply toggles or render state between ticks.
    pub fn run<R, F>(&mut self, reader: Arc<R>, shutdown: &ShutdownSignal, mut on_tick: F)
    where
        R: ReadMemory + Send + Sync + 'static,
        F: FnMut(&mut Self, &TickSummary),
    {
        info!("Tracking started (tick {} ms)", self.timing.tick_ms);
        while !shutdown.is_shutdown() {
            if reader.read_bytes(reader.base_address(), 4).is_err() {
                info!("Process no longer readable, detaching");
                break;
            }

            let summary = self.tick(&reader);
            on_tick(self, &summary);

            if shutdown.wait(self.timing.tick()) {
                break;
            }
        }
        debug!("Tracking stopped after {} ticks", self.ticks);
        self.reset();
    }

    /// Drop every cached address and tracked effect
    pub fn reset(&mut self) {
        self.resolver.invalidate_all();
        self.debuffs.reset();
        self.buffs.reset();
        self.orchestrator.reset();
        self.observer = None;
        self.mana = VitalPair::default();
        self.ticks = 0;
    }

    pub fn observer(&self) -> Option<&ObjectRecord> {
        self.observer.as_ref()
    }

    pub fn mana(&self) -> VitalPair {
        self.mana
    }

    /// Objects from the latest completed scan
    pub fn objects(&self) -> Vec<ObjectRecord> {
        self.orchestrator.snapshot()
    }

    pub fn debuffs(&self) -> &EffectMonitor {
        &self.debuffs
    }

    pub fn debuffs_mut(&mut self) -> &mut EffectMonitor {
        &mut self.debuffs
    }

    pub fn buffs(&self) -> &EffectMonitor {
        &self.buffs
    }

    pub fn buffs_mut(&mut self) -> &mut EffectMonitor {
        &mut self.buffs
    }

    pub fn vitals_mut(&mut self) -> &mut VitalReactor {
        &mut self.vitals
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Vec3;
    use crate::entity::tests::write_entity;
    use crate::memory::layout::{effects, observer};
    use crate::memory::{MockMemoryBuilder, MockMemoryReader};
    use crate::monitor::EffectKey;
    use crate::reaction::tests::RecordingExecutor;

    const MODULE: u64 = 0x0040_0000;
    const HOLDER: u64 = 0x2200_0000;
    const ENTITY: u64 = 0x2000_0000;
    const EXT_BASE: u64 = 0x5100_0000;
    const EFFECTS: u64 = 0x3000_0000;

    fn game_memory(vital: u32, max_vital: u32) -> Arc<MockMemoryReader> {
        let mock = MockMemoryBuilder::new()
            .base(MODULE)
            .map(MODULE, 0x1000)
            .u32(MODULE + observer::ROOT, HOLDER as u32)
            .u32(HOLDER + observer::ENTITY, ENTITY as u32)
            .u32(EXT_BASE + effects::HOLDER, EFFECTS as u32)
            .map(EFFECTS, 0x2000)
            .build();
        write_entity(
            &mock,
            ENTITY,
            0,
            0x3900_0000,
            "Observer",
            Vec3::new(10.0, 20.0, 30.0),
            vital,
            max_vital,
        );
        Arc::new(mock)
    }

    fn set_debuffs(mock: &MockMemoryReader, entries: &[(u32, u32)]) {
        mock.set_u32(EFFECTS + effects::DEBUFF_COUNT, entries.len() as u32);
        for (i, (id, type_id)) in entries.iter().enumerate() {
            let rec = EFFECTS + effects::DEBUFF_ARRAY + (i * effects::DEBUFF_SIZE) as u64;
            mock.set_u32(rec, *id);
            mock.set_u32(rec + 4, *type_id);
            mock.set_u32(rec + effects::DURATION as u64, 4000);
        }
    }

    fn quiet_config() -> Config {
        let mut config = Config::default();
        config.scan.regions.clear();
        config
    }

    fn tracker(config: &Config, recorder: Arc<RecordingExecutor>) -> Tracker {
        Tracker::with_rules(
            config,
            RuleTable::from_rules(default_buff_rules()),
            RuleTable::from_rules(default_cc_rules()),
            recorder,
        )
    }

    #[test]
    fn test_tick_reads_observer_and_reacts() {
        let mem = game_memory(9000, 10_000);
        set_debuffs(&mem, &[(11, 3601)]);
        let recorder = Arc::new(RecordingExecutor::default());
        let mut tracker = tracker(&quiet_config(), recorder.clone());

        let summary = tracker.tick(&mem);
        let observer = tracker.observer().unwrap();
        assert_eq!(observer.address, ENTITY);
        assert_eq!(observer.name, "Observer");
        assert_eq!(summary.debuffs.entered, vec![EffectKey::typed(11, 3601)]);
        assert_eq!(summary.debuffs.reacted, vec![EffectKey::typed(11, 3601)]);
        assert!(summary.buffs.is_quiet());
        assert_eq!(summary.vital, None);
        assert!(summary.scan_started);

        assert_eq!(recorder.wait_for(1)[0].name, "stun");
    }

    #[test]
    fn test_low_vital_checked_every_nth_tick() {
        let mem = game_memory(1500, 10_000);
        let recorder = Arc::new(RecordingExecutor::default());
        let mut tracker = tracker(&quiet_config(), recorder);

        let first = tracker.tick(&mem);
        assert_eq!(first.vital.as_deref(), Some("Nui's Nova"));
        for _ in 1..5 {
            assert_eq!(tracker.tick(&mem).vital, None);
        }
        // Nova is on cooldown; the next check falls through to the second rule.
        assert_eq!(tracker.tick(&mem).vital.as_deref(), Some("Desert Fire"));
    }

    #[test]
    fn test_missing_observer_keeps_monitor_state() {
        let mem = game_memory(9000, 10_000);
        set_debuffs(&mem, &[(11, 3601), (12, 509)]);
        let recorder = Arc::new(RecordingExecutor::default());
        let mut config = quiet_config();
        config.timing.debuff_ttl_ms = 0;
        config.timing.buff_ttl_ms = 0;
        let mut tracker = tracker(&config, recorder);
        tracker.tick(&mem);

        // Loading screen: observer chain breaks.
        mem.set_u32(HOLDER + observer::ENTITY, 0);
        let summary = tracker.tick(&mem);
        assert!(tracker.observer().is_none());
        assert!(summary.debuffs.is_quiet());
        assert_eq!(tracker.debuffs().known().len(), 2);
        assert!(!summary.scan_started);
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let mem = game_memory(9000, 10_000);
        let recorder = Arc::new(RecordingExecutor::default());
        let mut config = quiet_config();
        config.timing.tick_ms = 1;
        let mut tracker = tracker(&config, recorder);
        let shutdown = ShutdownSignal::new();

        let mut seen = 0;
        tracker.run(Arc::clone(&mem), &shutdown, |t, _| {
            seen += 1;
            if t.ticks() == 3 {
                shutdown.trigger();
            }
        });
        assert_eq!(seen, 3);
        assert_eq!(tracker.ticks(), 0);
    }

    #[test]
    fn test_run_detaches_when_process_gone() {
        let mem = game_memory(9000, 10_000);
        let recorder = Arc::new(RecordingExecutor::default());
        let mut config = quiet_config();
        config.timing.tick_ms = 1;
        let mut tracker = tracker(&config, recorder);
        let shutdown = ShutdownSignal::new();

        let mut seen = 0;
        tracker.run(Arc::clone(&mem), &shutdown, |_, _| {
            seen += 1;
            if seen == 2 {
                mem.unmap(MODULE, 0x1000);
            }
        });
        assert_eq!(seen, 2);
        assert!(!shutdown.is_shutdown());
    }
}
