//! Background scan scheduling.
//!
//! The hot path calls [`ScanOrchestrator::poll`] every tick. At most one scan
//! worker runs at a time; its result replaces the shared snapshot wholesale.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::entity::{EntityLayout, ObjectRecord};
use crate::memory::{AddressRange, ReadMemory};
use crate::scan::{ScanProfile, scan_objects};

pub struct ScanOrchestrator {
    snapshot: Arc<RwLock<Vec<ObjectRecord>>>,
    in_flight: Arc<AtomicBool>,
    passes: Arc<AtomicU64>,
    /// Bumped by `reset`; a worker from an older generation discards its result
    generation: Arc<AtomicU64>,
    interval: Duration,
    last_started: Option<Instant>,
    profile: Arc<ScanProfile>,
    layout: Arc<EntityLayout>,
    valid: AddressRange,
}

impl ScanOrchestrator {
    pub fn new(
        profile: ScanProfile,
        layout: EntityLayout,
        valid: AddressRange,
        interval: Duration,
    ) -> Self {
        Self {
            snapshot: Arc::new(RwLock::new(Vec::new())),
            in_flight: Arc::new(AtomicBool::new(false)),
            passes: Arc::new(AtomicU64::new(0)),
            generation: Arc::new(AtomicU64::new(0)),
            interval,
            last_started: None,
            profile: Arc::new(profile),
            layout: Arc::new(layout),
            valid,
        }
    }

    pub fn poll<R>(&mut self, reader: &Arc<R>, observer: Option<&ObjectRecord>) -> bool
    where
        R: ReadMemory + Send + Sync + 'static,
    {
        self.poll_at(reader, observer, Instant::now())
    }

    /// Start a scan if the cadence elapsed, none is running, and the
    /// observer is present. Returns whether a worker was started.
    pub fn poll_at<R>(
        &mut self,
        reader: &Arc<R>,
        observer: Option<&ObjectRecord>,
        now: Instant,
    ) -> bool
    where
        R: ReadMemory + Send + Sync + 'static,
    {
        let Some(observer) = observer.filter(|o| o.address != 0) else {
            return false;
        };
        if let Some(last) = self.last_started
            && now.saturating_duration_since(last) < self.interval
        {
            return false;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.last_started = Some(now);

        let reader = Arc::clone(reader);
        let observer = observer.clone();
        let snapshot = Arc::clone(&self.snapshot);
        let in_flight = Arc::clone(&self.in_flight);
        let passes = Arc::clone(&self.passes);
        let generation = Arc::clone(&self.generation);
        let started_in = generation.load(Ordering::Acquire);
        let profile = Arc::clone(&self.profile);
        let layout = Arc::clone(&self.layout);
        let valid = self.valid;

        let spawned = thread::Builder::new()
            .name("entity-scan".to_string())
            .spawn(move || {
                let records = scan_objects(&*reader, &observer, &profile, &layout, valid);
                let mut guard = snapshot.write();
                if generation.load(Ordering::Acquire) == started_in {
                    debug!("Scan pass complete: {} objects", records.len());
                    *guard = records;
                    passes.fetch_add(1, Ordering::Relaxed);
                } else {
                    debug!("Discarding scan started before reset");
                }
                in_flight.store(false, Ordering::Release);
            });

        if let Err(e) = spawned {
            warn!("Failed to spawn scan worker: {}", e);
            self.in_flight.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// Copy of the latest completed scan
    pub fn snapshot(&self) -> Vec<ObjectRecord> {
        self.snapshot.read().clone()
    }

    pub fn is_scanning(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Completed scan passes since creation
    pub fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    /// Forget the last result and cadence (e.g. on detach)
    pub fn reset(&mut self) {
        let mut guard = self.snapshot.write();
        self.generation.fetch_add(1, Ordering::AcqRel);
        guard.clear();
        drop(guard);
        self.last_started = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Vec3;
    use crate::entity::tests::write_entity;
    use crate::memory::{MockMemoryBuilder, MockMemoryReader};
    use crate::scan::ScanRegion;

    const REGION: u64 = 0x8000_0000;

    fn orchestrator(interval: Duration) -> ScanOrchestrator {
        let profile = ScanProfile {
            regions: vec![ScanRegion::new(REGION, 0x10000)],
            ..Default::default()
        };
        ScanOrchestrator::new(
            profile,
            EntityLayout::default(),
            AddressRange::default(),
            interval,
        )
    }

    fn observer() -> ObjectRecord {
        ObjectRecord {
            address: 0x2000_0000,
            position: Vec3::new(100.0, 100.0, 10.0),
            ..Default::default()
        }
    }

    fn wait_idle(orch: &ScanOrchestrator) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while orch.is_scanning() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!orch.is_scanning(), "scan worker did not finish");
    }

    fn memory_with_entity() -> Arc<MockMemoryReader> {
        let mock = MockMemoryBuilder::new().map(REGION, 0x20000).build();
        write_entity(
            &mock,
            REGION + 0x100,
            0,
            0x3900_0010,
            "Rival",
            Vec3::new(110.0, 100.0, 10.0),
            800,
            1000,
        );
        Arc::new(mock)
    }

    #[test]
    fn test_poll_publishes_snapshot() {
        let reader = memory_with_entity();
        let mut orch = orchestrator(Duration::from_secs(1));
        assert!(orch.snapshot().is_empty());

        assert!(orch.poll(&reader, Some(&observer())));
        wait_idle(&orch);

        let snap = orch.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].name, "Rival");
        assert_eq!(orch.passes(), 1);
    }

    #[test]
    fn test_poll_requires_observer() {
        let reader = memory_with_entity();
        let mut orch = orchestrator(Duration::ZERO);
        assert!(!orch.poll(&reader, None));
        assert!(!orch.poll(&reader, Some(&ObjectRecord::default())));
    }

    #[test]
    fn test_poll_respects_cadence() {
        let reader = memory_with_entity();
        let mut orch = orchestrator(Duration::from_secs(1));
        let t0 = Instant::now();

        assert!(orch.poll_at(&reader, Some(&observer()), t0));
        wait_idle(&orch);
        assert!(!orch.poll_at(&reader, Some(&observer()), t0 + Duration::from_millis(999)));
        assert!(orch.poll_at(&reader, Some(&observer()), t0 + Duration::from_secs(1)));
        wait_idle(&orch);
        assert_eq!(orch.passes(), 2);
    }

    /// Blocks every read while the test holds `gate`
    struct GatedReader {
        inner: Arc<MockMemoryReader>,
        gate: parking_lot::Mutex<()>,
    }

    impl ReadMemory for GatedReader {
        fn read_bytes(&self, address: u64, size: usize) -> crate::error::Result<Vec<u8>> {
            let _open = self.gate.lock();
            self.inner.read_bytes(address, size)
        }

        fn base_address(&self) -> u64 {
            self.inner.base_address()
        }
    }

    #[test]
    fn test_reset_discards_running_scan() {
        let reader = Arc::new(GatedReader {
            inner: memory_with_entity(),
            gate: parking_lot::Mutex::new(()),
        });
        let mut orch = orchestrator(Duration::ZERO);

        let held = reader.gate.lock();
        assert!(orch.poll(&reader, Some(&observer())));
        orch.reset();
        drop(held);
        wait_idle(&orch);

        assert!(orch.snapshot().is_empty());
        assert_eq!(orch.passes(), 0);

        // The next pass after reset publishes normally.
        assert!(orch.poll(&reader, Some(&observer())));
        wait_idle(&orch);
        assert_eq!(orch.snapshot().len(), 1);
        assert_eq!(orch.passes(), 1);
    }

    #[test]
    fn test_poll_skips_while_in_flight() {
        let reader = memory_with_entity();
        let mut orch = orchestrator(Duration::ZERO);
        orch.in_flight.store(true, Ordering::Release);
        assert!(!orch.poll(&reader, Some(&observer())));
        orch.in_flight.store(false, Ordering::Release);
        assert!(orch.poll(&reader, Some(&observer())));
        wait_idle(&orch);
    }
}
