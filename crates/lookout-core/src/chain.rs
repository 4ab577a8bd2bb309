//! Pointer-chain resolution with per-chain TTL caching.
//!
//! A chain starts at a root address and walks a list of hops. Each hop reads
//! a 32-bit pointer at `current + hop` and continues from that pointer. The
//! walk stops at the first pointer outside the valid address range and yields
//! 0. The terminal `field` offset is added to the last pointer without being
//! dereferenced.
//!
//! ```text
//! root ──(+hop0)──► p1 ──(+hop1)──► p2 ... pN ──(+field)──► result
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::memory::{AddressRange, ReadMemory};

/// Where a chain starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainRoot {
    /// Absolute address in the foreign process
    Absolute(u64),
    /// Offset from the main module base
    Module(u64),
}

/// Static definition of a pointer chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerChain {
    pub name: String,
    pub root: ChainRoot,
    #[serde(default)]
    pub hops: Vec<u64>,
    /// Offset added to the final pointer, not dereferenced
    #[serde(default)]
    pub field: u64,
    /// Cache lifetime; 0 re-resolves on every request
    #[serde(default)]
    pub ttl_ms: u64,
}

impl PointerChain {
    pub fn new(name: impl Into<String>, root: ChainRoot) -> Self {
        Self {
            name: name.into(),
            root,
            hops: Vec::new(),
            field: 0,
            ttl_ms: 0,
        }
    }

    pub fn hop(mut self, offset: u64) -> Self {
        self.hops.push(offset);
        self
    }

    pub fn hops(mut self, offsets: &[u64]) -> Self {
        self.hops.extend_from_slice(offsets);
        self
    }

    pub fn field(mut self, offset: u64) -> Self {
        self.field = offset;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = ttl.as_millis() as u64;
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn root_address(&self, module_base: u64) -> u64 {
        match self.root {
            ChainRoot::Absolute(addr) => addr,
            ChainRoot::Module(offset) => module_base.wrapping_add(offset),
        }
    }

    /// Walk the chain without caching
    pub fn walk<R: ReadMemory + ?Sized>(&self, reader: &R, valid: &AddressRange) -> u64 {
        let start = self.root_address(reader.base_address());
        let last = follow(reader, start, &self.hops, valid);
        if last == 0 {
            trace!("chain '{}' broke before terminal", self.name);
            return 0;
        }
        last.wrapping_add(self.field)
    }
}

/// Follow `hops` from `start`, returning the final pointer or 0.
///
/// With no hops `start` is returned unchanged.
pub fn follow<R: ReadMemory + ?Sized>(
    reader: &R,
    start: u64,
    hops: &[u64],
    valid: &AddressRange,
) -> u64 {
    let mut current = start;
    for (i, hop) in hops.iter().enumerate() {
        let ptr = reader.read_u32(current.wrapping_add(*hop)) as u64;
        if !valid.contains(ptr) {
            trace!("hop {} at {:#x}+{:#x} -> {:#x} rejected", i, current, hop, ptr);
            return 0;
        }
        current = ptr;
    }
    current
}

/// One cached resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntry {
    pub address: u64,
    pub resolved_at: Instant,
}

/// Resolves chains and keeps one cache slot per chain name
#[derive(Debug)]
pub struct ChainResolver {
    valid: AddressRange,
    cache: HashMap<String, CacheEntry>,
}

impl ChainResolver {
    pub fn new(valid: AddressRange) -> Self {
        Self {
            valid,
            cache: HashMap::new(),
        }
    }

    pub fn valid_range(&self) -> &AddressRange {
        &self.valid
    }

    pub fn resolve<R: ReadMemory + ?Sized>(&mut self, reader: &R, chain: &PointerChain) -> u64 {
        self.resolve_at(reader, chain, Instant::now())
    }

    /// Resolve as of `now`.
    ///
    /// A slot younger than the chain's TTL is returned as-is, even if the
    /// foreign value has changed. Otherwise the chain is walked and the slot
    /// overwritten with whatever came back, including 0.
    pub fn resolve_at<R: ReadMemory + ?Sized>(
        &mut self,
        reader: &R,
        chain: &PointerChain,
        now: Instant,
    ) -> u64 {
        if let Some(entry) = self.cache.get(&chain.name)
            && now.saturating_duration_since(entry.resolved_at) < chain.cache_ttl()
        {
            return entry.address;
        }

        let address = chain.walk(reader, &self.valid);
        self.cache.insert(
            chain.name.clone(),
            CacheEntry {
                address,
                resolved_at: now,
            },
        );
        address
    }

    pub fn cached(&self, name: &str) -> Option<&CacheEntry> {
        self.cache.get(name)
    }

    pub fn invalidate(&mut self, name: &str) {
        self.cache.remove(name);
    }

    /// Drop every slot (e.g. on detach)
    pub fn invalidate_all(&mut self) {
        self.cache.clear();
    }
}
