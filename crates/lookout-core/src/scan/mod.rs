//! Heuristic object scanner
//!
//! Sweeps fixed heap regions page by page and treats every 4-byte aligned
//! offset as a potential entity. A candidate survives only if its inline
//! fields (type tag, vital, position) look like an entity, it lies within
//! `max_radius` of the observer, and its name chain yields a readable name.
//!
//! Pages are read `page_stride` apart. The default stride is the page size
//! minus the entity signature span, so an entity whose fields straddle a page
//! boundary is still seen whole in the following page.

mod classify;
mod filters;
mod orchestrator;

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::Bounds;
use crate::entity::{EntityLayout, ObjectRecord, Vec3, read_max_vital, read_name};
use crate::memory::{AddressRange, ReadMemory};

pub use classify::{classify, classify_name};
pub use filters::{
    NameRules, coord_filter, name_filter, position_filter, radius_filter, tag_filter,
    vital_filter,
};
pub use orchestrator::ScanOrchestrator;

/// A contiguous block of the foreign heap to sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRegion {
    pub start: u64,
    pub size: u64,
}

impl ScanRegion {
    pub const fn new(start: u64, size: u64) -> Self {
        Self { start, size }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanProfile {
    pub regions: Vec<ScanRegion>,
    pub page_size: usize,
    /// Distance between page starts; defaults to `page_size - signature span`
    pub page_stride: Option<usize>,
    pub tag_range: Bounds<u32>,
    pub vital_range: Bounds<u32>,
    /// Exclusive bound on the absolute value of each coordinate
    pub coord_limit: f32,
    pub max_radius: f32,
    pub name: NameRules,
    /// Case-insensitive name prefixes of objects that are never reported
    pub hidden_prefixes: Vec<String>,
}

impl Default for ScanProfile {
    fn default() -> Self {
        Self {
            regions: (0..5u64)
                .map(|i| ScanRegion::new(0x8000_0000 + i * 0x1000_0000, 0x1000_0000))
                .collect(),
            page_size: 0x10000,
            page_stride: None,
            tag_range: Bounds::new(0x3900_0000, 0x3AFF_FFFF),
            vital_range: Bounds::new(100, 10_000_000),
            coord_limit: 100_000.0,
            max_radius: 1000.0,
            name: NameRules::default(),
            hidden_prefixes: vec!["prefab_".to_string(), "object_".to_string()],
        }
    }
}

impl ScanProfile {
    /// Effective stride, 4-byte aligned and never zero
    pub fn stride(&self, layout: &EntityLayout) -> usize {
        let stride = self
            .page_stride
            .unwrap_or_else(|| self.page_size.saturating_sub(layout.signature_span()));
        (stride & !3).max(4)
    }
}

fn le_u32(bytes: &[u8], at: u64) -> Option<u32> {
    let at = usize::try_from(at).ok()?;
    let raw = bytes.get(at..at.checked_add(4)?)?;
    raw.try_into().ok().map(u32::from_le_bytes)
}

fn le_f32(bytes: &[u8], at: u64) -> Option<f32> {
    le_u32(bytes, at).map(f32::from_bits)
}

/// Single sweep over a reader; holds no state between passes
pub struct EntityScanner<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    profile: &'a ScanProfile,
    layout: &'a EntityLayout,
    valid: AddressRange,
}

impl<'a, R: ReadMemory + ?Sized> EntityScanner<'a, R> {
    pub fn new(
        reader: &'a R,
        profile: &'a ScanProfile,
        layout: &'a EntityLayout,
        valid: AddressRange,
    ) -> Self {
        Self {
            reader,
            profile,
            layout,
            valid,
        }
    }

    /// Sweep every region and return plausible objects sorted by distance
    /// from `origin`. Faulting pages are skipped; this never fails.
    pub fn scan(&self, origin: &Vec3) -> Vec<ObjectRecord> {
        let started = Instant::now();
        let stride = self.profile.stride(self.layout) as u64;
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut pages = 0usize;

        for region in &self.profile.regions {
            let mut offset = 0u64;
            while offset < region.size {
                let page_addr = region.start + offset;
                offset += stride;

                let Ok(page) = self.reader.read_bytes(page_addr, self.profile.page_size) else {
                    continue;
                };
                pages += 1;
                self.scan_page(page_addr, &page, origin, &mut seen, &mut found);
            }
        }

        found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        debug!(
            "Scan finished: {} objects from {} pages in {:?}",
            found.len(),
            pages,
            started.elapsed()
        );
        found
    }

    fn scan_page(
        &self,
        page_addr: u64,
        page: &[u8],
        origin: &Vec3,
        seen: &mut HashSet<u64>,
        found: &mut Vec<ObjectRecord>,
    ) {
        let limit = page.len().saturating_sub(self.layout.signature_span());
        for off in (0..limit).step_by(4) {
            let address = page_addr + off as u64;
            if seen.contains(&address) {
                continue;
            }
            if let Some(record) = self.probe(address, page, off as u64, origin) {
                trace!("candidate {:#x} '{}' accepted", address, record.name);
                seen.insert(address);
                found.push(record);
            }
        }
    }

    fn probe(&self, address: u64, page: &[u8], off: u64, origin: &Vec3) -> Option<ObjectRecord> {
        let layout = self.layout;
        let profile = self.profile;

        let type_tag = le_u32(page, off + layout.type_tag)?;
        if !tag_filter(type_tag, &profile.tag_range) {
            return None;
        }

        let vital = le_u32(page, off + layout.vital)?;
        if !vital_filter(vital, &profile.vital_range) {
            return None;
        }

        let position = Vec3::new(
            le_f32(page, off + layout.pos_x)?,
            le_f32(page, off + layout.pos_y)?,
            le_f32(page, off + layout.pos_z)?,
        );
        if !position_filter(&position, profile.coord_limit) {
            return None;
        }

        let distance = origin.distance(&position);
        if !radius_filter(distance, profile.max_radius) {
            return None;
        }

        let name = read_name(self.reader, address, layout, &self.valid);
        if !name_filter(&name, &profile.name) {
            return None;
        }

        Some(ObjectRecord {
            address,
            name,
            position,
            vital,
            max_vital: read_max_vital(self.reader, address, layout, &self.valid),
            type_tag,
            distance,
            classification: Default::default(),
        })
    }
}

/// One-shot scan followed by classification
pub fn scan_objects<R: ReadMemory + ?Sized>(
    reader: &R,
    observer: &ObjectRecord,
    profile: &ScanProfile,
    layout: &EntityLayout,
    valid: AddressRange,
) -> Vec<ObjectRecord> {
    let raw = EntityScanner::new(reader, profile, layout, valid).scan(&observer.position);
    classify(raw, observer.address, &profile.hidden_prefixes)
}
