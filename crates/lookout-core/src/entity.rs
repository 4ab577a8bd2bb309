//! Object records and the field reads shared by the observer path and the
//! heuristic scanner.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::chain::{ChainResolver, PointerChain, follow};
use crate::memory::layout::entity;
use crate::memory::{AddressRange, ReadMemory, decode_name};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize, Display, IntoStaticStr)]
pub enum Classification {
    #[default]
    Unknown,
    Player,
    #[strum(serialize = "NPC")]
    Npc,
}

/// One sampled object. Superseded, never mutated, by the next pass.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectRecord {
    pub address: u64,
    pub name: String,
    pub position: Vec3,
    pub vital: u32,
    pub max_vital: u32,
    pub type_tag: u32,
    pub distance: f32,
    pub classification: Classification,
}

impl ObjectRecord {
    /// Current vital as a fraction of max, if max is known
    pub fn vital_fraction(&self) -> Option<f32> {
        (self.max_vital > 0).then(|| self.vital as f32 / self.max_vital as f32)
    }
}

/// Field offsets inside an entity object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityLayout {
    pub type_tag: u64,
    pub pos_x: u64,
    pub pos_y: u64,
    pub pos_z: u64,
    pub vital: u64,
    /// Hops from the entity to the name bytes
    pub name_hops: Vec<u64>,
    pub name_max_len: usize,
    /// Hops from the entity to the stats block
    pub stats_hops: Vec<u64>,
    pub max_vital: u64,
}

impl Default for EntityLayout {
    fn default() -> Self {
        Self {
            type_tag: entity::TYPE_TAG,
            pos_x: entity::POS_X,
            pos_y: entity::POS_Y,
            pos_z: entity::POS_Z,
            vital: entity::VITAL,
            name_hops: vec![entity::NAME_PTR1, entity::NAME_PTR2],
            name_max_len: entity::NAME_MAX_LEN,
            stats_hops: vec![entity::BASE, entity::TO_ESI, entity::TO_STATS],
            max_vital: entity::MAX_VITAL,
        }
    }
}

impl EntityLayout {
    /// Bytes from the type tag that cover every inline field
    pub fn signature_span(&self) -> usize {
        [self.type_tag, self.pos_x, self.pos_y, self.pos_z, self.vital]
            .into_iter()
            .max()
            .unwrap_or(0) as usize
            + 4
    }
}

/// Resolve an entity's display name through its name chain
pub fn read_name<R: ReadMemory + ?Sized>(
    reader: &R,
    entity_addr: u64,
    layout: &EntityLayout,
    valid: &AddressRange,
) -> String {
    let ptr = follow(reader, entity_addr, &layout.name_hops, valid);
    if ptr == 0 {
        return String::new();
    }
    decode_name(&reader.read_cstring(ptr, layout.name_max_len))
}

/// Read max vital through the stats chain, 0 if any hop is invalid
pub fn read_max_vital<R: ReadMemory + ?Sized>(
    reader: &R,
    entity_addr: u64,
    layout: &EntityLayout,
    valid: &AddressRange,
) -> u32 {
    let stats = follow(reader, entity_addr, &layout.stats_hops, valid);
    if stats == 0 {
        return 0;
    }
    reader.read_u32(stats + layout.max_vital)
}

/// Read the observer's own record through its pointer chain.
///
/// Returns `None` while the chain does not resolve (loading screen,
/// character select, detached client).
pub fn read_observer<R: ReadMemory + ?Sized>(
    reader: &R,
    resolver: &mut ChainResolver,
    chain: &PointerChain,
    layout: &EntityLayout,
) -> Option<ObjectRecord> {
    let address = resolver.resolve(reader, chain);
    if address == 0 {
        return None;
    }
    let valid = *resolver.valid_range();

    Some(ObjectRecord {
        address,
        name: read_name(reader, address, layout, &valid),
        position: Vec3::new(
            reader.read_f32(address + layout.pos_x),
            reader.read_f32(address + layout.pos_y),
            reader.read_f32(address + layout.pos_z),
        ),
        vital: reader.read_u32(address + layout.vital),
        max_vital: read_max_vital(reader, address, layout, &valid),
        type_tag: reader.read_u32(address + layout.type_tag),
        distance: 0.0,
        classification: Classification::Player,
    })
}

/// Current/max pair for a secondary vital such as mana
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VitalPair {
    pub current: u32,
    pub max: u32,
}

/// Offsets of a secondary vital inside the block its chain resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalFields {
    pub current: u64,
    pub max: u64,
}

pub fn read_vital_pair<R: ReadMemory + ?Sized>(
    reader: &R,
    resolver: &mut ChainResolver,
    chain: &PointerChain,
    fields: &VitalFields,
) -> VitalPair {
    let block = resolver.resolve(reader, chain);
    if block == 0 {
        return VitalPair::default();
    }
    VitalPair {
        current: reader.read_u32(block + fields.current),
        max: reader.read_u32(block + fields.max),
    }
}
