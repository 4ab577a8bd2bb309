//! Fixed-size effect record decoding

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Bounds;
use crate::error::{Error, Result};
use crate::memory::layout::effects;

/// Identity used for set-difference between ticks.
///
/// Buffs are keyed by id alone; debuffs by `(id, type_id)`, since the same
/// instance id can be reused across different effect types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EffectKey {
    pub id: u32,
    pub type_id: Option<u32>,
}

impl EffectKey {
    pub const fn new(id: u32) -> Self {
        Self { id, type_id: None }
    }

    pub const fn typed(id: u32, type_id: u32) -> Self {
        Self {
            id,
            type_id: Some(type_id),
        }
    }

    /// Identity looked up in the rule table
    pub fn rule_key(&self) -> u32 {
        self.type_id.unwrap_or(self.id)
    }
}

impl fmt::Display for EffectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_id {
            Some(type_id) => write!(f, "{}/{}", self.id, type_id),
            None => write!(f, "{}", self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectRecord {
    pub key: EffectKey,
    pub duration_total: u32,
    pub duration_remaining: u32,
    /// Filled from the rule table by the monitor; empty if unknown
    pub name: String,
    /// Index in the foreign array
    pub slot: usize,
}

/// Where an effect collection lives relative to the effect holder, and what
/// a plausible record looks like.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionLayout {
    pub count_offset: u64,
    pub array_offset: u64,
    pub record_size: usize,
    pub id_offset: usize,
    /// Present for collections keyed by `(id, type_id)`
    pub type_id_offset: Option<usize>,
    pub duration_offset: usize,
    pub remaining_offset: usize,
    pub id_range: Bounds<u32>,
    pub duration_range: Option<Bounds<u32>>,
    /// Counts of 0 or above this invalidate the collection
    pub max_count: u32,
    pub max_records: usize,
}

impl Default for CollectionLayout {
    fn default() -> Self {
        Self::buffs()
    }
}

impl CollectionLayout {
    pub fn buffs() -> Self {
        Self {
            count_offset: effects::BUFF_COUNT,
            array_offset: effects::BUFF_ARRAY,
            record_size: effects::BUFF_SIZE,
            id_offset: effects::BUFF_ID,
            type_id_offset: None,
            duration_offset: effects::DURATION,
            remaining_offset: effects::REMAINING,
            id_range: Bounds::new(1000, 9_999_999),
            duration_range: None,
            max_count: effects::MAX_COUNT,
            max_records: effects::MAX_RECORDS,
        }
    }

    pub fn debuffs() -> Self {
        Self {
            count_offset: effects::DEBUFF_COUNT,
            array_offset: effects::DEBUFF_ARRAY,
            record_size: effects::DEBUFF_SIZE,
            id_offset: effects::DEBUFF_ID,
            type_id_offset: Some(effects::DEBUFF_TYPE),
            duration_offset: effects::DURATION,
            remaining_offset: effects::REMAINING,
            id_range: Bounds::new(1, 50_000),
            duration_range: Some(Bounds::new(1000, 300_000)),
            max_count: effects::MAX_COUNT,
            max_records: effects::MAX_RECORDS,
        }
    }

    /// A count the collection can be trusted with
    pub fn count_is_valid(&self, count: u32) -> bool {
        count > 0 && count <= self.max_count
    }

    /// Bytes covering the first `count` records, capped at `max_records`
    pub fn read_len(&self, count: u32) -> usize {
        (count as usize).min(self.max_records) * self.record_size
    }
}

fn field(record: &[u8], offset: usize) -> Result<u32> {
    offset
        .checked_add(4)
        .and_then(|end| record.get(offset..end))
        .and_then(|raw| raw.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(Error::Decode {
            offset,
            len: record.len(),
        })
}

/// Decode one record.
///
/// Truncated input is an error; a record that decodes but fails the
/// plausibility ranges is `Ok(None)`.
pub fn decode_effect(
    record: &[u8],
    slot: usize,
    layout: &CollectionLayout,
) -> Result<Option<EffectRecord>> {
    let id = field(record, layout.id_offset)?;
    let type_id = layout
        .type_id_offset
        .map(|offset| field(record, offset))
        .transpose()?;
    let duration_total = field(record, layout.duration_offset)?;
    let duration_remaining = field(record, layout.remaining_offset)?;

    if !layout.id_range.contains(id) {
        return Ok(None);
    }
    if let Some(range) = &layout.duration_range
        && !range.contains(duration_total)
    {
        return Ok(None);
    }

    Ok(Some(EffectRecord {
        key: EffectKey { id, type_id },
        duration_total,
        duration_remaining,
        name: String::new(),
        slot,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debuff_bytes(id: u32, type_id: u32, duration: u32, remaining: u32) -> Vec<u8> {
        let mut rec = vec![0u8; effects::DEBUFF_SIZE];
        rec[0..4].copy_from_slice(&id.to_le_bytes());
        rec[4..8].copy_from_slice(&type_id.to_le_bytes());
        rec[0x30..0x34].copy_from_slice(&duration.to_le_bytes());
        rec[0x34..0x38].copy_from_slice(&remaining.to_le_bytes());
        rec
    }

    #[test]
    fn test_decode_debuff() {
        let rec = debuff_bytes(42, 3601, 5000, 3200);
        let effect = decode_effect(&rec, 3, &CollectionLayout::debuffs())
            .unwrap()
            .unwrap();
        assert_eq!(effect.key, EffectKey::typed(42, 3601));
        assert_eq!(effect.key.rule_key(), 3601);
        assert_eq!(effect.duration_total, 5000);
        assert_eq!(effect.duration_remaining, 3200);
        assert_eq!(effect.slot, 3);
    }

    #[test]
    fn test_decode_buff_keyed_by_id() {
        let mut rec = vec![0u8; effects::BUFF_SIZE];
        rec[4..8].copy_from_slice(&8000210u32.to_le_bytes());
        let effect = decode_effect(&rec, 0, &CollectionLayout::buffs())
            .unwrap()
            .unwrap();
        assert_eq!(effect.key, EffectKey::new(8000210));
        assert_eq!(effect.key.rule_key(), 8000210);
    }

    #[test]
    fn test_decode_implausible_is_none() {
        let layout = CollectionLayout::debuffs();
        assert!(decode_effect(&debuff_bytes(0, 1, 5000, 0), 0, &layout).unwrap().is_none());
        assert!(decode_effect(&debuff_bytes(50_001, 1, 5000, 0), 0, &layout).unwrap().is_none());
        assert!(decode_effect(&debuff_bytes(7, 1, 999, 0), 0, &layout).unwrap().is_none());
        assert!(decode_effect(&debuff_bytes(7, 1, 300_001, 0), 0, &layout).unwrap().is_none());
    }

    #[test]
    fn test_decode_truncated_is_error() {
        let rec = vec![0u8; 0x20];
        let err = decode_effect(&rec, 0, &CollectionLayout::debuffs()).unwrap_err();
        assert!(matches!(err, Error::Decode { offset: 0x30, len: 0x20 }));
    }

    #[test]
    fn test_read_len_caps_records() {
        let layout = CollectionLayout::buffs();
        assert_eq!(layout.read_len(3), 3 * 0x68);
        assert_eq!(layout.read_len(45), 30 * 0x68);
        assert!(!layout.count_is_valid(0));
        assert!(layout.count_is_valid(50));
        assert!(!layout.count_is_valid(51));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(EffectKey::new(87).to_string(), "87");
        assert_eq!(EffectKey::typed(12, 509).to_string(), "12/509");
    }
}
