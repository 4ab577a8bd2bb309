//! Plausibility predicates applied to scan candidates, cheapest first.

use serde::{Deserialize, Serialize};

use crate::config::Bounds;
use crate::entity::Vec3;

/// Display-name constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameRules {
    pub min_len: usize,
    pub max_len: usize,
    pub min_letters: usize,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            min_len: 2,
            max_len: 32,
            min_letters: 2,
        }
    }
}

pub fn tag_filter(tag: u32, range: &Bounds<u32>) -> bool {
    range.contains(tag)
}

pub fn vital_filter(vital: u32, range: &Bounds<u32>) -> bool {
    range.contains(vital)
}

/// Finite, inside `limit`, and not exactly zero
pub fn coord_filter(value: f32, limit: f32) -> bool {
    value.is_finite() && value.abs() < limit && value != 0.0
}

pub fn position_filter(position: &Vec3, limit: f32) -> bool {
    coord_filter(position.x, limit)
        && coord_filter(position.y, limit)
        && coord_filter(position.z, limit)
}

pub fn radius_filter(distance: f32, max_radius: f32) -> bool {
    distance <= max_radius
}

/// Length is counted in characters, so each replaced byte counts once.
pub fn name_filter(name: &str, rules: &NameRules) -> bool {
    let len = name.chars().count();
    if len < rules.min_len || len > rules.max_len {
        return false;
    }
    if name.chars().any(char::is_control) {
        return false;
    }
    name.bytes().filter(u8::is_ascii_alphabetic).count() >= rules.min_letters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::decode_name;

    #[test]
    fn test_tag_filter_half_open_default() {
        let range = Bounds::new(0x3900_0000, 0x3AFF_FFFF);
        assert!(tag_filter(0x3900_0000, &range));
        assert!(tag_filter(0x3AFF_FFFC, &range));
        assert!(!tag_filter(0x3B00_0000, &range));
        assert!(!tag_filter(0x38FF_FFFF, &range));
    }

    #[test]
    fn test_vital_filter() {
        let range = Bounds::new(100, 10_000_000);
        assert!(vital_filter(100, &range));
        assert!(vital_filter(10_000_000, &range));
        assert!(!vital_filter(99, &range));
        assert!(!vital_filter(10_000_001, &range));
    }

    #[test]
    fn test_coord_filter() {
        assert!(coord_filter(1.5, 100_000.0));
        assert!(coord_filter(-99_999.0, 100_000.0));
        assert!(!coord_filter(0.0, 100_000.0));
        assert!(!coord_filter(100_000.0, 100_000.0));
        assert!(!coord_filter(f32::NAN, 100_000.0));
        assert!(!coord_filter(f32::INFINITY, 100_000.0));
    }

    #[test]
    fn test_position_filter_rejects_any_zero_axis() {
        assert!(position_filter(&Vec3::new(1.0, 2.0, 3.0), 100_000.0));
        assert!(!position_filter(&Vec3::new(1.0, 0.0, 3.0), 100_000.0));
    }

    #[test]
    fn test_radius_filter_inclusive() {
        assert!(radius_filter(1000.0, 1000.0));
        assert!(!radius_filter(1000.1, 1000.0));
    }

    #[test]
    fn test_name_filter() {
        let rules = NameRules::default();
        assert!(name_filter("Kyrios", &rules));
        assert!(name_filter("Elder Ynystere", &rules));
        assert!(name_filter("ab", &rules));
        assert!(!name_filter("a", &rules));
        assert!(!name_filter("12345", &rules));
        assert!(!name_filter("a1", &rules));
        assert!(!name_filter("bad\x07name", &rules));
        assert!(!name_filter(&"x".repeat(33), &rules));
    }

    #[test]
    fn test_name_filter_counts_replaced_bytes_once() {
        // 31 raw bytes, seven of them not valid UTF-8.
        let mut raw = [b'C', b'a', b'f', 0xE9].repeat(7);
        raw.extend_from_slice(b"Bob");
        let name = decode_name(&raw);
        assert!(name.len() > 32);
        assert_eq!(name.chars().count(), 31);
        assert!(name_filter(&name, &NameRules::default()));
    }
}
