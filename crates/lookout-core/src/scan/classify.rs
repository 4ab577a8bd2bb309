//! Post-scan classification.

use crate::entity::{Classification, ObjectRecord};

/// Drop the observer and hidden objects, then tag survivors.
///
/// `hidden_prefixes` are compared case-insensitively. Names containing
/// whitespace belong to NPCs; player names cannot contain spaces.
pub fn classify(
    records: Vec<ObjectRecord>,
    observer_address: u64,
    hidden_prefixes: &[String],
) -> Vec<ObjectRecord> {
    records
        .into_iter()
        .filter(|r| r.address != observer_address)
        .filter(|r| !is_hidden(&r.name, hidden_prefixes))
        .map(|mut r| {
            r.classification = classify_name(&r.name);
            r
        })
        .collect()
}

pub fn classify_name(name: &str) -> Classification {
    if name.chars().any(char::is_whitespace) {
        Classification::Npc
    } else {
        Classification::Player
    }
}

fn is_hidden(name: &str, prefixes: &[String]) -> bool {
    let lower = name.to_ascii_lowercase();
    prefixes
        .iter()
        .any(|p| lower.starts_with(&p.to_ascii_lowercase()))
}
