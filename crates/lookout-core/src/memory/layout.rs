//! Memory layout constants for the observed client
//!
//! These are the built-in defaults for [`crate::config::GameLayout`]. The
//! static offsets drift between client builds, so every value here can be
//! overridden from the config file.

/// Observer (local player) chain, relative to the main module
pub mod observer {
    /// Static pointer to the local player holder
    pub const ROOT: u64 = 0xE9_DC54;
    /// Holder -> entity
    pub const ENTITY: u64 = 0x10;
}

/// Field offsets inside an entity object
pub mod entity {
    /// Type tag (vtable pointer) at the object start
    pub const TYPE_TAG: u64 = 0x0;
    /// Entity -> extended base pointer
    pub const BASE: u64 = 0x38;
    pub const POS_X: u64 = 0x830;
    pub const POS_Z: u64 = 0x834;
    pub const POS_Y: u64 = 0x838;
    pub const VITAL: u64 = 0x84C;

    /// Name chain: entity -> +0x0C -> +0x1C -> bytes
    pub const NAME_PTR1: u64 = 0x0C;
    pub const NAME_PTR2: u64 = 0x1C;
    pub const NAME_MAX_LEN: usize = 32;

    /// Stats chain: entity -> +BASE -> +0x4698 -> +0x10, max vital at +0x420
    pub const TO_ESI: u64 = 0x4698;
    pub const TO_STATS: u64 = 0x10;
    pub const MAX_VITAL: u64 = 0x420;

    /// Bytes past the type tag that must be readable for a full signature
    pub const SIGNATURE_SPAN: u64 = 0x900;
}

/// Secondary vital (mana), relative to the main module
pub mod mana {
    pub const ROOT: u64 = 0x130_D824;
    pub const HOPS: [u64; 7] = [0x0, 0x4, 0x18, 0xB0, 0x10, 0x5C, 0x0];
    pub const MAX: u64 = 0x314;
    pub const CURRENT: u64 = 0x318;
}

/// Status effect collections
pub mod effects {
    /// Extended base -> effect holder
    pub const HOLDER: u64 = 0x1898;

    /// Beneficial effects (buffs)
    pub const BUFF_COUNT: u64 = 0x20;
    pub const BUFF_ARRAY: u64 = 0x28;
    pub const BUFF_SIZE: usize = 0x68;
    pub const BUFF_ID: usize = 0x04;

    /// Harmful effects (debuffs / crowd control)
    pub const DEBUFF_COUNT: u64 = 0xD28;
    pub const DEBUFF_ARRAY: u64 = 0xD30;
    pub const DEBUFF_SIZE: usize = 0x68;
    pub const DEBUFF_ID: usize = 0x00;
    pub const DEBUFF_TYPE: usize = 0x04;

    /// Shared record fields
    pub const DURATION: usize = 0x30;
    pub const REMAINING: usize = 0x34;

    /// A reported count above this means the collection is garbage
    pub const MAX_COUNT: u32 = 50;
    /// Records decoded per tick
    pub const MAX_RECORDS: usize = 30;
}

/// Timing defaults
pub mod timing {
    /// Hot path sampling interval (ms)
    pub const TICK_INTERVAL_MS: u64 = 16;

    /// Minimum time between two dispatched reactions (ms)
    pub const DEBOUNCE_MS: u64 = 100;

    /// Cache TTL for the buff list root (ms)
    pub const BUFF_ROOT_TTL_MS: u64 = 100;

    /// Cache TTL for the debuff list root (ms)
    pub const DEBUFF_ROOT_TTL_MS: u64 = 50;

    /// Background entity scan cadence (ms)
    pub const SCAN_INTERVAL_MS: u64 = 1000;

    /// Vitals are checked every Nth tick
    pub const VITAL_CHECK_EVERY: u64 = 5;

    /// Delay between attach attempts (ms)
    pub const ATTACH_RETRY_MS: u64 = 5000;
}

/// Reaction transport defaults
pub mod reaction {
    /// Presses per dispatched reaction
    pub const REPEAT: u32 = 5;
    /// Delay between presses (ms)
    pub const INTERVAL_MS: u64 = 15;
}
