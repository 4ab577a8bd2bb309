//! Key-combo strings ("CTRL+SHIFT+F1") and their virtual-key codes

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

pub const VK_SHIFT: u8 = 0x10;
pub const VK_CONTROL: u8 = 0x11;
pub const VK_ALT: u8 = 0x12;
pub const VK_LSHIFT: u8 = 0xA0;
pub const VK_RSHIFT: u8 = 0xA1;
pub const VK_LCONTROL: u8 = 0xA2;
pub const VK_RCONTROL: u8 = 0xA3;
pub const VK_LALT: u8 = 0xA4;
pub const VK_RALT: u8 = 0xA5;

/// Side-specific modifiers, in the order they are polled
pub const SIDED_MODIFIERS: [u8; 6] = [
    VK_LSHIFT,
    VK_RSHIFT,
    VK_LCONTROL,
    VK_RCONTROL,
    VK_LALT,
    VK_RALT,
];

/// Whether modifier `m` is satisfied by holding `vk`
pub fn modifier_covers(m: u8, vk: u8) -> bool {
    m == vk
        || (m == VK_SHIFT && matches!(vk, VK_LSHIFT | VK_RSHIFT))
        || (m == VK_CONTROL && matches!(vk, VK_LCONTROL | VK_RCONTROL))
        || (m == VK_ALT && matches!(vk, VK_LALT | VK_RALT))
}

fn modifier_code(name: &str) -> Option<u8> {
    Some(match name {
        "SHIFT" => VK_SHIFT,
        "CTRL" | "CONTROL" => VK_CONTROL,
        "ALT" => VK_ALT,
        "LSHIFT" => VK_LSHIFT,
        "RSHIFT" => VK_RSHIFT,
        "LCTRL" | "LCONTROL" => VK_LCONTROL,
        "RCTRL" | "RCONTROL" => VK_RCONTROL,
        "LALT" => VK_LALT,
        "RALT" => VK_RALT,
        _ => return None,
    })
}

fn key_code(name: &str) -> Option<u8> {
    let bytes = name.as_bytes();
    if bytes.len() == 1 && (bytes[0].is_ascii_uppercase() || bytes[0].is_ascii_digit()) {
        return Some(bytes[0]);
    }
    if let Some(n) = name.strip_prefix('F')
        && let Ok(n) = n.parse::<u8>()
        && (1..=12).contains(&n)
    {
        return Some(0x6F + n);
    }
    if let Some(n) = name
        .strip_prefix("NUMPAD")
        .or_else(|| name.strip_prefix("NUM"))
        && let [d @ b'0'..=b'9'] = n.as_bytes()
    {
        return Some(0x60 + (d - b'0'));
    }

    Some(match name {
        "SPACE" => 0x20,
        "ENTER" => 0x0D,
        "TAB" => 0x09,
        "ESC" | "ESCAPE" => 0x1B,
        "BACKSPACE" => 0x08,
        "DELETE" => 0x2E,
        "INSERT" => 0x2D,
        "HOME" => 0x24,
        "END" => 0x23,
        "PAGEUP" => 0x21,
        "PAGEDOWN" => 0x22,
        "UP" => 0x26,
        "DOWN" => 0x28,
        "LEFT" => 0x25,
        "RIGHT" => 0x27,
        "`" | "~" | "TILDE" => 0xC0,
        "-" => 0xBD,
        "=" => 0xBB,
        "[" => 0xDB,
        "]" => 0xDD,
        "\\" => 0xDC,
        ";" => 0xBA,
        "'" => 0xDE,
        "," => 0xBC,
        "." => 0xBE,
        "/" => 0xBF,
        _ => return None,
    })
}

/// A main key plus held modifiers, as virtual-key codes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Vec<u8>,
    pub key: u8,
    raw: String,
}

impl KeyCombo {
    /// Parse "MOD+MOD+KEY" case-insensitively.
    ///
    /// The last part is the main key. Earlier parts are modifiers, or plain
    /// keys held like modifiers.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidKeyCombo(input.to_string());
        let upper = input.trim().to_ascii_uppercase();
        let parts: Vec<&str> = upper
            .split('+')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        let (main, held) = parts.split_last().ok_or_else(invalid)?;

        let modifiers = held
            .iter()
            .map(|p| modifier_code(p).or_else(|| key_code(p)).ok_or_else(invalid))
            .collect::<Result<Vec<u8>>>()?;
        let key = key_code(main).ok_or_else(invalid)?;

        Ok(Self {
            modifiers,
            key,
            raw: input.trim().to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether a physically held modifier is part of this combo. A generic
    /// SHIFT/CTRL/ALT in the combo covers both sides.
    pub fn covers_modifier(&self, vk: u8) -> bool {
        self.modifiers.iter().any(|&m| modifier_covers(m, vk))
    }
}

impl FromStr for KeyCombo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
