//! Key injection for reactions.
//!
//! A press is sent "clean": modifiers the user is holding that are not part
//! of the combo are released first and restored afterwards, so a held Shift
//! does not turn F1 into Shift+F1.

use std::sync::Arc;

use lookout_core::reaction::modifier_covers;
use lookout_core::{ActionExecutor, KeyCombo, LogExecutor};
#[cfg(target_os = "windows")]
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub vk: u8,
    pub up: bool,
}

impl KeyStroke {
    const fn down(vk: u8) -> Self {
        Self { vk, up: false }
    }

    const fn up(vk: u8) -> Self {
        Self { vk, up: true }
    }
}

/// Strokes for one clean press of `combo` while `held` modifiers are down
pub fn press_sequence(combo: &KeyCombo, held: &[u8]) -> Vec<KeyStroke> {
    let stray: Vec<u8> = held
        .iter()
        .copied()
        .filter(|&vk| !combo.covers_modifier(vk))
        .collect();
    let missing: Vec<u8> = combo
        .modifiers
        .iter()
        .copied()
        .filter(|&m| !held.iter().any(|&vk| modifier_covers(m, vk)))
        .collect();

    let mut strokes = Vec::with_capacity(2 * (stray.len() + missing.len()) + 2);
    strokes.extend(stray.iter().map(|&vk| KeyStroke::up(vk)));
    strokes.extend(missing.iter().map(|&vk| KeyStroke::down(vk)));
    strokes.push(KeyStroke::down(combo.key));
    strokes.push(KeyStroke::up(combo.key));
    strokes.extend(missing.iter().rev().map(|&vk| KeyStroke::up(vk)));
    strokes.extend(stray.iter().map(|&vk| KeyStroke::down(vk)));
    strokes
}

/// Executor for the watch loop: real input on Windows unless `dry_run`
pub fn select(dry_run: bool) -> Arc<dyn ActionExecutor> {
    #[cfg(target_os = "windows")]
    if !dry_run {
        info!("Reactions send keyboard input");
        return Arc::new(windows_impl::SendInputExecutor);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = dry_run;
    Arc::new(LogExecutor)
}

#[cfg(target_os = "windows")]
mod windows_impl {
    use std::thread;

    use lookout_core::reaction::SIDED_MODIFIERS;
    use lookout_core::{ActionExecutor, Error, ResponseAction, Result};
    use tracing::debug;
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        GetAsyncKeyState, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBD_EVENT_FLAGS, KEYBDINPUT,
        KEYEVENTF_KEYUP, MAPVK_VK_TO_VSC, MapVirtualKeyW, SendInput, VIRTUAL_KEY,
    };

    use super::{KeyStroke, press_sequence};

    /// Injects key presses with `SendInput`
    pub struct SendInputExecutor;

    fn held_modifiers() -> Vec<u8> {
        SIDED_MODIFIERS
            .iter()
            .copied()
            // SAFETY: GetAsyncKeyState only reads global key state.
            .filter(|&vk| unsafe { GetAsyncKeyState(vk as i32) } < 0)
            .collect()
    }

    fn to_input(stroke: KeyStroke) -> INPUT {
        // SAFETY: MapVirtualKeyW is a pure table lookup.
        let scan = unsafe { MapVirtualKeyW(stroke.vk as u32, MAPVK_VK_TO_VSC) } as u16;
        let flags = if stroke.up {
            KEYEVENTF_KEYUP
        } else {
            KEYBD_EVENT_FLAGS(0)
        };
        INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: VIRTUAL_KEY(stroke.vk as u16),
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    impl ActionExecutor for SendInputExecutor {
        fn invoke(&self, action: &ResponseAction) -> Result<()> {
            for i in 0..action.repeat {
                if i > 0 && !action.interval.is_zero() {
                    thread::sleep(action.interval);
                }

                let inputs: Vec<INPUT> = press_sequence(&action.combo, &held_modifiers())
                    .into_iter()
                    .map(to_input)
                    .collect();
                // SAFETY: `inputs` is a valid slice of keyboard INPUTs.
                let sent =
                    unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) } as usize;
                if sent != inputs.len() {
                    return Err(Error::ActionFailed(format!(
                        "{}: SendInput accepted {} of {} events",
                        action.combo,
                        sent,
                        inputs.len()
                    )));
                }
            }
            debug!("Sent {} x{}", action.combo, action.repeat);
            Ok(())
        }
    }
}
