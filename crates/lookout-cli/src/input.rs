use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use lookout_core::ShutdownSignal;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Console hotkeys handled between ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hotkey {
    ToggleBuffs,
    ToggleDebuffs,
    ToggleVitals,
    ShowObjects,
    ShowEffects,
}

/// Spawn a thread that reads console keys.
///
/// Esc, q and Ctrl+C trigger shutdown; the toggle keys are forwarded to
/// `hotkeys` for the tracking loop to apply.
pub fn spawn_keyboard_monitor(
    shutdown: Arc<ShutdownSignal>,
    hotkeys: Sender<Hotkey>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        debug!("Keyboard monitor started");

        while !shutdown.is_shutdown() {
            if !event::poll(Duration::from_millis(100)).unwrap_or(false) {
                continue;
            }
            let Ok(Event::Key(key_event)) = event::read() else {
                continue;
            };
            if key_event.kind == KeyEventKind::Release {
                continue;
            }
            if should_shutdown(&key_event) {
                debug!("Shutdown key pressed: {:?}", key_event.code);
                shutdown.trigger();
                break;
            }
            if let Some(hotkey) = hotkey_for(&key_event)
                && hotkeys.send(hotkey).is_err()
            {
                break;
            }
        }

        debug!("Keyboard monitor stopped");
    })
}

/// Check if the key event should trigger shutdown.
fn should_shutdown(event: &KeyEvent) -> bool {
    match event.code {
        KeyCode::Esc => true,
        KeyCode::Char('q') | KeyCode::Char('Q') => true,
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => true,
        _ => false,
    }
}

fn hotkey_for(event: &KeyEvent) -> Option<Hotkey> {
    if event.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match event.code {
        KeyCode::Char('b') | KeyCode::Char('B') => Some(Hotkey::ToggleBuffs),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(Hotkey::ToggleDebuffs),
        KeyCode::Char('v') | KeyCode::Char('V') => Some(Hotkey::ToggleVitals),
        KeyCode::Char('o') | KeyCode::Char('O') => Some(Hotkey::ShowObjects),
        KeyCode::Char('e') | KeyCode::Char('E') => Some(Hotkey::ShowEffects),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_shutdown_esc() {
        let event = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert!(should_shutdown(&event));
    }

    #[test]
    fn test_should_shutdown_q_upper() {
        let event = KeyEvent::new(KeyCode::Char('Q'), KeyModifiers::SHIFT);
        assert!(should_shutdown(&event));
    }

    #[test]
    fn test_ctrl_c_is_shutdown_not_toggle() {
        let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(should_shutdown(&event));
        assert_eq!(hotkey_for(&event), None);
    }

    #[test]
    fn test_toggle_keys() {
        let key = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);
        assert_eq!(hotkey_for(&key('b')), Some(Hotkey::ToggleBuffs));
        assert_eq!(hotkey_for(&key('c')), Some(Hotkey::ToggleDebuffs));
        assert_eq!(hotkey_for(&key('V')), Some(Hotkey::ToggleVitals));
        assert_eq!(hotkey_for(&key('o')), Some(Hotkey::ShowObjects));
        assert_eq!(hotkey_for(&key('e')), Some(Hotkey::ShowEffects));
        assert!(!should_shutdown(&key('c')));
    }

    #[test]
    fn test_other_keys_ignored() {
        let event = KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        assert!(!should_shutdown(&event));
        assert_eq!(hotkey_for(&event), None);

        let event = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert!(!should_shutdown(&event));
        assert_eq!(hotkey_for(&event), None);
    }
}
