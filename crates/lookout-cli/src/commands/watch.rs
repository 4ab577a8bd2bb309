//! Main tracking mode command.

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};

use anyhow::Result;
use lookout_core::{Config, EffectMonitor, ShutdownSignal, TickReport, Tracker, TransitionKind};
use owo_colors::OwoColorize;
use tracing::{debug, info};

use crate::commands::scan::print_objects;
use crate::executor;
use crate::input::{self, Hotkey};
use crate::retry::attach_with_retry;

/// Run the main tracking mode
pub fn run(config: &Config, dry_run: bool) -> Result<()> {
    let shutdown = Arc::new(ShutdownSignal::new());
    let shutdown_ctrlc = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping...");
        shutdown_ctrlc.trigger();
    })?;

    let (hotkey_tx, hotkeys) = mpsc::channel();
    let _keyboard_handle = input::spawn_keyboard_monitor(Arc::clone(&shutdown), hotkey_tx);

    let executor = executor::select(dry_run);
    let mut tracker = Tracker::new(config, executor);

    println!(
        "Waiting for {}... (Esc/q quit, b/c/v toggle BUFF/CC/vitals, o objects, e effects)",
        config.process.name
    );
    while let Some(reader) =
        attach_with_retry(&config.process, config.timing.attach_retry(), &shutdown)
    {
        println!("{}", "Attached, tracking".green());
        tracker.run(reader, &shutdown, |tracker, summary| {
            apply_hotkeys(tracker, &hotkeys);
            print_transitions(tracker.debuffs(), &summary.debuffs);
            print_transitions(tracker.buffs(), &summary.buffs);
            if let Some(rule) = &summary.vital {
                println!("{} {}", "[VITAL]".magenta(), rule);
            }
        });

        if shutdown.is_shutdown() {
            break;
        }
        debug!("Process disconnected, waiting for reconnect...");
        println!("{}", "Process gone, waiting to re-attach".yellow());
        if shutdown.wait(config.timing.attach_retry()) {
            break;
        }
    }

    info!("Shutdown complete");
    Ok(())
}

fn apply_hotkeys(tracker: &mut Tracker, hotkeys: &Receiver<Hotkey>) {
    while let Ok(hotkey) = hotkeys.try_recv() {
        match hotkey {
            Hotkey::ToggleBuffs => toggle_reactions(tracker.buffs_mut()),
            Hotkey::ToggleDebuffs => toggle_reactions(tracker.debuffs_mut()),
            Hotkey::ToggleVitals => {
                let vitals = tracker.vitals_mut();
                let enabled = !vitals.is_enabled();
                vitals.set_enabled(enabled);
                println!("[VITAL] reactions {}", on_off(enabled));
            }
            Hotkey::ShowObjects => print_objects(&tracker.objects(), Some(15)),
            Hotkey::ShowEffects => {
                print_effects(tracker.debuffs());
                print_effects(tracker.buffs());
            }
        }
    }
}

fn toggle_reactions(monitor: &mut EffectMonitor) {
    let dispatcher = monitor.dispatcher_mut();
    let enabled = !dispatcher.is_enabled();
    dispatcher.set_enabled(enabled);
    println!("[{}] reactions {}", dispatcher.label(), on_off(enabled));
}

fn on_off(enabled: bool) -> String {
    if enabled {
        "on".green().to_string()
    } else {
        "off".red().to_string()
    }
}

/// Print this tick's transitions, which are the newest entries of the log
fn print_transitions(monitor: &EffectMonitor, report: &TickReport) {
    let fresh = report.entered.len() + report.exited.len();
    if report.invalidated {
        println!("[{}] {}", monitor.kind(), "collection reset".dimmed());
    }
    if fresh == 0 {
        return;
    }

    let mut events: Vec<_> = monitor.events().iter().rev().take(fresh).collect();
    events.reverse();
    for event in events {
        let name = if event.name.is_empty() {
            "?"
        } else {
            event.name.as_str()
        };
        let time = event.timestamp.format("%H:%M:%S%.3f");
        match event.kind {
            TransitionKind::Enter if event.reacted => println!(
                "{} [{}] {} {} ({}) {}",
                time,
                monitor.kind(),
                "+".green(),
                name.bold(),
                event.key,
                "-> react".cyan()
            ),
            TransitionKind::Enter => println!(
                "{} [{}] {} {} ({})",
                time,
                monitor.kind(),
                "+".green(),
                name,
                event.key
            ),
            TransitionKind::Exit => println!(
                "{} [{}] {} {} ({})",
                time,
                monitor.kind(),
                "-".red(),
                name.dimmed(),
                event.key
            ),
        }
    }
}

fn print_effects(monitor: &EffectMonitor) {
    println!(
        "[{}] {} active ({}), {} reactions",
        monitor.kind(),
        monitor.effects().len(),
        monitor.state(),
        monitor.dispatcher().reactions()
    );
    for effect in monitor.effects() {
        println!(
            "  #{:<2} {:<12} {:<24} {:>6}/{} ms",
            effect.slot,
            effect.key.to_string(),
            effect.name,
            effect.duration_remaining,
            effect.duration_total
        );
    }
}
