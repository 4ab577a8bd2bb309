//! One-shot entity scan around the observer.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};
use lookout_core::{
    ChainResolver, Classification, Config, MemoryReader, ObjectRecord, ProcessHandle,
    read_observer, scan_objects,
};
use owo_colors::OwoColorize;

/// Run the scan command
pub fn run(config: &Config, limit: Option<usize>, json: bool) -> Result<()> {
    let process = ProcessHandle::find_and_open(&config.process.name, &config.process.module)?;
    println!(
        "Found process (PID: {}, {} at 0x{:X})",
        process.pid, process.module_name, process.base_address
    );
    let reader = MemoryReader::new(Arc::new(process));

    let layout = &config.layout;
    let mut resolver = ChainResolver::new(layout.valid_range);
    let Some(observer) = read_observer(
        &reader,
        &mut resolver,
        &layout.observer_chain(),
        &layout.entity,
    ) else {
        bail!("Observer chain did not resolve (not in world?)");
    };
    println!(
        "Observer {:?} at 0x{:X} ({:.1}, {:.1}, {:.1})",
        observer.name,
        observer.address,
        observer.position.x,
        observer.position.y,
        observer.position.z
    );

    let started = Instant::now();
    let objects = scan_objects(
        &reader,
        &observer,
        &config.scan,
        &layout.entity,
        layout.valid_range,
    );
    println!(
        "Scanned {} regions in {:.2?}",
        config.scan.regions.len(),
        started.elapsed()
    );

    if json {
        let shown = &objects[..limit.unwrap_or(objects.len()).min(objects.len())];
        println!("{}", serde_json::to_string_pretty(shown)?);
    } else {
        print_objects(&objects, limit);
    }
    Ok(())
}

/// Print objects nearest first as a table
pub fn print_objects(objects: &[ObjectRecord], limit: Option<usize>) {
    let shown = limit.unwrap_or(objects.len()).min(objects.len());
    println!("=== Objects ({} of {}) ===", shown, objects.len());
    for object in &objects[..shown] {
        let class = format!("{:<6}", object.classification);
        let class = match object.classification {
            Classification::Npc => class.yellow().to_string(),
            Classification::Player => class.cyan().to_string(),
            Classification::Unknown => class,
        };
        let vital = match object.vital_fraction() {
            Some(f) if f <= 0.3 => format!("{:>5.1}%", f * 100.0).red().to_string(),
            Some(f) => format!("{:>5.1}%", f * 100.0),
            None => "    ?".to_string(),
        };
        println!(
            "  {:>7.1}m  {} {:<24} {} {:>8}/{:<8} 0x{:08X}",
            object.distance,
            class,
            object.name,
            vital,
            object.vital,
            object.max_vital,
            object.address
        );
    }
}
