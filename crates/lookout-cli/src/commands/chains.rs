//! Chains command implementation.

use std::sync::Arc;

use anyhow::Result;
use lookout_core::chain::follow;
use lookout_core::{AddressRange, Config, MemoryReader, PointerChain, ProcessHandle, ReadMemory};
use owo_colors::OwoColorize;

/// Run the chains command
pub fn run(config: &Config) -> Result<()> {
    let process = ProcessHandle::find_and_open(&config.process.name, &config.process.module)?;
    println!(
        "Found process (PID: {}, {} at 0x{:X})",
        process.pid, process.module_name, process.base_address
    );
    let reader = MemoryReader::new(Arc::new(process));

    let layout = &config.layout;
    let timing = &config.timing;
    let chains = [
        layout.observer_chain(),
        layout.effects_chain("debuff_root", timing.debuff_ttl()),
        layout.effects_chain("buff_root", timing.buff_ttl()),
        layout.mana_chain(),
    ];
    for chain in &chains {
        print_chain(&reader, chain, &layout.valid_range);
    }
    Ok(())
}

/// Print every hop of `chain` and where it broke
fn print_chain<R: ReadMemory>(reader: &R, chain: &PointerChain, valid: &AddressRange) {
    let start = chain.root_address(reader.base_address());
    println!();
    println!("=== {} (ttl {} ms) ===", chain.name, chain.ttl_ms);
    println!("  root        0x{:08X}", start);

    let mut current = start;
    for (i, hop) in chain.hops.iter().enumerate() {
        let next = follow(reader, start, &chain.hops[..=i], valid);
        if next == 0 {
            let raw = reader.read_u32(current.wrapping_add(*hop));
            println!(
                "  [{}] +0x{:<5X} -> 0x{:08X} {}",
                i,
                hop,
                raw,
                "invalid".red()
            );
            return;
        }
        println!("  [{}] +0x{:<5X} -> 0x{:08X}", i, hop, next);
        current = next;
    }

    let terminal = chain.walk(reader, valid);
    println!("  resolved    {}", format!("0x{:08X}", terminal).green());
}
