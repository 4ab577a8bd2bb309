//! Init command implementation.

use std::path::Path;

use anyhow::{Result, bail};
use lookout_core::reaction::{default_buff_rules, default_cc_rules};
use lookout_core::{Config, RuleTable};

/// Write the default config to `path` and create any missing rule files
pub fn run(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let config = Config::default();
    config.save(path)?;
    println!("Wrote {}", path.display());

    let buffs = RuleTable::load_or_create(&config.rules.buff_rules, &default_buff_rules());
    println!(
        "{}: {} rules ({} reactive)",
        config.rules.buff_rules.display(),
        buffs.len(),
        buffs.reactive_len()
    );
    let cc = RuleTable::load_or_create(&config.rules.cc_rules, &default_cc_rules());
    println!(
        "{}: {} rules ({} reactive)",
        config.rules.cc_rules.display(),
        cc.len(),
        cc.reactive_len()
    );
    Ok(())
}
