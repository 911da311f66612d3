//! Preset command implementation.
//!
//! Reads and initializes the JSON preset store under `<root>/.gridclock`.

use std::path::Path;

use anyhow::{Context, Result};
use gridclock_automaton::{EngineConfig, JsonPresetStore, PresetStore, Session};
use gridclock_core::PresetSlot;

/// List written slots.
pub fn list(root: &Path) -> Result<()> {
    let store = JsonPresetStore::new(root);
    let slots = store.list_slots();

    if slots.is_empty() {
        println!("No presets in {}", store.store_dir().display());
        println!("Run 'gclk preset init' to write the factory preset.");
        return Ok(());
    }

    let active = store.active_slot()?;
    println!("Presets in {}", store.store_dir().display());
    println!("{:-<40}", "");
    for slot in slots {
        let Some(persisted) = store.read(slot)? else {
            continue;
        };
        let marker = if active == Some(slot) { "*" } else { " " };
        println!(
            "{} slot {}  {:?} mode, {:?} depth, {} edges{}",
            marker,
            slot,
            persisted.preset.config.mode,
            persisted.preset.config.logic_depth,
            persisted.metadata.edge_count,
            persisted
                .metadata
                .label
                .map(|l| format!("  ({l})"))
                .unwrap_or_default()
        );
    }

    let stats = store.stats()?;
    println!();
    println!("{} files, {} bytes", stats.file_count, stats.total_size);
    Ok(())
}

/// Print a slot as JSON.
pub fn show(root: &Path, slot: u8) -> Result<()> {
    let slot = PresetSlot::try_from(slot)?;
    let store = JsonPresetStore::new(root);

    let preset = store
        .load_preset(slot)?
        .with_context(|| format!("Slot {} is empty", slot))?;
    println!("{}", serde_json::to_string_pretty(&preset)?);
    Ok(())
}

/// Write factory defaults to slot 0 and make it active.
pub fn init(root: &Path) -> Result<()> {
    let mut store = JsonPresetStore::new(root);
    let mut session = Session::new(EngineConfig::default());
    session
        .init_defaults(&mut store)
        .with_context(|| format!("Failed to initialize store in {}", store.root().display()))?;

    println!(
        "Wrote factory preset to {}",
        store.slot_path(session.active_slot()).display()
    );
    Ok(())
}
