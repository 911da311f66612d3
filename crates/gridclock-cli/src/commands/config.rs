//! Config command implementation.

use anyhow::Result;

use crate::config::Config;

/// Show current configuration and the engine timing it resolves to.
pub fn show(config: &Config) -> Result<()> {
    println!("gridclock CLI Configuration");
    println!("{:-<40}", "");
    println!("Store Directory:     {}", config.store_dir.display());
    println!(
        "Engine Config:       {}",
        config
            .engine_config
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(defaults)".to_string())
    );

    let engine = config.engine()?;
    println!();
    println!("Engine timing");
    println!("  Gate width:        {} ms", engine.gate_ms);
    println!(
        "  Step gates:        {} ms short, {} ms long",
        engine.short_gate_ms, engine.long_gate_ms
    );
    println!("  Aux clock width:   {} ms", engine.clock_out_ms);
    println!("  Error blink:       {} ms", engine.error_blink_ms);
    println!("  Control poll:      {} ms", engine.housekeeping_ms);
    println!(
        "  Tempo range:       {}..={} (deadband {})",
        engine.min_speed, engine.max_speed, engine.tempo_deadband
    );

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}
