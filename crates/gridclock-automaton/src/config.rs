//! Engine timing configuration.
//!
//! Device settings (mode, depth, input mode, divisor table) travel inside
//! presets as [`gridclock_core::Config`]. The values here are properties of
//! the host build: gate widths, timer cadences and the tempo range.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SessionError, SessionResult};

/// Width class of a fired gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateWidth {
    /// Fixed width used in logical mode.
    Standard,
    /// Short step gate.
    Short,
    /// Long step gate.
    Long,
}

/// Timing constants for the clock engine and alert blinking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gate width in logical mode (ms).
    pub gate_ms: u32,

    /// Gate width of a short step (ms).
    pub short_gate_ms: u32,

    /// Gate width of a long step (ms).
    pub long_gate_ms: u32,

    /// Width of the auxiliary clock pulse (ms).
    pub clock_out_ms: u32,

    /// Period of the error blink timer (ms).
    pub error_blink_ms: u32,

    /// Cadence of the control-input poll (ms).
    pub housekeeping_ms: u32,

    /// Clock period armed before the first tempo sample (ms).
    pub initial_clock_ms: u32,

    /// Slowest tempo, in speed units.
    pub min_speed: u32,

    /// Fastest tempo, in speed units.
    pub max_speed: u32,

    /// Input changes at or below this distance are ignored.
    pub tempo_deadband: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gate_ms: 10,
            short_gate_ms: 10,
            long_gate_ms: 100,
            clock_out_ms: 10,
            error_blink_ms: 333,
            housekeeping_ms: 4,
            initial_clock_ms: 100,
            min_speed: 30,
            max_speed: 1000,
            tempo_deadband: 0,
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file; missing fields take defaults.
    pub fn load(path: &Path) -> SessionResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| SessionError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        config.validate()?;

        debug!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    /// Reject zero widths and inverted tempo ranges.
    pub fn validate(&self) -> SessionResult<()> {
        let widths = [
            ("gate_ms", self.gate_ms),
            ("short_gate_ms", self.short_gate_ms),
            ("long_gate_ms", self.long_gate_ms),
            ("clock_out_ms", self.clock_out_ms),
            ("error_blink_ms", self.error_blink_ms),
            ("housekeeping_ms", self.housekeeping_ms),
            ("initial_clock_ms", self.initial_clock_ms),
        ];
        if let Some((name, _)) = widths.iter().find(|(_, ms)| *ms == 0) {
            return Err(SessionError::InvalidConfig(format!("{name} must be > 0")));
        }
        if self.min_speed == 0 || self.min_speed > self.max_speed {
            return Err(SessionError::InvalidConfig(format!(
                "speed range {}..={} is empty or starts at zero",
                self.min_speed, self.max_speed
            )));
        }
        Ok(())
    }

    /// Gate width in milliseconds.
    pub fn gate_ms_for(&self, width: GateWidth) -> u32 {
        match width {
            GateWidth::Standard => self.gate_ms,
            GateWidth::Short => self.short_gate_ms,
            GateWidth::Long => self.long_gate_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_width_rejected() {
        let config = EngineConfig {
            gate_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SessionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_inverted_speed_range_rejected() {
        let config = EngineConfig {
            min_speed: 500,
            max_speed: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"long_gate_ms": 250}"#).unwrap();
        assert_eq!(config.long_gate_ms, 250);
        assert_eq!(config.gate_ms, 10);
        assert_eq!(config.gate_ms_for(GateWidth::Long), 250);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"error_blink_ms": 200}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.error_blink_ms, 200);

        let missing = EngineConfig::load(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(SessionError::ConfigFile { .. })));
    }
}
