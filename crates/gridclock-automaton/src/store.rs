//! Preset stores.
//!
//! [`JsonPresetStore`] keeps one pretty-printed JSON file per slot below a
//! workspace root. [`MemoryPresetStore`] keeps presets in a map, for tests
//! and simulation.
//!
//! ## File Structure
//!
//! ```text
//! .gridclock/
//! ├── active_slot.json     # Slot selected on the last run
//! └── presets/
//!     ├── slot-0.json
//!     └── slot-3.json
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use gridclock_core::{Preset, PresetSlot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};
use crate::platform::PresetStore;

/// Name of the store folder inside the workspace root.
pub const STORE_DIR: &str = ".gridclock";

const PRESETS_DIR: &str = "presets";
const ACTIVE_SLOT_FILE: &str = "active_slot.json";

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata stored next to a preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetMetadata {
    /// Version of the file format.
    pub version: u32,

    /// When the preset was written.
    pub saved_at: SystemTime,

    /// Slot the preset was written to.
    pub slot: PresetSlot,

    /// Number of logic edges in the preset.
    pub edge_count: usize,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A preset file: metadata plus config and rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPreset {
    pub metadata: PresetMetadata,
    pub preset: Preset,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct ActiveSlotFile {
    slot: PresetSlot,
}

/// Preset files under `<root>/.gridclock/`.
#[derive(Debug, Clone)]
pub struct JsonPresetStore {
    /// Workspace root.
    root: PathBuf,

    /// Path to the `.gridclock` directory.
    store_dir: PathBuf,
}

impl JsonPresetStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let store_dir = root.join(STORE_DIR);
        Self { root, store_dir }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    fn presets_dir(&self) -> PathBuf {
        self.store_dir.join(PRESETS_DIR)
    }

    /// File holding `slot`.
    pub fn slot_path(&self, slot: PresetSlot) -> PathBuf {
        self.presets_dir().join(format!("slot-{}.json", slot.get()))
    }

    pub fn exists(&self) -> bool {
        self.store_dir.exists()
    }

    /// Create the directory structure.
    pub fn init(&self) -> SessionResult<()> {
        let presets_dir = self.presets_dir();
        if !presets_dir.exists() {
            std::fs::create_dir_all(&presets_dir)?;
            debug!(path = %presets_dir.display(), "Created preset directory");
        }
        Ok(())
    }

    pub fn has_preset(&self, slot: PresetSlot) -> bool {
        self.slot_path(slot).exists()
    }

    /// Write `preset` to `slot` with an optional label.
    pub fn write(
        &self,
        slot: PresetSlot,
        preset: &Preset,
        label: Option<String>,
    ) -> SessionResult<PathBuf> {
        self.init()?;

        let persisted = PersistedPreset {
            metadata: PresetMetadata {
                version: FORMAT_VERSION,
                saved_at: SystemTime::now(),
                slot,
                edge_count: preset.edge_count(),
                label,
            },
            preset: preset.clone(),
        };

        let path = self.slot_path(slot);
        let json = serde_json::to_string_pretty(&persisted)?;
        std::fs::write(&path, json)?;

        info!(
            path = %path.display(),
            slot = slot.get(),
            edges = persisted.metadata.edge_count,
            "Saved preset"
        );
        Ok(path)
    }

    /// Read the file for `slot`, if present.
    pub fn read(&self, slot: PresetSlot) -> SessionResult<Option<PersistedPreset>> {
        let path = self.slot_path(slot);
        if !path.exists() {
            return Ok(None);
        }

        let json = std::fs::read_to_string(&path)?;
        let persisted: PersistedPreset = serde_json::from_str(&json)?;
        if persisted.metadata.version > FORMAT_VERSION {
            return Err(SessionError::store(
                slot,
                format!("unsupported format version {}", persisted.metadata.version),
            ));
        }

        debug!(path = %path.display(), slot = slot.get(), "Loaded preset");
        Ok(Some(persisted))
    }

    /// Slots that have a preset file, in ascending order.
    pub fn list_slots(&self) -> Vec<PresetSlot> {
        PresetSlot::all().filter(|s| self.has_preset(*s)).collect()
    }

    /// Remove all store data.
    pub fn clean(&self) -> SessionResult<()> {
        if self.store_dir.exists() {
            std::fs::remove_dir_all(&self.store_dir)?;
            info!(path = %self.store_dir.display(), "Removed preset store");
        }
        Ok(())
    }

    /// Storage statistics.
    pub fn stats(&self) -> SessionResult<StoreStats> {
        if !self.exists() {
            return Ok(StoreStats::default());
        }

        let mut total_size = 0u64;
        let mut file_count = 0usize;

        for entry in walkdir::WalkDir::new(&self.store_dir)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                total_size += entry.metadata().map(|m| m.len()).unwrap_or(0);
                file_count += 1;
            }
        }

        Ok(StoreStats {
            total_size,
            file_count,
            preset_count: self.list_slots().len(),
            active_slot: self.active_slot()?,
        })
    }
}

impl PresetStore for JsonPresetStore {
    fn load_preset(&self, slot: PresetSlot) -> SessionResult<Option<Preset>> {
        Ok(self.read(slot)?.map(|p| p.preset))
    }

    fn save_preset(&mut self, slot: PresetSlot, preset: &Preset) -> SessionResult<()> {
        self.write(slot, preset, None)?;
        Ok(())
    }

    fn active_slot(&self) -> SessionResult<Option<PresetSlot>> {
        let path = self.store_dir.join(ACTIVE_SLOT_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)?;
        let file: ActiveSlotFile = serde_json::from_str(&json)?;
        Ok(Some(file.slot))
    }

    fn set_active_slot(&mut self, slot: PresetSlot) -> SessionResult<()> {
        self.init()?;
        let path = self.store_dir.join(ACTIVE_SLOT_FILE);
        let json = serde_json::to_string_pretty(&ActiveSlotFile { slot })?;
        std::fs::write(&path, json)?;
        debug!(slot = slot.get(), "Set active slot");
        Ok(())
    }
}

/// Storage statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Total size of all files in bytes.
    pub total_size: u64,

    /// Number of files.
    pub file_count: usize,

    /// Number of written slots.
    pub preset_count: usize,

    /// Slot selected on the last run.
    pub active_slot: Option<PresetSlot>,
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryPresetStore {
    presets: BTreeMap<PresetSlot, Preset>,
    active: Option<PresetSlot>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

impl PresetStore for MemoryPresetStore {
    fn load_preset(&self, slot: PresetSlot) -> SessionResult<Option<Preset>> {
        Ok(self.presets.get(&slot).cloned())
    }

    fn save_preset(&mut self, slot: PresetSlot, preset: &Preset) -> SessionResult<()> {
        self.presets.insert(slot, preset.clone());
        Ok(())
    }

    fn active_slot(&self) -> SessionResult<Option<PresetSlot>> {
        Ok(self.active)
    }

    fn set_active_slot(&mut self, slot: PresetSlot) -> SessionResult<()> {
        self.active = Some(slot);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gridclock_core::{LogicEdge, LogicOperator, RowIndex};
    use tempfile::TempDir;

    fn slot(i: u8) -> PresetSlot {
        PresetSlot::new(i).unwrap()
    }

    #[test]
    fn test_store_init() {
        let dir = TempDir::new().unwrap();
        let store = JsonPresetStore::new(dir.path());

        assert!(!store.exists());
        store.init().unwrap();
        assert!(store.exists());
        assert!(store.store_dir().join("presets").is_dir());
    }

    #[test]
    fn test_save_and_load_preset() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonPresetStore::new(dir.path());

        let mut preset = Preset::default();
        preset.rows[2].logic_edge = Some(LogicEdge::new(
            LogicOperator::Xor,
            RowIndex::new(5).unwrap(),
        ));
        store.save_preset(slot(3), &preset).unwrap();

        assert!(store.has_preset(slot(3)));
        assert_eq!(store.load_preset(slot(3)).unwrap(), Some(preset));
        assert_eq!(store.load_preset(slot(4)).unwrap(), None);

        let persisted = store.read(slot(3)).unwrap().unwrap();
        assert_eq!(persisted.metadata.edge_count, 1);
        assert_eq!(persisted.metadata.slot, slot(3));
    }

    #[test]
    fn test_active_slot_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonPresetStore::new(dir.path());

        assert_eq!(store.active_slot().unwrap(), None);
        store.set_active_slot(slot(9)).unwrap();
        assert_eq!(store.active_slot().unwrap(), Some(slot(9)));
    }

    #[test]
    fn test_list_and_stats() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonPresetStore::new(dir.path());
        assert_eq!(store.stats().unwrap().file_count, 0);

        store.save_preset(slot(1), &Preset::default()).unwrap();
        store.save_preset(slot(0), &Preset::default()).unwrap();
        store.set_active_slot(slot(1)).unwrap();

        assert_eq!(store.list_slots(), vec![slot(0), slot(1)]);
        let stats = store.stats().unwrap();
        assert_eq!(stats.file_count, 3);
        assert_eq!(stats.preset_count, 2);
        assert_eq!(stats.active_slot, Some(slot(1)));
        assert!(stats.total_size > 0);
    }

    #[test]
    fn test_future_version_rejected() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonPresetStore::new(dir.path());
        store.save_preset(slot(2), &Preset::default()).unwrap();

        let path = store.slot_path(slot(2));
        let mut value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        value["metadata"]["version"] = serde_json::json!(FORMAT_VERSION + 1);
        std::fs::write(&path, value.to_string()).unwrap();

        assert!(matches!(
            store.load_preset(slot(2)),
            Err(SessionError::Store { .. })
        ));
    }

    #[test]
    fn test_clean() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonPresetStore::new(dir.path());
        store.save_preset(slot(0), &Preset::default()).unwrap();

        store.clean().unwrap();
        assert!(!store.exists());
        assert!(store.list_slots().is_empty());
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryPresetStore::new();
        assert!(store.is_empty());
        store.save_preset(slot(4), &Preset::default()).unwrap();
        store.set_active_slot(slot(4)).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.active_slot().unwrap(), Some(slot(4)));
        assert!(store.load_preset(slot(4)).unwrap().is_some());
    }
}
