//! Event-driven control core for the gridclock.
//!
//! The crate turns host events (grid presses, clock pulses, timer expiries)
//! into row edits, phase advances and gate writes. Hardware and storage stay
//! behind the traits in [`platform`]; a [`Session`] is handed a platform on
//! every call and owns nothing else.
//!
//! ## Layers
//!
//! ```text
//! Session ──▶ LogicGraph (resolver) ──▶ sync (pattern length / phase)
//!    │                                     │
//!    ├──▶ ClockEngine ──▶ trigger evaluator (gridclock-core)
//!    └──▶ AlertState
//! ```
//!
//! ## Edit flow
//!
//! A grid press on a logic column asks the resolver for an edge from the
//! selected row. An accepted edge recomputes every affected row before the
//! handler returns, so the next tick sees the settled graph. A rejected edge
//! leaves the rows untouched and starts the alert blink on the pressed row.

mod alert;
mod clock;
pub mod config;
mod error;
mod event;
pub mod platform;
pub mod recording;
mod resolver;
mod rows;
mod session;
pub mod store;
mod sync;

pub use alert::{AlertState, ALERT_PHASES};
pub use clock::{row_fires, speed_from_input, ClockEngine, Tempo, TickResult};
pub use config::{EngineConfig, GateWidth};
pub use error::{SessionError, SessionResult};
pub use event::{EventKind, Page};
pub use platform::{
    ControlInputs, GateOutputs, Platform, PresetStore, Repeat, Scheduler, TimerId,
};
pub use recording::{PlatformCall, RecordingPlatform};
pub use resolver::{
    downward_chain, graph_satisfies, upward_chain, EdgeChange, EditOutcome, LogicGraph,
};
pub use rows::{RowStack, RowStore};
pub use session::Session;
pub use store::{
    JsonPresetStore, MemoryPresetStore, PersistedPreset, PresetMetadata, StoreStats, STORE_DIR,
};
pub use sync::{aligned_phase, pattern_length_for, refresh_lengths, resync_row};
