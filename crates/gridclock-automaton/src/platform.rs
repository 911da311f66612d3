//! Contracts for the hardware and storage collaborators.
//!
//! The core never touches pins, timers or flash directly. A host implements
//! these traits and passes itself into every session handler.

use std::fmt;

use gridclock_core::{Preset, PresetSlot, RowIndex};
use serde::{Deserialize, Serialize};

use crate::error::SessionResult;

/// Identifier of a timed event owned by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerId {
    /// Periodic control-input poll.
    Housekeeping,
    /// Periodic master clock.
    Clock,
    /// One-shot end of the auxiliary clock pulse.
    ClockOut,
    /// Periodic alert blink.
    Error,
    /// One-shot end of a row's gate.
    Gate(RowIndex),
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerId::Housekeeping => f.write_str("housekeeping"),
            TimerId::Clock => f.write_str("clock"),
            TimerId::ClockOut => f.write_str("clock_out"),
            TimerId::Error => f.write_str("error"),
            TimerId::Gate(row) => write!(f, "gate_{row}"),
        }
    }
}

/// How often a scheduled event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Repeat {
    Once,
    Periodic,
}

/// Timer service.
///
/// Scheduling an id that is already pending replaces it.
pub trait Scheduler {
    /// Arm `id` to fire after `delay_ms`.
    fn schedule(&mut self, id: TimerId, delay_ms: u32, repeat: Repeat);

    /// Change the period of a periodic event.
    fn update_interval(&mut self, id: TimerId, period_ms: u32);

    /// Drop a pending event, if any.
    fn cancel(&mut self, id: TimerId);
}

/// Gate and clock pin writers.
pub trait GateOutputs {
    fn set_gate(&mut self, row: RowIndex, high: bool);

    fn set_aux_clock(&mut self, high: bool);
}

/// Knob and clock-jack sampling.
pub trait ControlInputs {
    /// Raw tempo control, full 16-bit range.
    fn read_control(&mut self) -> u16;

    /// Whether a cable is feeding the external clock input.
    fn external_clock_present(&self) -> bool;
}

/// Non-volatile preset storage.
pub trait PresetStore {
    /// Preset saved in `slot`, or `None` if the slot was never written.
    fn load_preset(&self, slot: PresetSlot) -> SessionResult<Option<Preset>>;

    fn save_preset(&mut self, slot: PresetSlot, preset: &Preset) -> SessionResult<()>;

    /// Slot selected on the last run.
    fn active_slot(&self) -> SessionResult<Option<PresetSlot>>;

    fn set_active_slot(&mut self, slot: PresetSlot) -> SessionResult<()>;
}

/// Everything a session handler needs from its host.
pub trait Platform: Scheduler + GateOutputs + ControlInputs + PresetStore {}

impl<T> Platform for T where T: Scheduler + GateOutputs + ControlInputs + PresetStore + ?Sized {}
