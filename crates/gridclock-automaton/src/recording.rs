//! Host stand-in that records every call the core makes.
//!
//! Used by the test suites and by the command-line simulator. Timers are not
//! driven by wall time; the caller reads [`RecordingPlatform::pending`] and
//! delivers `TimerExpired` events itself.

use std::collections::BTreeMap;

use gridclock_core::{Preset, PresetSlot, RowIndex, GATE_OUTS};
use serde::Serialize;

use crate::error::SessionResult;
use crate::platform::{ControlInputs, GateOutputs, PresetStore, Repeat, Scheduler, TimerId};
use crate::store::MemoryPresetStore;

/// One observed collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PlatformCall {
    Schedule {
        id: TimerId,
        delay_ms: u32,
        repeat: Repeat,
    },
    UpdateInterval {
        id: TimerId,
        period_ms: u32,
    },
    Cancel {
        id: TimerId,
    },
    SetGate {
        row: RowIndex,
        high: bool,
    },
    SetAuxClock {
        high: bool,
    },
}

/// Recording host with a pluggable preset store.
#[derive(Debug, Clone)]
pub struct RecordingPlatform<S: PresetStore = MemoryPresetStore> {
    /// Calls in the order they were made.
    pub calls: Vec<PlatformCall>,
    /// Value returned by `read_control`.
    pub control_input: u16,
    /// Whether an external clock is plugged in.
    pub external_clock: bool,
    /// Current level of every gate.
    pub gates: [bool; GATE_OUTS],
    /// Current level of the aux clock.
    pub aux_clock: bool,
    /// Armed timers with their period and repeat kind.
    pub pending: BTreeMap<TimerId, (u32, Repeat)>,
    /// Rising edges seen per row.
    pub gate_rises: [u64; GATE_OUTS],
    pub store: S,
}

impl Default for RecordingPlatform<MemoryPresetStore> {
    fn default() -> Self {
        Self::with_store(MemoryPresetStore::default())
    }
}

impl<S: PresetStore> RecordingPlatform<S> {
    pub fn with_store(store: S) -> Self {
        Self {
            calls: Vec::new(),
            control_input: 0,
            external_clock: false,
            gates: [false; GATE_OUTS],
            aux_clock: false,
            pending: BTreeMap::new(),
            gate_rises: [0; GATE_OUTS],
            store,
        }
    }

    /// Drain the recorded calls.
    pub fn take_calls(&mut self) -> Vec<PlatformCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn is_armed(&self, id: TimerId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Period of an armed timer.
    pub fn interval(&self, id: TimerId) -> Option<u32> {
        self.pending.get(&id).map(|(ms, _)| *ms)
    }

    /// Forget a fired one-shot timer, as a real scheduler would.
    pub fn fire(&mut self, id: TimerId) {
        if let Some((_, Repeat::Once)) = self.pending.get(&id) {
            self.pending.remove(&id);
        }
    }
}

impl<S: PresetStore> Scheduler for RecordingPlatform<S> {
    fn schedule(&mut self, id: TimerId, delay_ms: u32, repeat: Repeat) {
        self.pending.insert(id, (delay_ms, repeat));
        self.calls.push(PlatformCall::Schedule {
            id,
            delay_ms,
            repeat,
        });
    }

    fn update_interval(&mut self, id: TimerId, period_ms: u32) {
        if let Some(entry) = self.pending.get_mut(&id) {
            entry.0 = period_ms;
        }
        self.calls.push(PlatformCall::UpdateInterval { id, period_ms });
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.remove(&id);
        self.calls.push(PlatformCall::Cancel { id });
    }
}

impl<S: PresetStore> GateOutputs for RecordingPlatform<S> {
    fn set_gate(&mut self, row: RowIndex, high: bool) {
        if high && !self.gates[row.index()] {
            self.gate_rises[row.index()] += 1;
        }
        self.gates[row.index()] = high;
        self.calls.push(PlatformCall::SetGate { row, high });
    }

    fn set_aux_clock(&mut self, high: bool) {
        self.aux_clock = high;
        self.calls.push(PlatformCall::SetAuxClock { high });
    }
}

impl<S: PresetStore> ControlInputs for RecordingPlatform<S> {
    fn read_control(&mut self) -> u16 {
        self.control_input
    }

    fn external_clock_present(&self) -> bool {
        self.external_clock
    }
}

impl<S: PresetStore> PresetStore for RecordingPlatform<S> {
    fn load_preset(&self, slot: PresetSlot) -> SessionResult<Option<Preset>> {
        self.store.load_preset(slot)
    }

    fn save_preset(&mut self, slot: PresetSlot, preset: &Preset) -> SessionResult<()> {
        self.store.save_preset(slot, preset)
    }

    fn active_slot(&self) -> SessionResult<Option<PresetSlot>> {
        self.store.active_slot()
    }

    fn set_active_slot(&mut self, slot: PresetSlot) -> SessionResult<()> {
        self.store.set_active_slot(slot)
    }
}
