//! Clock and tempo engine.
//!
//! Per tick the engine either advances every row's phase and decides which
//! rows fire, or rotates the row divisions one row up. Both paths work in
//! place on the row array; nothing is allocated while ticking.

use gridclock_core::{base_fires, combined_fires, Config, Mode, RowIndex, StepGate, GATE_OUTS};
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{EngineConfig, GateWidth};
use crate::rows::RowStore;

// =============================================================================
// Tempo
// =============================================================================

/// Map a raw 16-bit control reading to a clamped speed.
pub fn speed_from_input(input: u16, engine: &EngineConfig) -> u32 {
    (u32::from(input) >> 6).clamp(engine.min_speed, engine.max_speed)
}

/// Smoothed tempo derived from the control input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tempo {
    /// Last input that caused a recompute.
    pub last_input: Option<u16>,
    /// Current speed, in speed units.
    pub speed: u32,
    /// Current clock period (ms).
    pub period_ms: u32,
}

impl Tempo {
    pub fn new(engine: &EngineConfig) -> Self {
        Self {
            last_input: None,
            speed: 60_000 / engine.initial_clock_ms.max(1),
            period_ms: engine.initial_clock_ms,
        }
    }

    /// Feed a control reading.
    ///
    /// Returns the new period when it changed, so the caller can re-arm the
    /// clock timer. Readings within the deadband of the last one are ignored.
    pub fn sample(&mut self, input: u16, engine: &EngineConfig) -> Option<u32> {
        if let Some(last) = self.last_input {
            if input.abs_diff(last) <= engine.tempo_deadband {
                return None;
            }
        }
        self.last_input = Some(input);

        let speed = speed_from_input(input, engine);
        let period_ms = 60_000 / speed.max(1);
        self.speed = speed;
        if period_ms == self.period_ms {
            return None;
        }

        self.period_ms = period_ms;
        Some(period_ms)
    }
}

// =============================================================================
// Ticking
// =============================================================================

/// Fire decisions of one tick, indexed by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TickResult {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Gate width of each row that fired.
    pub fired: [Option<GateWidth>; GATE_OUTS],
}

impl TickResult {
    /// Rows that fired, with their gate widths.
    pub fn fired_rows(&self) -> impl Iterator<Item = (RowIndex, GateWidth)> + '_ {
        RowIndex::all().filter_map(|row| self.fired[row.index()].map(|width| (row, width)))
    }

    pub fn fired_count(&self) -> usize {
        self.fired.iter().filter(|f| f.is_some()).count()
    }
}

/// Whether `index` fires at its current phase, and with which gate width.
pub fn row_fires(rows: &RowStore, config: &Config, index: RowIndex) -> Option<GateWidth> {
    let row = rows.row(index);
    match config.mode {
        Mode::Logical => {
            let (operator, other) = match row.logic_edge {
                Some(edge) => (Some(edge.operator), rows.row(edge.target).divisor),
                None => (None, 1),
            };
            combined_fires(operator, row.divisor, other, row.phase).then_some(GateWidth::Standard)
        }
        Mode::Step => {
            if !base_fires(row.divisor, row.phase) {
                return None;
            }
            match row.current_step() {
                StepGate::Off => None,
                StepGate::Short => Some(GateWidth::Short),
                StepGate::Long => Some(GateWidth::Long),
            }
        }
    }
}

/// Phase advance and rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockEngine {
    tempo: Tempo,
    ticks: u64,
    rotations: u64,
}

impl ClockEngine {
    pub fn new(engine: &EngineConfig) -> Self {
        Self {
            tempo: Tempo::new(engine),
            ticks: 0,
            rotations: 0,
        }
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub fn tempo_mut(&mut self) -> &mut Tempo {
        &mut self.tempo
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    /// Advance every row one step and collect fire decisions.
    ///
    /// Fired rows get their `blink` flag set.
    pub fn advance(&mut self, rows: &mut RowStore, config: &Config) -> TickResult {
        self.ticks += 1;
        let mut result = TickResult {
            tick: self.ticks,
            ..Default::default()
        };

        for row in rows.rows_mut() {
            let length = row.pattern_length.max(1);
            row.phase = (row.phase + 1) % length;
        }

        for index in RowIndex::all() {
            if let Some(width) = row_fires(rows, config, index) {
                result.fired[index.index()] = Some(width);
                rows.row_mut(index).blink = true;
            }
        }

        trace!(tick = self.ticks, fired = result.fired_count(), "clock_tick");
        result
    }

    /// Shift `(position, divisor, pattern_length)` one row up.
    ///
    /// Row 7 takes row 0's values. Edges and step slots stay with their row;
    /// phases are wrapped into the new pattern length.
    pub fn rotate(&mut self, rows: &mut RowStore) {
        let rows = rows.rows_mut();
        let first = (rows[0].position, rows[0].divisor, rows[0].pattern_length);

        for i in 0..GATE_OUTS - 1 {
            rows[i].position = rows[i + 1].position;
            rows[i].divisor = rows[i + 1].divisor;
            rows[i].pattern_length = rows[i + 1].pattern_length;
        }
        let last = &mut rows[GATE_OUTS - 1];
        (last.position, last.divisor, last.pattern_length) = first;

        for row in rows.iter_mut() {
            row.phase %= row.pattern_length.max(1);
        }

        self.rotations += 1;
        debug!(rotations = self.rotations, "rows_rotated");
    }

    /// Put every row back at the start of its pattern.
    pub fn reset_phases(&mut self, rows: &mut RowStore) {
        for row in rows.rows_mut() {
            row.phase = 0;
        }
        debug!(tick = self.ticks, "phases_reset");
    }
}
