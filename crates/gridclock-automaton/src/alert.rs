//! Rejected-edit alert.
//!
//! A rejection highlights the offending row for a few blink periods, then
//! clears itself. A second rejection while alerting restarts the blink on
//! the new row.

use gridclock_core::RowIndex;
use serde::Serialize;

/// Error-timer ticks before an alert clears.
pub const ALERT_PHASES: u8 = 5;

/// Alert state machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AlertState {
    #[default]
    Idle,
    Alerting {
        row: RowIndex,
        phase_counter: u8,
    },
}

impl AlertState {
    /// Start (or restart) an alert on `row`.
    pub fn raise(&mut self, row: RowIndex) {
        *self = AlertState::Alerting {
            row,
            phase_counter: 0,
        };
    }

    /// Advance on an error-timer tick.
    ///
    /// Returns `true` when this tick cleared the alert.
    pub fn tick(&mut self) -> bool {
        match *self {
            AlertState::Idle => false,
            AlertState::Alerting { row, phase_counter } => {
                let next = phase_counter + 1;
                if next >= ALERT_PHASES {
                    *self = AlertState::Idle;
                    true
                } else {
                    *self = AlertState::Alerting {
                        row,
                        phase_counter: next,
                    };
                    false
                }
            }
        }
    }

    pub fn clear(&mut self) {
        *self = AlertState::Idle;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AlertState::Alerting { .. })
    }

    pub fn offending_row(&self) -> Option<RowIndex> {
        match self {
            AlertState::Alerting { row, .. } => Some(*row),
            AlertState::Idle => None,
        }
    }

    pub fn phase_counter(&self) -> Option<u8> {
        match self {
            AlertState::Alerting { phase_counter, .. } => Some(*phase_counter),
            AlertState::Idle => None,
        }
    }

    /// Row to draw highlighted right now, if any.
    pub fn highlight(&self) -> Option<RowIndex> {
        match self {
            AlertState::Alerting { row, phase_counter } if phase_counter % 2 == 1 => Some(*row),
            _ => None,
        }
    }
}
