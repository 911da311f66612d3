//! Events delivered to the session by the host dispatcher.

use serde::{Deserialize, Serialize};

use crate::platform::TimerId;

/// Grid page shown in step mode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// Row selection and divisions.
    #[default]
    Main,
    /// Step slot editing.
    Steps,
}

impl Page {
    pub fn toggled(self) -> Self {
        match self {
            Page::Main => Page::Steps,
            Page::Steps => Page::Main,
        }
    }
}

/// Input to [`Session::handle_event`](crate::Session::handle_event).
///
/// Coordinates are raw grid values; out-of-range values are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    /// Key pressed down.
    GridPress { x: u8, y: u8 },
    /// Key held past the hold threshold.
    GridHold { x: u8, y: u8 },
    /// Rising edge on the external clock jack.
    ExternalClock,
    /// A scheduled timer fired.
    TimerExpired { id: TimerId },
    /// Front panel button tapped.
    FrontButtonPressed,
    /// Front panel button held.
    FrontButtonHeld,
}

impl EventKind {
    pub fn timer(id: TimerId) -> Self {
        EventKind::TimerExpired { id }
    }
}
