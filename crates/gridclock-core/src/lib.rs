//! Core domain types shared across the gridclock workspace.
//!
//! A gridclock has eight gate outputs ("rows"). Each row divides the master
//! clock by a divisor picked from a fixed table, and may be combined with one
//! other row's pulse train through a boolean operator:
//!
//! ```text
//! row 0  ÷4  ──AND──▶ row 1 ÷3     fires when both fire: every 12 ticks
//! row 2  ÷2
//! ...
//! row 7  ÷8
//! ```
//!
//! This crate only holds data and pure functions. Validation of the logic
//! graph, ticking and persistence live in `gridclock-automaton`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod trigger;

pub use trigger::{base_fires, combined_fires};

// =============================================================================
// Constants
// =============================================================================

/// Number of gate outputs, one per grid row.
pub const GATE_OUTS: usize = 8;

/// Upper bound on logic edges in a nested graph.
///
/// Keeps at least two rows without an outgoing edge.
pub const MAX_LOGIC_EDGES: usize = GATE_OUTS - 2;

/// Number of gate slots per row in step mode.
pub const STEP_SLOTS: usize = 16;

/// Number of preset slots offered by the store.
pub const PRESET_SLOTS: u8 = 10;

/// Leftmost grid column that selects a division.
pub const FIRST_POSITION: u8 = 4;

/// Rightmost grid column that selects a division.
pub const LAST_POSITION: u8 = 15;

/// Twelve clock divisions, indexed by `position - FIRST_POSITION`.
pub type DivisorTable = [u32; 12];

/// Factory divisor table: slow on the left of the grid, fast on the right.
pub const DEFAULT_DIVISOR_TABLE: DivisorTable = [128, 64, 32, 16, 8, 7, 6, 5, 4, 3, 2, 1];

/// Largest divisor a table entry may hold.
pub const MAX_DIVISOR: u32 = 128;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised when building model values from raw input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Row index outside `0..GATE_OUTS`.
    #[error("row index {0} out of range (expected 0..8)")]
    InvalidRowIndex(u8),

    /// Preset slot outside `0..PRESET_SLOTS`.
    #[error("preset slot {0} out of range (expected 0..10)")]
    InvalidPresetSlot(u8),

    /// Position outside the division columns.
    #[error("position {0} is not a division column (expected 4..=15)")]
    InvalidPosition(u8),

    /// A divisor table entry of zero would never fire.
    #[error("divisor table entry {entry} is zero")]
    ZeroDivisor { entry: usize },

    /// A divisor table entry above [`MAX_DIVISOR`].
    #[error("divisor table entry {entry} is {divisor} (expected at most 128)")]
    DivisorTooLarge { entry: usize, divisor: u32 },

    /// Operator name not recognised.
    #[error("unknown logic operator: {0:?}")]
    UnknownOperator(String),
}

/// Why an edit to the logic graph was refused.
///
/// Rejections are ordinary values: the row store is left untouched and the
/// session raises an alert for the offending row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditRejection {
    /// The selected row tried to reference itself.
    #[error("a row cannot reference itself")]
    SelfReference,

    /// The target already references the selected row.
    #[error("target row already references the selected row")]
    DirectCycle,

    /// The edge would close a longer reference loop.
    #[error("edge would close a reference cycle")]
    TransitiveCycle,

    /// Another row already references the target (nested depth only).
    #[error("target row is already referenced by another row")]
    AlreadyTargeted,

    /// The nested graph already holds the maximum number of edges.
    #[error("logic edge capacity reached")]
    CapacityExceeded,
}

// =============================================================================
// Identifiers
// =============================================================================

/// Index of one of the eight rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct RowIndex(u8);

impl RowIndex {
    /// Top row.
    pub const MIN: RowIndex = RowIndex(0);

    /// Bottom row.
    pub const MAX: RowIndex = RowIndex(GATE_OUTS as u8 - 1);

    /// Create a row index, or `None` when out of range.
    pub fn new(index: u8) -> Option<Self> {
        (usize::from(index) < GATE_OUTS).then_some(Self(index))
    }

    /// Position in row arrays.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Raw value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Iterate over all rows, top to bottom.
    pub fn all() -> impl Iterator<Item = RowIndex> {
        (0..GATE_OUTS as u8).map(RowIndex)
    }
}

impl TryFrom<u8> for RowIndex {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ModelError::InvalidRowIndex(value))
    }
}

impl From<RowIndex> for u8 {
    fn from(row: RowIndex) -> Self {
        row.0
    }
}

impl fmt::Display for RowIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a preset slot in the external store.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PresetSlot(u8);

impl PresetSlot {
    /// Create a slot, or `None` when out of range.
    pub fn new(slot: u8) -> Option<Self> {
        (slot < PRESET_SLOTS).then_some(Self(slot))
    }

    /// Raw value.
    pub fn get(self) -> u8 {
        self.0
    }

    /// Iterate over every slot.
    pub fn all() -> impl Iterator<Item = PresetSlot> {
        (0..PRESET_SLOTS).map(PresetSlot)
    }
}

impl TryFrom<u8> for PresetSlot {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(ModelError::InvalidPresetSlot(value))
    }
}

impl From<PresetSlot> for u8 {
    fn from(slot: PresetSlot) -> Self {
        slot.0
    }
}

impl fmt::Display for PresetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Logic
// =============================================================================

/// Boolean operator carried by a logic edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicOperator {
    And,
    Or,
    Xor,
    Nor,
}

impl LogicOperator {
    /// Every operator, in grid order.
    pub const ALL: [LogicOperator; 4] = [Self::And, Self::Or, Self::Xor, Self::Nor];

    /// Combine the two operands' fire decisions.
    pub fn combine(self, a: bool, b: bool) -> bool {
        match self {
            LogicOperator::And => a && b,
            LogicOperator::Or => a || b,
            LogicOperator::Xor => a != b,
            LogicOperator::Nor => !a && !b,
        }
    }

    /// Operator bound to a logic column on a plain grid press.
    ///
    /// NOR has no column of its own; it is reached by holding a logic key.
    pub fn from_grid_column(x: u8) -> Option<Self> {
        match x {
            1 => Some(LogicOperator::And),
            2 => Some(LogicOperator::Or),
            3 => Some(LogicOperator::Xor),
            _ => None,
        }
    }

    /// Upper-case label.
    pub fn label(&self) -> &'static str {
        match self {
            LogicOperator::And => "AND",
            LogicOperator::Or => "OR",
            LogicOperator::Xor => "XOR",
            LogicOperator::Nor => "NOR",
        }
    }
}

impl fmt::Display for LogicOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LogicOperator {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(LogicOperator::And),
            "or" => Ok(LogicOperator::Or),
            "xor" => Ok(LogicOperator::Xor),
            "nor" => Ok(LogicOperator::Nor),
            _ => Err(ModelError::UnknownOperator(s.to_string())),
        }
    }
}

/// Directed reference from one row to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicEdge {
    /// How the two pulse trains are combined.
    pub operator: LogicOperator,
    /// Row whose divisor is the second operand.
    pub target: RowIndex,
}

impl LogicEdge {
    pub fn new(operator: LogicOperator, target: RowIndex) -> Self {
        Self { operator, target }
    }
}

// =============================================================================
// Step mode
// =============================================================================

/// Gate marker for a single step slot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepGate {
    #[default]
    Off,
    Short,
    Long,
}

impl StepGate {
    /// Next marker in the press cycle Off → Short → Long → Off.
    pub fn cycle(self) -> Self {
        match self {
            StepGate::Off => StepGate::Short,
            StepGate::Short => StepGate::Long,
            StepGate::Long => StepGate::Off,
        }
    }

    /// Whether this slot produces a gate.
    pub fn is_on(self) -> bool {
        !matches!(self, StepGate::Off)
    }
}

// =============================================================================
// Config
// =============================================================================

/// Which per-row fields drive the outputs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Divisions plus optional logic edges.
    #[default]
    Logical,
    /// Divisions gated by a 16-slot step pattern.
    Step,
}

/// How far logic edges may chain.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicDepth {
    /// Only depth-1 pairs; A→B and B→A may not coexist.
    #[default]
    Single,
    /// Acyclic chains with single fan-in and a global edge cap.
    Nested,
}

/// Role of the external clock input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// External pulses advance every row's phase.
    #[default]
    ClockIn,
    /// External pulses rotate row divisions one row up.
    RotateIn,
}

/// Device-wide configuration, stored with every preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_divisor_table")]
    pub divisor_table: DivisorTable,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub logic_depth: LogicDepth,
    #[serde(default)]
    pub input_mode: InputMode,
}

fn default_divisor_table() -> DivisorTable {
    DEFAULT_DIVISOR_TABLE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            divisor_table: DEFAULT_DIVISOR_TABLE,
            mode: Mode::default(),
            logic_depth: LogicDepth::default(),
            input_mode: InputMode::default(),
        }
    }
}

impl Config {
    /// Divisor selected by a grid position.
    pub fn divisor_for(&self, position: u8) -> Option<u32> {
        if !(FIRST_POSITION..=LAST_POSITION).contains(&position) {
            return None;
        }
        self.divisor_table
            .get(usize::from(position - FIRST_POSITION))
            .copied()
    }

    /// Pattern length of a row with no logic edge.
    pub fn base_pattern_length(&self, divisor: u32) -> u32 {
        let divisor = divisor.max(1);
        match self.mode {
            Mode::Logical => divisor,
            Mode::Step => divisor.saturating_mul(STEP_SLOTS as u32),
        }
    }

    /// Check that every divisor lies in `1..=MAX_DIVISOR`.
    pub fn validate(&self) -> Result<(), ModelError> {
        for (entry, &divisor) in self.divisor_table.iter().enumerate() {
            if divisor == 0 {
                return Err(ModelError::ZeroDivisor { entry });
            }
            if divisor > MAX_DIVISOR {
                return Err(ModelError::DivisorTooLarge { entry, divisor });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Rows
// =============================================================================

/// One gate output channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Grid column selecting the divisor (`4..=15`).
    pub position: u8,
    /// Clock division looked up from the table.
    pub divisor: u32,
    /// Optional reference to another row.
    #[serde(default)]
    pub logic_edge: Option<LogicEdge>,
    /// Period of this row's fire pattern, in ticks.
    pub pattern_length: u32,
    /// Current step within the pattern.
    #[serde(default)]
    pub phase: u32,
    /// Set when the row fires; cleared after a render pass.
    #[serde(skip)]
    pub blink: bool,
    /// Step-mode gate markers.
    #[serde(default)]
    pub steps: [StepGate; STEP_SLOTS],
}

impl Row {
    /// Factory row for `index` under `config`.
    ///
    /// Row `i` sits at position `15 - i`: row 0 follows the clock, row 7
    /// divides by 8 with the default table.
    pub fn with_defaults(index: RowIndex, config: &Config) -> Self {
        let position = LAST_POSITION - index.get();
        let divisor = config.divisor_for(position).unwrap_or(1).max(1);
        Self {
            position,
            divisor,
            logic_edge: None,
            pattern_length: config.base_pattern_length(divisor),
            phase: 0,
            blink: false,
            steps: [StepGate::Off; STEP_SLOTS],
        }
    }

    /// Slot currently under the playhead in step mode.
    pub fn current_step(&self) -> StepGate {
        let slot = (self.phase / self.divisor.max(1)) as usize % STEP_SLOTS;
        self.steps[slot]
    }

    /// Whether the row references `target`.
    pub fn targets(&self, target: RowIndex) -> bool {
        self.logic_edge.is_some_and(|edge| edge.target == target)
    }
}

/// Full set of rows under `config` defaults.
pub fn default_rows(config: &Config) -> [Row; GATE_OUTS] {
    std::array::from_fn(|i| {
        let index = RowIndex(i as u8);
        Row::with_defaults(index, config)
    })
}

// =============================================================================
// Presets
// =============================================================================

/// Snapshot of config and rows, as exchanged with the preset store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub config: Config,
    pub rows: [Row; GATE_OUTS],
}

impl Default for Preset {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl Preset {
    /// Factory rows under the given config.
    pub fn with_config(config: Config) -> Self {
        let rows = default_rows(&config);
        Self { config, rows }
    }

    /// Number of logic edges across all rows.
    pub fn edge_count(&self) -> usize {
        self.rows.iter().filter(|r| r.logic_edge.is_some()).count()
    }
}

// =============================================================================
// Tests
// =============================================================================
