//! Session controller: event dispatch, mode switching and preset handling.
//!
//! A [`Session`] owns all mutable state of the device. The host feeds it one
//! [`EventKind`] at a time together with a [`Platform`]; each event runs to
//! completion before the next.

use gridclock_core::{
    Config, EditRejection, InputMode, LogicDepth, LogicOperator, Mode, Preset, PresetSlot, Row,
    RowIndex, StepGate, GATE_OUTS, STEP_SLOTS,
};
use tracing::{debug, info};

use crate::alert::AlertState;
use crate::clock::{ClockEngine, Tempo, TickResult};
use crate::config::EngineConfig;
use crate::error::{SessionError, SessionResult};
use crate::event::{EventKind, Page};
use crate::platform::{ControlInputs, GateOutputs, Platform, PresetStore, Repeat, Scheduler, TimerId};
use crate::resolver::{graph_satisfies, EditOutcome, LogicGraph};
use crate::rows::RowStore;
use crate::sync::refresh_lengths;

/// Owned state of one running device.
#[derive(Debug, Clone)]
pub struct Session {
    config: Config,
    engine: EngineConfig,
    rows: RowStore,
    clock: ClockEngine,
    alert: AlertState,
    selected_row: RowIndex,
    active_slot: PresetSlot,
    page: Page,
    just_saved: bool,
    last_rejection: Option<EditRejection>,
    last_tick: Option<TickResult>,
}

impl Session {
    /// Session with factory rows and config.
    pub fn new(engine: EngineConfig) -> Self {
        Self::from_preset(Preset::default(), engine)
    }

    /// Session running `preset` as-is.
    pub fn from_preset(preset: Preset, engine: EngineConfig) -> Self {
        let clock = ClockEngine::new(&engine);
        Self {
            config: preset.config,
            engine,
            rows: RowStore::new(preset.rows),
            clock,
            alert: AlertState::Idle,
            selected_row: RowIndex::MIN,
            active_slot: PresetSlot::default(),
            page: Page::Main,
            just_saved: false,
            last_rejection: None,
            last_tick: None,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rows(&self) -> &[Row; GATE_OUTS] {
        self.rows.rows()
    }

    pub fn row(&self, index: RowIndex) -> &Row {
        self.rows.row(index)
    }

    pub fn alert(&self) -> AlertState {
        self.alert
    }

    pub fn selected_row(&self) -> RowIndex {
        self.selected_row
    }

    pub fn active_slot(&self) -> PresetSlot {
        self.active_slot
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Set by a save; cleared by [`Session::render_pass_complete`].
    pub fn just_saved(&self) -> bool {
        self.just_saved
    }

    pub fn tempo(&self) -> &Tempo {
        self.clock.tempo()
    }

    pub fn ticks(&self) -> u64 {
        self.clock.ticks()
    }

    /// Reason of the most recent rejected edit.
    pub fn last_rejection(&self) -> Option<EditRejection> {
        self.last_rejection
    }

    /// Fire decisions of the most recent phase advance.
    pub fn last_tick(&self) -> Option<&TickResult> {
        self.last_tick.as_ref()
    }

    /// Current config and rows, without transient UI flags.
    pub fn snapshot(&self) -> Preset {
        let mut rows = self.rows.clone();
        rows.clear_blinks();
        Preset {
            config: self.config.clone(),
            rows: rows.into_rows(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// First boot: write factory settings to slot 0 and select it.
    pub fn init_defaults<S: PresetStore + ?Sized>(&mut self, store: &mut S) -> SessionResult<()> {
        let slot = PresetSlot::default();
        let preset = Preset::default();
        store.save_preset(slot, &preset)?;
        store.set_active_slot(slot)?;

        self.replace_state(preset);
        self.active_slot = slot;
        info!(slot = slot.get(), "defaults_initialized");
        Ok(())
    }

    /// Restore the active preset and start the clock.
    ///
    /// Falls back to [`Session::init_defaults`] when the store has no active
    /// slot or the slot is empty.
    pub fn init_session<P: Platform + ?Sized>(&mut self, platform: &mut P) -> SessionResult<()> {
        let loaded = match platform.active_slot()? {
            Some(slot) => self.load_preset(slot, platform)?,
            None => false,
        };
        if !loaded {
            self.init_defaults(platform)?;
        }

        platform.schedule(TimerId::Clock, self.clock.tempo().period_ms, Repeat::Periodic);
        platform.schedule(
            TimerId::Housekeeping,
            self.engine.housekeeping_ms,
            Repeat::Periodic,
        );
        self.poll_tempo(platform);

        info!(
            slot = self.active_slot.get(),
            mode = ?self.config.mode,
            period_ms = self.clock.tempo().period_ms,
            "session_started"
        );
        Ok(())
    }

    /// Dispatch one event.
    ///
    /// Only store access can fail; every other path is infallible.
    pub fn handle_event<P: Platform + ?Sized>(
        &mut self,
        event: EventKind,
        platform: &mut P,
    ) -> SessionResult<()> {
        match event {
            EventKind::GridPress { x, y } => self.grid_press(x, y, platform),
            EventKind::GridHold { x, y } => self.grid_hold(x, y, platform),
            EventKind::ExternalClock => match self.config.input_mode {
                InputMode::ClockIn => {
                    if platform.external_clock_present() {
                        self.tick(platform);
                    }
                }
                InputMode::RotateIn => self.rotate(),
            },
            EventKind::TimerExpired { id } => self.timer_expired(id, platform),
            EventKind::FrontButtonPressed => self.clock.reset_phases(&mut self.rows),
            EventKind::FrontButtonHeld => {
                let slot = self.active_slot;
                self.save_preset(slot, platform)?;
            }
        }
        Ok(())
    }

    /// Called by the renderer after drawing a frame.
    pub fn render_pass_complete(&mut self) {
        self.rows.clear_blinks();
        self.just_saved = false;
    }

    // =========================================================================
    // Grid
    // =========================================================================

    fn grid_press<P: Platform + ?Sized>(&mut self, x: u8, y: u8, platform: &mut P) {
        let Some(row) = RowIndex::new(y) else {
            return;
        };

        match (self.config.mode, self.page) {
            (Mode::Step, Page::Steps) => {
                if let Some(slot) = self.rows.row_mut(row).steps.get_mut(usize::from(x)) {
                    *slot = slot.cycle();
                    debug!(row = %row, slot = x, gate = ?*slot, "step_cycled");
                }
            }
            (mode, _) => match x {
                0 => self.select_row(row),
                1..=3 if mode == Mode::Logical => {
                    if let Some(operator) = LogicOperator::from_grid_column(x) {
                        self.try_apply_edge(self.selected_row, row, operator, platform);
                    }
                }
                _ => {
                    self.set_position(row, x);
                }
            },
        }
    }

    fn grid_hold<P: Platform + ?Sized>(&mut self, x: u8, y: u8, platform: &mut P) {
        let Some(row) = RowIndex::new(y) else {
            return;
        };

        match (self.config.mode, x) {
            (Mode::Logical, 1..=3) => {
                self.try_apply_edge(self.selected_row, row, LogicOperator::Nor, platform);
            }
            (Mode::Step, 0) => {
                self.page = self.page.toggled();
                debug!(page = ?self.page, "page_toggled");
            }
            _ => {}
        }
    }

    pub fn select_row(&mut self, row: RowIndex) {
        self.selected_row = row;
    }

    // =========================================================================
    // Edits
    // =========================================================================

    /// Apply a logic edge, raising the alert on rejection.
    ///
    /// Returns `None` in step mode, where rows carry no edges.
    pub fn try_apply_edge<S: Scheduler + ?Sized>(
        &mut self,
        selected: RowIndex,
        target: RowIndex,
        operator: LogicOperator,
        scheduler: &mut S,
    ) -> Option<EditOutcome> {
        if self.config.mode != Mode::Logical {
            return None;
        }

        let outcome = LogicGraph::new(&mut self.rows, &self.config)
            .try_apply_edge(selected, target, operator);

        if let Err(rejection) = outcome {
            info!(
                row = %selected,
                target = %target,
                op = %operator,
                reason = %rejection,
                "edge_rejected"
            );
            self.last_rejection = Some(rejection);
            self.alert.raise(target);
            scheduler.schedule(TimerId::Error, self.engine.error_blink_ms, Repeat::Periodic);
        }
        Some(outcome)
    }

    /// Move a row to a division column; `None` if `position` is not one.
    pub fn set_position(&mut self, row: RowIndex, position: u8) -> Option<u32> {
        LogicGraph::new(&mut self.rows, &self.config).set_position(row, position)
    }

    /// Switch between logical and step mode.
    ///
    /// Edges and step slots go back to their defaults and phases restart;
    /// each row keeps its division.
    pub fn switch_mode<S: Scheduler + ?Sized>(&mut self, mode: Mode, scheduler: &mut S) {
        if self.config.mode == mode {
            return;
        }
        self.config.mode = mode;
        for index in RowIndex::all() {
            let row = self.rows.row_mut(index);
            row.logic_edge = None;
            row.steps = [StepGate::Off; STEP_SLOTS];
            row.phase = 0;
        }
        refresh_lengths(&mut self.rows, &self.config);
        self.page = Page::Main;
        self.dismiss_alert(scheduler);
        info!(mode = ?mode, "mode_switched");
    }

    /// Change logic depth.
    ///
    /// Edges that break the new depth's rules are all dropped.
    pub fn set_logic_depth(&mut self, depth: LogicDepth) {
        if self.config.logic_depth == depth {
            return;
        }
        let keep = graph_satisfies(&self.rows, depth);
        self.config.logic_depth = depth;

        if !keep {
            LogicGraph::new(&mut self.rows, &self.config).clear_edges();
        }
        info!(depth = ?depth, edges_kept = keep, "logic_depth_changed");
    }

    pub fn set_input_mode(&mut self, input_mode: InputMode) {
        self.config.input_mode = input_mode;
        debug!(input_mode = ?input_mode, "input_mode_changed");
    }

    // =========================================================================
    // Presets
    // =========================================================================

    /// Replace config and rows with the preset in `slot`.
    ///
    /// Returns `false`, leaving the session untouched, if the slot is empty.
    pub fn load_preset<S: PresetStore + ?Sized>(
        &mut self,
        slot: PresetSlot,
        store: &mut S,
    ) -> SessionResult<bool> {
        let Some(preset) = store.load_preset(slot)? else {
            debug!(slot = slot.get(), "preset_slot_empty");
            return Ok(false);
        };
        validate_preset(slot, &preset)?;
        store.set_active_slot(slot)?;

        self.replace_state(preset);
        self.active_slot = slot;
        info!(slot = slot.get(), edges = self.rows.edge_count(), "preset_loaded");
        Ok(true)
    }

    /// Persist config and rows to `slot`.
    pub fn save_preset<S: PresetStore + ?Sized>(
        &mut self,
        slot: PresetSlot,
        store: &mut S,
    ) -> SessionResult<()> {
        store.save_preset(slot, &self.snapshot())?;
        self.just_saved = true;
        info!(slot = slot.get(), "preset_saved");
        Ok(())
    }

    fn dismiss_alert<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.alert.is_pending() {
            scheduler.cancel(TimerId::Error);
        }
        self.alert.clear();
    }

    fn replace_state(&mut self, preset: Preset) {
        self.config = preset.config;
        self.rows = RowStore::new(preset.rows);
        self.clock.reset_phases(&mut self.rows);
        self.rows.clear_blinks();
        self.alert.clear();
        self.last_rejection = None;
        self.page = Page::Main;
    }

    // =========================================================================
    // Clock
    // =========================================================================

    /// Advance phases and raise the gates of rows that fire.
    pub fn tick<P: GateOutputs + Scheduler + ?Sized>(&mut self, platform: &mut P) -> TickResult {
        let result = self.clock.advance(&mut self.rows, &self.config);
        for (row, width) in result.fired_rows() {
            platform.set_gate(row, true);
            platform.schedule(
                TimerId::Gate(row),
                self.engine.gate_ms_for(width),
                Repeat::Once,
            );
        }
        self.last_tick = Some(result);
        result
    }

    /// Rotate row divisions one row up.
    pub fn rotate(&mut self) {
        self.clock.rotate(&mut self.rows);
    }

    fn poll_tempo<P: ControlInputs + Scheduler + ?Sized>(&mut self, platform: &mut P) {
        let input = platform.read_control();
        if let Some(period_ms) = self.clock.tempo_mut().sample(input, &self.engine) {
            platform.update_interval(TimerId::Clock, period_ms);
            info!(
                speed = self.clock.tempo().speed,
                period_ms,
                "tempo_changed"
            );
        }
    }

    fn timer_expired<P: Platform + ?Sized>(&mut self, id: TimerId, platform: &mut P) {
        match id {
            TimerId::Housekeeping => self.poll_tempo(platform),
            TimerId::Clock => {
                platform.set_aux_clock(true);
                platform.schedule(TimerId::ClockOut, self.engine.clock_out_ms, Repeat::Once);

                let external_drives = self.config.input_mode == InputMode::ClockIn
                    && platform.external_clock_present();
                if !external_drives {
                    self.tick(platform);
                }
            }
            TimerId::ClockOut => platform.set_aux_clock(false),
            TimerId::Error => {
                // an alert dropped by a preset load leaves the timer running
                if !self.alert.is_pending() {
                    platform.cancel(TimerId::Error);
                } else if self.alert.tick() {
                    platform.cancel(TimerId::Error);
                    debug!("alert_cleared");
                }
            }
            TimerId::Gate(row) => platform.set_gate(row, false),
        }
    }
}

/// Reject presets whose rows break an invariant of their config.
fn validate_preset(slot: PresetSlot, preset: &Preset) -> SessionResult<()> {
    let invalid = |reason: String| SessionError::invalid_preset(slot, reason);

    preset
        .config
        .validate()
        .map_err(|e| invalid(e.to_string()))?;

    for (i, row) in preset.rows.iter().enumerate() {
        let expected = preset.config.divisor_for(row.position);
        if expected != Some(row.divisor) {
            return Err(invalid(format!(
                "row {i}: divisor {} does not match position {}",
                row.divisor, row.position
            )));
        }
        if row.pattern_length == 0 {
            return Err(invalid(format!("row {i}: pattern length is zero")));
        }
    }

    let rows = RowStore::new(preset.rows.clone());
    match preset.config.mode {
        Mode::Step if rows.edge_count() > 0 => {
            Err(invalid("step mode preset carries logic edges".to_string()))
        }
        Mode::Logical if !graph_satisfies(&rows, preset.config.logic_depth) => Err(invalid(
            format!("edges break {:?} depth rules", preset.config.logic_depth),
        )),
        _ => Ok(()),
    }
}
