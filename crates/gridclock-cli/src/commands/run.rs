//! Run command implementation.
//!
//! Plays a session on a virtual clock. Every tick is one `Clock` timer
//! expiry; gates and the aux clock are lowered before the next tick.

use std::str::FromStr;

use anyhow::{Context, Result};
use gridclock_automaton::{EdgeChange, EventKind, RecordingPlatform, Session, TimerId};
use gridclock_core::{
    InputMode, LogicDepth, LogicOperator, ModelError, Row, RowIndex, GATE_OUTS,
};
use serde::Serialize;
use tracing::info;

use crate::config::Config;

/// Output format for the run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => anyhow::bail!("Unknown format: {}. Use 'text' or 'json'", s),
        }
    }
}

/// `SRC:OP:DST` edge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeSpec {
    pub source: RowIndex,
    pub operator: LogicOperator,
    pub target: RowIndex,
}

impl FromStr for EdgeSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [source, operator, target] = parts.as_slice() else {
            anyhow::bail!("Invalid edge '{}'. Expected SRC:OP:DST, e.g. 3:and:2", s);
        };
        Ok(Self {
            source: parse_row(source)?,
            operator: operator
                .parse()
                .with_context(|| format!("Invalid operator in edge '{}'", s))?,
            target: parse_row(target)?,
        })
    }
}

/// `ROW:POS` division request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PositionSpec {
    pub row: RowIndex,
    pub position: u8,
}

impl FromStr for PositionSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some((row, position)) = s.split_once(':') else {
            anyhow::bail!("Invalid position '{}'. Expected ROW:POS, e.g. 2:12", s);
        };
        Ok(Self {
            row: parse_row(row)?,
            position: position
                .trim()
                .parse()
                .with_context(|| format!("Invalid position in '{}'", s))?,
        })
    }
}

fn parse_row(s: &str) -> Result<RowIndex> {
    let raw: u8 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid row '{}'", s))?;
    Ok(RowIndex::try_from(raw)?)
}

/// Parse `single` or `nested`.
pub fn parse_depth(s: &str) -> Result<LogicDepth> {
    match s.to_lowercase().as_str() {
        "single" => Ok(LogicDepth::Single),
        "nested" => Ok(LogicDepth::Nested),
        _ => anyhow::bail!("Unknown depth: {}. Use 'single' or 'nested'", s),
    }
}

/// Parsed `gclk run` arguments.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub ticks: u64,
    pub edges: Vec<EdgeSpec>,
    pub positions: Vec<PositionSpec>,
    pub depth: LogicDepth,
    pub rotate_every: Option<u64>,
}

/// Outcome of one requested edge.
#[derive(Debug, Clone, Serialize)]
pub struct EditReport {
    pub edge: EdgeSpec,
    pub accepted: bool,
    pub detail: String,
}

/// Final state of one row.
#[derive(Debug, Clone, Serialize)]
pub struct RowReport {
    pub row: RowIndex,
    pub divisor: u32,
    pub pattern_length: u32,
    pub edge: Option<String>,
    pub fire_count: usize,
}

/// Everything `gclk run` prints.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub ticks: u64,
    pub depth: LogicDepth,
    pub edits: Vec<EditReport>,
    /// Per tick, the rows that fired.
    pub timeline: Vec<Vec<RowIndex>>,
    pub rows: Vec<RowReport>,
}

/// Simulate and build the report.
pub fn simulate(config: &Config, options: &RunOptions) -> Result<RunReport> {
    let engine = config.engine()?;
    let mut platform: RecordingPlatform = RecordingPlatform::default();
    let mut session = Session::new(engine);
    session.init_session(&mut platform)?;
    session.set_logic_depth(options.depth);

    for spec in &options.positions {
        if session.set_position(spec.row, spec.position).is_none() {
            return Err(ModelError::InvalidPosition(spec.position))
                .with_context(|| format!("Cannot move row {}", spec.row));
        }
    }

    let mut edits = Vec::with_capacity(options.edges.len());
    for spec in &options.edges {
        let outcome =
            session.try_apply_edge(spec.source, spec.target, spec.operator, &mut platform);
        let (accepted, detail) = match outcome {
            Some(Ok(EdgeChange::Added(_))) => (true, "added".to_string()),
            Some(Ok(EdgeChange::Replaced { previous, .. })) => (
                true,
                format!("replaced {} {}", previous.operator, previous.target),
            ),
            Some(Ok(EdgeChange::Cleared(_))) => (true, "cleared".to_string()),
            Some(Err(rejection)) => (false, rejection.to_string()),
            None => (false, "edges are ignored in step mode".to_string()),
        };
        edits.push(EditReport {
            edge: *spec,
            accepted,
            detail,
        });
    }

    if options.rotate_every.is_some() {
        session.set_input_mode(InputMode::RotateIn);
    }

    let mut timeline = Vec::new();
    let mut fire_counts = [0usize; GATE_OUTS];
    for tick in 1..=options.ticks {
        session.handle_event(EventKind::timer(TimerId::Clock), &mut platform)?;

        let fired: Vec<RowIndex> = session
            .last_tick()
            .map(|t| t.fired_rows().map(|(row, _)| row).collect())
            .unwrap_or_default();
        for row in &fired {
            fire_counts[row.index()] += 1;
            session.handle_event(EventKind::timer(TimerId::Gate(*row)), &mut platform)?;
        }
        session.handle_event(EventKind::timer(TimerId::ClockOut), &mut platform)?;
        session.render_pass_complete();
        timeline.push(fired);

        if let Some(every) = options.rotate_every.filter(|k| *k > 0) {
            if tick % every == 0 {
                session.handle_event(EventKind::ExternalClock, &mut platform)?;
            }
        }
    }

    info!(ticks = options.ticks, edits = edits.len(), "simulation_complete");

    let rows = RowIndex::all()
        .map(|index| row_report(index, session.row(index), fire_counts[index.index()]))
        .collect();

    Ok(RunReport {
        ticks: options.ticks,
        depth: options.depth,
        edits,
        timeline,
        rows,
    })
}

fn row_report(index: RowIndex, row: &Row, fire_count: usize) -> RowReport {
    RowReport {
        row: index,
        divisor: row.divisor,
        pattern_length: row.pattern_length,
        edge: row
            .logic_edge
            .map(|edge| format!("{} {}", edge.operator, edge.target)),
        fire_count,
    }
}

/// Execute the run command.
pub fn execute(config: &Config, options: &RunOptions, format: OutputFormat) -> Result<()> {
    let report = simulate(config, options)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_text(&report),
    }
    Ok(())
}

fn print_text(report: &RunReport) {
    println!("gridclock run: {} ticks, {:?} depth", report.ticks, report.depth);

    if !report.edits.is_empty() {
        println!();
        println!("Edits:");
        for edit in &report.edits {
            let status = if edit.accepted { "ok" } else { "rejected" };
            println!(
                "  {} {} {}  {:<8} {}",
                edit.edge.source, edit.edge.operator, edit.edge.target, status, edit.detail
            );
        }
    }

    println!();
    println!("{:<4} {:>4} {:>6} {:<8} timeline", "row", "div", "len", "edge");
    println!("{:-<40}", "");
    for row in &report.rows {
        let line: String = report
            .timeline
            .iter()
            .map(|fired| if fired.contains(&row.row) { 'x' } else { '.' })
            .collect();
        println!(
            "{:<4} {:>4} {:>6} {:<8} {}",
            row.row,
            row.divisor,
            row.pattern_length,
            row.edge.as_deref().unwrap_or("-"),
            line
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(i: u8) -> RowIndex {
        RowIndex::new(i).unwrap()
    }

    fn options(edges: &[&str]) -> RunOptions {
        RunOptions {
            ticks: 12,
            edges: edges.iter().map(|s| s.parse().unwrap()).collect(),
            positions: Vec::new(),
            depth: LogicDepth::Single,
            rotate_every: None,
        }
    }

    fn test_config() -> Config {
        Config {
            store_dir: std::env::temp_dir(),
            engine_config: None,
        }
    }

    #[test]
    fn test_parse_edge_spec() {
        let spec: EdgeSpec = "3:and:2".parse().unwrap();
        assert_eq!(spec.source, row(3));
        assert_eq!(spec.operator, LogicOperator::And);
        assert_eq!(spec.target, row(2));

        assert!("3:and".parse::<EdgeSpec>().is_err());
        assert!("9:and:2".parse::<EdgeSpec>().is_err());
        assert!("3:nand:2".parse::<EdgeSpec>().is_err());
    }

    #[test]
    fn test_parse_position_spec() {
        let spec: PositionSpec = "2:12".parse().unwrap();
        assert_eq!(spec.row, row(2));
        assert_eq!(spec.position, 12);
        assert!("2".parse::<PositionSpec>().is_err());
    }

    #[test]
    fn test_simulate_and_edge() {
        let report = simulate(&test_config(), &options(&["3:and:2"])).unwrap();

        assert!(report.edits[0].accepted);
        assert_eq!(report.rows[3].pattern_length, 12);
        assert_eq!(report.rows[3].fire_count, 1);
        assert!(report.timeline[10].contains(&row(3)));
        // row 0 divides by 1
        assert_eq!(report.rows[0].fire_count, 12);
    }

    #[test]
    fn test_simulate_reports_rejection() {
        let report = simulate(&test_config(), &options(&["0:or:1", "1:or:0"])).unwrap();

        assert!(report.edits[0].accepted);
        assert!(!report.edits[1].accepted);
        assert!(report.edits[1].detail.contains("references"));
    }
}
