//! Per-tick step records and the sinks that collect them

use serde::Serialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::core::error::Result;
use crate::core::types::{Orientation, Position, Tick};
use crate::rules::action::{join_actions, Action};
use crate::simulation::perception::Percept;

/// Column headers of the CSV trace, matching the legacy log layout
pub const TRACE_HEADER: [&str; 12] = [
    "#",
    "Pos",
    "Orientación",
    "Piso",
    "Izquierda",
    "Centro",
    "Derecha",
    "Contacto",
    "Regla",
    "Acción",
    "Nueva Pos",
    "Nueva Orientación",
];

/// Everything that happened in one tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub tick: Tick,
    pub position_before: Position,
    pub orientation_before: Orientation,
    /// Percept the decision was made on
    pub percept: Percept,
    /// Provenance index, `None` when the fallback ran
    pub matched_rule: Option<usize>,
    /// Full sequence executed this tick
    pub actions: Vec<Action>,
    pub position_after: Position,
    pub orientation_after: Orientation,
}

impl StepRecord {
    pub fn is_fallback(&self) -> bool {
        self.matched_rule.is_none()
    }

    /// `#n` for a matched rule, `#-` for the fallback
    pub fn rule_label(&self) -> String {
        match self.matched_rule {
            Some(index) => format!("#{}", index),
            None => "#-".to_string(),
        }
    }

    /// Row in `TRACE_HEADER` order
    pub fn to_row(&self) -> [String; 12] {
        let [floor, left, center, right, contact] = self.percept.symbols();
        [
            self.tick.to_string(),
            self.position_before.to_string(),
            self.orientation_before.symbol().to_string(),
            floor.to_string(),
            left.to_string(),
            center.to_string(),
            right.to_string(),
            contact.to_string(),
            self.rule_label(),
            join_actions(&self.actions),
            self.position_after.to_string(),
            self.orientation_after.symbol().to_string(),
        ]
    }
}

/// Writes step records as CSV, header first
pub struct TraceWriter<W: Write> {
    writer: csv::Writer<W>,
    rows: usize,
}

impl TraceWriter<File> {
    /// Create (or truncate) a trace file, creating parent directories
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::new(File::create(path)?)
    }
}

impl<W: Write> TraceWriter<W> {
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(inner);
        writer.write_record(TRACE_HEADER)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write(&mut self, record: &StepRecord) -> Result<()> {
        self.writer.write_record(record.to_row())?;
        self.rows += 1;
        Ok(())
    }

    /// Data rows written so far, header excluded
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }
}

/// Aggregate view over a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceSummary {
    pub ticks: usize,
    pub fallbacks: usize,
    pub rules_used: BTreeSet<usize>,
    /// Ticks that tried to advance but ended where they started
    pub stalled_ticks: usize,
}

impl TraceSummary {
    pub fn from_records(records: &[StepRecord]) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.ticks += 1;
            match record.matched_rule {
                Some(index) => {
                    summary.rules_used.insert(index);
                }
                None => summary.fallbacks += 1,
            }
            if record.position_before == record.position_after
                && record.actions.contains(&Action::MoveForward)
            {
                summary.stalled_ticks += 1;
            }
        }
        summary
    }
}
