//! Reflex Grid - headless runner
//!
//! Loads a rule table, starts a session and drives the stepper from a plain
//! loop: stdin commands in manual mode, the wall clock in the automatic modes.
//! The pacing mode can be switched mid-run. Each step is printed and
//! optionally written to a CSV trace, one file per segment.

use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use reflex_grid::core::config::{PacingMode, SessionConfig};
use reflex_grid::core::error::Result;
use reflex_grid::core::types::Tick;
use reflex_grid::entity::Agent;
use reflex_grid::rules::{join_actions, load_rule_table, Action};
use reflex_grid::simulation::{
    ActionOutcome, Percept, StepObserver, StepRecord, Stepper, TraceSummary, TraceWriter,
};
use reflex_grid::spatial::GridWorld;

/// Longest the automatic loop sleeps between polls
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    Manual,
    Auto,
    AutoFast,
}

impl From<ModeArg> for PacingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Manual => PacingMode::Manual,
            ModeArg::Auto => PacingMode::Auto,
            ModeArg::AutoFast => PacingMode::AutoFast,
        }
    }
}

/// Simple reflex agent on a grid world
#[derive(Parser, Debug)]
#[command(name = "reflex-grid")]
#[command(about = "Run a percept-action rule table on a random grid world")]
struct Args {
    /// Rule table CSV (floor,left,center,right,contact,action...)
    #[arg(long)]
    rules: PathBuf,

    /// Session config TOML; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Map rows, border included
    #[arg(long)]
    rows: Option<usize>,

    /// Map columns, border included
    #[arg(long)]
    cols: Option<usize>,

    /// Obstacle density in [0, 1]
    #[arg(long)]
    density: Option<f64>,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Pacing mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Stop once a segment reaches this many ticks (0 = until quit)
    #[arg(long, default_value_t = 50)]
    ticks: u64,

    /// Write the step trace to this CSV file
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, default_value = "text")]
    format: String,

    /// Print the map before running
    #[arg(long)]
    show_map: bool,

    /// Print every individual action, not just whole ticks
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// Prints per-action lines when verbose
struct ConsoleObserver {
    verbose: bool,
}

impl StepObserver for ConsoleObserver {
    fn on_action(
        &mut self,
        tick: Tick,
        action: Action,
        outcome: ActionOutcome,
        agent: &Agent,
        _grid: &GridWorld,
    ) {
        if self.verbose {
            println!(
                "    {:>4} {:<13} {:?} -> {} {}",
                tick,
                action.symbol(),
                outcome,
                agent.position(),
                agent.orientation().symbol()
            );
        }
    }
}

/// One trace file per run segment (a restart starts a new segment)
struct TraceSink {
    base: PathBuf,
    segment: usize,
    writer: TraceWriter<File>,
}

impl TraceSink {
    fn open(base: &Path) -> Result<Self> {
        Ok(Self {
            base: base.to_path_buf(),
            segment: 0,
            writer: TraceWriter::create(base)?,
        })
    }

    fn write(&mut self, record: &StepRecord) -> Result<()> {
        self.writer.write(record)
    }

    fn next_segment(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.segment += 1;
        let path = segment_path(&self.base, self.segment);
        tracing::info!(path = %path.display(), "Starting new trace segment");
        self.writer = TraceWriter::create(&path)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        tracing::info!(
            path = %segment_path(&self.base, self.segment).display(),
            rows = self.writer.rows(),
            "Trace written"
        );
        Ok(())
    }
}

/// `trace.csv` -> `trace-1.csv`, `trace-2.csv`, ...
fn segment_path(base: &Path, segment: usize) -> PathBuf {
    if segment == 0 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "trace".to_string());
    let name = match base.extension() {
        Some(ext) => format!("{}-{}.{}", stem, segment, ext.to_string_lossy()),
        None => format!("{}-{}", stem, segment),
    };
    base.with_file_name(name)
}

#[derive(Serialize)]
struct RunReport {
    seed: u64,
    rows: usize,
    cols: usize,
    density: f64,
    pacing: &'static str,
    rules: usize,
    uncovered_percepts: usize,
    /// Totals over every segment
    summary: TraceSummary,
    segments: Vec<SegmentReport>,
}

/// Records between two restarts or mode changes
#[derive(Serialize)]
struct SegmentReport {
    summary: TraceSummary,
    records: Vec<StepRecord>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("reflex_grid=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let json = match args.format.as_str() {
        "json" => true,
        "text" => false,
        other => {
            tracing::warn!(format = other, "Unknown output format, using text");
            false
        }
    };

    let config = build_config(&args)?;
    let table = load_rule_table(&args.rules)?;
    let uncovered = table.uncovered().len();
    if uncovered > 0 {
        tracing::warn!(
            uncovered,
            "Rule table leaves percepts uncovered; those ticks will use the fallback"
        );
    }

    let mut stepper = Stepper::new(config, table, Instant::now())?;
    let mut sink = args.trace.as_deref().map(TraceSink::open).transpose()?;
    let mut observer = ConsoleObserver {
        verbose: args.verbose && !json,
    };

    if args.show_map && !json {
        print_map(&stepper);
    }

    let segments = run_session(&mut stepper, &mut observer, &mut sink, args.ticks, json)?;
    stepper.stop();

    if let Some(sink) = sink.as_mut() {
        sink.finish()?;
    }

    let (summary, segments) = summarize_segments(segments);
    if json {
        let report = RunReport {
            seed: stepper.seed(),
            rows: stepper.config().rows,
            cols: stepper.config().cols,
            density: stepper.config().density,
            pacing: stepper.pacing().label(),
            rules: stepper.table().len(),
            uncovered_percepts: uncovered,
            summary,
            segments,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&stepper, &summary, segments.len(), uncovered);
    }

    Ok(())
}

/// Overall totals plus one report per segment, in run order
fn summarize_segments(segments: Vec<Vec<StepRecord>>) -> (TraceSummary, Vec<SegmentReport>) {
    let all: Vec<StepRecord> = segments.iter().flatten().cloned().collect();
    let reports = segments
        .into_iter()
        .map(|records| SegmentReport {
            summary: TraceSummary::from_records(&records),
            records,
        })
        .collect();
    (TraceSummary::from_records(&all), reports)
}

/// Defaults, then the config file, then CLI flags
fn build_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };

    if let Some(rows) = args.rows {
        config.rows = rows;
    }
    if let Some(cols) = args.cols {
        config.cols = cols;
    }
    if let Some(density) = args.density {
        config.density = density;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(mode) = args.mode {
        config.pacing = mode.into();
    }

    config.validate()?;
    Ok(config)
}

/// Interactive command read from stdin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Step,
    Restart,
    Pacing(PacingMode),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "" | "s" | "step" => Some(Command::Step),
        "r" | "restart" => Some(Command::Restart),
        "a" | "auto" => Some(Command::Pacing(PacingMode::Auto)),
        "f" | "fast" => Some(Command::Pacing(PacingMode::AutoFast)),
        "m" | "manual" => Some(Command::Pacing(PacingMode::Manual)),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

/// What the session loop does after a command
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    NewSegment,
    Quit,
}

/// Apply one command to the stepper
///
/// Restarts and real mode changes start a new segment. Selecting the mode
/// already in effect does nothing.
fn dispatch(stepper: &mut Stepper, command: Command, now: Instant) -> Result<Flow> {
    match command {
        Command::Step => {
            stepper.trigger();
            Ok(Flow::Continue)
        }
        Command::Restart => {
            stepper.restart(now)?;
            Ok(Flow::NewSegment)
        }
        Command::Pacing(mode) if mode == stepper.pacing() => Ok(Flow::Continue),
        Command::Pacing(mode) => {
            stepper.set_pacing(mode, now);
            Ok(Flow::NewSegment)
        }
        Command::Quit => Ok(Flow::Quit),
    }
}

/// Forward stdin lines to the session loop so automatic pacing never blocks on input
fn spawn_command_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Drive the stepper until a segment reaches `max_ticks` (0 = no limit) or the user quits
///
/// Manual pacing waits on stdin for each command. Automatic pacing polls the
/// wall clock and picks up commands between polls. Closing stdin ends a
/// manual session but lets an automatic one run on.
fn run_session(
    stepper: &mut Stepper,
    observer: &mut ConsoleObserver,
    sink: &mut Option<TraceSink>,
    max_ticks: u64,
    json: bool,
) -> Result<Vec<Vec<StepRecord>>> {
    let commands = spawn_command_reader();
    let mut segments = Vec::new();
    let mut current = Vec::new();
    if !json {
        println!("Commands: Enter = step, a = auto, f = fast, m = manual, r = restart, q = quit");
    }

    loop {
        if max_ticks > 0 && stepper.tick() >= max_ticks {
            break;
        }

        let line = if stepper.pacing().is_automatic() {
            match commands.try_recv() {
                Ok(line) => Some(line),
                Err(_) => None,
            }
        } else {
            if !json {
                print!("> ");
                io::stdout().flush()?;
            }
            match commands.recv() {
                Ok(line) => Some(line),
                Err(_) => break,
            }
        };

        if let Some(line) = line {
            match parse_command(&line) {
                Some(command) => match dispatch(stepper, command, Instant::now())? {
                    Flow::Quit => break,
                    Flow::NewSegment => {
                        segments.push(std::mem::take(&mut current));
                        if let Some(sink) = sink.as_mut() {
                            sink.next_segment()?;
                        }
                        if !json {
                            println!(
                                "[{}] agent at {} {}",
                                stepper.pacing().label(),
                                stepper.agent().position(),
                                stepper.agent().orientation().symbol()
                            );
                        }
                    }
                    Flow::Continue => {}
                },
                None => tracing::warn!(command = line.trim(), "Unknown command"),
            }
        }

        let now = Instant::now();
        match stepper.poll(now, observer) {
            Some(record) => handle_record(record, &mut current, sink, json)?,
            None if stepper.pacing().is_automatic() => {
                let wait = stepper
                    .time_until_next(now)
                    .unwrap_or(MAX_IDLE_SLEEP)
                    .min(MAX_IDLE_SLEEP);
                thread::sleep(wait);
            }
            None => {}
        }
    }

    segments.push(current);
    Ok(segments)
}

fn handle_record(
    record: StepRecord,
    records: &mut Vec<StepRecord>,
    sink: &mut Option<TraceSink>,
    json: bool,
) -> Result<()> {
    if let Some(sink) = sink.as_mut() {
        sink.write(&record)?;
    }
    if !json {
        println!(
            "{:>5} {} {} {} {:<4} {:<28} -> {} {}",
            record.tick,
            record.position_before,
            record.orientation_before.symbol(),
            record.percept,
            record.rule_label(),
            join_actions(&record.actions),
            record.position_after,
            record.orientation_after.symbol()
        );
    }
    records.push(record);
    Ok(())
}

fn print_map(stepper: &Stepper) {
    let agent = stepper.agent();
    println!(
        "{}",
        stepper
            .grid()
            .render_ascii(Some((agent.position(), agent.orientation().symbol())))
    );
}

fn print_summary(stepper: &Stepper, summary: &TraceSummary, segments: usize, uncovered: usize) {
    println!();
    println!("=== SESSION SUMMARY ===");
    println!("Seed:           {}", stepper.seed());
    println!(
        "Map:            {}x{} ({} obstacles)",
        stepper.grid().rows(),
        stepper.grid().cols(),
        stepper.grid().obstacle_count()
    );
    println!(
        "Rules:          {} ({} of {} percepts uncovered)",
        stepper.table().len(),
        uncovered,
        Percept::SPACE_SIZE
    );
    println!("Segments:       {}", segments);
    println!("Ticks:          {}", summary.ticks);
    println!("Fallbacks:      {}", summary.fallbacks);
    println!("Distinct rules: {}", summary.rules_used.len());
    println!("Stalled ticks:  {}", summary.stalled_ticks);
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflex_grid::core::types::{Orientation, Position};
    use reflex_grid::rules::RuleTable;

    #[test]
    fn test_segment_paths() {
        let base = Path::new("out/trace.csv");
        assert_eq!(segment_path(base, 0), PathBuf::from("out/trace.csv"));
        assert_eq!(segment_path(base, 2), PathBuf::from("out/trace-2.csv"));
        assert_eq!(segment_path(Path::new("log"), 1), PathBuf::from("log-1"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "reflex-grid",
            "--rules",
            "data/rules/basic.csv",
            "--rows",
            "7",
            "--seed",
            "9",
            "--mode",
            "auto-fast",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.rows, 7);
        assert_eq!(config.cols, 11);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.pacing, PacingMode::AutoFast);
    }

    fn open_stepper(now: Instant) -> Stepper {
        let grid = GridWorld::from_ascii(&["#####", "#...#", "#...#", "#...#", "#####"]).unwrap();
        let agent = Agent::place(&grid, Position::new(2, 2), Orientation::North).unwrap();
        let config = SessionConfig {
            seed: Some(4),
            ..SessionConfig::default()
        };
        Stepper::with_world(config, grid, RuleTable::new(), agent, now)
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command(""), Some(Command::Step));
        assert_eq!(parse_command("  r "), Some(Command::Restart));
        assert_eq!(parse_command("a"), Some(Command::Pacing(PacingMode::Auto)));
        assert_eq!(parse_command("fast"), Some(Command::Pacing(PacingMode::AutoFast)));
        assert_eq!(parse_command("m"), Some(Command::Pacing(PacingMode::Manual)));
        assert_eq!(parse_command("q"), Some(Command::Quit));
        assert_eq!(parse_command("jump"), None);
    }

    #[test]
    fn test_mode_switch_starts_segment_and_paces_automatically() {
        let start = Instant::now();
        let mut stepper = open_stepper(start);

        let flow = dispatch(&mut stepper, Command::Pacing(PacingMode::AutoFast), start).unwrap();
        assert_eq!(flow, Flow::NewSegment);
        assert_eq!(stepper.pacing(), PacingMode::AutoFast);
        assert!(stepper.poll(start + Duration::from_millis(50), &mut ()).is_some());

        let flow = dispatch(&mut stepper, Command::Pacing(PacingMode::AutoFast), start).unwrap();
        assert_eq!(flow, Flow::Continue);

        let later = start + Duration::from_millis(60);
        let flow = dispatch(&mut stepper, Command::Pacing(PacingMode::Manual), later).unwrap();
        assert_eq!(flow, Flow::NewSegment);
        assert!(stepper.poll(later + Duration::from_secs(1), &mut ()).is_none());
    }

    #[test]
    fn test_step_restart_and_quit_dispatch() {
        let now = Instant::now();
        let mut stepper = open_stepper(now);

        assert_eq!(dispatch(&mut stepper, Command::Step, now).unwrap(), Flow::Continue);
        assert!(stepper.poll(now, &mut ()).is_some());
        assert_eq!(stepper.tick(), 1);

        assert_eq!(dispatch(&mut stepper, Command::Restart, now).unwrap(), Flow::NewSegment);
        assert_eq!(stepper.tick(), 0);

        assert_eq!(dispatch(&mut stepper, Command::Quit, now).unwrap(), Flow::Quit);
    }

    #[test]
    fn test_summary_covers_every_segment() {
        let now = Instant::now();
        let mut stepper = open_stepper(now);
        let mut segments = Vec::new();

        for ticks in [3, 2] {
            let mut log = reflex_grid::simulation::TraceLog::new();
            for _ in 0..ticks {
                stepper.trigger();
                stepper.poll(now, &mut log);
            }
            segments.push(log.records);
            stepper.restart(now).unwrap();
        }

        let (summary, reports) = summarize_segments(segments);
        assert_eq!(summary.ticks, 5);
        assert_eq!(summary.fallbacks, 5);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].summary.ticks, 3);
        assert_eq!(reports[1].records.len(), 2);
        assert_eq!(reports[1].records[0].tick, 1);
    }

    #[test]
    fn test_cli_rejects_small_map() {
        let args = Args::parse_from(["reflex-grid", "--rules", "x.csv", "--cols", "4"]);
        assert!(build_config(&args).is_err());
    }
}
