//! Integration tests for the reflex engine
//!
//! These walk the public API through complete sessions:
//! - Percepts and motion on a hand-built 5x5 map
//! - Rule matching, provenance and the fallback policy
//! - Manual and automatic pacing through the stepper
//! - CSV trace output for a whole run

use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reflex_grid::core::config::{PacingMode, SessionConfig};
use reflex_grid::core::error::{ReflexError, RuleTableError};
use reflex_grid::core::types::{Orientation, Position};
use reflex_grid::entity::Agent;
use reflex_grid::rules::{parse_rule_table, Action, RuleTable};
use reflex_grid::simulation::{
    apply, decide, sense, Percept, StepPhase, Stepper, TraceLog, TraceSummary, TraceWriter,
};
use reflex_grid::spatial::{Cell, GridWorld};

fn empty_5x5() -> GridWorld {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    GridWorld::generate(5, 5, 0.0, &mut rng).unwrap()
}

fn percept(fields: [&str; 5]) -> Percept {
    Percept::from_fields(fields).unwrap()
}

#[test]
fn test_open_cell_percept_then_move_north() {
    let grid = empty_5x5();
    let mut agent = Agent::place(&grid, Position::new(2, 2), Orientation::North).unwrap();

    assert_eq!(sense(&grid, &agent), percept(["0", ".", ".", ".", "0"]));

    apply(&mut agent, &grid, Action::MoveForward);
    assert_eq!(agent.position(), Position::new(1, 2));
    assert!(!agent.is_blocked());
}

#[test]
fn test_border_collision_sets_contact() {
    let grid = empty_5x5();
    let mut agent = Agent::place(&grid, Position::new(1, 2), Orientation::North).unwrap();

    apply(&mut agent, &grid, Action::MoveForward);

    assert_eq!(agent.position(), Position::new(1, 2));
    assert!(agent.is_blocked());
    assert!(sense(&grid, &agent).contact);
    assert_eq!(sense(&grid, &agent).to_string(), "0,P,P,P,1");
}

#[test]
fn test_single_rule_match() {
    let table = parse_rule_table("0,.,.,.,0,MOVE_FORWARD").unwrap();
    let decision = decide(&percept(["0", ".", ".", ".", "0"]), &table);

    assert_eq!(decision.actions, vec![Action::MoveForward]);
    assert_eq!(decision.matched_rule, Some(1));
}

#[test]
fn test_empty_table_fallback() {
    let table = RuleTable::new();
    let decision = decide(&percept(["1", "L", "P", ".", "1"]), &table);

    assert_eq!(decision.actions, vec![Action::RotateRight, Action::MoveForward]);
    assert_eq!(decision.matched_rule, None);
}

#[test]
fn test_rotation_direction_is_pinned() {
    // ROTATE_RIGHT turns North to West (counter-clockwise on screen),
    // so the next forward step moves one column left.
    let grid = empty_5x5();
    let mut agent = Agent::place(&grid, Position::new(2, 2), Orientation::North).unwrap();

    apply(&mut agent, &grid, Action::RotateRight);
    apply(&mut agent, &grid, Action::MoveForward);
    assert_eq!(agent.orientation(), Orientation::West);
    assert_eq!(agent.position(), Position::new(2, 1));

    apply(&mut agent, &grid, Action::RotateLeft);
    apply(&mut agent, &grid, Action::RotateLeft);
    apply(&mut agent, &grid, Action::MoveForward);
    assert_eq!(agent.orientation(), Orientation::East);
    assert_eq!(agent.position(), Position::new(2, 2));
}

#[test]
fn test_fallback_tick_from_corner() {
    // Facing the north wall from the top-left interior corner with no rules:
    // the fallback turns West and bumps into the west wall.
    let grid = empty_5x5();
    let agent = Agent::place(&grid, Position::new(1, 1), Orientation::North).unwrap();
    let now = Instant::now();
    let config = SessionConfig::default();
    let mut stepper = Stepper::with_world(config, grid, RuleTable::new(), agent, now);

    stepper.trigger();
    let record = stepper.poll(now, &mut ()).unwrap();

    assert!(record.is_fallback());
    assert_eq!(record.rule_label(), "#-");
    assert_eq!(record.position_after, Position::new(1, 1));
    assert_eq!(record.orientation_after, Orientation::West);
    assert!(stepper.percept().contact);
}

#[test]
fn test_stepper_record_uses_pre_tick_percept() {
    let grid = empty_5x5();
    let agent = Agent::place(&grid, Position::new(3, 2), Orientation::North).unwrap();
    let table = parse_rule_table("0,.,.,.,0,MOVE_FORWARD\n0,P,P,P,0,ROTATE_LEFT\n").unwrap();
    let now = Instant::now();
    let mut stepper = Stepper::with_world(SessionConfig::default(), grid, table, agent, now);
    let mut log = TraceLog::new();

    for _ in 0..3 {
        stepper.trigger();
        stepper.poll(now, &mut log);
    }

    let rules: Vec<Option<usize>> = log.records.iter().map(|r| r.matched_rule).collect();
    assert_eq!(rules, vec![Some(1), Some(1), Some(2)]);

    let last = &log.records[2];
    assert_eq!(last.percept.to_string(), "0,P,P,P,0");
    assert_eq!(last.position_before, Position::new(1, 2));
    assert_eq!(last.orientation_after, Orientation::East);
}

#[test]
fn test_automatic_session_runs_on_schedule() {
    let config = SessionConfig {
        rows: 9,
        cols: 9,
        density: 0.2,
        pacing: PacingMode::AutoFast,
        seed: Some(77),
        ..SessionConfig::default()
    };
    let table = parse_rule_table("0,.,.,.,0,MOVE_FORWARD\n").unwrap();
    let start = Instant::now();
    let mut stepper = Stepper::new(config, table, start).unwrap();
    let mut log = TraceLog::new();

    // Poll every 10ms for one simulated second: 50ms interval gives 20 ticks
    for ms in (0..=1000).step_by(10) {
        stepper.poll(start + Duration::from_millis(ms), &mut log);
    }

    assert_eq!(log.records.len(), 20);
    assert!(log.records.windows(2).all(|w| w[1].tick == w[0].tick + 1));
    for record in &log.records {
        assert!(stepper.grid().is_walkable(record.position_after));
    }
}

#[test]
fn test_restart_preserves_map() {
    let config = SessionConfig {
        seed: Some(3),
        ..SessionConfig::default()
    };
    let start = Instant::now();
    let mut stepper = Stepper::new(config, RuleTable::new(), start).unwrap();
    let grid = stepper.grid().clone();

    for _ in 0..5 {
        stepper.trigger();
        stepper.poll(start, &mut ());
    }
    assert_eq!(stepper.tick(), 5);

    stepper.restart(start).unwrap();
    assert_eq!(stepper.tick(), 0);
    assert_eq!(stepper.phase(), StepPhase::AwaitingTrigger);
    assert_eq!(stepper.grid(), &grid);
}

#[test]
fn test_agent_never_leaves_walkable_cells() {
    let config = SessionConfig {
        rows: 12,
        cols: 15,
        density: 0.4,
        seed: Some(2025),
        ..SessionConfig::default()
    };
    let table = parse_rule_table(include_str!("../data/rules/basic.csv")).unwrap();
    let now = Instant::now();
    let mut stepper = Stepper::new(config, table, now).unwrap();
    let mut log = TraceLog::new();

    for _ in 0..500 {
        stepper.trigger();
        stepper.poll(now, &mut log);
    }

    assert_eq!(log.records.len(), 500);
    for record in &log.records {
        assert_ne!(stepper.grid().cell(record.position_after), Some(Cell::Wall));
        assert!(stepper.grid().is_interior(record.position_after));
    }
}

#[test]
fn test_full_trace_to_csv() {
    let grid = empty_5x5();
    let agent = Agent::place(&grid, Position::new(3, 3), Orientation::West).unwrap();
    let now = Instant::now();
    let config = SessionConfig::default();
    let mut stepper = Stepper::with_world(config, grid, RuleTable::new(), agent, now);
    let mut log = TraceLog::new();

    for _ in 0..4 {
        stepper.trigger();
        stepper.poll(now, &mut log);
    }

    let mut writer = TraceWriter::new(Vec::new()).unwrap();
    for record in &log.records {
        writer.write(record).unwrap();
    }
    let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

    assert_eq!(text.lines().count(), 5);
    assert!(text.lines().skip(1).all(|l| l.contains("#-,ROTATE_RIGHT y MOVE_FORWARD")));

    let summary = TraceSummary::from_records(&log.records);
    assert_eq!(summary.ticks, 4);
    assert_eq!(summary.fallbacks, 4);
    assert!(summary.rules_used.is_empty());
}

#[test]
fn test_bad_tables_are_rejected_whole() {
    let cases = [
        ("0,.,.,.,0\n", "malformed"),
        ("0,.,.,.,0,FLY\n", "unknown"),
        ("0,.,.,.,0,MOVE_FORWARD\n0,.,.,.,0,ROTATE_LEFT\n", "duplicate"),
        ("0,.,Q,.,0,MOVE_FORWARD\n", "percept"),
    ];

    for (content, kind) in cases {
        let err = parse_rule_table(content).unwrap_err();
        let ok = match kind {
            "malformed" => matches!(err, RuleTableError::MalformedRecord { .. }),
            "unknown" => matches!(err, RuleTableError::UnknownAction { .. }),
            "duplicate" => matches!(err, RuleTableError::DuplicateRule { .. }),
            _ => matches!(err, RuleTableError::InvalidPercept { .. }),
        };
        assert!(ok, "{:?} should be {}", err, kind);
    }
}

#[test]
fn test_session_start_surfaces_grid_errors() {
    let config = SessionConfig {
        rows: 2,
        ..SessionConfig::default()
    };
    let err = Stepper::new(config, RuleTable::new(), Instant::now()).err().unwrap();
    assert!(matches!(err, ReflexError::Config(_)));
}
