//! Session stepper: paces ticks and runs perceive → decide → act → re-perceive
//!
//! The stepper owns the grid, the agent and the rule table for the whole
//! session. It never blocks: the caller polls it from its own loop, passing
//! the current time, and a poll either runs exactly one tick or does nothing.
//!
//! Pacing:
//! - `Manual`: a tick runs only after `trigger()`. Triggers do not queue.
//! - `Auto` / `AutoFast`: a tick runs once the configured interval has elapsed
//!   since the previous tick. The interval re-arms from the moment the tick
//!   ran; missed ticks are not caught up.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::{Duration, Instant};

use crate::core::config::{PacingMode, SessionConfig};
use crate::core::error::Result;
use crate::core::types::Tick;
use crate::entity::agent::Agent;
use crate::rules::action::Action;
use crate::rules::table::RuleTable;
use crate::simulation::controller::{decide, Decision};
use crate::simulation::executor::{self, ActionOutcome};
use crate::simulation::perception::{sense, Percept};
use crate::simulation::trace::StepRecord;
use crate::spatial::grid::GridWorld;

/// Where the stepper is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPhase {
    /// Stopped; polls do nothing until a restart
    Idle,
    /// Waiting for a trigger or for the interval to elapse
    AwaitingTrigger,
    /// Running the current action sequence
    ExecutingActions,
    /// Re-perceiving and resolving the next decision
    Settling,
}

/// Hooks for whoever renders or logs the session
pub trait StepObserver {
    /// Called after every individual action, mid-tick
    fn on_action(
        &mut self,
        _tick: Tick,
        _action: Action,
        _outcome: ActionOutcome,
        _agent: &Agent,
        _grid: &GridWorld,
    ) {
    }

    /// Called once per tick with the finished record
    fn on_step(&mut self, _record: &StepRecord) {}
}

/// No-op observer
impl StepObserver for () {}

/// Observer that keeps every step record in memory
#[derive(Debug, Default)]
pub struct TraceLog {
    pub records: Vec<StepRecord>,
}

impl TraceLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StepObserver for TraceLog {
    fn on_step(&mut self, record: &StepRecord) {
        self.records.push(record.clone());
    }
}

pub struct Stepper {
    config: SessionConfig,
    grid: GridWorld,
    table: RuleTable,
    agent: Agent,
    rng: ChaCha8Rng,
    seed: u64,
    tick: Tick,
    /// Percept and decision that the next tick will act on
    percept: Percept,
    decision: Decision,
    phase: StepPhase,
    pacing: PacingMode,
    trigger_pending: bool,
    last_tick_at: Instant,
}

impl Stepper {
    /// Start a session: validate config, generate the grid, spawn the agent
    pub fn new(config: SessionConfig, table: RuleTable, now: Instant) -> Result<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = GridWorld::generate(config.rows, config.cols, config.density, &mut rng)?;
        let agent = Agent::spawn(&grid, &mut rng)?;

        tracing::info!(
            seed,
            rows = config.rows,
            cols = config.cols,
            density = config.density,
            rules = table.len(),
            pacing = config.pacing.label(),
            "Session started"
        );

        Ok(Self::assemble(config, grid, table, agent, rng, seed, now))
    }

    /// Start a session on a prepared grid and agent, e.g. a fixed scenario
    ///
    /// The RNG (used on restart) is seeded from `config.seed`, or 0.
    pub fn with_world(
        config: SessionConfig,
        grid: GridWorld,
        table: RuleTable,
        agent: Agent,
        now: Instant,
    ) -> Self {
        let seed = config.seed.unwrap_or(0);
        let rng = ChaCha8Rng::seed_from_u64(seed);
        Self::assemble(config, grid, table, agent, rng, seed, now)
    }

    fn assemble(
        config: SessionConfig,
        grid: GridWorld,
        table: RuleTable,
        agent: Agent,
        rng: ChaCha8Rng,
        seed: u64,
        now: Instant,
    ) -> Self {
        let percept = sense(&grid, &agent);
        let decision = decide(&percept, &table);
        let pacing = config.pacing;

        Self {
            config,
            grid,
            table,
            agent,
            rng,
            seed,
            tick: 0,
            percept,
            decision,
            phase: StepPhase::AwaitingTrigger,
            pacing,
            trigger_pending: false,
            last_tick_at: now,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn grid(&self) -> &GridWorld {
        &self.grid
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Ticks run since the session (re)started
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Percept the next tick will act on
    pub fn percept(&self) -> &Percept {
        &self.percept
    }

    /// Decision the next tick will execute
    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    pub fn phase(&self) -> StepPhase {
        self.phase
    }

    pub fn pacing(&self) -> PacingMode {
        self.pacing
    }

    /// Request one manual tick; ignored in automatic modes or when stopped
    pub fn trigger(&mut self) {
        if self.pacing == PacingMode::Manual && self.phase != StepPhase::Idle {
            self.trigger_pending = true;
        }
    }

    /// Switch pacing mode; the interval timer restarts and any pending trigger is dropped
    pub fn set_pacing(&mut self, mode: PacingMode, now: Instant) {
        self.pacing = mode;
        self.trigger_pending = false;
        self.last_tick_at = now;
        tracing::info!(pacing = mode.label(), "Pacing changed");
    }

    /// Time left before the next automatic tick is due, `None` in manual mode or when stopped
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        if self.phase == StepPhase::Idle {
            return None;
        }
        let interval = self.config.interval_for(self.pacing)?;
        Some(interval.saturating_sub(now.saturating_duration_since(self.last_tick_at)))
    }

    /// Stop the session; later polls are no-ops
    pub fn stop(&mut self) {
        self.phase = StepPhase::Idle;
        self.trigger_pending = false;
        tracing::info!(ticks = self.tick, "Session stopped");
    }

    /// Fresh agent on the same grid, tick counter back to zero
    ///
    /// Fails only when the grid has no walkable cell, leaving the session as it was.
    pub fn restart(&mut self, now: Instant) -> Result<()> {
        self.agent = Agent::spawn(&self.grid, &mut self.rng)?;
        self.tick = 0;
        self.percept = sense(&self.grid, &self.agent);
        self.decision = decide(&self.percept, &self.table);
        self.phase = StepPhase::AwaitingTrigger;
        self.trigger_pending = false;
        self.last_tick_at = now;
        tracing::info!(
            position = %self.agent.position(),
            orientation = ?self.agent.orientation(),
            "Session restarted"
        );
        Ok(())
    }

    /// Run one tick if the pacing policy says one is due
    pub fn poll<O: StepObserver + ?Sized>(
        &mut self,
        now: Instant,
        observer: &mut O,
    ) -> Option<StepRecord> {
        let due = match self.phase {
            StepPhase::AwaitingTrigger => match self.config.interval_for(self.pacing) {
                None => std::mem::take(&mut self.trigger_pending),
                Some(interval) => now.saturating_duration_since(self.last_tick_at) >= interval,
            },
            _ => false,
        };

        if !due {
            return None;
        }
        Some(self.run_tick(now, observer))
    }

    fn run_tick<O: StepObserver + ?Sized>(&mut self, now: Instant, observer: &mut O) -> StepRecord {
        self.tick += 1;
        let tick = self.tick;
        let position_before = self.agent.position();
        let orientation_before = self.agent.orientation();
        let percept_before = self.percept;

        self.phase = StepPhase::ExecutingActions;
        for &action in &self.decision.actions {
            let outcome = executor::apply(&mut self.agent, &self.grid, action);
            observer.on_action(tick, action, outcome, &self.agent, &self.grid);
        }

        // Decision for the next tick is made now, not lazily
        self.phase = StepPhase::Settling;
        self.percept = sense(&self.grid, &self.agent);
        let next = decide(&self.percept, &self.table);
        let executed = std::mem::replace(&mut self.decision, next);

        let record = StepRecord {
            tick,
            position_before,
            orientation_before,
            percept: percept_before,
            matched_rule: executed.matched_rule,
            actions: executed.actions,
            position_after: self.agent.position(),
            orientation_after: self.agent.orientation(),
        };

        self.last_tick_at = now;
        self.phase = StepPhase::AwaitingTrigger;

        tracing::debug!(
            tick,
            rule = %record.rule_label(),
            from = %record.position_before,
            to = %record.position_after,
            "Tick complete"
        );
        observer.on_step(&record);
        record
    }
}
