//! Fixed-rate match driver.
//!
//! [`SimulationLoop::tick`] performs one complete simulation step and is
//! synchronous, so a caller that owns the [`MatchState`] can never observe a
//! half-applied tick. [`SimulationLoop::wait_tick`] supplies the cadence.

use crate::game::MatchState;
use log::{debug, info};
use shared::physics;
use shared::{Phase, Snapshot, TICK_RATE};
use std::time::Duration;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

/// Receives every snapshot produced by the loop.
pub trait SnapshotSink {
    fn broadcast(&mut self, snapshot: Snapshot);
}

impl SnapshotSink for Vec<Snapshot> {
    fn broadcast(&mut self, snapshot: Snapshot) {
        self.push(snapshot);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The loop is stopped or the match is not in play.
    Idle,
    Advanced,
    /// This tick ended the match; the loop has stopped itself.
    Finished,
}

pub struct SimulationLoop {
    tick_duration: Duration,
    running: bool,
    interval: Option<Interval>,
    ticks: u64,
}

impl Default for SimulationLoop {
    fn default() -> Self {
        Self::new(TICK_RATE)
    }
}

impl SimulationLoop {
    pub fn new(tick_rate: u32) -> Self {
        Self::with_duration(Duration::from_secs_f64(1.0 / tick_rate.max(1) as f64))
    }

    pub fn with_duration(tick_duration: Duration) -> Self {
        Self {
            tick_duration,
            running: false,
            interval: None,
            ticks: 0,
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            debug!("Simulation loop started ({:?} per tick)", self.tick_duration);
        }
        self.running = true;
    }

    /// Stops ticking. Safe to call repeatedly; pending ticks are discarded.
    pub fn stop(&mut self) {
        if self.running {
            debug!("Simulation loop stopped after {} ticks", self.ticks);
        }
        self.running = false;
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Resolves at the next tick boundary, or never while stopped.
    ///
    /// Late ticks are skipped rather than replayed in a burst.
    pub async fn wait_tick(&mut self) {
        if !self.running {
            std::future::pending::<()>().await;
        }

        let period = self.tick_duration;
        let interval = self.interval.get_or_insert_with(|| {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        interval.tick().await;
    }

    /// Runs one simulation step against `state` and publishes the result.
    pub fn tick(&mut self, state: &mut MatchState, sink: &mut impl SnapshotSink) -> TickOutcome {
        if !self.running || state.phase != Phase::Play {
            return TickOutcome::Idle;
        }

        let arena = state.rules.arena;
        let exit = {
            let Some(ball) = state.ball.as_mut() else {
                return TickOutcome::Idle;
            };

            physics::advance_ball(ball);
            physics::reflect_off_walls(ball, arena.height);

            // Only the paddle the ball is heading into is ever tested.
            let side = physics::approached_side(ball, arena.width);
            if let Some(paddle) = state.players.values().find(|p| p.side == side) {
                if physics::collides(ball, paddle) {
                    physics::deflect(ball, paddle, physics::bounce_sign(side));
                    debug!("Ball hit the {:?} paddle, speed now {}", side, ball.speed);
                }
            }

            physics::exit_side(ball, arena.width)
                .map(|side| (side, physics::return_direction(ball)))
        };

        if let Some((conceding_side, dir_x)) = exit {
            state.award_point(conceding_side.opposite());
            state.serve(dir_x);
        }

        self.ticks += 1;
        sink.broadcast(state.snapshot());

        if state.has_winner() {
            state.finish();
            sink.broadcast(state.snapshot());
            self.stop();
            info!("Game over at {} points", state.leading_score());
            return TickOutcome::Finished;
        }

        TickOutcome::Advanced
    }
}
