use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::{Arena, Ball, ClientId, Phase, Player, Side, Snapshot, WIN_SCORE};
use std::collections::HashMap;

/// Fixed parameters of one match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchRules {
    pub arena: Arena,
    pub win_score: u32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            arena: Arena::default(),
            win_score: WIN_SCORE,
        }
    }
}

/// The authoritative state of a single match.
///
/// Exactly one instance exists per running match and it is only ever touched
/// by the server loop that owns it.
#[derive(Debug, Clone)]
pub struct MatchState {
    pub players: HashMap<ClientId, Player>,
    pub ball: Option<Ball>,
    pub phase: Phase,
    pub rules: MatchRules,
    rng: StdRng,
}

impl MatchState {
    pub fn new(rules: MatchRules) -> Self {
        Self::with_rng(rules, StdRng::from_entropy())
    }

    /// Deterministic serve directions, for tests and replays.
    pub fn with_seed(rules: MatchRules, seed: u64) -> Self {
        Self::with_rng(rules, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rules: MatchRules, rng: StdRng) -> Self {
        Self {
            players: HashMap::new(),
            ball: None,
            phase: Phase::Sync,
            rules,
            rng,
        }
    }

    pub fn player_on(&self, side: Side) -> Option<&Player> {
        self.players.values().find(|p| p.side == side)
    }

    pub fn player_on_mut(&mut self, side: Side) -> Option<&mut Player> {
        self.players.values_mut().find(|p| p.side == side)
    }

    /// Starts play: serves a ball in a random direction and enters `Play`.
    ///
    /// Only valid from `Sync`; any other phase is left untouched.
    pub fn begin(&mut self) -> bool {
        if self.phase != Phase::Sync {
            return false;
        }

        let dir_x = self.random_direction();
        self.serve(dir_x);
        self.phase = Phase::Play;
        info!("Match started with {} players", self.players.len());
        true
    }

    /// Replaces the ball after a point, heading along `dir_x`.
    pub fn serve(&mut self, dir_x: f32) {
        let dir_y = self.random_direction();
        self.ball = Some(Ball::serve(&self.rules.arena, dir_x, dir_y));
    }

    /// Gives one point to whoever holds `side`. Returns the new score.
    pub fn award_point(&mut self, side: Side) -> Option<u32> {
        match self.player_on_mut(side) {
            Some(player) => {
                player.score += 1;
                info!("Point for {:?} player {} ({})", side, player.id, player.score);
                Some(player.score)
            }
            None => {
                debug!("No {:?} player to award the point to", side);
                None
            }
        }
    }

    pub fn leading_score(&self) -> u32 {
        self.players.values().map(|p| p.score).max().unwrap_or(0)
    }

    pub fn has_winner(&self) -> bool {
        self.leading_score() >= self.rules.win_score
    }

    /// Moves the terminal phase in. `End` is never left afterwards.
    pub fn finish(&mut self) {
        self.phase = Phase::End;
    }

    /// Applies a client's paddle position.
    ///
    /// The value is clamped to the arena. Non-finite values and moves from
    /// connections without a paddle are dropped.
    pub fn set_paddle_y(&mut self, client_id: ClientId, y: f32) -> bool {
        if !y.is_finite() {
            warn!("Dropping non-finite paddle position from client {}", client_id);
            return false;
        }

        let max_y = self.rules.arena.max_paddle_y();
        match self.players.get_mut(&client_id) {
            Some(player) => {
                player.y = y.clamp(0.0, max_y);
                true
            }
            None => {
                debug!("Dropping move from client {} without a paddle", client_id);
                false
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            players: self.players.clone(),
            ball: self.ball.clone(),
            phase: self.phase,
        }
    }

    fn random_direction(&mut self) -> f32 {
        if self.rng.gen_bool(0.5) {
            1.0
        } else {
            -1.0
        }
    }
}
