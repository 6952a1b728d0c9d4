//! Types and constants shared between the pong server and its clients.
//!
//! Everything that must agree on both ends of the wire lives here: the arena
//! and entity dimensions, the entity records carried in snapshots, the
//! [`Packet`] message contract and the pure [`physics`] functions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod physics;

pub const CANVAS_WIDTH: f32 = 600.0;
pub const CANVAS_HEIGHT: f32 = 400.0;
pub const PADDLE_WIDTH: f32 = 20.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
pub const BALL_RADIUS: f32 = 10.0;
pub const BALL_SPEED: f32 = 5.0;
pub const BALL_SPEED_DELTA: f32 = 0.5;
pub const WIN_SCORE: u32 = 5;
pub const TICK_RATE: u32 = 50;
pub const PADDLE_COLOR: &str = "WHITE";
pub const BALL_COLOR: &str = "WHITE";

/// Opaque per-connection identifier assigned by the server.
pub type ClientId = u32;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Coarse match state.
///
/// `Pause` is a valid state on the wire but nothing in the current rules
/// enters it.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Sync,
    Play,
    Pause,
    End,
}

/// Logical playing field. Paddles sit flush against the left and right edges.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
        }
    }
}

impl Arena {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.width / 2.0, self.height / 2.0)
    }

    /// Highest `y` a paddle's top edge may take while staying on the field.
    pub fn max_paddle_y(&self) -> f32 {
        (self.height - PADDLE_HEIGHT).max(0.0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: ClientId,
    pub side: Side,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
    pub score: u32,
}

impl Player {
    /// Creates a paddle on `side`, vertically centered, with no points.
    pub fn new(id: ClientId, side: Side, arena: &Arena) -> Self {
        let x = match side {
            Side::Left => 0.0,
            Side::Right => arena.width - PADDLE_WIDTH,
        };

        Self {
            id,
            side,
            x,
            y: arena.height / 2.0 - PADDLE_HEIGHT / 2.0,
            width: PADDLE_WIDTH,
            height: PADDLE_HEIGHT,
            color: PADDLE_COLOR.to_string(),
            score: 0,
        }
    }

    pub fn get_bounds(&self) -> (f32, f32, f32, f32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Ball {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub speed: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub color: String,
}

impl Ball {
    /// Places a fresh ball at the arena center moving at base speed.
    ///
    /// `dir_x` and `dir_y` are expected to be `1.0` or `-1.0`.
    pub fn serve(arena: &Arena, dir_x: f32, dir_y: f32) -> Self {
        let (x, y) = arena.center();
        Self {
            x,
            y,
            radius: BALL_RADIUS,
            speed: BALL_SPEED,
            velocity_x: BALL_SPEED * dir_x,
            velocity_y: BALL_SPEED * dir_y,
            color: BALL_COLOR.to_string(),
        }
    }

    pub fn get_bounds(&self) -> (f32, f32, f32, f32) {
        (
            self.x - self.radius,
            self.y - self.radius,
            self.x + self.radius,
            self.y + self.radius,
        )
    }
}

/// Full match state as seen by every client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub players: HashMap<ClientId, Player>,
    pub ball: Option<Ball>,
    pub phase: Phase,
}

impl Snapshot {
    pub fn player_on(&self, side: Side) -> Option<&Player> {
        self.players.values().find(|p| p.side == side)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Join,
    Move { y: f32 },
    Leave,

    Assigned { client_id: ClientId, side: Side },
    Rejected { reason: String },
    State(Snapshot),
}

impl Packet {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}
