use crate::game::MatchRules;
use shared::{Arena, PADDLE_HEIGHT, PADDLE_WIDTH, TICK_RATE, WIN_SCORE};
use std::error::Error;
use std::time::Duration;

/// Runtime settings for one server process.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tick_rate: u32,
    pub win_score: u32,
    pub arena: Arena,
    /// Open connections allowed at once, seated or not.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            tick_rate: TICK_RATE,
            win_score: WIN_SCORE,
            arena: Arena::default(),
            max_connections: 16,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn rules(&self) -> MatchRules {
        MatchRules {
            arena: self.arena,
            win_score: self.win_score,
        }
    }

    pub fn validate(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if self.tick_rate == 0 {
            return Err("tick rate must be at least 1".into());
        }
        if self.win_score == 0 {
            return Err("win score must be at least 1".into());
        }
        if !self.arena.width.is_finite()
            || !self.arena.height.is_finite()
            || self.arena.width <= 2.0 * PADDLE_WIDTH
            || self.arena.height < PADDLE_HEIGHT
        {
            return Err(format!(
                "arena {}x{} is too small for {}x{} paddles",
                self.arena.width, self.arena.height, PADDLE_WIDTH, PADDLE_HEIGHT
            )
            .into());
        }
        if self.max_connections < 2 {
            return Err("at least two connections are needed for a match".into());
        }
        Ok(())
    }
}
