//! # Pong Server Library
//!
//! Authoritative server for a two-player paddle game. The server owns the
//! only copy of the match (paddles, ball, scores and phase) and streams full
//! snapshots to every connected client. Clients only ever send their own
//! paddle position.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The ball is simulated here and nowhere else. Each tick advances the ball by
//! its velocity, bounces it off the top and bottom walls, deflects it off the
//! paddle it is heading into and awards a point when it leaves the field.
//! Paddles are never simulated, only reported.
//!
//! ### Seating
//! The first connection to ask for a paddle gets the left one, the second the
//! right one, and the match starts as soon as both are seated. Anyone else is
//! turned away and disconnected.
//!
//! ### State Broadcasting
//! Every tick, and once more when a match ends, the full match state is sent
//! to all connections. There are no per-client views.
//!
//! ## Architecture Design
//!
//! ### Single Owner
//! [`network::Server::run`] owns the [`game::MatchState`], the
//! [`simulation::SimulationLoop`] and the [`client_manager::ClientManager`] and
//! handles one event at a time: a decoded packet, a connection change, or a
//! tick. A tick always runs to completion before the next event, so clients
//! never see a half-updated match and no locks are needed.
//!
//! ### WebSocket Transport
//! Each connection gets a reader task that decodes `bincode` frames into
//! [`shared::Packet`]s for the server loop, and a writer task that drains the
//! connection's outbound queue.
//!
//! ## Module Organization
//!
//! - `client_manager`: connection identifiers and outbound queues
//! - `config`: runtime settings and their validation
//! - `game`: the match state and its transitions
//! - `network`: the server loop and WebSocket plumbing
//! - `simulation`: the fixed-rate tick driver
//! - `slots`: paddle assignment and release
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod game;
pub mod network;
pub mod simulation;
pub mod slots;
