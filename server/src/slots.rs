//! Paddle slot assignment.
//!
//! Arrivals are seated strictly in order: the first gets the left paddle, the
//! second the right one, and anybody after that is turned away. Slots are
//! never renumbered when someone leaves.

use crate::game::MatchState;
use log::info;
use shared::{ClientId, Phase, Player, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotResult {
    /// A paddle was created. When `match_ready` is set the caller must call
    /// [`MatchState::begin`] and start the simulation loop.
    Assigned { side: Side, match_ready: bool },
    /// The connection already holds this paddle; nothing changed.
    AlreadySeated { side: Side },
    /// Both paddles are taken. The caller closes the connection.
    Rejected,
}

pub fn assign(state: &mut MatchState, client_id: ClientId) -> SlotResult {
    if let Some(player) = state.players.get(&client_id) {
        return SlotResult::AlreadySeated { side: player.side };
    }

    let side = match state.players.len() {
        0 => Side::Left,
        1 => match state.player_on(Side::Left) {
            Some(_) => Side::Right,
            None => Side::Left,
        },
        _ => {
            info!("Rejecting client {}: both paddles are taken", client_id);
            return SlotResult::Rejected;
        }
    };

    let player = Player::new(client_id, side, &state.rules.arena);
    state.players.insert(client_id, player);
    info!("Client {} takes the {:?} paddle", client_id, side);

    let match_ready = state.players.len() == 2 && state.phase == Phase::Sync;
    SlotResult::Assigned { side, match_ready }
}

/// Removes the paddle held by `client_id`, whatever the phase.
pub fn release(state: &mut MatchState, client_id: ClientId) -> Option<Player> {
    let removed = state.players.remove(&client_id);
    if let Some(player) = &removed {
        info!(
            "Client {} left the {:?} paddle ({} remaining)",
            client_id,
            player.side,
            state.players.len()
        );
    }
    removed
}
