//! World snapshots and their fan-out to connected sessions
//!
//! Snapshots go out on their own timer, faster than the simulation ticks.
//! The same state is therefore delivered several times, which covers for
//! lost datagrams without any acknowledgement scheme.

use crate::game::GameServer;
use shared::Packet;
use std::net::SocketAddr;

/// One encoded datagram and every address it must reach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub payload: Vec<u8>,
    pub targets: Vec<SocketAddr>,
}

impl Broadcast {
    /// Encodes `packet` once for every connected session. Returns `None`
    /// when nobody is connected.
    pub fn to_sessions(game: &GameServer, packet: &Packet) -> Option<Self> {
        let targets: Vec<SocketAddr> = game
            .session_addrs()
            .into_iter()
            .map(|(_, addr)| addr)
            .collect();
        if targets.is_empty() {
            return None;
        }

        Some(Self {
            payload: packet.encode(),
            targets,
        })
    }

    /// Current GAME_STATE for every connected session
    pub fn game_state(game: &GameServer) -> Option<Self> {
        Self::to_sessions(game, &game.snapshot())
    }
}

impl GameServer {
    /// Full world state: match flags plus one record per connected player
    /// in seat order.
    pub fn snapshot(&self) -> Packet {
        Packet::GameState {
            active: self.game_active,
            winner: self.winner,
            players: self.connected_players().map(|p| p.to_state()).collect(),
        }
    }
}
