//! Seat bookkeeping for the two participants
//!
//! This module handles the server-side half of the join protocol:
//! - Seat allocation (lowest free id first) and capacity enforcement
//! - Liveness tracking through `last_seen` timestamps
//! - Timeout sweeps, the only way a silent client is ever detected
//!
//! Nothing here touches the socket. Callers encode and send whatever
//! response the table decides on.

use crate::game::GameServer;
use log::{debug, info};
use shared::{Packet, MAX_PLAYERS};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Outcome of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinResult {
    pub accepted: bool,
    pub assigned_id: Option<u8>,
}

impl JoinResult {
    fn accepted(id: u8) -> Self {
        Self {
            accepted: true,
            assigned_id: Some(id),
        }
    }

    fn rejected() -> Self {
        Self {
            accepted: false,
            assigned_id: None,
        }
    }

    /// JOIN_RESPONSE to send back to the requester
    pub fn to_packet(&self) -> Packet {
        match self.assigned_id {
            Some(id) if self.accepted => Packet::join_accepted(id),
            _ => Packet::join_rejected(),
        }
    }
}

impl GameServer {
    /// Seats a new participant, or answers again for one already seated.
    ///
    /// A repeated join from an address that already holds a seat returns the
    /// same id and only refreshes liveness, so a client whose JOIN_RESPONSE
    /// was lost can simply ask again. When the join fills the second seat a
    /// fresh match starts with both planes back on their spawn points.
    pub fn join(&mut self, addr: SocketAddr, now: Instant) -> JoinResult {
        if let Some(id) = self.find_by_addr(addr) {
            debug!("Repeated join from {}, keeping player {}", addr, id);
            self.touch(id, now);
            return JoinResult::accepted(id);
        }

        let Some(slot) = self.players.iter().position(|p| !p.connected) else {
            info!("Rejected join from {}: server full", addr);
            return JoinResult::rejected();
        };

        let player = &mut self.players[slot];
        player.respawn();
        player.addr = Some(addr);
        player.connected = true;
        player.last_seen = Some(now);
        let id = player.id;
        info!("Player {} joined from {}", id, addr);

        if self.num_players() == MAX_PLAYERS {
            self.start_match();
        }

        JoinResult::accepted(id)
    }

    fn start_match(&mut self) {
        for player in self.players.iter_mut() {
            player.respawn();
        }
        self.game_active = true;
        self.winner = None;
        self.frame_count = 0;
        info!("Game started");
    }

    /// Refreshes liveness for a connected seat. Returns false for unknown or
    /// vacated ids.
    pub fn touch(&mut self, id: u8, now: Instant) -> bool {
        match self.players.get_mut(id as usize) {
            Some(player) if player.connected => {
                player.last_seen = Some(now);
                true
            }
            _ => false,
        }
    }

    /// Vacates every seat that has been silent for longer than `timeout`.
    ///
    /// Any running match is halted. Returns the ids that were dropped.
    pub fn sweep_timeouts(&mut self, now: Instant, timeout: Duration) -> Vec<u8> {
        let mut timed_out = Vec::new();

        for player in self.players.iter_mut().filter(|p| p.connected) {
            let silent_for = player
                .last_seen
                .map_or(Duration::MAX, |seen| now.saturating_duration_since(seen));
            if silent_for > timeout {
                player.connected = false;
                timed_out.push(player.id);
                info!("Player {} timed out after {:?}", player.id, silent_for);
            }
        }

        if !timed_out.is_empty() {
            self.game_active = false;
            info!("Game now {:?}", self.phase());
        }
        timed_out
    }

    /// Vacates a seat on the client's request. Returns false if the seat was
    /// not held.
    pub fn disconnect(&mut self, id: u8) -> bool {
        match self.players.get_mut(id as usize) {
            Some(player) if player.connected => {
                player.connected = false;
                self.game_active = false;
                info!("Player {} disconnected, game now {:?}", id, self.phase());
                true
            }
            _ => false,
        }
    }

    pub fn is_full(&self) -> bool {
        self.num_players() >= MAX_PLAYERS
    }

    /// Finds the connected seat bound to a network address
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u8> {
        self.connected_players()
            .find(|p| p.addr == Some(addr))
            .map(|p| p.id)
    }

    /// True when `addr` is the session currently holding seat `id`
    pub fn is_session(&self, id: u8, addr: SocketAddr) -> bool {
        self.player(id)
            .map_or(false, |p| p.connected && p.addr == Some(addr))
    }

    /// Addresses of every connected session, in seat order
    pub fn session_addrs(&self) -> Vec<(u8, SocketAddr)> {
        self.connected_players()
            .filter_map(|p| p.addr.map(|addr| (p.id, addr)))
            .collect()
    }
}
