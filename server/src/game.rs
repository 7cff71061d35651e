//! Authoritative game state: the two player slots, their shots, and the
//! match flags. Session bookkeeping, the per-tick simulation and the
//! snapshot encoder live in their own modules as further `impl GameServer`
//! blocks, so every component works on the same explicit context.

use log::debug;
use shared::{
    Airframe, Direction, PlayerState, ShotState, MAX_PLAYERS, MAX_SHOTS, SHOT_RANGE,
    WORLD_HEIGHT, WORLD_WIDTH,
};
use std::net::SocketAddr;
use std::time::Instant;

/// Coarse match phase derived from the flags on `GameServer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// No match running and at least one seat free
    Waiting,
    Active,
    /// A shot landed; stays here until a seat is vacated
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shot {
    pub x: i16,
    pub y: i16,
    pub direction: Direction,
    pub range: u8,
    pub active: bool,
}

impl Shot {
    pub const INACTIVE: Shot = Shot {
        x: 0,
        y: 0,
        direction: Direction::N,
        range: 0,
        active: false,
    };

    pub fn to_state(&self) -> ShotState {
        ShotState {
            x: self.x as u8,
            y: self.y as u8,
            direction: self.direction,
            range: self.range,
            active: self.active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: u8,
    pub x: i16,
    pub y: i16,
    pub direction: Direction,
    pub airframe: Airframe,
    pub shots: [Shot; MAX_SHOTS],
    pub addr: Option<SocketAddr>,
    pub connected: bool,
    pub last_seen: Option<Instant>,
}

impl Player {
    /// Creates an unseated player parked on its spawn point
    pub fn new(id: u8) -> Self {
        let mut player = Self {
            id,
            x: 0,
            y: 0,
            direction: Direction::N,
            airframe: Airframe::for_player(id),
            shots: [Shot::INACTIVE; MAX_SHOTS],
            addr: None,
            connected: false,
            last_seen: None,
        };
        player.respawn();
        player
    }

    /// Moves the plane back to its spawn point and clears its shots.
    ///
    /// Player 0 starts in the bottom-right corner heading west, player 1 in
    /// the top-left corner heading east. Session fields are left untouched.
    pub fn respawn(&mut self) {
        if self.id == 0 {
            self.x = WORLD_WIDTH - 10;
            self.y = WORLD_HEIGHT - 10;
            self.direction = Direction::W;
        } else {
            self.x = 10;
            self.y = 10;
            self.direction = Direction::E;
        }
        self.airframe = Airframe::for_player(self.id);
        self.shots = [Shot::INACTIVE; MAX_SHOTS];
    }

    /// Puts a new shot in the first free slot, starting at the plane's
    /// position and heading. Returns false when both slots are in flight.
    pub fn fire(&mut self) -> bool {
        match self.shots.iter_mut().find(|shot| !shot.active) {
            Some(slot) => {
                *slot = Shot {
                    x: self.x,
                    y: self.y,
                    direction: self.direction,
                    range: SHOT_RANGE,
                    active: true,
                };
                true
            }
            None => false,
        }
    }

    pub fn active_shots(&self) -> usize {
        self.shots.iter().filter(|shot| shot.active).count()
    }

    pub fn to_state(&self) -> PlayerState {
        PlayerState {
            id: self.id,
            x: self.x as u8,
            y: self.y as u8,
            direction: self.direction,
            airframe: self.airframe,
            shots: self.shots.map(|shot| shot.to_state()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameServer {
    pub players: [Player; MAX_PLAYERS],
    pub game_active: bool,
    pub winner: Option<u8>,
    pub frame_count: u32,
}

impl GameServer {
    pub fn new() -> Self {
        Self {
            players: [Player::new(0), Player::new(1)],
            game_active: false,
            winner: None,
            frame_count: 0,
        }
    }

    /// Number of seats currently held by a connected session
    pub fn num_players(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    pub fn connected_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.connected)
    }

    pub fn player(&self, id: u8) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn phase(&self) -> GamePhase {
        if self.game_active {
            GamePhase::Active
        } else if self.winner.is_some() && self.num_players() == MAX_PLAYERS {
            GamePhase::Over
        } else {
            GamePhase::Waiting
        }
    }

    /// Applies a client's latest intent to its plane.
    ///
    /// The heading is always taken; a fire request only spawns a shot while
    /// a match is running and a slot is free. Returns true when a shot was
    /// fired.
    pub fn apply_input(&mut self, id: u8, direction: Direction, fire: bool) -> bool {
        let game_active = self.game_active;
        let Some(player) = self.players.get_mut(id as usize) else {
            return false;
        };
        if !player.connected {
            return false;
        }

        player.direction = direction;
        if fire && game_active {
            let fired = player.fire();
            if !fired {
                debug!("Player {} fire dropped, no free shot slot", id);
            }
            return fired;
        }
        false
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new()
    }
}
