//! Fixed-step simulation: movement, shot travel, hit detection

use crate::game::{GameServer, Player, Shot};
use log::info;
use shared::{hits_shape, MAX_PLAYERS, SHOT_SPEED, WORLD_HEIGHT, WORLD_WIDTH};

/// Wraps a plane coordinate into `[1, size - 2]`, keeping the border free.
fn wrap_inset(value: i16, size: i16) -> i16 {
    1 + (value - 1).rem_euclid(size - 2)
}

/// Wraps a shot coordinate into `[0, size - 1]`.
fn wrap_full(value: i16, size: i16) -> i16 {
    value.rem_euclid(size)
}

impl Player {
    fn advance(&mut self) {
        let (dx, dy) = self.direction.delta();
        self.x = wrap_inset(self.x + dx, WORLD_WIDTH);
        self.y = wrap_inset(self.y + dy, WORLD_HEIGHT);
    }

    fn is_hit_by(&self, shot: &Shot) -> bool {
        hits_shape(
            (self.x, self.y),
            self.airframe,
            self.direction,
            (shot.x, shot.y),
        )
    }
}

impl Shot {
    fn advance(&mut self) {
        if !self.active {
            return;
        }
        let (dx, dy) = self.direction.delta();
        self.x = wrap_full(self.x + dx * SHOT_SPEED, WORLD_WIDTH);
        self.y = wrap_full(self.y + dy * SHOT_SPEED, WORLD_HEIGHT);
        self.range = self.range.saturating_sub(1);
        if self.range == 0 {
            self.active = false;
        }
    }
}

impl GameServer {
    /// Advances the match by one tick.
    ///
    /// Does nothing unless a match is running with both seats connected.
    /// Returns the winner's id when this tick decided the match.
    pub fn step(&mut self) -> Option<u8> {
        if !self.game_active || self.num_players() < MAX_PLAYERS {
            return None;
        }

        self.frame_count = self.frame_count.wrapping_add(1);

        for player in self.players.iter_mut().filter(|p| p.connected) {
            player.advance();
        }
        for player in self.players.iter_mut().filter(|p| p.connected) {
            for shot in player.shots.iter_mut() {
                shot.advance();
            }
        }

        let (shooter, slot) = self.find_hit()?;
        self.players[shooter].shots[slot].active = false;
        self.game_active = false;
        let winner = self.players[shooter].id;
        self.winner = Some(winner);
        info!("Player {} wins on frame {}", winner, self.frame_count);
        Some(winner)
    }

    /// First (shooter, shot slot) pair whose shot sits inside another
    /// connected plane's silhouette, scanning in seat order.
    fn find_hit(&self) -> Option<(usize, usize)> {
        for (i, shooter) in self.players.iter().enumerate() {
            if !shooter.connected {
                continue;
            }
            for (s, shot) in shooter.shots.iter().enumerate() {
                if !shot.active {
                    continue;
                }
                let hit = self
                    .players
                    .iter()
                    .enumerate()
                    .any(|(j, target)| i != j && target.connected && target.is_hit_by(shot));
                if hit {
                    return Some((i, s));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GamePhase;
    use shared::{Direction, SHOT_RANGE};
    use std::net::SocketAddr;
    use std::time::Instant;

    /// Two seated players in a running match, parked far apart.
    fn running_match() -> GameServer {
        let mut game = GameServer::new();
        let now = Instant::now();
        game.join(SocketAddr::from(([127, 0, 0, 1], 7000)), now);
        game.join(SocketAddr::from(([127, 0, 0, 1], 7001)), now);
        assert!(game.game_active);
        game
    }

    fn place(game: &mut GameServer, id: usize, x: i16, y: i16, direction: Direction) {
        let player = &mut game.players[id];
        player.x = x;
        player.y = y;
        player.direction = direction;
    }

    fn shot(x: i16, y: i16, direction: Direction, range: u8) -> Shot {
        Shot {
            x,
            y,
            direction,
            range,
            active: true,
        }
    }

    #[test]
    fn test_wrap_helpers() {
        assert_eq!(wrap_inset(0, 80), 78);
        assert_eq!(wrap_inset(1, 80), 1);
        assert_eq!(wrap_inset(78, 80), 78);
        assert_eq!(wrap_inset(79, 80), 1);

        assert_eq!(wrap_full(-1, 80), 79);
        assert_eq!(wrap_full(-3, 80), 77);
        assert_eq!(wrap_full(80, 80), 0);
        assert_eq!(wrap_full(81, 80), 1);
    }

    #[test]
    fn test_step_noop_when_waiting() {
        let mut game = GameServer::new();
        game.join(SocketAddr::from(([127, 0, 0, 1], 7000)), Instant::now());

        let before = format!("{:?}", game);
        assert_eq!(game.step(), None);
        assert_eq!(format!("{:?}", game), before);
        assert_eq!(game.frame_count, 0);
    }

    #[test]
    fn test_step_moves_players_and_counts_frames() {
        let mut game = running_match();
        game.step();

        assert_eq!(game.frame_count, 1);
        assert_eq!((game.players[0].x, game.players[0].y), (69, 70));
        assert_eq!((game.players[1].x, game.players[1].y), (11, 10));
    }

    #[test]
    fn test_players_wrap_inside_inset_bounds() {
        let mut game = running_match();
        place(&mut game, 0, 1, 1, Direction::NW);
        place(&mut game, 1, 78, 40, Direction::E);

        game.step();
        assert_eq!((game.players[0].x, game.players[0].y), (78, 78));
        assert_eq!((game.players[1].x, game.players[1].y), (1, 40));

        for dir in Direction::ALL {
            game.players[0].direction = dir;
            game.players[1].direction = Direction::from_wire(dir as u8 + 3);
            for _ in 0..100 {
                game.step();
                for player in &game.players {
                    assert!((1..=WORLD_WIDTH - 2).contains(&player.x));
                    assert!((1..=WORLD_HEIGHT - 2).contains(&player.y));
                }
            }
        }
    }

    #[test]
    fn test_shots_wrap_inside_full_bounds() {
        let mut game = running_match();
        place(&mut game, 0, 40, 70, Direction::N);
        place(&mut game, 1, 40, 10, Direction::S);
        game.players[0].shots[0] = shot(1, 78, Direction::SW, 10);

        game.step();
        let s = game.players[0].shots[0];
        assert_eq!((s.x, s.y), (78, 1));
        assert!((0..WORLD_WIDTH).contains(&s.x));
        assert!((0..WORLD_HEIGHT).contains(&s.y));
    }

    #[test]
    fn test_shot_range_decrements_until_exactly_zero() {
        let mut game = running_match();
        place(&mut game, 0, 40, 10, Direction::E);
        place(&mut game, 1, 10, 70, Direction::N);
        game.players[0].shots[0] = shot(40, 10, Direction::E, SHOT_RANGE);

        let mut last_range = SHOT_RANGE;
        for tick in 1..SHOT_RANGE {
            game.step();
            let s = game.players[0].shots[0];
            assert!(s.active, "shot died early on tick {}", tick);
            assert!(s.range < last_range);
            assert_eq!(s.range, SHOT_RANGE - tick);
            last_range = s.range;
        }

        game.step();
        let s = game.players[0].shots[0];
        assert_eq!(s.range, 0);
        assert!(!s.active);
        assert!(game.game_active);

        let frozen = s;
        game.step();
        assert_eq!(game.players[0].shots[0], frozen);
    }

    #[test]
    fn test_hit_ends_game_in_one_step() {
        let mut game = running_match();
        place(&mut game, 0, 10, 70, Direction::N);
        place(&mut game, 1, 40, 40, Direction::E);
        // After the tick the target sits on (41, 40) and the shot lands there.
        game.players[0].shots[0] = shot(38, 40, Direction::E, 5);

        assert_eq!(game.step(), Some(0));
        assert_eq!(game.winner, Some(0));
        assert!(!game.game_active);
        assert!(!game.players[0].shots[0].active);
        assert_eq!(game.phase(), GamePhase::Over);
    }

    #[test]
    fn test_hit_on_mask_edge_cell() {
        let mut game = running_match();
        place(&mut game, 0, 10, 70, Direction::S);
        // Bomber heading north ends the tick on (40, 39); its lower-left wing
        // tip is (39, 40).
        place(&mut game, 1, 40, 40, Direction::N);
        game.players[0].shots[1] = shot(39, 43, Direction::N, 5);

        assert_eq!(game.step(), Some(0));
        assert_eq!(game.winner, Some(0));
        assert!(!game.players[0].shots[1].active);
    }

    #[test]
    fn test_shot_in_empty_mask_cell_misses() {
        let mut game = running_match();
        place(&mut game, 0, 10, 70, Direction::S);
        // Fighter heading north ends on (40, 39); (40, 40) is its empty tail cell.
        game.players[1].airframe = shared::Airframe::Fighter;
        place(&mut game, 1, 40, 40, Direction::N);
        game.players[0].shots[0] = shot(40, 43, Direction::N, 5);

        assert_eq!(game.step(), None);
        assert!(game.game_active);
        assert_eq!(game.winner, None);
    }

    #[test]
    fn test_first_hit_in_seat_order_wins() {
        let mut game = running_match();
        place(&mut game, 0, 20, 20, Direction::E);
        place(&mut game, 1, 60, 20, Direction::W);
        // Both shots land on their target's centre during the same tick.
        game.players[0].shots[0] = shot(56, 20, Direction::E, 5);
        game.players[1].shots[0] = shot(24, 20, Direction::W, 5);

        assert_eq!(game.step(), Some(0));
        assert!(!game.players[0].shots[0].active);
        assert!(game.players[1].shots[0].active);
    }

    #[test]
    fn test_terminal_state_is_idempotent() {
        let mut game = running_match();
        place(&mut game, 0, 10, 70, Direction::N);
        place(&mut game, 1, 40, 40, Direction::E);
        game.players[0].shots[0] = shot(38, 40, Direction::E, 5);
        game.players[1].shots[1] = shot(5, 5, Direction::S, 9);
        assert_eq!(game.step(), Some(0));

        let settled = format!("{:?}", game);
        for _ in 0..20 {
            assert_eq!(game.step(), None);
        }
        assert_eq!(format!("{:?}", game), settled);
    }

    #[test]
    fn test_own_shot_never_hits_shooter() {
        let mut game = running_match();
        place(&mut game, 0, 40, 40, Direction::E);
        place(&mut game, 1, 10, 70, Direction::N);
        game.players[0].shots[0] = shot(38, 40, Direction::E, 5);

        assert_eq!(game.step(), None);
        assert!(game.game_active);
    }
}
