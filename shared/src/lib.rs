use serde::{Deserialize, Serialize};

pub mod packet;

pub use packet::{DecodeError, Packet, PacketKind, PlayerState, ShotState};

pub const SERVER_PORT: u16 = 4242;
pub const MAX_PLAYERS: usize = 2;
pub const MAX_SHOTS: usize = 2;
pub const WORLD_WIDTH: i16 = 80;
pub const WORLD_HEIGHT: i16 = 80;
pub const SHOT_SPEED: i16 = 3;
pub const SHOT_RANGE: u8 = 15;

/// Player id sent back in a JOIN_RESPONSE when the table is full.
pub const REJECTED_ID: u8 = 0xFF;

/// One of the eight compass headings, clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    N = 0,
    NE = 1,
    E = 2,
    SE = 3,
    S = 4,
    SW = 5,
    W = 6,
    NW = 7,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::N,
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::S,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// Maps any wire byte onto a heading; values wrap modulo 8.
    pub fn from_wire(value: u8) -> Self {
        Self::ALL[(value % 8) as usize]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Unit grid step for this heading. Screen coordinates: y grows southwards.
    pub fn delta(self) -> (i16, i16) {
        match self {
            Direction::N => (0, -1),
            Direction::NE => (1, -1),
            Direction::E => (1, 0),
            Direction::SE => (1, 1),
            Direction::S => (0, 1),
            Direction::SW => (-1, 1),
            Direction::W => (-1, 0),
            Direction::NW => (-1, -1),
        }
    }
}

/// Plane silhouette. Each player flies the airframe matching its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Airframe {
    Fighter = 0,
    Bomber = 1,
}

impl Airframe {
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Airframe::Fighter),
            1 => Some(Airframe::Bomber),
            _ => None,
        }
    }

    pub fn for_player(player_id: u8) -> Self {
        if player_id == 0 {
            Airframe::Fighter
        } else {
            Airframe::Bomber
        }
    }
}

type Mask = [u8; 9];

// Row-major 3x3 grids centred on the plane; row 0 is y - 1, column 0 is x - 1.
const FIGHTER_MASKS: [Mask; 8] = [
    [0, 1, 0, 1, 1, 1, 0, 0, 0],
    [1, 0, 1, 0, 1, 0, 1, 0, 0],
    [0, 1, 0, 1, 1, 0, 0, 1, 0],
    [1, 0, 0, 0, 1, 0, 1, 0, 1],
    [0, 0, 0, 1, 1, 1, 0, 1, 0],
    [0, 0, 1, 0, 1, 0, 1, 0, 1],
    [0, 1, 0, 0, 1, 1, 0, 1, 0],
    [1, 0, 1, 0, 1, 0, 0, 0, 1],
];

const BOMBER_MASKS: [Mask; 8] = [
    [0, 1, 0, 1, 1, 1, 1, 0, 1],
    [1, 1, 1, 1, 1, 0, 1, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 1, 1],
    [1, 0, 0, 1, 1, 0, 1, 1, 1],
    [1, 0, 1, 1, 1, 1, 0, 1, 0],
    [0, 0, 1, 0, 1, 1, 1, 1, 1],
    [1, 1, 0, 0, 1, 1, 1, 1, 0],
    [1, 1, 1, 0, 1, 1, 0, 0, 1],
];

/// Returns the 3x3 occupancy mask for an airframe flying in `direction`.
pub fn shape_mask(airframe: Airframe, direction: Direction) -> &'static [u8; 9] {
    match airframe {
        Airframe::Fighter => &FIGHTER_MASKS[direction.index()],
        Airframe::Bomber => &BOMBER_MASKS[direction.index()],
    }
}

/// Tests whether `cell` is a solid part of a plane centred on `center`.
///
/// The mask is not wrapped: planes are kept one cell away from the border,
/// so every mask cell already lies inside the playfield.
pub fn hits_shape(
    center: (i16, i16),
    airframe: Airframe,
    direction: Direction,
    cell: (i16, i16),
) -> bool {
    let dx = cell.0 - center.0 + 1;
    let dy = cell.1 - center.1 + 1;
    if !(0..3).contains(&dx) || !(0..3).contains(&dy) {
        return false;
    }
    shape_mask(airframe, direction)[(dy * 3 + dx) as usize] != 0
}
