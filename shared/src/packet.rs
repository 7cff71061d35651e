//! Byte-level wire format shared by the server and its clients
//!
//! Every datagram starts with a one-byte kind tag followed by a fixed
//! layout of single-byte fields, so no endianness handling is needed.
//! Decoding checks the minimum length for the declared kind; anything
//! past that minimum is ignored.

use crate::{Airframe, Direction, MAX_PLAYERS, MAX_SHOTS, REJECTED_ID};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bytes per shot inside a player record: x, y, direction, range, active.
pub const SHOT_RECORD_LEN: usize = 5;
/// Bytes per player record: id, x, y, direction, airframe, then its shots.
pub const PLAYER_RECORD_LEN: usize = 5 + MAX_SHOTS * SHOT_RECORD_LEN;
/// Header of a GAME_STATE packet: tag, count, active, winner.
pub const GAME_STATE_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    JoinRequest = 0x01,
    JoinResponse = 0x02,
    StateUpdate = 0x03,
    GameState = 0x04,
    GameOver = 0x05,
    Ping = 0x06,
    Pong = 0x07,
    Disconnect = 0x08,
}

impl PacketKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x01 => Some(PacketKind::JoinRequest),
            0x02 => Some(PacketKind::JoinResponse),
            0x03 => Some(PacketKind::StateUpdate),
            0x04 => Some(PacketKind::GameState),
            0x05 => Some(PacketKind::GameOver),
            0x06 => Some(PacketKind::Ping),
            0x07 => Some(PacketKind::Pong),
            0x08 => Some(PacketKind::Disconnect),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Smallest buffer, tag included, that can hold this kind.
    /// GAME_STATE additionally needs one record per announced player.
    pub fn min_len(self) -> usize {
        match self {
            PacketKind::JoinRequest | PacketKind::Ping | PacketKind::Pong => 1,
            PacketKind::GameOver | PacketKind::Disconnect => 2,
            PacketKind::JoinResponse => 3,
            PacketKind::StateUpdate => 4,
            PacketKind::GameState => GAME_STATE_HEADER_LEN,
        }
    }
}

/// Reasons a datagram could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty datagram")]
    Empty,
    #[error("unknown packet kind 0x{0:02x}")]
    UnknownKind(u8),
    #[error("{kind:?} needs {expected} bytes, got {actual}")]
    Truncated {
        kind: PacketKind,
        expected: usize,
        actual: usize,
    },
    #[error("invalid {field} value {value}")]
    InvalidValue { field: &'static str, value: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotState {
    pub x: u8,
    pub y: u8,
    pub direction: Direction,
    pub range: u8,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub id: u8,
    pub x: u8,
    pub y: u8,
    pub direction: Direction,
    pub airframe: Airframe,
    pub shots: [ShotState; MAX_SHOTS],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    JoinRequest,
    /// `player_id` is `REJECTED_ID` when `accepted` is false.
    JoinResponse {
        player_id: u8,
        accepted: bool,
    },
    StateUpdate {
        player_id: u8,
        direction: Direction,
        fire: bool,
    },
    GameState {
        active: bool,
        winner: Option<u8>,
        players: Vec<PlayerState>,
    },
    GameOver {
        winner: u8,
    },
    Ping,
    Pong,
    Disconnect {
        player_id: u8,
    },
}

impl Packet {
    pub fn join_accepted(player_id: u8) -> Self {
        Packet::JoinResponse {
            player_id,
            accepted: true,
        }
    }

    pub fn join_rejected() -> Self {
        Packet::JoinResponse {
            player_id: REJECTED_ID,
            accepted: false,
        }
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Packet::JoinRequest => PacketKind::JoinRequest,
            Packet::JoinResponse { .. } => PacketKind::JoinResponse,
            Packet::StateUpdate { .. } => PacketKind::StateUpdate,
            Packet::GameState { .. } => PacketKind::GameState,
            Packet::GameOver { .. } => PacketKind::GameOver,
            Packet::Ping => PacketKind::Ping,
            Packet::Pong => PacketKind::Pong,
            Packet::Disconnect { .. } => PacketKind::Disconnect,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            Packet::GameState { players, .. } => {
                GAME_STATE_HEADER_LEN + players.len().min(MAX_PLAYERS) * PLAYER_RECORD_LEN
            }
            other => other.kind().min_len(),
        }
    }

    /// Appends the wire form of this packet to `buf`.
    ///
    /// A GAME_STATE carries at most `MAX_PLAYERS` records; extra entries are
    /// not written.
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.push(self.kind().tag());
        match self {
            Packet::JoinRequest | Packet::Ping | Packet::Pong => {}
            Packet::JoinResponse {
                player_id,
                accepted,
            } => {
                buf.push(*player_id);
                buf.push(*accepted as u8);
            }
            Packet::StateUpdate {
                player_id,
                direction,
                fire,
            } => {
                buf.push(*player_id);
                buf.push(*direction as u8);
                buf.push(*fire as u8);
            }
            Packet::GameState {
                active,
                winner,
                players,
            } => {
                let players = &players[..players.len().min(MAX_PLAYERS)];
                buf.push(players.len() as u8);
                buf.push(*active as u8);
                // 0 means "no winner yet", otherwise the winning id plus one.
                buf.push(winner.map_or(0, |id| id.wrapping_add(1)));
                for player in players {
                    buf.push(player.id);
                    buf.push(player.x);
                    buf.push(player.y);
                    buf.push(player.direction as u8);
                    buf.push(player.airframe as u8);
                    for shot in &player.shots {
                        buf.push(shot.x);
                        buf.push(shot.y);
                        buf.push(shot.direction as u8);
                        buf.push(shot.range);
                        buf.push(shot.active as u8);
                    }
                }
            }
            Packet::GameOver { winner } => buf.push(*winner),
            Packet::Disconnect { player_id } => buf.push(*player_id),
        }
    }

    pub fn decode(data: &[u8]) -> Result<Packet, DecodeError> {
        let tag = *data.first().ok_or(DecodeError::Empty)?;
        let kind = PacketKind::from_tag(tag).ok_or(DecodeError::UnknownKind(tag))?;
        require_len(kind, kind.min_len(), data)?;

        let packet = match kind {
            PacketKind::JoinRequest => Packet::JoinRequest,
            PacketKind::Ping => Packet::Ping,
            PacketKind::Pong => Packet::Pong,
            PacketKind::JoinResponse => Packet::JoinResponse {
                player_id: data[1],
                accepted: data[2] != 0,
            },
            PacketKind::StateUpdate => Packet::StateUpdate {
                player_id: data[1],
                direction: Direction::from_wire(data[2]),
                fire: data[3] != 0,
            },
            PacketKind::GameOver => Packet::GameOver { winner: data[1] },
            PacketKind::Disconnect => Packet::Disconnect { player_id: data[1] },
            PacketKind::GameState => decode_game_state(data)?,
        };

        Ok(packet)
    }
}

fn require_len(kind: PacketKind, expected: usize, data: &[u8]) -> Result<(), DecodeError> {
    if data.len() < expected {
        return Err(DecodeError::Truncated {
            kind,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn decode_game_state(data: &[u8]) -> Result<Packet, DecodeError> {
    let count = data[1];
    if count as usize > MAX_PLAYERS {
        return Err(DecodeError::InvalidValue {
            field: "player count",
            value: count,
        });
    }
    let expected = GAME_STATE_HEADER_LEN + count as usize * PLAYER_RECORD_LEN;
    require_len(PacketKind::GameState, expected, data)?;

    let active = data[2] != 0;
    let winner = match data[3] {
        0 => None,
        n => Some(n - 1),
    };

    let mut players = Vec::with_capacity(count as usize);
    for record in data[GAME_STATE_HEADER_LEN..expected].chunks_exact(PLAYER_RECORD_LEN) {
        players.push(decode_player(record)?);
    }

    Ok(Packet::GameState {
        active,
        winner,
        players,
    })
}

fn decode_player(record: &[u8]) -> Result<PlayerState, DecodeError> {
    let airframe = Airframe::from_wire(record[4]).ok_or(DecodeError::InvalidValue {
        field: "airframe",
        value: record[4],
    })?;

    let mut shots = [ShotState {
        x: 0,
        y: 0,
        direction: Direction::N,
        range: 0,
        active: false,
    }; MAX_SHOTS];
    for (shot, bytes) in shots.iter_mut().zip(record[5..].chunks_exact(SHOT_RECORD_LEN)) {
        *shot = ShotState {
            x: bytes[0],
            y: bytes[1],
            direction: Direction::from_wire(bytes[2]),
            range: bytes[3],
            active: bytes[4] != 0,
        };
    }

    Ok(PlayerState {
        id: record[0],
        x: record[1],
        y: record[2],
        direction: Direction::from_wire(record[3]),
        airframe,
        shots,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_player(id: u8) -> PlayerState {
        PlayerState {
            id,
            x: 70,
            y: 12,
            direction: Direction::SW,
            airframe: Airframe::for_player(id),
            shots: [
                ShotState {
                    x: 3,
                    y: 79,
                    direction: Direction::SW,
                    range: 9,
                    active: true,
                },
                ShotState {
                    x: 0,
                    y: 0,
                    direction: Direction::N,
                    range: 0,
                    active: false,
                },
            ],
        }
    }

    #[test]
    fn test_roundtrip_every_kind() {
        let packets = vec![
            Packet::JoinRequest,
            Packet::join_accepted(1),
            Packet::join_rejected(),
            Packet::StateUpdate {
                player_id: 0,
                direction: Direction::NW,
                fire: true,
            },
            Packet::GameState {
                active: false,
                winner: None,
                players: vec![],
            },
            Packet::GameState {
                active: true,
                winner: None,
                players: vec![sample_player(0), sample_player(1)],
            },
            Packet::GameState {
                active: false,
                winner: Some(1),
                players: vec![sample_player(1)],
            },
            Packet::GameOver { winner: 0 },
            Packet::Ping,
            Packet::Pong,
            Packet::Disconnect { player_id: 1 },
        ];

        for packet in packets {
            let bytes = packet.encode();
            assert_eq!(bytes.len(), packet.encoded_len());
            assert_eq!(bytes[0], packet.kind().tag());
            assert_eq!(Packet::decode(&bytes), Ok(packet));
        }
    }

    #[test]
    fn test_join_response_layout() {
        assert_eq!(Packet::join_accepted(1).encode(), vec![0x02, 1, 1]);
        assert_eq!(Packet::join_rejected().encode(), vec![0x02, 0xFF, 0]);
    }

    #[test]
    fn test_state_update_layout() {
        let bytes = Packet::StateUpdate {
            player_id: 1,
            direction: Direction::S,
            fire: false,
        }
        .encode();
        assert_eq!(bytes, vec![0x03, 1, 4, 0]);
    }

    #[test]
    fn test_game_state_layout() {
        let bytes = Packet::GameState {
            active: true,
            winner: Some(0),
            players: vec![sample_player(0)],
        }
        .encode();

        assert_eq!(bytes.len(), GAME_STATE_HEADER_LEN + PLAYER_RECORD_LEN);
        assert_eq!(&bytes[..4], &[0x04, 1, 1, 1]);
        assert_eq!(&bytes[4..9], &[0, 70, 12, 5, 0]);
        assert_eq!(&bytes[9..14], &[3, 79, 5, 9, 1]);
        assert_eq!(&bytes[14..19], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(Packet::decode(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_decode_unknown_kind() {
        assert_eq!(Packet::decode(&[0x00]), Err(DecodeError::UnknownKind(0x00)));
        assert_eq!(Packet::decode(&[0x42, 1, 2]), Err(DecodeError::UnknownKind(0x42)));
    }

    #[test]
    fn test_decode_truncated_for_each_kind() {
        let cases = [
            (vec![0x02, 1], PacketKind::JoinResponse, 3),
            (vec![0x03, 0, 2], PacketKind::StateUpdate, 4),
            (vec![0x04, 0], PacketKind::GameState, 4),
            (vec![0x05], PacketKind::GameOver, 2),
            (vec![0x08], PacketKind::Disconnect, 2),
        ];

        for (bytes, kind, expected) in cases {
            assert_eq!(
                Packet::decode(&bytes),
                Err(DecodeError::Truncated {
                    kind,
                    expected,
                    actual: bytes.len(),
                })
            );
        }
    }

    #[test]
    fn test_decode_game_state_short_records() {
        let mut bytes = Packet::GameState {
            active: true,
            winner: None,
            players: vec![sample_player(0), sample_player(1)],
        }
        .encode();
        bytes.truncate(bytes.len() - 1);

        assert_eq!(
            Packet::decode(&bytes),
            Err(DecodeError::Truncated {
                kind: PacketKind::GameState,
                expected: GAME_STATE_HEADER_LEN + 2 * PLAYER_RECORD_LEN,
                actual: GAME_STATE_HEADER_LEN + 2 * PLAYER_RECORD_LEN - 1,
            })
        );
    }

    #[test]
    fn test_decode_game_state_rejects_too_many_players() {
        assert_eq!(
            Packet::decode(&[0x04, 3, 1, 0]),
            Err(DecodeError::InvalidValue {
                field: "player count",
                value: 3,
            })
        );
    }

    #[test]
    fn test_decode_game_state_rejects_bad_airframe() {
        let mut bytes = Packet::GameState {
            active: true,
            winner: None,
            players: vec![sample_player(0)],
        }
        .encode();
        bytes[8] = 7;

        assert_eq!(
            Packet::decode(&bytes),
            Err(DecodeError::InvalidValue {
                field: "airframe",
                value: 7,
            })
        );
    }

    #[test]
    fn test_decode_state_update_wraps_direction() {
        let packet = Packet::decode(&[0x03, 1, 9, 1]).unwrap();
        assert_eq!(
            packet,
            Packet::StateUpdate {
                player_id: 1,
                direction: Direction::NE,
                fire: true,
            }
        );
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        assert_eq!(Packet::decode(&[0x06, 0xAA, 0xBB]), Ok(Packet::Ping));
        assert_eq!(
            Packet::decode(&[0x03, 0, 2, 0, 0]),
            Ok(Packet::StateUpdate {
                player_id: 0,
                direction: Direction::E,
                fire: false,
            })
        );
    }

    #[test]
    fn test_encode_caps_player_records() {
        let packet = Packet::GameState {
            active: true,
            winner: None,
            players: vec![sample_player(0), sample_player(1), sample_player(1)],
        };
        let bytes = packet.encode();
        assert_eq!(bytes[1], MAX_PLAYERS as u8);
        assert_eq!(bytes.len(), GAME_STATE_HEADER_LEN + MAX_PLAYERS * PLAYER_RECORD_LEN);
        assert_eq!(bytes.len(), packet.encoded_len());
    }

    #[test]
    fn test_player_state_json() {
        let json = serde_json::to_string(&sample_player(1)).unwrap();
        assert!(json.contains("\"airframe\":\"Bomber\""));
        assert!(json.contains("\"direction\":\"SW\""));

        let back: PlayerState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_player(1));
    }
}
