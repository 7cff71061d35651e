//! # Dogfight Server Library
//!
//! Authoritative server for a two-player dogfight played over UDP. Two planes
//! fly across a wrapping 80x80 grid and fire short-lived shots at each other;
//! the first shot to land inside the other plane's silhouette wins the match.
//!
//! ## Architecture
//!
//! A single event loop owns all game state. Two tasks sit beside it:
//! - **Network Receiver**: decodes datagrams and forwards the valid ones
//! - **Network Sender**: writes replies and broadcasts to the socket
//!
//! The loop wakes on the first queued packet or the next timer deadline,
//! drains a bounded number of packets, then runs the simulation tick and
//! the GAME_STATE broadcast if they are due. Idle sessions are swept at
//! the end of every iteration.
//!
//! ## Module Organization
//!
//! - `game`: the two player slots, their shots and the match flags
//! - `session`: joining, liveness, timeouts and disconnects
//! - `simulation`: movement, shot travel and hit detection per tick
//! - `broadcast`: world snapshots and their fan-out to sessions
//! - `network`: socket tasks, packet dispatch and the event loop
//! - `config`: bind address, cadences and timeout
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 10 Hz simulation, 20 Hz broadcast, 5 second timeout
//!     let config = ServerConfig::from_parts("0.0.0.0", 4242, 10, 20, 5.0)?;
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod game;
pub mod network;
pub mod session;
pub mod simulation;
