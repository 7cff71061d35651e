//! Server network layer handling UDP communications and game loop coordination

use crate::broadcast::Broadcast;
use crate::config::{ConfigError, ServerConfig};
use crate::game::GameServer;
use log::{debug, error, info, warn};
use shared::Packet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Largest datagram the receiver accepts; every valid packet is far smaller.
const RECV_BUFFER_LEN: usize = 512;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: Packet, addr: SocketAddr },
    Broadcast(Broadcast),
}

/// Cloneable handle for stopping a running server from another task
#[derive(Debug, Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Shutdown requested after server loop ended");
        }
    }
}

/// Applies one decoded client packet to the game and returns the reply to
/// send back to `addr`, if any.
///
/// Packets naming a seat that `addr` does not hold are ignored, as are
/// server-to-client kinds.
pub fn dispatch_packet(
    game: &mut GameServer,
    packet: Packet,
    addr: SocketAddr,
    now: Instant,
) -> Option<Packet> {
    match packet {
        Packet::JoinRequest => Some(game.join(addr, now).to_packet()),

        Packet::StateUpdate {
            player_id,
            direction,
            fire,
        } => {
            if !game.is_session(player_id, addr) {
                debug!("Ignoring state update for player {} from {}", player_id, addr);
                return None;
            }
            game.touch(player_id, now);
            game.apply_input(player_id, direction, fire);
            None
        }

        Packet::Ping => Some(Packet::Pong),

        Packet::Disconnect { player_id } => {
            if game.is_session(player_id, addr) {
                game.disconnect(player_id);
            } else {
                debug!("Ignoring disconnect for player {} from {}", player_id, addr);
            }
            None
        }

        other => {
            warn!("Unexpected {:?} packet from {}", other.kind(), addr);
            None
        }
    }
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    game: GameServer,
    config: ServerConfig,
    tasks: Vec<JoinHandle<()>>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let socket = Arc::new(UdpSocket::bind(config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            game: GameServer::new(),
            config,
            tasks: Vec::new(),
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    pub fn game(&self) -> &GameServer {
        &self.game
    }

    /// Spawns task that continuously listens for incoming packets.
    /// Datagrams that fail to decode are dropped here and never reach the
    /// game loop.
    fn spawn_network_receiver(&mut self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        self.tasks.push(tokio::spawn(async move {
            let mut buffer = [0u8; RECV_BUFFER_LEN];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => match Packet::decode(&buffer[..len]) {
                        Ok(packet) => {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        }
                        Err(e) => debug!("Dropped malformed datagram from {}: {}", addr, e),
                    },
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }));
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);

        self.tasks.push(tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = socket.send_to(&packet.encode(), addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::Broadcast(broadcast) => {
                        for addr in &broadcast.targets {
                            if let Err(e) = socket.send_to(&broadcast.payload, addr).await {
                                error!("Failed to send to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        }));
    }

    fn queue(&self, message: GameMessage) {
        if let Err(e) = self.game_tx.send(message) {
            error!("Failed to queue outgoing packet: {}", e);
        }
    }

    /// Handles one message from the receiver. Returns false on shutdown.
    fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::PacketReceived { packet, addr } => {
                if let Some(reply) = dispatch_packet(&mut self.game, packet, addr, Instant::now())
                {
                    self.queue(GameMessage::SendPacket {
                        packet: reply,
                        addr,
                    });
                }
                true
            }
            ServerMessage::Shutdown => false,
        }
    }

    /// Runs one simulation step and announces the result if it ended the match
    fn simulate(&mut self) {
        if let Some(winner) = self.game.step() {
            info!("Announcing winner {} ({:?})", winner, self.game.phase());
            if let Some(broadcast) =
                Broadcast::to_sessions(&self.game, &Packet::GameOver { winner })
            {
                self.queue(GameMessage::Broadcast(broadcast));
            }
        }

        if self.game.game_active && self.game.frame_count % 100 == 0 {
            debug!(
                "Frame {}: {} players, shots in flight {:?}",
                self.game.frame_count,
                self.game.num_players(),
                self.game
                    .connected_players()
                    .map(|p| p.active_shots())
                    .collect::<Vec<_>>()
            );
        }
    }

    /// Queues the current world state for every connected session
    fn broadcast_game_state(&mut self) {
        if let Some(broadcast) = Broadcast::game_state(&self.game) {
            self.queue(GameMessage::Broadcast(broadcast));
        }
    }

    /// Main server loop coordinating all operations.
    ///
    /// Each iteration waits for the first packet or the next timer deadline,
    /// handles whatever packets are already queued, then runs the simulation
    /// and the broadcast if they are due, and finally sweeps idle sessions.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let start = Instant::now();
        let mut next_tick = start + self.config.tick_interval;
        let mut next_broadcast = start + self.config.broadcast_interval;

        info!(
            "Server started: tick every {:?}, broadcast every {:?}, timeout {:?}",
            self.config.tick_interval, self.config.broadcast_interval, self.config.session_timeout
        );

        'main: loop {
            let deadline = tokio::time::Instant::from_std(next_tick.min(next_broadcast));

            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => {
                            if !self.handle_message(message) {
                                break 'main;
                            }
                        }
                        None => break 'main,
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {}
            }

            // Handle what is already queued, bounded so timers are not starved
            for _ in 1..self.config.max_packets_per_iteration {
                match self.server_rx.try_recv() {
                    Ok(message) => {
                        if !self.handle_message(message) {
                            break 'main;
                        }
                    }
                    Err(_) => break,
                }
            }

            let now = Instant::now();
            if now >= next_tick {
                self.simulate();
                next_tick = now + self.config.tick_interval;
            }
            if now >= next_broadcast {
                self.broadcast_game_state();
                next_broadcast = now + self.config.broadcast_interval;
            }

            self.game.sweep_timeouts(now, self.config.session_timeout);
        }

        info!("Server shutting down");
        for task in self.tasks.drain(..) {
            task.abort();
        }
        Ok(())
    }
}
