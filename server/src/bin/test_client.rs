//! Headless probe client: joins a dogfight server, flies around at random
//! and reports what the server sends back.

use clap::Parser;
use log::{debug, info, warn};
use rand::Rng;
use shared::{Direction, Packet, SERVER_PORT};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep_until, timeout, Duration, Instant};

const JOIN_ATTEMPTS: u32 = 5;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value_t = SocketAddr::from(([127, 0, 0, 1], SERVER_PORT)))]
    server: SocketAddr,

    /// Seconds to fly before disconnecting
    #[arg(short = 'd', long, default_value = "30")]
    duration: u64,

    /// Chance per input tick of turning one step left or right
    #[arg(long, default_value = "0.2")]
    turn_chance: f64,

    /// Chance per input tick of pulling the trigger
    #[arg(long, default_value = "0.1")]
    fire_chance: f64,

    /// Print every GAME_STATE as a JSON line on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum ProbeError {
    #[error("server is full")]
    Rejected,
    #[error("no JOIN_RESPONSE after {0} attempts")]
    NoResponse(u32),
}

/// Sends JOIN_REQUEST until the server answers, returning the assigned id
async fn join(socket: &UdpSocket, server: SocketAddr) -> Result<u8, Box<dyn std::error::Error>> {
    let request = Packet::JoinRequest.encode();
    let mut buf = [0u8; 512];

    for attempt in 1..=JOIN_ATTEMPTS {
        socket.send_to(&request, server).await?;
        debug!("Sent join request (attempt {})", attempt);

        let deadline = Instant::now() + Duration::from_secs(1);
        while let Ok(received) = timeout(
            deadline.saturating_duration_since(Instant::now()),
            socket.recv_from(&mut buf),
        )
        .await
        {
            let (len, _) = received?;
            match Packet::decode(&buf[..len]) {
                Ok(Packet::JoinResponse {
                    player_id,
                    accepted: true,
                }) => return Ok(player_id),
                Ok(Packet::JoinResponse { accepted: false, .. }) => {
                    return Err(ProbeError::Rejected.into())
                }
                Ok(other) => debug!("Ignoring {:?} while joining", other.kind()),
                Err(e) => warn!("Undecodable datagram: {}", e),
            }
        }
    }

    Err(ProbeError::NoResponse(JOIN_ATTEMPTS).into())
}

/// Picks the next heading and trigger state
fn next_intent(direction: Direction, turn_chance: f64, fire_chance: f64) -> (Direction, bool) {
    let mut rng = rand::thread_rng();
    let direction = if rng.gen_bool(turn_chance.clamp(0.0, 1.0)) {
        let step = if rng.gen_bool(0.5) { 1 } else { 7 };
        Direction::from_wire(direction as u8 + step)
    } else {
        direction
    };
    (direction, rng.gen_bool(fire_chance.clamp(0.0, 1.0)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let bind_addr: SocketAddr = if args.server.is_ipv4() {
        SocketAddr::from(([0, 0, 0, 0], 0))
    } else {
        "[::]:0".parse()?
    };
    let socket = UdpSocket::bind(bind_addr).await?;
    info!("Probe bound to {}", socket.local_addr()?);

    let player_id = join(&socket, args.server).await?;
    info!("Joined {} as player {}", args.server, player_id);

    let mut input_timer = interval(Duration::from_millis(100));
    let mut ping_timer = interval(Duration::from_secs(1));
    let stop_at = Instant::now() + Duration::from_secs(args.duration);
    let mut direction = Direction::N;
    let mut ping_sent: Option<Instant> = None;
    let mut buf = [0u8; 512];

    loop {
        tokio::select! {
            _ = sleep_until(stop_at) => break,

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }

            _ = input_timer.tick() => {
                let (next, fire) = next_intent(direction, args.turn_chance, args.fire_chance);
                direction = next;
                let update = Packet::StateUpdate { player_id, direction, fire };
                socket.send_to(&update.encode(), args.server).await?;
            }

            _ = ping_timer.tick() => {
                socket.send_to(&Packet::Ping.encode(), args.server).await?;
                ping_sent = Some(Instant::now());
            }

            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                match Packet::decode(&buf[..len]) {
                    Ok(Packet::Pong) => {
                        if let Some(sent) = ping_sent.take() {
                            info!("Round trip {:?}", sent.elapsed());
                        }
                    }
                    Ok(Packet::GameOver { winner }) => {
                        if winner == player_id {
                            info!("Game over: we won");
                        } else {
                            info!("Game over: player {} won", winner);
                        }
                    }
                    Ok(state @ Packet::GameState { .. }) => {
                        if args.json {
                            println!("{}", serde_json::to_string(&state)?);
                        } else {
                            debug!("{:?}", state);
                        }
                    }
                    Ok(other) => debug!("Received {:?}", other),
                    Err(e) => warn!("Undecodable datagram: {}", e),
                }
            }
        }
    }

    socket
        .send_to(&Packet::Disconnect { player_id }.encode(), args.server)
        .await?;
    info!("Sent disconnect for player {}", player_id);
    Ok(())
}
