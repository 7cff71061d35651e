//! Server configuration: bind address, timer cadences and session timeout

use shared::SERVER_PORT;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Highest tick or broadcast rate accepted, in Hz
pub const MAX_RATE_HZ: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Time between two simulation steps
    pub tick_interval: Duration,
    /// Time between two GAME_STATE broadcasts
    pub broadcast_interval: Duration,
    /// Silence after which a seat is vacated
    pub session_timeout: Duration,
    /// Upper bound on datagrams handled before timers are checked again
    pub max_packets_per_iteration: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), SERVER_PORT),
            tick_interval: Duration::from_millis(100),
            broadcast_interval: Duration::from_millis(50),
            session_timeout: Duration::from_secs(5),
            max_packets_per_iteration: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),
    #[error("{name} must be between 1 and 1000 Hz, got {value}")]
    InvalidRate { name: &'static str, value: u32 },
    #[error("session timeout must be a positive, representable duration")]
    InvalidTimeout,
    #[error("max packets per iteration must be positive")]
    ZeroPacketBudget,
}

impl ServerConfig {
    /// Builds a configuration from command-line style values: a host and
    /// port, rates in Hz and a timeout in seconds.
    pub fn from_parts(
        host: &str,
        port: u16,
        tick_rate: u32,
        broadcast_rate: u32,
        timeout_secs: f64,
    ) -> Result<Self, ConfigError> {
        let ip: IpAddr = host
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(host.to_string()))?;

        let config = Self {
            bind_addr: SocketAddr::new(ip, port),
            tick_interval: interval_for("tick rate", tick_rate)?,
            broadcast_interval: interval_for("broadcast rate", broadcast_rate)?,
            session_timeout: Duration::try_from_secs_f64(timeout_secs)
                .map_err(|_| ConfigError::InvalidTimeout)?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidRate {
                name: "tick rate",
                value: 0,
            });
        }
        if self.broadcast_interval.is_zero() {
            return Err(ConfigError::InvalidRate {
                name: "broadcast rate",
                value: 0,
            });
        }
        if self.session_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.max_packets_per_iteration == 0 {
            return Err(ConfigError::ZeroPacketBudget);
        }
        Ok(())
    }
}

fn interval_for(name: &'static str, rate_hz: u32) -> Result<Duration, ConfigError> {
    if rate_hz == 0 || rate_hz > MAX_RATE_HZ {
        return Err(ConfigError::InvalidRate {
            name,
            value: rate_hz,
        });
    }
    Ok(Duration::from_nanos(1_000_000_000 / rate_hz as u64))
}
