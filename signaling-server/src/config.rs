use std::net::SocketAddr;

use clap::Parser;
use log::LevelFilter;
use peer_relay::{RelayConfig, DEFAULT_CONTROLLER_PROTOCOL};

/// Signaling relay between one `WebRTC` controller and its peers.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "PEER_RELAY_ADDRESS", default_value = "127.0.0.1:8989")]
    pub address: SocketAddr,

    /// Path the WebSocket endpoint is served on.
    #[arg(long, env = "PEER_RELAY_PATH", default_value = "/")]
    pub path: String,

    /// Subprotocol that marks a connection as the controller.
    #[arg(long, env = "PEER_RELAY_CONTROLLER_PROTOCOL", default_value = DEFAULT_CONTROLLER_PROTOCOL)]
    pub controller_protocol: String,

    #[arg(long, env = "PEER_RELAY_LOG_LEVEL", default_value = "info")]
    pub log_level: LevelFilter,
}

impl Config {
    #[must_use]
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            controller_protocol: self.controller_protocol.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["peer-relay-signaling-server"]).unwrap();
        assert_eq!(config.address, "127.0.0.1:8989".parse().unwrap());
        assert_eq!(config.path, "/");
        assert_eq!(config.relay_config(), RelayConfig::default());
        assert_eq!(config.log_level, LevelFilter::Info);
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "peer-relay-signaling-server",
            "--address",
            "0.0.0.0:9001",
            "--controller-protocol",
            "controller",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(config.address.port(), 9001);
        assert_eq!(config.controller_protocol, "controller");
        assert_eq!(config.log_level, LevelFilter::Debug);
    }
}
