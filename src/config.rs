//! Process configuration for the relay server.

use std::net::SocketAddr;

use clap::Parser;

/// Default listening port when `PORT` is unset
pub const DEFAULT_PORT: u16 = 3000;

/// Command-line and environment configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "molsync", about = "Relay server for shared structure editing")]
pub struct Config {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl Config {
    /// Formats the listen address for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed socket address, if the host is a literal IP
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        self.bind_addr().parse().ok()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}
