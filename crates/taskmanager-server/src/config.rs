use std::net::{IpAddr, SocketAddr};

use clap::Parser;
use taskmanager_db::DEFAULT_DATABASE_URL;

#[derive(Debug, Parser)]
#[command(name = "taskmanager-server", about = "Task tracking HTTP service")]
pub struct ServerConfig {
    /// Database connection URL (sqlite:///path.db, sqlite::memory:, postgres://...)
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
