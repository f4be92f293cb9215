//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// Plaintext TCP listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    pub address: SocketAddr,
    /// Connection class new clients on this listener are counted against.
    #[serde(default = "default_class")]
    pub class: String,
    /// Whether server links may use this listener (in addition to clients).
    #[serde(default)]
    pub server_port: bool,
}

/// TLS listener.
#[derive(Debug, Clone, Deserialize)]
pub struct TlsListenConfig {
    pub address: SocketAddr,
    pub cert_path: String,
    pub key_path: String,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default)]
    pub server_port: bool,
}

fn default_class() -> String {
    "default".to_string()
}
