//! Server-to-server link configuration.

use serde::Deserialize;

use super::defaults::default_true;

/// One configured uplink, either autoconnected or accepted passively.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkBlock {
    /// Remote server name, as it will introduce itself via SERVER/ISERVER.
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub password: String,
    #[serde(default)]
    pub tls: bool,
    #[serde(default = "default_true")]
    pub verify_cert: bool,
    #[serde(default)]
    pub autoconnect: bool,
    /// Allow the `I` handshake option: id-tagged commands, `alt` path,
    /// ack queues. Both sides must advertise it for the link to use it.
    #[serde(default)]
    pub multi_connect: bool,
    pub sid: Option<String>,
    /// Class this link's ping/sendq limits are drawn from.
    #[serde(default = "default_link_class")]
    pub class: String,
}

fn default_link_class() -> String {
    "server".to_string()
}
