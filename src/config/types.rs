//! Top-level configuration struct.

use serde::Deserialize;

use super::classes::ClassBlock;
use super::defaults::*;
use super::links::LinkBlock;
use super::listen::{ListenConfig, TlsListenConfig};
use super::oper::OperBlock;
use super::security::SecurityConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Our own server name, as advertised in SERVER/ISERVER.
    pub name: String,
    /// Server-id used in TS6-style multi-connect id tagging.
    pub sid: String,
    pub description: String,
    #[serde(default)]
    pub network_name: Option<String>,
    /// Free-text location lines for ADMIN; absent entries fall back to
    /// `description`.
    #[serde(default)]
    pub admin_location: Option<String>,
    #[serde(default)]
    pub admin_email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_nick_len")]
    pub nick_len: usize,
    #[serde(default = "default_channel_len")]
    pub channel_len: usize,
    #[serde(default = "default_max_bans")]
    pub max_bans: usize,
    #[serde(default = "default_hold_period")]
    pub hold_period: u64,
    #[serde(default = "default_chasetimelimit")]
    pub chasetimelimit: u64,
    #[serde(default = "default_reop_delay")]
    pub reop_delay: u64,
    #[serde(default = "default_id_window")]
    pub id_window: u32,
    #[serde(default = "default_max_channels_per_user")]
    pub max_channels_per_user: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            nick_len: default_nick_len(),
            channel_len: default_channel_len(),
            max_bans: default_max_bans(),
            hold_period: default_hold_period(),
            chasetimelimit: default_chasetimelimit(),
            reop_delay: default_reop_delay(),
            id_window: default_id_window(),
            max_channels_per_user: default_max_channels_per_user(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub listen: Vec<ListenConfig>,
    #[serde(default)]
    pub tls_listen: Vec<TlsListenConfig>,
    #[serde(default)]
    pub classes: Vec<ClassBlock>,
    #[serde(default)]
    pub links: Vec<LinkBlock>,
    #[serde(default)]
    pub opers: Vec<OperBlock>,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "default_registration_timeout")]
    pub registration_timeout: u64,
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout: u64,
}

impl Config {
    pub fn class(&self, name: &str) -> ClassBlock {
        self.classes
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .unwrap_or_else(|| ClassBlock::fallback(name))
    }
}
