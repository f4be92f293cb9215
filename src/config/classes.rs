//! Connection class configuration: per-class resource limits.

use serde::Deserialize;

/// A named connection class. Every local client and server link is
/// counted against exactly one class.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassBlock {
    /// Class name, referenced from listener/link/oper blocks.
    pub name: String,
    /// Max simultaneous connections from one host in this class.
    #[serde(default = "default_local_max")]
    pub local_max: u32,
    /// Max simultaneous connections across the whole class.
    #[serde(default = "default_global_max")]
    pub global_max: u32,
    /// Ping interval in seconds for links in this class.
    #[serde(default = "super::defaults::default_ping_interval")]
    pub ping_freq: u64,
    /// SendQ cap in bytes before the link is killed for flooding.
    #[serde(default = "default_sendq")]
    pub sendq: usize,
    /// Penalty units consumed per parsed line (anti-flood).
    #[serde(default = "super::defaults::default_penalty_per_message")]
    pub penalty_per_message: u32,
    /// Max accumulated penalty (recvq-style) before reads are suspended.
    #[serde(default = "default_max_penalty")]
    pub max_penalty: u32,
}

fn default_local_max() -> u32 {
    3
}

fn default_global_max() -> u32 {
    1000
}

fn default_sendq() -> usize {
    1_048_576
}

fn default_max_penalty() -> u32 {
    20
}

impl ClassBlock {
    pub fn fallback(name: impl Into<String>) -> Self {
        ClassBlock {
            name: name.into(),
            local_max: default_local_max(),
            global_max: default_global_max(),
            ping_freq: super::defaults::default_ping_interval(),
            sendq: default_sendq(),
            penalty_per_message: super::defaults::default_penalty_per_message(),
            max_penalty: default_max_penalty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_has_sane_bounds() {
        let c = ClassBlock::fallback("default");
        assert!(c.local_max > 0);
        assert!(c.sendq > 0);
    }
}
