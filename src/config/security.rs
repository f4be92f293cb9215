//! In-memory kill-line / host-mask rejection configuration.
//!
//! Grounded on `original_source/modules/ircd-rusnet/rusnet.c`'s host-mask
//! ban list consulted before registration completes. No persistence: the
//! list is reloaded from config on REHASH and otherwise lives only in
//! memory; nothing here is persisted across restarts.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SecurityConfig {
    /// `nick!user@host`-style glob masks rejected at registration.
    #[serde(default)]
    pub kill_lines: Vec<String>,
    /// Masks exempt from class connection limits and kill lines.
    #[serde(default)]
    pub exempt: Vec<String>,
}
