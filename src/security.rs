//! Operator authentication and kill-line (host-mask reject) checks,
//! consulted at OPER time and at registration completion respectively.
//!
//! Grounded on `original_source/modules/ircd-rusnet/rusnet.c`'s host-mask
//! ban list, consulted before registration completes; kept in-memory only,
//! reloaded from config on REHASH (see `crate::config::security`).

use crate::config::SecurityConfig;
use crate::directory::channel::glob_match;

/// Compares a supplied OPER password against the configured one. The
/// teacher's stack carries no password-hashing crate, so this is a plain
/// constant-time-insensitive equality check over the configured plaintext;
/// hashed O-line passwords are not supported.
pub fn verify_oper_password(configured: &str, supplied: &str) -> bool {
    configured == supplied
}

/// Checks `nick!user@host` against every configured kill-line, skipping
/// any mask also covered by an exempt entry. Returns the matching
/// kill-line on a hit.
pub fn matching_kill_line<'a>(security: &'a SecurityConfig, mask: &str) -> Option<&'a str> {
    if security.exempt.iter().any(|e| glob_match(e, mask)) {
        return None;
    }
    security.kill_lines.iter().find(|k| glob_match(k, mask)).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn security(kill_lines: &[&str], exempt: &[&str]) -> SecurityConfig {
        SecurityConfig {
            kill_lines: kill_lines.iter().map(|s| s.to_string()).collect(),
            exempt: exempt.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn password_must_match_exactly() {
        assert!(verify_oper_password("hunter2", "hunter2"));
        assert!(!verify_oper_password("hunter2", "hunter3"));
    }

    #[test]
    fn kill_line_matches_glob_mask() {
        let sec = security(&["*!*@*.badisp.example"], &[]);
        assert!(matching_kill_line(&sec, "spammer!user@host.badisp.example").is_some());
        assert!(matching_kill_line(&sec, "alice!user@good.example").is_none());
    }

    #[test]
    fn exempt_mask_overrides_kill_line() {
        let sec = security(&["*!*@*.badisp.example"], &["trusted!*@*.badisp.example"]);
        assert!(matching_kill_line(&sec, "trusted!user@host.badisp.example").is_none());
    }
}
