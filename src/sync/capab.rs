//! Server-link option negotiation: the `opts` token list carried on the
//! `PASS <pass> <ver> <flags> <opts>` handshake line, generalized
//! from `ircd-capab.c`'s table-driven CAPAB exchange. Options are
//! negotiated as a plain set intersection rather than the original's
//! ordered pre-`x`/post-`x` bindtable walk: every option here is either
//! wanted or not, so ordering carries no meaning we need to keep.

use std::collections::BTreeSet;

/// Compression connection-chain filter.
pub const OPT_COMPRESSION: &str = "Z";
/// TLS connection-chain filter.
pub const OPT_TLS: &str = "S";
/// Non-ASCII charset translation.
pub const OPT_CHARSET: &str = "U";
/// Multi-connect (IMODE/ITOPIC/INUM/ISERVER/ACK) id-tagged protocol.
pub const OPT_MULTI_CONNECT: &str = "I";

pub const KNOWN_OPTIONS: &[&str] = &[OPT_COMPRESSION, OPT_TLS, OPT_CHARSET, OPT_MULTI_CONNECT];

/// Parses the space-separated `opts` token from a handshake line into the
/// subset we recognise; unknown tokens are dropped rather than rejected,
/// since an option either side doesn't understand is simply not used.
pub fn parse(opts: &str) -> BTreeSet<String> {
    opts.split_whitespace()
        .map(str::to_string)
        .filter(|tok| KNOWN_OPTIONS.contains(&tok.as_str()))
        .collect()
}

/// Renders our locally-offered option set back into wire form.
pub fn encode(offered: &BTreeSet<String>) -> String {
    offered.iter().cloned().collect::<Vec<_>>().join(" ")
}

/// A link is only considered capable of an option once *both* ends have
/// advertised it — a link whose peer never sent `I` falls back to the
/// plain (non-id-tagged) command set even if we support it locally.
pub fn negotiate(local: &BTreeSet<String>, remote: &BTreeSet<String>) -> BTreeSet<String> {
    local.intersection(remote).cloned().collect()
}

#[derive(Debug, Clone, Default)]
pub struct PeerCapabilities {
    pub agreed: BTreeSet<String>,
}

impl PeerCapabilities {
    pub fn from_handshake(local_offer: &BTreeSet<String>, remote_opts: &str) -> Self {
        let remote = parse(remote_opts);
        PeerCapabilities { agreed: negotiate(local_offer, &remote) }
    }

    pub fn multi_connect(&self) -> bool {
        self.agreed.contains(OPT_MULTI_CONNECT)
    }

    pub fn tls(&self) -> bool {
        self.agreed.contains(OPT_TLS)
    }

    pub fn compression(&self) -> bool {
        self.agreed.contains(OPT_COMPRESSION)
    }
}

pub fn default_local_offer() -> BTreeSet<String> {
    KNOWN_OPTIONS.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_tokens_are_dropped() {
        let parsed = parse("I Z bogus");
        assert_eq!(parsed, BTreeSet::from(["I".to_string(), "Z".to_string()]));
    }

    #[test]
    fn negotiation_only_keeps_options_both_sides_offered() {
        let local = default_local_offer();
        let caps = PeerCapabilities::from_handshake(&local, "I U");
        assert!(caps.multi_connect());
        assert!(!caps.tls());
    }

    #[test]
    fn peer_offering_nothing_yields_no_multi_connect() {
        let local = default_local_offer();
        let caps = PeerCapabilities::from_handshake(&local, "");
        assert!(!caps.multi_connect());
        assert!(caps.agreed.is_empty());
    }
}
