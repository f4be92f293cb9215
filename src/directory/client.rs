//! The CLIENT representation: a tagged union over self/local user/local
//! peer/remote user/remote server/service/phantom, stored in a `Slab`-backed
//! arena rather than raw pointers.

use std::time::Instant;

use ircd_proto::ModeFlags;

use super::class::ClassId;

/// Arena index standing in for a `CLIENT*`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ClientId(pub usize);

/// The three mutually-exclusive "extra" slots: a class
/// pointer for local users, a token+user-count for servers, or a
/// rename-to pointer for phantoms.
#[derive(Clone, Debug)]
pub enum ClientSlot {
    Local { class: ClassId },
    Server { token: u32, user_count: u32 },
    Phantom { rto: ClientId },
    None,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ClientKind {
    SelfServer,
    LocalUser,
    LocalPeer,
    RemoteUser,
    RemotePeer,
    Service,
    Phantom,
}

/// Topology fields shared by every non-self client.
#[derive(Clone, Debug, Default)]
pub struct Topology {
    /// Owning server (self for local/self clients).
    pub cs: Option<ClientId>,
    /// Local peer link through which this client is reached (shortest path).
    pub via: Option<ClientId>,
    /// Second-shortest disjoint path, only set under multi-connect.
    pub alt: Option<ClientId>,
    pub hops: u32,
}

/// Per-origin duplicate-id suppression state, carried on any
/// client objects whose state changes arrive tagged with an id.
#[derive(Clone, Debug, Default)]
pub struct IdCache {
    pub last_id: u32,
    pub window: Vec<u64>,
}

#[derive(Clone, Debug)]
pub struct Client {
    pub kind: ClientKind,
    pub nick: String,
    pub nick_lower: String,
    pub ident: String,
    pub host: String,
    pub visible_host: String,
    pub realname: String,
    pub away: Option<String>,
    pub modes: ModeFlags,
    pub topology: Topology,
    pub slot: ClientSlot,
    /// Channel-membership or server-link list — the fourth exclusive
    /// represented as member channel ids here since
    /// the channel side (`MEMBER`) owns the authoritative back-pointer.
    pub channels: Vec<super::channel::ChannelId>,
    /// "renamed-from" phantom, or head of a collision chain.
    pub rfr: Option<ClientId>,
    /// Nonzero means this slot is a phantom; expiry timestamp.
    pub hold_upto: Option<Instant>,
    pub id_cache: IdCache,
    /// References keeping this object alive while an ACK is outstanding.
    pub on_ack: u32,
    pub last_seen: Instant,
    pub signon: Instant,
    /// Set at connect time from `ConnectionHandle::initiated_locally`.
    /// Only meaningful before a server link has registered: tells the
    /// SERVER handler whether we already wrote our own handshake (we
    /// dialed out) or still owe the peer one (they dialed us).
    pub peer_initiated_locally: bool,
}

impl Client {
    pub fn new_local_user(nick: &str, ident: &str, host: &str, class: ClassId, now: Instant) -> Self {
        Client {
            kind: ClientKind::LocalUser,
            nick: nick.to_string(),
            nick_lower: ircd_proto::casefold::to_lower(nick),
            ident: ident.to_string(),
            host: host.to_string(),
            visible_host: host.to_string(),
            realname: String::new(),
            away: None,
            modes: ModeFlags::NONE,
            topology: Topology::default(),
            slot: ClientSlot::Local { class },
            channels: Vec::new(),
            rfr: None,
            hold_upto: None,
            id_cache: IdCache::default(),
            on_ack: 0,
            last_seen: now,
            signon: now,
            peer_initiated_locally: false,
        }
    }

    pub fn is_phantom(&self) -> bool {
        self.hold_upto.is_some()
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, ClientKind::LocalUser | ClientKind::LocalPeer | ClientKind::SelfServer)
    }

    pub fn is_expired_phantom(&self, now: Instant) -> bool {
        match self.hold_upto {
            Some(t) => t <= now && self.on_ack == 0,
            None => false,
        }
    }

    /// Convert a live client into a phantom in place, following the
    /// phantom-lifecycle rule: `hold_upto` is set, `host` records the
    /// originating server for in-flight trace, `away` records the peer
    /// still owed an ACK.
    pub fn convert_to_phantom(&mut self, now: Instant, hold_period_secs: u64, originating_server: &str) {
        self.kind = ClientKind::Phantom;
        self.hold_upto = Some(now + std::time::Duration::from_secs(hold_period_secs));
        self.host = originating_server.to_string();
        self.channels.clear();
    }

    pub fn mask(&self) -> String {
        format!("{}!{}@{}", self.nick, self.ident, self.visible_host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_local_user_casefolds_nick() {
        let c = Client::new_local_user("Alice[x]", "a", "h", ClassId(0), Instant::now());
        assert_eq!(c.nick_lower, "alice{x}");
    }

    #[test]
    fn phantom_conversion_sets_hold_upto_and_clears_channels() {
        let now = Instant::now();
        let mut c = Client::new_local_user("bob", "b", "h", ClassId(0), now);
        c.channels.push(super::super::channel::ChannelId(3));
        c.convert_to_phantom(now, 900, "hub.example");
        assert!(c.is_phantom());
        assert!(c.channels.is_empty());
        assert_eq!(c.host, "hub.example");
    }

    #[test]
    fn expired_phantom_requires_zero_ack_refs() {
        let now = Instant::now();
        let mut c = Client::new_local_user("carol", "c", "h", ClassId(0), now);
        c.convert_to_phantom(now - std::time::Duration::from_secs(1), 0, "hub");
        c.on_ack = 1;
        assert!(!c.is_expired_phantom(now));
        c.on_ack = 0;
        assert!(c.is_expired_phantom(now));
    }
}
