//! Collision Resolver: decides what happens when an incoming
//! NICK/introduction names a key already occupied.

use std::time::Instant;

use crate::directory::client::{Client, ClientId};
use crate::directory::Directory;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Policy {
    KillBoth,
    RenameIncoming,
    RenameExisting,
}

#[derive(Clone, Debug)]
pub enum Resolution {
    /// The key was held by an expired phantom; the incoming client simply
    /// takes it over (chaining the phantom for trace purposes).
    TookOverExpiredKey,
    /// Both sides are killed; incoming introduction is rejected too.
    KillBoth { existing: ClientId },
    /// The incoming side is renamed to a collision-safe nick
    /// (`nick_<sid>`) instead of being killed.
    RenameIncoming { new_nick: String },
    /// The existing local client is renamed instead of the incoming
    /// remote one, used when policy favours the remote identity.
    RenameExisting { existing: ClientId, new_nick: String },
}

/// Resolves a nick collision between an incoming introduction (carrying
/// `incoming_sid` to build a disambiguated nick) and whatever currently
/// occupies `nick`'s key.
pub fn resolve_nick_collision(dir: &mut Directory, nick: &str, incoming_sid: &str, policy: Policy, now: Instant) -> Resolution {
    let Some(existing) = dir.find_client(nick, false) else {
        return Resolution::TookOverExpiredKey;
    };

    let Some(existing_client) = dir.client(existing) else {
        return Resolution::TookOverExpiredKey;
    };

    if existing_client.is_expired_phantom(now) {
        return Resolution::TookOverExpiredKey;
    }

    match policy {
        Policy::KillBoth => Resolution::KillBoth { existing },
        Policy::RenameIncoming => Resolution::RenameIncoming { new_nick: disambiguated_nick(nick, incoming_sid) },
        Policy::RenameExisting => {
            Resolution::RenameExisting { existing, new_nick: disambiguated_nick(nick, incoming_sid) }
        }
    }
}

fn disambiguated_nick(nick: &str, sid: &str) -> String {
    format!("{nick}_{sid}")
}

/// Server-name collision: squit the younger of the two
/// links sharing the name. `existing_signon`/`incoming_signon` are the
/// SERVER introduction timestamps; the younger (larger) one loses.
pub fn younger_server_link(existing: (ClientId, Instant), incoming: (ClientId, Instant)) -> ClientId {
    if existing.1 >= incoming.1 {
        existing.0
    } else {
        incoming.0
    }
}

/// Builds the phantom that results from a kill-both resolution on the
/// existing side, for callers that need a template before calling
/// `Directory::quit_to_phantom`.
pub fn phantom_template_for_kill(existing: &Client) -> Client {
    existing.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::class::ClassId;

    fn user(nick: &str, now: Instant) -> Client {
        Client::new_local_user(nick, "u", "h", ClassId(0), now)
    }

    #[test]
    fn free_key_takes_over_directly() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let resolution = resolve_nick_collision(&mut dir, "alice", "001", Policy::KillBoth, now);
        assert!(matches!(resolution, Resolution::TookOverExpiredKey));
    }

    #[test]
    fn expired_phantom_is_taken_over_regardless_of_policy() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(user("alice", now));
        dir.quit_to_phantom(id, now, 0, "hub.example");
        let later = now + std::time::Duration::from_secs(1);
        let resolution = resolve_nick_collision(&mut dir, "alice", "001", Policy::KillBoth, later);
        assert!(matches!(resolution, Resolution::TookOverExpiredKey));
    }

    #[test]
    fn live_collision_with_kill_both_policy_names_existing() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(user("alice", now));
        let resolution = resolve_nick_collision(&mut dir, "alice", "001", Policy::KillBoth, now);
        match resolution {
            Resolution::KillBoth { existing } => assert_eq!(existing, id),
            other => panic!("expected KillBoth, got {other:?}"),
        }
    }

    #[test]
    fn rename_incoming_builds_sid_suffixed_nick() {
        let mut dir = Directory::new();
        let now = Instant::now();
        dir.insert_live(user("alice", now));
        let resolution = resolve_nick_collision(&mut dir, "alice", "42X", Policy::RenameIncoming, now);
        match resolution {
            Resolution::RenameIncoming { new_nick } => assert_eq!(new_nick, "alice_42X"),
            other => panic!("expected RenameIncoming, got {other:?}"),
        }
    }

    #[test]
    fn younger_server_link_picks_later_signon() {
        let older = (ClientId(1), Instant::now());
        let younger = (ClientId(2), older.1 + std::time::Duration::from_secs(5));
        assert_eq!(younger_server_link(older, younger), younger.0);
    }
}
