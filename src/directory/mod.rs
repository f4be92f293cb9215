//! The Directory: the single structure owning every CLIENT and CHANNEL,
//! touched only from the dispatch task.

pub mod channel;
pub mod class;
pub mod client;

use std::collections::HashMap;
use std::time::Instant;

use ircd_proto::casefold::to_lower;
use slab::Slab;

use channel::{Channel, ChannelId};
use class::{ClassId, ClassManager};
use client::{Client, ClientId, ClientSlot};

pub struct Directory {
    pub clients: Slab<Client>,
    pub channels: Slab<Channel>,
    nick_index: HashMap<String, ClientId>,
    channel_index: HashMap<String, ChannelId>,
    pub classes: ClassManager,
}

impl Default for Directory {
    fn default() -> Self {
        Directory {
            clients: Slab::new(),
            channels: Slab::new(),
            nick_index: HashMap::new(),
            channel_index: HashMap::new(),
            classes: ClassManager::default(),
        }
    }
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id.0)
    }

    pub fn client_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(id.0)
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.0)
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(id.0)
    }

    /// Exact case-folded lookup; when `trace_phantom` is set and the key
    /// resolves to a phantom with an `rto` pointer, follows it to the
    /// live client that nick was renamed to.
    pub fn find_client(&self, name: &str, trace_phantom: bool) -> Option<ClientId> {
        let key = to_lower(name);
        let id = *self.nick_index.get(&key)?;
        if trace_phantom {
            if let Some(c) = self.clients.get(id.0) {
                if let ClientSlot::Phantom { rto } = c.slot {
                    return Some(rto);
                }
            }
        }
        Some(id)
    }

    pub fn find_channel(&self, name: &str) -> Option<ChannelId> {
        self.channel_index.get(&to_lower(name)).copied()
    }

    /// Which class (if any) a client is counted against — `None` for
    /// remote clients, server links and phantoms, which carry no class slot.
    pub fn local_class(&self, id: ClientId) -> Option<ClassId> {
        match self.client(id)?.slot {
            ClientSlot::Local { class } => Some(class),
            _ => None,
        }
    }

    /// Full scan fallback for nick-less WHO/WHOIS lookups; this is fine since
    /// it's not the hot path.
    pub fn find_by_userhost(&self, nick: Option<&str>, user: Option<&str>, host: Option<&str>) -> Vec<ClientId> {
        if let Some(nick) = nick {
            return self.find_client(nick, false).into_iter().collect();
        }
        self.clients
            .iter()
            .filter(|(_, c)| !c.is_phantom())
            .filter(|(_, c)| user.is_none_or(|u| c.ident.eq_ignore_ascii_case(u)))
            .filter(|(_, c)| host.is_none_or(|h| c.host.eq_ignore_ascii_case(h)))
            .map(|(i, _)| ClientId(i))
            .collect()
    }

    /// Insert a brand-new live client under a key that must be free
    /// (callers resolve collisions before calling this).
    pub fn insert_live(&mut self, client: Client) -> ClientId {
        let key = client.nick_lower.clone();
        let id = ClientId(self.clients.insert(client));
        self.nick_index.insert(key, id);
        id
    }

    /// Take over a key currently occupied by a non-expired phantom: the
    /// phantom is chained onto the new client's `rfr` (the "other client
    /// that held this name before" relation), then the index
    /// entry is repointed at the new live client.
    pub fn take_over_key(&mut self, mut client: Client) -> ClientId {
        let key = client.nick_lower.clone();
        let previous = self.nick_index.get(&key).copied();
        client.rfr = previous;
        let id = ClientId(self.clients.insert(client));
        self.nick_index.insert(key, id);
        id
    }

    pub fn remove_live(&mut self, id: ClientId) {
        if let Some(c) = self.clients.get(id.0) {
            let key = c.nick_lower.clone();
            if self.nick_index.get(&key) == Some(&id) {
                self.nick_index.remove(&key);
            }
            if let ClientSlot::Local { class } = c.slot {
                self.classes.get_mut(class).remove(id);
            }
        }
        self.clients.remove(id.0);
    }

    /// QUIT/KILL/SQUIT: convert a live client into a phantom in place. The
    /// same arena slot stays reachable under its own key for
    /// `CHASETIMELIMIT`-style tracing.
    pub fn quit_to_phantom(&mut self, id: ClientId, now: Instant, hold_period_secs: u64, originating_server: &str) {
        if let Some(c) = self.clients.get_mut(id.0) {
            if let ClientSlot::Local { class } = c.slot {
                self.classes.get_mut(class).remove(id);
            }
            c.slot = ClientSlot::None;
            c.convert_to_phantom(now, hold_period_secs, originating_server);
        }
    }

    /// NICK change: the old nick becomes a standalone phantom (possibly
    /// chained onto whatever already occupied that key); the live object
    /// keeps its identity under the new nick and remembers the phantom via
    /// `rfr` so messages racing to the old nick can still be traced.
    pub fn rename(
        &mut self,
        id: ClientId,
        new_nick: &str,
        now: Instant,
        hold_period_secs: u64,
        originating_server: &str,
    ) -> Option<ClientId> {
        let old = self.clients.get(id.0)?.clone();
        let old_key = old.nick_lower.clone();

        let mut phantom = old;
        phantom.slot = ClientSlot::Phantom { rto: id };
        phantom.convert_to_phantom(now, hold_period_secs, originating_server);
        let previous_at_key = self.nick_index.get(&old_key).copied();
        phantom.rfr = previous_at_key.filter(|&p| p != id);
        let phantom_id = ClientId(self.clients.insert(phantom));
        self.nick_index.insert(old_key, phantom_id);

        let new_key = to_lower(new_nick);
        if let Some(live) = self.clients.get_mut(id.0) {
            live.nick = new_nick.to_string();
            live.nick_lower = new_key.clone();
            live.rfr = Some(phantom_id);
        }
        self.nick_index.insert(new_key, id);
        Some(phantom_id)
    }

    /// Walk a phantom chain (starting at `head`), dropping every entry
    /// that is an expired phantom with zero outstanding ACK refs, and
    /// re-linking survivors so the chain stays connected.
    fn gc_chain(&mut self, head: Option<ClientId>, now: Instant) -> Option<ClientId> {
        let id = head?;
        let Some(c) = self.clients.get(id.0) else { return None };
        if c.is_expired_phantom(now) {
            let next = c.rfr;
            self.clients.remove(id.0);
            self.gc_chain(next, now)
        } else {
            let next = c.rfr;
            let new_next = self.gc_chain(next, now);
            if let Some(c) = self.clients.get_mut(id.0) {
                c.rfr = new_next;
            }
            Some(id)
        }
    }

    /// Drop a lone phantom that currently sits directly under its own key
    /// in the index once it expires; recursively cleans the chain behind
    /// it and repairs the index entry so no orphan phantoms remain.
    pub fn gc_key(&mut self, key: &str, now: Instant) {
        let Some(&head) = self.nick_index.get(key) else { return };
        match self.gc_chain(Some(head), now) {
            Some(new_head) => {
                self.nick_index.insert(key.to_string(), new_head);
            }
            None => {
                self.nick_index.remove(key);
            }
        }
    }

    /// Re-run `gc_chain` for a live holder's `rfr` chain (used after an ACK
    /// resolves and `on_ack` drops to zero on some member of the chain).
    pub fn gc_holder(&mut self, holder: ClientId, now: Instant) {
        let head = self.clients.get(holder.0).and_then(|c| c.rfr);
        let new_head = self.gc_chain(head, now);
        if let Some(c) = self.clients.get_mut(holder.0) {
            c.rfr = new_head;
        }
    }

    pub fn insert_channel(&mut self, channel: Channel) -> ChannelId {
        let key = channel.name_lower.clone();
        let id = ChannelId(self.channels.insert(channel));
        self.channel_index.insert(key, id);
        id
    }

    pub fn remove_channel(&mut self, id: ChannelId) {
        if let Some(c) = self.channels.get(id.0) {
            self.channel_index.remove(&c.name_lower);
        }
        self.channels.remove(id.0);
    }

    /// Turn a just-connected placeholder client into a registered server
    /// link once its SERVER line has been validated: re-keys the nick
    /// index under the server name and swaps in a `Server` slot.
    pub fn promote_to_server(&mut self, id: ClientId, name: &str, token: u32) -> bool {
        let Some(c) = self.clients.get(id.0) else { return false };
        let old_key = c.nick_lower.clone();
        let new_key = to_lower(name);
        if new_key != old_key && self.nick_index.contains_key(&new_key) {
            return false;
        }
        if let ClientSlot::Local { class } = c.slot {
            self.classes.get_mut(class).remove(id);
        }
        self.nick_index.remove(&old_key);
        if let Some(c) = self.clients.get_mut(id.0) {
            c.nick = name.to_string();
            c.nick_lower = new_key.clone();
            c.kind = client::ClientKind::LocalPeer;
            c.slot = ClientSlot::Server { token, user_count: 0 };
        }
        self.nick_index.insert(new_key, id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client::ClientKind;

    fn user(nick: &str, now: Instant) -> Client {
        Client::new_local_user(nick, "u", "h", class::ClassId(0), now)
    }

    #[test]
    fn insert_and_find_round_trips() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(user("Alice", now));
        assert_eq!(dir.find_client("ALICE", false), Some(id));
        assert_eq!(dir.find_client("alice", true), Some(id));
    }

    #[test]
    fn rename_leaves_traceable_phantom_at_old_key() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(user("alice", now));
        let phantom_id = dir.rename(id, "alice2", now, 900, "hub.example").unwrap();

        assert_eq!(dir.find_client("alice2", false), Some(id));
        assert_eq!(dir.find_client("alice", false), Some(phantom_id));
        assert_eq!(dir.find_client("alice", true), Some(id));
        assert!(dir.client(phantom_id).unwrap().is_phantom());
        assert_eq!(dir.client(id).unwrap().rfr, Some(phantom_id));
    }

    #[test]
    fn quit_converts_in_place_and_gc_removes_after_expiry() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(user("bob", now));
        dir.quit_to_phantom(id, now, 0, "hub.example");
        assert!(dir.client(id).unwrap().is_phantom());
        assert_eq!(dir.find_client("bob", false), Some(id));

        let later = now + std::time::Duration::from_secs(1);
        dir.gc_key("bob", later);
        assert_eq!(dir.find_client("bob", false), None);
    }

    #[test]
    fn gc_chain_preserves_connectivity_when_middle_entry_survives() {
        let mut dir = Directory::new();
        let now = Instant::now();

        // carol quits (expired immediately), then a new carol registers
        // while the first is still theoretically chained, simulating a
        // collision resolver taking over a held key.
        let first = dir.insert_live(user("carol", now));
        dir.quit_to_phantom(first, now, 900, "hub.example"); // NOT expired yet
        let second = dir.take_over_key(user("carol", now));
        assert_eq!(dir.client(second).unwrap().rfr, Some(first));
        assert_eq!(dir.find_client("carol", false), Some(second));

        // Expire the chained phantom and GC via the new holder.
        let later = now + std::time::Duration::from_secs(1000);
        dir.gc_holder(second, later);
        assert_eq!(dir.client(second).unwrap().rfr, None);
        assert!(dir.client(first).is_none());
    }

    #[test]
    fn find_by_userhost_full_scan_filters_live_clients() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let mut c = user("dave", now);
        c.ident = "dv".into();
        c.host = "host.example".into();
        dir.insert_live(c);
        let matches = dir.find_by_userhost(None, Some("dv"), None);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn kind_is_local_user_after_insert() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(user("eve", now));
        assert_eq!(dir.client(id).unwrap().kind, ClientKind::LocalUser);
    }
}
