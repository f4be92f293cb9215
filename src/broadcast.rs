//! Routing primitives: `sendto_*` helpers that resolve a local target
//! (channel, nick, host mask, server mask) against the `Directory` and
//! hand the message to each recipient's outbound sink exactly once.
//! Forwarding a delivery across peer links is the caller's job — these
//! helpers only reach clients registered locally in `Outbound`.

use std::collections::HashMap;
use std::sync::Arc;

use ircd_proto::Message;
use tokio::sync::mpsc;
use tracing::warn;

use crate::directory::channel::ChannelId;
use crate::directory::client::ClientId;
use crate::directory::Directory;

/// Per-client outbound channel. Local users and local peer links both get
/// an entry here; the dispatch task is the only writer into `Directory`
/// and the only reader of this map, so no locking is needed.
#[derive(Default)]
pub struct Outbound {
    senders: HashMap<ClientId, mpsc::UnboundedSender<Arc<Message>>>,
}

impl Outbound {
    pub fn register(&mut self, id: ClientId, sender: mpsc::UnboundedSender<Arc<Message>>) {
        self.senders.insert(id, sender);
    }

    pub fn unregister(&mut self, id: ClientId) {
        self.senders.remove(&id);
    }

    pub fn send_to(&self, id: ClientId, msg: &Arc<Message>) {
        if let Some(tx) = self.senders.get(&id) {
            if tx.send(msg.clone()).is_err() {
                warn!(?id, "outbound queue dropped, recipient connection is gone");
            }
        }
    }
}

/// Send to every member of a channel, optionally skipping one (the
/// originator, who already saw their own message echoed locally by the
/// connection layer if the wire protocol calls for it).
pub fn sendto_channel(dir: &Directory, out: &Outbound, channel: ChannelId, msg: Arc<Message>, exclude: Option<ClientId>) {
    let Some(chan) = dir.channel(channel) else { return };
    for member in &chan.members {
        if Some(member.client) == exclude {
            continue;
        }
        out.send_to(member.client, &msg);
    }
}

/// Send to every channel a client shares with `subject`, once per
/// recipient even if several shared channels would otherwise duplicate
/// delivery (used for QUIT notification fan-out).
pub fn sendto_common_channels(dir: &Directory, out: &Outbound, subject: ClientId, msg: Arc<Message>, exclude: Option<ClientId>) {
    let Some(client) = dir.client(subject) else { return };
    let mut notified = std::collections::HashSet::new();
    for &chan_id in &client.channels {
        let Some(chan) = dir.channel(chan_id) else { continue };
        for member in &chan.members {
            if Some(member.client) == exclude || member.client == subject {
                continue;
            }
            if notified.insert(member.client) {
                out.send_to(member.client, &msg);
            }
        }
    }
}

pub fn sendto_nick(dir: &Directory, out: &Outbound, nick: &str, msg: Arc<Message>) -> bool {
    match dir.find_client(nick, true) {
        Some(id) => {
            out.send_to(id, &msg);
            true
        }
        None => false,
    }
}

/// Host-mask targeting (`PRIVMSG user@host.mask`): delivers to
/// every matching local client; remote matches are left to peer
/// forwarding, which the caller handles separately per link.
pub fn sendto_host_mask(dir: &Directory, out: &Outbound, mask: &str, msg: Arc<Message>) {
    for (idx, client) in dir.clients.iter() {
        if client.is_phantom() || !client.is_local() {
            continue;
        }
        if crate::directory::channel::glob_match(mask, &client.mask()) {
            out.send_to(ClientId(idx), &msg);
        }
    }
}

/// Server-mask targeting (`PRIVMSG $*.example.com`): delivers to every
/// local user whose server name matches, intended for opers' WALLOPS-like
/// broadcasts.
pub fn sendto_server_mask(dir: &Directory, out: &Outbound, mask: &str, server_name: &str, msg: Arc<Message>) {
    if !crate::directory::channel::glob_match(mask, server_name) {
        return;
    }
    for (idx, client) in dir.clients.iter() {
        if client.is_phantom() || !client.is_local() {
            continue;
        }
        out.send_to(ClientId(idx), &msg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::channel::Channel;
    use crate::directory::class::ClassId;
    use crate::directory::client::Client;
    use ircd_proto::ModeFlags;
    use std::time::Instant;

    fn test_msg() -> Arc<Message> {
        Arc::new(Message::privmsg("#chan", "hi"))
    }

    #[test]
    fn sendto_channel_skips_excluded_member() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let a = dir.insert_live(Client::new_local_user("alice", "a", "h", ClassId(0), now));
        let b = dir.insert_live(Client::new_local_user("bob", "b", "h", ClassId(0), now));
        let mut chan = Channel::new("#chan", ModeFlags::NONE);
        chan.add_member(a, ModeFlags::NONE, now);
        chan.add_member(b, ModeFlags::NONE, now);
        let chan_id = dir.insert_channel(chan);

        let mut out = Outbound::default();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        out.register(a, tx_a);
        out.register(b, tx_b);

        sendto_channel(&dir, &out, chan_id, test_msg(), Some(a));
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn sendto_nick_resolves_case_insensitively() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let a = dir.insert_live(Client::new_local_user("Alice", "a", "h", ClassId(0), now));
        let mut out = Outbound::default();
        let (tx, mut rx) = mpsc::unbounded_channel();
        out.register(a, tx);
        assert!(sendto_nick(&dir, &out, "ALICE", test_msg()));
        assert!(rx.try_recv().is_ok());
    }
}
