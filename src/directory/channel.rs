//! CHANNEL and MEMBER records.

use std::time::Instant;

use ircd_proto::ModeFlags;

use super::client::ClientId;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ChannelId(pub usize);

#[derive(Clone, Debug)]
pub struct ListEntry {
    pub mask: String,
    pub set_by: String,
    pub set_at: Instant,
}

#[derive(Clone, Debug)]
pub struct Topic {
    pub text: String,
    pub set_by: String,
    pub set_at: Instant,
    /// Wall-clock seconds-since-epoch, separate from `set_at`'s monotonic
    /// clock, since RPL_TOPICWHOTIME wires a real timestamp.
    pub set_at_unix: i64,
}

/// The join record. The back-pointers the original keeps (`prevnick`,
/// `prevchan`) for O(1) removal are naturally subsumed here by storing
/// members in a `Vec` on the channel and letting the client list its own
/// channel ids (standing in for a MEMBER doubly-linked list, arena-ified).
#[derive(Clone, Debug)]
pub struct Member {
    pub client: ClientId,
    pub modes: ModeFlags,
    pub join_time: Instant,
}

pub struct Channel {
    pub name: String,
    pub name_lower: String,
    pub members: Vec<Member>,
    pub invited: Vec<ClientId>,
    pub bans: Vec<ListEntry>,
    pub excepts: Vec<ListEntry>,
    pub invex: Vec<ListEntry>,
    pub modes: ModeFlags,
    pub limit: Option<u32>,
    pub key: Option<String>,
    pub topic: Option<Topic>,
    /// Founder, only meaningful for safe (`!`) channels.
    pub founder: Option<ClientId>,
    /// Nonzero (Some) means held empty; freed once `now >= hold_upto`.
    pub hold_upto: Option<Instant>,
    /// Last moment the channel had an operator present.
    pub noop_since: Option<Instant>,
}

impl Channel {
    pub fn new(name: &str, default_modes: ModeFlags) -> Self {
        Channel {
            name: name.to_string(),
            name_lower: ircd_proto::casefold::to_lower(name),
            members: Vec::new(),
            invited: Vec::new(),
            bans: Vec::new(),
            excepts: Vec::new(),
            invex: Vec::new(),
            modes: default_modes,
            limit: None,
            key: None,
            topic: None,
            founder: None,
            hold_upto: None,
            noop_since: None,
        }
    }

    pub fn member(&self, id: ClientId) -> Option<&Member> {
        self.members.iter().find(|m| m.client == id)
    }

    pub fn member_mut(&mut self, id: ClientId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.client == id)
    }

    pub fn has_member(&self, id: ClientId) -> bool {
        self.member(id).is_some()
    }

    pub fn add_member(&mut self, client: ClientId, modes: ModeFlags, now: Instant) {
        self.members.push(Member { client, modes, join_time: now });
        self.noop_since = None;
    }

    /// Removes a member; returns whether an operator left as a result,
    /// which callers use to stamp `noop_since`.
    pub fn remove_member(&mut self, client: ClientId, now: Instant) -> bool {
        let Some(idx) = self.members.iter().position(|m| m.client == client) else {
            return false;
        };
        let was_op = self.members[idx].modes.contains(ModeFlags::A_OP);
        self.members.remove(idx);
        if was_op && !self.members.iter().any(|m| m.modes.contains(ModeFlags::A_OP)) {
            self.noop_since = Some(now);
        }
        was_op
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn has_any_operator(&self) -> bool {
        self.members.iter().any(|m| m.modes.contains(ModeFlags::A_OP))
    }

    /// Cancel narrower masks subsumed by a newly-added broader mask;
    /// returns the masks removed as a result,
    /// which the caller broadcasts as `-x` in the same batch.
    pub fn add_mask_with_cancellation(list_kind: ListKind, list: &mut Vec<ListEntry>, new_mask: &str, set_by: &str, now: Instant) -> Vec<String> {
        let _ = list_kind;
        let removed: Vec<String> = list
            .iter()
            .filter(|e| e.mask != new_mask && mask_subsumes(new_mask, &e.mask))
            .map(|e| e.mask.clone())
            .collect();
        list.retain(|e| !removed.contains(&e.mask));
        if !list.iter().any(|e| e.mask == new_mask) {
            list.push(ListEntry { mask: new_mask.to_string(), set_by: set_by.to_string(), set_at: now });
        }
        removed
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ListKind {
    Ban,
    Except,
    InviteExempt,
}

/// True when `broad` is a glob-style mask that matches every string
/// `narrow` would match — the trivial case used for cancellation is
/// identity-through-wildcard-expansion (`*!*@*.example.com` subsumes
/// `bob!*@host.example.com`), implemented as a glob-containment check.
pub fn mask_subsumes(broad: &str, narrow: &str) -> bool {
    if broad == narrow {
        return false;
    }
    glob_match(broad, narrow)
}

/// Minimal `*`/`?` glob matcher for ban/exempt masks.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    fn helper(p: &[u8], t: &[u8]) -> bool {
        match (p.first(), t.first()) {
            (None, None) => true,
            (Some(b'*'), _) => helper(&p[1..], t) || (!t.is_empty() && helper(p, &t[1..])),
            (Some(b'?'), Some(_)) => helper(&p[1..], &t[1..]),
            (Some(pc), Some(tc)) if pc.eq_ignore_ascii_case(tc) => helper(&p[1..], &t[1..]),
            _ => false,
        }
    }
    helper(pattern.as_bytes(), text.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_wildcard_masks() {
        assert!(glob_match("*!*@*.example.com", "bob!x@host.example.com"));
        assert!(!glob_match("*!*@*.example.com", "bob!x@host.other.com"));
    }

    #[test]
    fn broader_mask_subsumes_narrower() {
        assert!(mask_subsumes("*!*@*.example.com", "bob!*@host.example.com"));
        assert!(!mask_subsumes("bob!*@host.example.com", "*!*@*.example.com"));
    }

    #[test]
    fn add_mask_with_cancellation_removes_narrower_entries() {
        let mut list = vec![ListEntry {
            mask: "bob!*@host.example.com".into(),
            set_by: "alice".into(),
            set_at: Instant::now(),
        }];
        let removed = Channel::add_mask_with_cancellation(
            ListKind::Ban,
            &mut list,
            "*!*@*.example.com",
            "alice",
            Instant::now(),
        );
        assert_eq!(removed, vec!["bob!*@host.example.com".to_string()]);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].mask, "*!*@*.example.com");
    }

    #[test]
    fn remove_member_stamps_noop_since_when_last_op_leaves() {
        let mut chan = Channel::new("#x", ModeFlags::NONE);
        let now = Instant::now();
        chan.add_member(ClientId(1), ModeFlags::A_OP, now);
        assert!(chan.noop_since.is_none());
        let was_op = chan.remove_member(ClientId(1), now);
        assert!(was_op);
        assert!(chan.noop_since.is_some());
    }
}
