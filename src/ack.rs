//! Ack protocol: commands sent to a multi-connect peer that
//! change an object's lifetime register an ACK entry so the object is kept
//! alive (`on_ack` refcounted) until the peer confirms, or the change is
//! cancelled by a later command on the same object ("contrary" entries).

use std::collections::VecDeque;

use crate::directory::client::ClientId;

/// What an outstanding ACK is for; used only to detect a "contrary"
/// command (e.g. a KILL cancels an earlier pending NICK-change ACK for
/// the same client) without comparing full command payloads.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AckSubject {
    Client(ClientId),
}

#[derive(Clone, Debug)]
pub struct AckEntry {
    pub id: u32,
    pub subject: AckSubject,
    /// True once a later, contrary command superseded this entry; the
    /// ACK is still consumed off the queue but no longer releases a ref.
    pub contrary: bool,
}

/// Per-link outstanding-ACK queue.
#[derive(Default)]
pub struct AckQueue {
    queue: VecDeque<AckEntry>,
}

impl AckQueue {
    pub fn push(&mut self, id: u32, subject: AckSubject) {
        self.queue.push_back(AckEntry { id, subject, contrary: false });
    }

    /// Mark every still-pending entry for `subject` as contrary: the
    /// entry stays in FIFO order but its eventual ACK no longer releases
    /// the hold.
    pub fn mark_contrary(&mut self, subject: AckSubject) {
        for entry in self.queue.iter_mut() {
            if entry.subject == subject {
                entry.contrary = true;
            }
        }
    }

    /// Pop the ACK matching `id`. The common case is a head match; when a
    /// peer coalesces traffic, entries can also be acked out of FIFO
    /// order, so we fall back to a full scan.
    pub fn pop(&mut self, id: u32) -> Option<AckEntry> {
        if let Some(front) = self.queue.front() {
            if front.id == id {
                return self.queue.pop_front();
            }
        }
        let pos = self.queue.iter().position(|e| e.id == id)?;
        self.queue.remove(pos)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Applies a popped ACK: decrements the subject's `on_ack` refcount unless
/// it was marked contrary, returning whether the hold was actually
/// released (callers use this to trigger phantom GC). The caller looks up
/// `entry.subject` in the `Directory` and passes its `on_ack` field.
pub fn apply_ack(entry: &AckEntry, on_ack: &mut u32) -> bool {
    if entry.contrary {
        return false;
    }
    *on_ack = on_ack.saturating_sub(1);
    *on_ack == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn head_match_pops_in_order() {
        let mut q = AckQueue::default();
        q.push(1, AckSubject::Client(ClientId(1)));
        q.push(2, AckSubject::Client(ClientId(2)));
        let popped = q.pop(1).unwrap();
        assert_eq!(popped.id, 1);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn out_of_order_ack_falls_back_to_scan() {
        let mut q = AckQueue::default();
        q.push(1, AckSubject::Client(ClientId(1)));
        q.push(2, AckSubject::Client(ClientId(2)));
        let popped = q.pop(2).unwrap();
        assert_eq!(popped.id, 2);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn mark_contrary_flags_matching_subject() {
        let mut q = AckQueue::default();
        q.push(1, AckSubject::Client(ClientId(1)));
        q.mark_contrary(AckSubject::Client(ClientId(1)));
        let popped = q.pop(1).unwrap();
        assert!(popped.contrary);
    }
}
