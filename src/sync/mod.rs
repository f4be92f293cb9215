//! Peer link state machine and S2S option negotiation.
//!
//! The core dispatch task only needs to know *which* state a link is in
//! and how much penalty it has accrued; the actual socket plumbing for an
//! outbound uplink lives in `network` alongside the client listener, kept
//! as a separate concern that only meets this module at the
//! `Directory`/dispatch boundary.

pub mod capab;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::ack::AckQueue;
use crate::directory::client::ClientId;
use crate::idgen::IdWindow;

/// Everything dispatch needs to drive local peer links: one `PeerFsm` (and
/// its ack/id-dedup state) per link, keyed by the link's own `ClientId`.
/// Lives alongside `Directory`/`Outbound` in the dispatch task; nothing
/// here is touched off that task.
#[derive(Default)]
pub struct PeerRegistry {
    pub fsm: HashMap<ClientId, PeerFsm>,
    pub ack: HashMap<ClientId, AckQueue>,
    pub idwin: HashMap<ClientId, IdWindow>,
    /// `PASS` password stashed until the matching `SERVER` line arrives.
    pub pending_pass: HashMap<ClientId, String>,
}

impl PeerRegistry {
    pub fn remove(&mut self, id: ClientId) {
        self.fsm.remove(&id);
        self.ack.remove(&id);
        self.idwin.remove(&id);
        self.pending_pass.remove(&id);
    }
}

/// Per-link state. `Idle` only applies to links we initiated;
/// an inbound connection starts straight at `Initial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Disconnected,
    Initial,
    Login,
    Idle,
    Talk,
    Quit,
    LastWait,
}

impl PeerState {
    pub fn is_registered(&self) -> bool {
        matches!(self, PeerState::Talk)
    }
}

/// Tracks accrued flood penalty and next-allowed-read time for one link,
/// the way `ircd.c`'s per-peer penalty counter gates the input loop.
pub struct PenaltyBucket {
    pub penalty: u32,
    pub max_penalty: u32,
    pub per_message: u32,
}

impl PenaltyBucket {
    pub fn new(max_penalty: u32, per_message: u32) -> Self {
        PenaltyBucket { penalty: 0, max_penalty, per_message }
    }

    /// Step 1 of the input loop: reads are suspended while over budget.
    pub fn reads_suspended(&self) -> bool {
        self.penalty >= self.max_penalty
    }

    pub fn charge(&mut self, multiplier: u32) {
        self.penalty = self.penalty.saturating_add(self.per_message.saturating_mul(multiplier.max(1)));
    }

    /// Called once per timer tick; penalty drains by one message's worth.
    pub fn decay(&mut self) {
        self.penalty = self.penalty.saturating_sub(self.per_message);
    }
}

/// Minimal per-link FSM driver. Holds just enough to decide state
/// transitions and ping timeouts; the link's actual I/O is owned by the
/// connection task, same division of labor as client links.
pub struct PeerFsm {
    pub state: PeerState,
    pub penalty: PenaltyBucket,
    pub capab: capab::PeerCapabilities,
    pub ping_interval: Duration,
    last_input: Instant,
    pinged: bool,
}

impl PeerFsm {
    pub fn new(initial: PeerState, max_penalty: u32, per_message: u32, ping_interval: Duration, now: Instant) -> Self {
        PeerFsm {
            state: initial,
            penalty: PenaltyBucket::new(max_penalty, per_message),
            capab: capab::PeerCapabilities::default(),
            ping_interval,
            last_input: now,
            pinged: false,
        }
    }

    pub fn note_input(&mut self, now: Instant) {
        self.last_input = now;
        self.pinged = false;
    }

    pub fn negotiate_capab(&mut self, local_offer: &std::collections::BTreeSet<String>, remote_opts: &str) {
        self.capab = capab::PeerCapabilities::from_handshake(local_offer, remote_opts);
    }

    pub fn complete_registration(&mut self) {
        if self.state == PeerState::Initial || self.state == PeerState::Login || self.state == PeerState::Idle {
            self.state = PeerState::Talk;
        }
    }

    pub fn begin_quit(&mut self) {
        self.state = PeerState::Quit;
    }

    /// Returns the action the caller should take this tick: send a PING,
    /// drop the link for a timeout, or do nothing. Mirrors "on timeout
    /// send PING ... on twice the interval with no reply, mark Quit".
    pub fn tick(&mut self, now: Instant) -> PeerTickAction {
        self.penalty.decay();
        let since = now.saturating_duration_since(self.last_input);
        if !self.pinged && since >= self.ping_interval {
            self.pinged = true;
            return PeerTickAction::SendPing;
        }
        if self.pinged && since >= self.ping_interval * 2 {
            self.state = PeerState::Quit;
            return PeerTickAction::TimedOut;
        }
        PeerTickAction::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerTickAction {
    None,
    SendPing,
    TimedOut,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn penalty_suspends_reads_once_over_max() {
        let mut bucket = PenaltyBucket::new(3, 1);
        bucket.charge(1);
        bucket.charge(1);
        bucket.charge(1);
        assert!(bucket.reads_suspended());
        bucket.decay();
        assert!(!bucket.reads_suspended());
    }

    #[test]
    fn fsm_pings_then_times_out_after_two_intervals() {
        let t0 = Instant::now();
        let mut fsm = PeerFsm::new(PeerState::Talk, 20, 1, Duration::from_secs(60), t0);
        assert_eq!(fsm.tick(t0), PeerTickAction::None);
        let t1 = t0 + Duration::from_secs(61);
        assert_eq!(fsm.tick(t1), PeerTickAction::SendPing);
        let t2 = t0 + Duration::from_secs(122);
        assert_eq!(fsm.tick(t2), PeerTickAction::TimedOut);
        assert_eq!(fsm.state, PeerState::Quit);
    }

    #[test]
    fn input_before_second_interval_cancels_timeout() {
        let t0 = Instant::now();
        let mut fsm = PeerFsm::new(PeerState::Talk, 20, 1, Duration::from_secs(60), t0);
        let t1 = t0 + Duration::from_secs(61);
        assert_eq!(fsm.tick(t1), PeerTickAction::SendPing);
        fsm.note_input(t1);
        let t2 = t1 + Duration::from_secs(61);
        assert_eq!(fsm.tick(t2), PeerTickAction::SendPing);
    }

    #[test]
    fn registration_only_completes_from_pre_talk_states() {
        let mut fsm = PeerFsm::new(PeerState::Login, 20, 1, Duration::from_secs(60), Instant::now());
        fsm.complete_registration();
        assert_eq!(fsm.state, PeerState::Talk);
    }
}
