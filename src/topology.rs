//! Path recomputation: after the peer graph changes (a link
//! comes up or down), every remote client/server's `via`/`alt`/`hops` must
//! be recomputed relative to this server's local peers.

use std::collections::VecDeque;

use crate::directory::client::ClientId;
use crate::directory::Directory;

/// One local peer link, with the set of remote clients/servers reachable
/// only through it.
pub struct PeerEdge {
    pub peer: ClientId,
    pub reachable: Vec<ClientId>,
    /// Whether this link has negotiated multi-connect, making it eligible
    /// to serve as an `alt` path for anything also reachable via another
    /// multi-connect-capable link.
    pub multi_connect: bool,
}

/// Two-phase BFS over the current peer set:
/// 1. Reset every remote's `via`/`alt`/`hops`.
/// 2. For each local peer edge, walk its reachable set; the first peer to
///    reach a remote assigns `via`/`hops`, a second multi-connect-capable
///    peer reaching the same remote assigns `alt`.
pub fn recompute(dir: &mut Directory, edges: &[PeerEdge]) {
    for edge in edges {
        for &remote in &edge.reachable {
            if let Some(c) = dir.client_mut(remote) {
                c.topology.via = None;
                c.topology.alt = None;
                c.topology.hops = 0;
            }
        }
    }

    for edge in edges {
        let mut queue: VecDeque<(ClientId, u32)> = edge.reachable.iter().map(|&r| (r, 1)).collect();
        while let Some((remote, hops)) = queue.pop_front() {
            let Some(c) = dir.client_mut(remote) else { continue };
            if c.topology.via.is_none() {
                c.topology.via = Some(edge.peer);
                c.topology.hops = hops;
            } else if c.topology.alt.is_none() && c.topology.via != Some(edge.peer) && edge.multi_connect {
                c.topology.alt = Some(edge.peer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::class::ClassId;
    use crate::directory::client::Client;
    use std::time::Instant;

    fn remote(dir: &mut Directory, nick: &str) -> ClientId {
        let now = Instant::now();
        dir.insert_live(Client::new_local_user(nick, "u", "h", ClassId(0), now))
    }

    #[test]
    fn first_edge_assigns_via_second_assigns_alt() {
        let mut dir = Directory::new();
        let remote_id = remote(&mut dir, "alice");
        let peer_a = ClientId(100);
        let peer_b = ClientId(101);
        let edges = vec![
            PeerEdge { peer: peer_a, reachable: vec![remote_id], multi_connect: true },
            PeerEdge { peer: peer_b, reachable: vec![remote_id], multi_connect: true },
        ];
        recompute(&mut dir, &edges);
        let topo = &dir.client(remote_id).unwrap().topology;
        assert_eq!(topo.via, Some(peer_a));
        assert_eq!(topo.alt, Some(peer_b));
    }

    #[test]
    fn non_multiconnect_edge_never_becomes_alt() {
        let mut dir = Directory::new();
        let remote_id = remote(&mut dir, "bob");
        let peer_a = ClientId(100);
        let peer_b = ClientId(101);
        let edges = vec![
            PeerEdge { peer: peer_a, reachable: vec![remote_id], multi_connect: true },
            PeerEdge { peer: peer_b, reachable: vec![remote_id], multi_connect: false },
        ];
        recompute(&mut dir, &edges);
        let topo = &dir.client(remote_id).unwrap().topology;
        assert_eq!(topo.via, Some(peer_a));
        assert_eq!(topo.alt, None);
    }
}
