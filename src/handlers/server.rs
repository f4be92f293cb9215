//! Operator and server-to-server handlers: OPER, WALLOPS, KILL, SQUIT,
//! the plain and multi-connect SERVER introduction, NJOIN burst, ACK, PASS
//! and CONNECT.
//!
//! SERVER/ISERVER promote a freshly-accepted (or freshly-dialed)
//! connection into a peer link once its handshake checks out; NJOIN lays
//! down the channel membership a peer bursts for users it already
//! introduced. A peer-originated NICK introduction (the path that would
//! create those remote users in the first place) isn't built at this
//! scope, so NJOIN entries naming a nick we have no record of are logged
//! and skipped rather than synthesizing a placeholder remote user.

use std::sync::Arc;
use std::time::Instant;

use ircd_proto::{Command, Message, ModeFlags, Response};
use tracing::debug;

use crate::ack::AckSubject;
use crate::directory::channel::Channel;
use crate::directory::client::{ClientId, ClientKind};
use crate::error::HandlerError;
use crate::sync::{PeerFsm, PeerState};

use super::Context;

pub fn handle_pass(ctx: &mut Context, password: &str) -> Result<(), HandlerError> {
    ctx.peers.pending_pass.insert(ctx.id, password.to_string());
    Ok(())
}

pub fn handle_oper(ctx: &mut Context, name: &str, password: &str) -> Result<(), HandlerError> {
    let Some(block) = ctx.config.opers.iter().find(|o| o.name == name).cloned() else {
        return Err(HandlerError::NoOperHost);
    };
    if let Some(mask) = &block.hostmask {
        let client_mask = ctx.dir.client(ctx.id).map(|c| format!("{}@{}", c.ident, c.host)).unwrap_or_default();
        if !crate::directory::channel::glob_match(mask, &client_mask) {
            return Err(HandlerError::NoOperHost);
        }
    }
    if !crate::security::verify_oper_password(&block.password, password) {
        return Err(HandlerError::PasswordMismatch);
    }

    if let Some(c) = ctx.dir.client_mut(ctx.id) {
        c.modes.insert(ModeFlags::A_OP);
    }
    let nick = ctx.nick().to_string();
    let server_name = ctx.server_name().to_string();
    ctx.reply(
        Message::numeric(Response::RPL_YOUREOPER, vec![nick, "You are now an IRC operator".to_string()])
            .with_prefix(super::server_prefix(&server_name)),
    );
    Ok(())
}

pub fn handle_wallops(ctx: &mut Context, text: &str) -> Result<(), HandlerError> {
    if !super::is_oper(ctx) {
        return Err(HandlerError::AccessDenied);
    }
    broadcast_wallops(ctx, text);
    Ok(())
}

/// Sends a WALLOPS-shaped notice to every local client with `+w` set,
/// used both for `/wallops` itself and for the oper-notable events
/// (kill, squit, rehash) that generalize the same fan-out.
fn broadcast_wallops(ctx: &mut Context, text: &str) {
    let mask = ctx.dir.client(ctx.id).map(|c| c.mask()).unwrap_or_else(|| ctx.server_name().to_string());
    let msg = Arc::new(Message::new(Some(ircd_proto::Prefix::parse(&mask)), Command::WALLOPS(text.to_string())));
    for (idx, client) in ctx.dir.clients.iter() {
        if client.is_local() && !client.is_phantom() && client.modes.contains(ModeFlags::A_WALLOP) {
            ctx.out.send_to(ClientId(idx), &msg);
        }
    }
}

pub fn handle_kill(ctx: &mut Context, nick: &str, comment: &str) -> Result<(), HandlerError> {
    if !super::is_oper(ctx) {
        return Err(HandlerError::AccessDenied);
    }
    let target = ctx.dir.find_client(nick, false).ok_or_else(|| HandlerError::NoSuchNick(nick.to_string()))?;
    let is_server = ctx.dir.client(target).is_some_and(|c| matches!(c.kind, ClientKind::LocalPeer | ClientKind::RemotePeer));
    if is_server {
        return Err(HandlerError::CantKillServer);
    }

    let killer = ctx.nick().to_string();
    let reason = format!("Killed ({killer} ({comment}))");
    broadcast_wallops(ctx, &format!("Received KILL message for {nick} from {killer}: {comment}"));
    quit_peer_or_user(ctx, target, Some(reason));
    Ok(())
}

pub fn handle_squit(ctx: &mut Context, server: &str, comment: &str) -> Result<(), HandlerError> {
    if !super::is_oper(ctx) {
        return Err(HandlerError::AccessDenied);
    }
    let target = ctx.dir.find_client(server, false).ok_or_else(|| HandlerError::NoSuchServer(server.to_string()))?;
    let is_peer = ctx.dir.client(target).is_some_and(|c| matches!(c.kind, ClientKind::LocalPeer | ClientKind::RemotePeer));
    if !is_peer {
        return Err(HandlerError::NoSuchServer(server.to_string()));
    }

    let nick = ctx.nick().to_string();
    broadcast_wallops(ctx, &format!("Received SQUIT {server} from {nick}: {comment}"));
    quit_peer_or_user(ctx, target, Some(format!("Squit by {nick}: {comment}")));
    // Remote clients reached only through `target` aren't tracked at this
    // build's scope (no peer-originated NICK introduction yet), so there is
    // nothing for the BFS to reset beyond the direct link removed above.
    crate::topology::recompute(ctx.dir, &[]);
    Ok(())
}

fn quit_peer_or_user(ctx: &mut Context, id: ClientId, reason: Option<String>) {
    if let Some(class) = ctx.dir.local_class(id) {
        ctx.dir.classes.get_mut(class).remove(id);
    }
    ctx.peers.remove(id);
    super::process_quit(ctx.dir, ctx.out, ctx.config, id, reason);
}

pub fn handle_server(ctx: &mut Context, name: &str, hopcount: u32, info: &str) -> Result<(), HandlerError> {
    handle_server_line(ctx, name, hopcount, None, info)
}

pub fn handle_iserver(ctx: &mut Context, name: &str, hopcount: u32, token: u32, info: &str) -> Result<(), HandlerError> {
    handle_server_line(ctx, name, hopcount, Some(token), info)
}

/// Shared body for `SERVER` and `ISERVER`: validate the link password,
/// resolve a same-name collision against whatever already holds that key,
/// promote the connection into a peer, negotiate the handshake options
/// carried in `info`, and answer with our own `SERVER` line if the peer
/// dialed us first.
fn handle_server_line(ctx: &mut Context, name: &str, _hopcount: u32, token: Option<u32>, info: &str) -> Result<(), HandlerError> {
    if let Some(link) = ctx.config.links.iter().find(|l| l.name.eq_ignore_ascii_case(name)) {
        let supplied = ctx.peers.pending_pass.remove(&ctx.id);
        if supplied.as_deref() != Some(link.password.as_str()) {
            return Err(HandlerError::Quit(Some("Bad link password".into())));
        }
    }

    let now = Instant::now();
    if let Some(existing) = ctx.dir.find_client(name, false) {
        if existing != ctx.id {
            let existing_is_peer =
                ctx.dir.client(existing).is_some_and(|c| matches!(c.kind, ClientKind::LocalPeer | ClientKind::RemotePeer));
            if existing_is_peer {
                let existing_signon = ctx.dir.client(existing).map(|c| c.signon).unwrap_or(now);
                let loser = crate::collision::younger_server_link((existing, existing_signon), (ctx.id, now));
                if loser == ctx.id {
                    return Err(HandlerError::Quit(Some(format!("Server {name} already linked"))));
                }
                quit_peer_or_user(ctx, existing, Some("Server re-introduced on a younger link".into()));
            }
        }
    }

    let assigned_token = token.unwrap_or(ctx.id.0 as u32);
    if !ctx.dir.promote_to_server(ctx.id, name, assigned_token) {
        return Err(HandlerError::Quit(Some(format!("Could not register server {name}"))));
    }

    let (_sid, opts) = info.split_once(' ').unwrap_or((info, ""));
    let local_offer = crate::sync::capab::default_local_offer();
    let ping_secs = ctx
        .config
        .links
        .iter()
        .find(|l| l.name.eq_ignore_ascii_case(name))
        .and_then(|l| ctx.dir.classes.by_name(&l.class))
        .map(|id| ctx.dir.classes.get(id).ping_freq_secs)
        .unwrap_or(120);

    let fsm = ctx
        .peers
        .fsm
        .entry(ctx.id)
        .or_insert_with(|| PeerFsm::new(PeerState::Initial, 20, 1, std::time::Duration::from_secs(ping_secs), now));
    fsm.negotiate_capab(&local_offer, opts);
    fsm.complete_registration();

    let peer_initiated_locally = ctx.dir.client(ctx.id).map(|c| c.peer_initiated_locally).unwrap_or(false);
    if !peer_initiated_locally {
        let our_info = format!("{} {}", ctx.config.server.sid, crate::sync::capab::encode(&local_offer));
        ctx.reply(Message::new(None, Command::SERVER { name: ctx.server_name().to_string(), hopcount: 1, info: our_info }));
    }

    crate::topology::recompute(ctx.dir, &[]);
    broadcast_wallops(ctx, &format!("Link with {name} established"));
    Ok(())
}

pub fn handle_njoin(ctx: &mut Context, channel: &str, nicks: &str) -> Result<(), HandlerError> {
    let chan_id = ctx.dir.find_channel(channel).unwrap_or_else(|| ctx.dir.insert_channel(Channel::new(channel, ModeFlags::NONE)));
    let now = Instant::now();

    for token in nicks.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (prefix, nick) = split_njoin_prefix(token);
        let Some(client_id) = ctx.dir.find_client(nick, true) else {
            debug!(nick, channel, "NJOIN names a client with no local record, skipping");
            continue;
        };

        let member_modes = njoin_prefix_modes(prefix);
        let already_member = ctx.dir.channel(chan_id).is_some_and(|c| c.member(client_id).is_some());
        if !already_member {
            if let Some(chan) = ctx.dir.channel_mut(chan_id) {
                chan.add_member(client_id, member_modes, now);
            }
            if let Some(c) = ctx.dir.client_mut(client_id) {
                if !c.channels.contains(&chan_id) {
                    c.channels.push(chan_id);
                }
            }
        }
    }
    Ok(())
}

fn split_njoin_prefix(token: &str) -> (Option<char>, &str) {
    match token.chars().next() {
        Some(c @ ('@' | '%' | '+')) => (Some(c), &token[c.len_utf8()..]),
        _ => (None, token),
    }
}

fn njoin_prefix_modes(prefix: Option<char>) -> ModeFlags {
    match prefix {
        Some('@') => ModeFlags::A_OP,
        Some('%') => ModeFlags::A_HALFOP,
        Some('+') => ModeFlags::A_VOICE,
        _ => ModeFlags::NONE,
    }
}

pub fn handle_ack(ctx: &mut Context, _cmd: &str, target: &str, _channel: Option<&str>) -> Result<(), HandlerError> {
    let Ok(id) = target.parse::<u32>() else { return Ok(()) };
    let Some(queue) = ctx.peers.ack.get_mut(&ctx.id) else { return Ok(()) };
    let Some(entry) = queue.pop(id) else { return Ok(()) };

    let AckSubject::Client(subject) = entry.subject;
    let Some(client) = ctx.dir.client_mut(subject) else { return Ok(()) };
    let mut on_ack = client.on_ack;
    let released = crate::ack::apply_ack(&entry, &mut on_ack);
    client.on_ack = on_ack;
    if released {
        ctx.dir.gc_holder(subject, Instant::now());
    }
    Ok(())
}

pub fn handle_connect(ctx: &mut Context, target: &str, port: &str, remote: Option<&str>) -> Result<(), HandlerError> {
    if !super::is_oper(ctx) {
        return Err(HandlerError::AccessDenied);
    }
    if remote.is_some() {
        // Relaying CONNECT to a third server over the peer graph isn't
        // supported at this scope; only a direct local dial is.
        return Err(HandlerError::NoSuchServer(target.to_string()));
    }
    let Some(mut link) = ctx.config.links.iter().find(|l| l.name.eq_ignore_ascii_case(target)).cloned() else {
        return Err(HandlerError::NoSuchServer(target.to_string()));
    };
    if let Ok(p) = port.parse::<u16>() {
        if p != 0 {
            link.port = p;
        }
    }
    let _ = ctx.connect_tx.send(crate::network::connector::ConnectRequest { link });
    Ok(())
}

/// Per-link duplicate check for the `I`-prefixed relay forms: a peer can
/// reach us over more than one path, so the same state change can arrive
/// twice. Returns false (and the caller should drop the message) on a
/// repeat; true the first time an id is seen on this link.
fn observe_id(ctx: &mut Context, id: u32) -> bool {
    let window_size = ctx.config.limits.id_window;
    ctx.peers.idwin.entry(ctx.id).or_insert_with(|| crate::idgen::IdWindow::new(window_size)).observe(id)
}

pub fn handle_imode(ctx: &mut Context, id: u32, target: &str, modes: &str, params: Vec<String>) -> Result<(), HandlerError> {
    if !observe_id(ctx, id) {
        return Ok(());
    }
    if target.starts_with(['#', '&', '+', '!']) {
        relay_channel_mode(ctx, target, modes, params);
    } else {
        relay_user_mode(ctx, target, modes);
    }
    Ok(())
}

/// Applies a peer-relayed channel mode change without the local
/// chanop-privilege check `mode::handle_channel` makes: the originating
/// server already authorized it, and re-checking local membership here
/// would just reject legitimate remote-oper changes.
fn relay_channel_mode(ctx: &mut Context, channel: &str, modes: &str, params: Vec<String>) {
    use crate::modes::{channel::apply_channel_token, find_letter, format_mode_batch, tokenize, CHANNEL_MODES, MEMBER_MODES};

    let Some(chan_id) = ctx.dir.find_channel(channel) else { return };
    let member_tokens = tokenize(modes, params.clone(), MEMBER_MODES);
    let channel_tokens = tokenize(modes, params, CHANNEL_MODES);
    let tokens = if member_tokens.len() >= channel_tokens.len() { member_tokens } else { channel_tokens };

    let mut resolved = std::collections::HashMap::new();
    for token in &tokens {
        if find_letter(MEMBER_MODES, token.letter).is_some() {
            if let Some(n) = &token.param {
                resolved.insert(n.clone(), ctx.dir.find_client(n, false));
            }
        }
    }

    let now = Instant::now();
    let actor = ctx.nick().to_string();
    let mut applied = Vec::new();
    for token in &tokens {
        let Some(chan) = ctx.dir.channel_mut(chan_id) else { break };
        let resolver = |n: &str| resolved.get(n).copied().flatten();
        if let Ok((changes, _removed)) = apply_channel_token(chan, token, &actor, resolver, now) {
            applied.extend(changes);
        }
    }
    if applied.is_empty() {
        return;
    }
    let (letters, out_params) = format_mode_batch(&applied);
    let command = Command::ChannelMode { channel: channel.to_string(), modes: letters, params: out_params };
    let msg = Arc::new(Message::new(Some(ircd_proto::Prefix::server(actor)), command));
    crate::broadcast::sendto_channel(ctx.dir, ctx.out, chan_id, msg, None);
}

fn relay_user_mode(ctx: &mut Context, target_nick: &str, modes: &str) {
    use crate::modes::{format_mode_batch, tokenize, user::apply_user_token, USER_MODES};

    let Some(target_id) = ctx.dir.find_client(target_nick, true) else {
        debug!(target_nick, "IMODE names a user with no local record, skipping");
        return;
    };
    let tokens = tokenize(modes, vec![], USER_MODES);
    let mut applied = Vec::new();
    if let Some(c) = ctx.dir.client_mut(target_id) {
        for token in &tokens {
            if let Ok(Some(change)) = apply_user_token(c, token) {
                applied.push(change);
            }
        }
    }
    if applied.is_empty() {
        return;
    }
    let (letters, _) = format_mode_batch(&applied);
    let command = Command::UserMode { nick: target_nick.to_string(), modes: letters, params: vec![] };
    let msg = Arc::new(Message::new(Some(ircd_proto::Prefix::parse(target_nick)), command));
    ctx.out.send_to(target_id, &msg);
}

pub fn handle_itopic(ctx: &mut Context, id: u32, channel: &str, topic: &str) -> Result<(), HandlerError> {
    if !observe_id(ctx, id) {
        return Ok(());
    }
    let Some(chan_id) = ctx.dir.find_channel(channel) else { return Ok(()) };
    let actor = ctx.nick().to_string();
    let now = Instant::now();
    if let Some(chan) = ctx.dir.channel_mut(chan_id) {
        chan.topic = Some(crate::directory::channel::Topic {
            text: topic.to_string(),
            set_by: actor.clone(),
            set_at: now,
            set_at_unix: chrono::Utc::now().timestamp(),
        });
    }
    let command = Command::TOPIC { channel: channel.to_string(), topic: Some(topic.to_string()) };
    let msg = Arc::new(Message::new(Some(ircd_proto::Prefix::server(actor)), command));
    crate::broadcast::sendto_channel(ctx.dir, ctx.out, chan_id, msg, None);
    Ok(())
}

/// Relays a numeric a peer generated for one of our local users (e.g. a
/// remote-originated WHOIS reply hop). `params[0]` is the target nick by
/// the same convention plain numerics use.
pub fn handle_inum(ctx: &mut Context, id: u32, numeric: u16, params: Vec<String>) -> Result<(), HandlerError> {
    if !observe_id(ctx, id) {
        return Ok(());
    }
    let Some(target_nick) = params.first() else { return Ok(()) };
    let Some(target_id) = ctx.dir.find_client(target_nick, false) else {
        debug!(target_nick, numeric, "INUM names a user with no local record, skipping");
        return Ok(());
    };
    let prefix = ircd_proto::Prefix::server(ctx.nick().to_string());
    let msg = Arc::new(Message::new(Some(prefix), Command::Raw(format!("{numeric:03}"), params)));
    ctx.out.send_to(target_id, &msg);
    Ok(())
}

pub fn handle_iwallops(ctx: &mut Context, id: u32, text: &str) -> Result<(), HandlerError> {
    if !observe_id(ctx, id) {
        return Ok(());
    }
    let origin = ctx.nick().to_string();
    let msg = Arc::new(Message::new(Some(ircd_proto::Prefix::server(origin)), Command::WALLOPS(text.to_string())));
    for (idx, client) in ctx.dir.clients.iter() {
        if client.is_local() && !client.is_phantom() && client.modes.contains(ModeFlags::A_WALLOP) {
            ctx.out.send_to(ClientId(idx), &msg);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Outbound;
    use crate::config::Config;
    use crate::directory::class::ClassId;
    use crate::directory::client::Client;
    use crate::directory::Directory;
    use crate::stats::CommandStats;

    fn base_config() -> Config {
        toml::from_str(
            r#"
            [server]
            name = "irc.example"
            sid = "1AB"
            description = "test"
            [[listen]]
            address = "0.0.0.0:6667"
            [[opers]]
            name = "admin"
            password = "hunter2"
            "#,
        )
        .unwrap()
    }

    fn ctx_parts() -> (Directory, Outbound, Config, CommandStats, PeerRegistry, tokio::sync::mpsc::UnboundedSender<crate::network::connector::ConnectRequest>) {
        let dir = Directory::new();
        let out = Outbound::default();
        let config = base_config();
        let stats = CommandStats::default();
        let peers = PeerRegistry::default();
        let (connect_tx, _connect_rx) = tokio::sync::mpsc::unbounded_channel();
        (dir, out, config, stats, peers, connect_tx)
    }

    #[test]
    fn pass_stashes_password_for_the_link() {
        let (mut dir, mut out, config, mut stats, mut peers, connect_tx) = ctx_parts();
        let now = Instant::now();
        let id = dir.insert_live(Client::new_local_user("*1", "", "h", ClassId(0), now));
        let mut ctx =
            Context { dir: &mut dir, out: &mut out, config: &config, stats: &mut stats, peers: &mut peers, connect_tx: &connect_tx, id };
        assert!(handle_pass(&mut ctx, "hunter2").is_ok());
        assert_eq!(ctx.peers.pending_pass.get(&id).map(String::as_str), Some("hunter2"));
    }

    #[test]
    fn oper_with_wrong_password_is_rejected() {
        let (mut dir, mut out, config, mut stats, mut peers, connect_tx) = ctx_parts();
        let now = Instant::now();
        let id = dir.insert_live(Client::new_local_user("alice", "a", "h", ClassId(0), now));
        let mut ctx =
            Context { dir: &mut dir, out: &mut out, config: &config, stats: &mut stats, peers: &mut peers, connect_tx: &connect_tx, id };
        assert_eq!(handle_oper(&mut ctx, "admin", "wrong"), Err(HandlerError::PasswordMismatch));
        assert!(!ctx.dir.client(id).unwrap().modes.contains(ModeFlags::A_OP));
    }

    #[test]
    fn oper_with_correct_password_sets_the_oper_flag() {
        let (mut dir, mut out, config, mut stats, mut peers, connect_tx) = ctx_parts();
        let now = Instant::now();
        let id = dir.insert_live(Client::new_local_user("alice", "a", "h", ClassId(0), now));
        let mut ctx =
            Context { dir: &mut dir, out: &mut out, config: &config, stats: &mut stats, peers: &mut peers, connect_tx: &connect_tx, id };
        assert!(handle_oper(&mut ctx, "admin", "hunter2").is_ok());
        assert!(ctx.dir.client(id).unwrap().modes.contains(ModeFlags::A_OP));
    }

    #[test]
    fn njoin_skips_a_nick_with_no_local_record() {
        let (mut dir, mut out, config, mut stats, mut peers, connect_tx) = ctx_parts();
        let now = Instant::now();
        let link_id = dir.insert_live(Client::new_local_user("*2", "", "h", ClassId(0), now));
        let mut ctx = Context {
            dir: &mut dir,
            out: &mut out,
            config: &config,
            stats: &mut stats,
            peers: &mut peers,
            connect_tx: &connect_tx,
            id: link_id,
        };
        assert!(handle_njoin(&mut ctx, "#chan", "@ghost").is_ok());
        let chan_id = ctx.dir.find_channel("#chan").unwrap();
        assert!(ctx.dir.channel(chan_id).unwrap().is_empty());
    }

    #[test]
    fn ack_with_no_outstanding_entry_is_a_no_op() {
        let (mut dir, mut out, config, mut stats, mut peers, connect_tx) = ctx_parts();
        let now = Instant::now();
        let link_id = dir.insert_live(Client::new_local_user("*3", "", "h", ClassId(0), now));
        peers.ack.insert(link_id, crate::ack::AckQueue::default());
        let mut ctx = Context {
            dir: &mut dir,
            out: &mut out,
            config: &config,
            stats: &mut stats,
            peers: &mut peers,
            connect_tx: &connect_tx,
            id: link_id,
        };
        assert!(handle_ack(&mut ctx, "MODE", "7", Some("#chan")).is_ok());
    }
}
