//! The single dispatch task: owns the `Directory` and `Outbound` registry
//! outright and processes one event to completion before looking at the
//! next, so no locking is needed anywhere in the core state.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::broadcast::Outbound;
use crate::config::{Config, ClassBlock};
use crate::directory::class::{Class, ClassId};
use crate::directory::client::{Client, ClientId};
use crate::directory::Directory;
use crate::error::HandlerError;
use crate::handlers::{self, Context};
use crate::network::connector::ConnectRequest;
use crate::network::ConnectionHandle;
use crate::stats::CommandStats;
use crate::sync::PeerRegistry;

pub enum DispatchEvent {
    Connect(ConnectionHandle, oneshot::Sender<ClientId>),
    Line(ClientId, ircd_proto::Command),
    Disconnect(ClientId),
}

/// Owns every piece of mutable core state the dispatch task touches, so
/// `handle_event` can take one argument instead of five.
struct State {
    dir: Directory,
    out: Outbound,
    stats: CommandStats,
    peers: PeerRegistry,
    config_path: String,
    connect_tx: mpsc::UnboundedSender<ConnectRequest>,
}

pub async fn run(
    mut rx: mpsc::UnboundedReceiver<DispatchEvent>,
    mut config: Config,
    config_path: String,
    connect_tx: mpsc::UnboundedSender<ConnectRequest>,
) {
    let mut dir = Directory::new();
    for block in &config.classes {
        register_class(&mut dir, block);
    }
    if dir.classes.by_name("default").is_none() {
        register_class(&mut dir, &ClassBlock::fallback("default"));
    }

    let mut state =
        State { dir, out: Outbound::default(), stats: CommandStats::default(), peers: PeerRegistry::default(), config_path, connect_tx };

    let mut gc_interval = tokio::time::interval(Duration::from_secs(60));
    let mut peer_interval = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                handle_event(&mut state, &mut config, event);
            }
            _ = gc_interval.tick() => {
                gc_sweep(&mut state.dir);
            }
            _ = peer_interval.tick() => {
                peer_tick(&mut state, &config);
            }
        }
    }
}

fn register_class(dir: &mut Directory, block: &ClassBlock) -> ClassId {
    dir.classes.register(Class::new(&block.name, block.local_max, block.global_max, block.ping_freq, block.sendq))
}

fn resolve_class(dir: &mut Directory, config: &Config, name: &str) -> ClassId {
    match dir.classes.by_name(name) {
        Some(id) => id,
        None => register_class(dir, &config.class(name)),
    }
}

fn handle_event(state: &mut State, config: &mut Config, event: DispatchEvent) {
    match event {
        DispatchEvent::Connect(handle, reply) => {
            let class_id = resolve_class(&mut state.dir, config, &handle.class);
            if state.dir.classes.get(class_id).at_global_limit() {
                warn!(class = %handle.class, addr = %handle.addr, "connection rejected, class at global limit");
                return;
            }

            let now = Instant::now();
            let placeholder = format!("*{}", handle.addr.port());
            let mut client = Client::new_local_user(&placeholder, "", &handle.addr.ip().to_string(), class_id, now);
            client.peer_initiated_locally = handle.initiated_locally;
            let id = state.dir.insert_live(client);
            state.dir.classes.get_mut(class_id).add(id);
            state.out.register(id, handle.outbound);
            info!(client_id = id.0, addr = %handle.addr, class = %handle.class, "connection registered");
            let _ = reply.send(id);
        }
        DispatchEvent::Line(id, command) => {
            if state.dir.client(id).is_none() {
                return;
            }
            let mut ctx = Context {
                dir: &mut state.dir,
                out: &mut state.out,
                config: &*config,
                stats: &mut state.stats,
                peers: &mut state.peers,
                connect_tx: &state.connect_tx,
                id,
            };
            match handlers::dispatch(&mut ctx, command) {
                Ok(()) => {}
                Err(HandlerError::Quit(reason)) => {
                    quit_and_release(state, config, id, reason);
                }
                Err(HandlerError::Rehash) => {
                    let nick = ctx.nick().to_string();
                    rehash(state, config, id, &nick);
                }
                Err(e) => {
                    let nick = ctx.nick().to_string();
                    if let Some(reply) = e.to_irc_reply(&config.server.name, &nick, "") {
                        ctx.reply(reply);
                    }
                }
            }
        }
        DispatchEvent::Disconnect(id) => {
            if state.dir.client(id).is_some_and(|c| !c.is_phantom()) {
                quit_and_release(state, config, id, Some("Connection reset".into()));
            }
        }
    }
}

fn quit_and_release(state: &mut State, config: &Config, id: ClientId, reason: Option<String>) {
    if let Some(class) = state.dir.local_class(id) {
        state.dir.classes.get_mut(class).remove(id);
    }
    state.peers.remove(id);
    handlers::process_quit(&mut state.dir, &mut state.out, config, id, reason);
}

/// REHASH re-reads and re-validates the config file, swapping it in only if
/// both steps succeed; the requesting oper gets `RPL_REHASHING` either way
/// the re-read itself isn't retried on bad input, matching the
/// read-then-replace semantics of the file-based config it came from.
fn rehash(state: &mut State, config: &mut Config, id: ClientId, nick: &str) {
    let server_name = config.server.name.clone();
    let prefix = ircd_proto::Prefix::server(server_name.clone());
    match crate::config::reload(&state.config_path) {
        Ok(new_config) => {
            *config = new_config;
            info!(by = %nick, "configuration rehashed");
            let msg = ircd_proto::Message::numeric(
                ircd_proto::Response::RPL_REHASHING,
                vec![nick.to_string(), "ircd.conf".to_string(), "Rehashing".to_string()],
            )
            .with_prefix(prefix);
            state.out.send_to(id, &std::sync::Arc::new(msg));
        }
        Err(e) => {
            warn!(by = %nick, error = %e, "rehash failed, keeping running configuration");
        }
    }
}

fn peer_tick(state: &mut State, config: &Config) {
    let now = Instant::now();
    let mut timed_out = Vec::new();
    let mut pings = Vec::new();
    for (&id, fsm) in state.peers.fsm.iter_mut() {
        match fsm.tick(now) {
            crate::sync::PeerTickAction::SendPing => pings.push(id),
            crate::sync::PeerTickAction::TimedOut => timed_out.push(id),
            crate::sync::PeerTickAction::None => {}
        }
    }
    let server_name = &config.server.name;
    for id in pings {
        let msg = std::sync::Arc::new(ircd_proto::Message::new(None, ircd_proto::Command::PING(server_name.clone())));
        state.out.send_to(id, &msg);
    }
    for id in timed_out {
        quit_and_release(state, config, id, Some("Ping timeout".into()));
    }
}

/// Periodic phantom/channel-hold sweep: nothing holds a
/// reference to an expired phantom or a held-empty channel forever.
fn gc_sweep(dir: &mut Directory) {
    let now = Instant::now();
    let nicks: Vec<String> = dir.clients.iter().map(|(_, c)| c.nick_lower.clone()).collect();
    for key in nicks {
        dir.gc_key(&key, now);
    }
    let empty_expired: Vec<_> = dir
        .channels
        .iter()
        .filter(|(_, c)| c.is_empty() && c.hold_upto.is_some_and(|t| t <= now))
        .map(|(i, _)| crate::directory::channel::ChannelId(i))
        .collect();
    for id in empty_expired {
        dir.remove_channel(id);
    }
    if !dir.channels.is_empty() {
        warn!(count = dir.channels.len(), "channels still open after gc sweep");
    }
}
