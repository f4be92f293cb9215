//! Read-only informational numerics: LUSERS, VERSION, ADMIN, TIME, INFO,
//! MOTD. Thin counters and static text over `Directory`/`Config`, none of
//! which share routing logic with the messaging path.

use ircd_proto::{Message, ModeFlags, Response};

use crate::directory::client::ClientKind;
use crate::error::HandlerError;

use super::{server_prefix, Context};

pub fn handle_lusers(ctx: &mut Context) -> Result<(), HandlerError> {
    let mut users = 0u32;
    let mut invisible = 0u32;
    let mut opers = 0u32;
    let mut servers = 1u32; // ourselves
    let mut unknown = 0u32;

    for (_, c) in ctx.dir.clients.iter() {
        if c.is_phantom() {
            continue;
        }
        match c.kind {
            ClientKind::LocalUser | ClientKind::RemoteUser => {
                if c.ident.is_empty() {
                    unknown += 1;
                    continue;
                }
                users += 1;
                if c.modes.contains(ModeFlags::A_INVISIBLE) {
                    invisible += 1;
                }
                if c.modes.contains(ModeFlags::A_OP) {
                    opers += 1;
                }
            }
            ClientKind::LocalPeer | ClientKind::RemotePeer => servers += 1,
            _ => {}
        }
    }

    let nick = ctx.nick().to_string();
    let server_name = ctx.server_name().to_string();
    let prefix = server_prefix(&server_name);
    let channels = ctx.dir.channels.len();
    let local_clients = ctx.dir.clients.iter().filter(|(_, c)| c.is_local() && !c.is_phantom()).count();
    let local_servers = ctx.dir.clients.iter().filter(|(_, c)| c.kind == ClientKind::LocalPeer).count();

    let lines = [
        (Response::RPL_LUSERCLIENT, vec![nick.clone(), format!("There are {users} users and {invisible} invisible on {servers} servers")]),
        (Response::RPL_LUSEROP, vec![nick.clone(), opers.to_string(), "operator(s) online".to_string()]),
        (Response::RPL_LUSERUNKNOWN, vec![nick.clone(), unknown.to_string(), "unknown connection(s)".to_string()]),
        (Response::RPL_LUSERCHANNELS, vec![nick.clone(), channels.to_string(), "channels formed".to_string()]),
        (
            Response::RPL_LUSERME,
            vec![nick.clone(), format!("I have {local_clients} clients and {local_servers} servers")],
        ),
    ];
    for (code, params) in lines {
        ctx.reply(Message::numeric(code, params).with_prefix(prefix.clone()));
    }
    Ok(())
}

pub fn handle_version(ctx: &mut Context) -> Result<(), HandlerError> {
    let nick = ctx.nick().to_string();
    let server_name = ctx.server_name().to_string();
    let version = format!("spanircd-{}.", env!("CARGO_PKG_VERSION"));
    ctx.reply(
        Message::numeric(Response::RPL_VERSION, vec![nick, version, server_name.clone(), "multi-connect IRC daemon".to_string()])
            .with_prefix(server_prefix(&server_name)),
    );
    Ok(())
}

pub fn handle_admin(ctx: &mut Context) -> Result<(), HandlerError> {
    let nick = ctx.nick().to_string();
    let server_name = ctx.server_name().to_string();
    let prefix = server_prefix(&server_name);
    let location = ctx.config.server.admin_location.clone().unwrap_or_else(|| ctx.config.server.description.clone());
    let email = ctx.config.server.admin_email.clone().unwrap_or_else(|| "admin@localhost".to_string());

    let lines = [
        (Response::RPL_ADMINME, vec![nick.clone(), server_name.clone(), "Administrative info".to_string()]),
        (Response::RPL_ADMINLOC1, vec![nick.clone(), location]),
        (Response::RPL_ADMINLOC2, vec![nick.clone(), ctx.config.server.description.clone()]),
        (Response::RPL_ADMINEMAIL, vec![nick.clone(), email]),
    ];
    for (code, params) in lines {
        ctx.reply(Message::numeric(code, params).with_prefix(prefix.clone()));
    }
    Ok(())
}

pub fn handle_time(ctx: &mut Context) -> Result<(), HandlerError> {
    let nick = ctx.nick().to_string();
    let server_name = ctx.server_name().to_string();
    let now = chrono::Utc::now().to_rfc2822();
    ctx.reply(
        Message::numeric(Response::RPL_TIME, vec![nick, server_name.clone(), now]).with_prefix(server_prefix(&server_name)),
    );
    Ok(())
}

pub fn handle_info(ctx: &mut Context) -> Result<(), HandlerError> {
    let nick = ctx.nick().to_string();
    let server_name = ctx.server_name().to_string();
    let prefix = server_prefix(&server_name);
    let lines = [
        format!("spanircd {}", env!("CARGO_PKG_VERSION")),
        "A multi-connect IRC daemon.".to_string(),
        String::new(),
    ];
    for line in lines {
        ctx.reply(Message::numeric(Response::RPL_INFO, vec![nick.clone(), line]).with_prefix(prefix.clone()));
    }
    ctx.reply(Message::numeric(Response::RPL_ENDOFINFO, vec![nick, "End of /INFO list".to_string()]).with_prefix(prefix));
    Ok(())
}

/// No `motd.txt`-equivalent config exists (no file-serving ambient stack
/// is carried), so MOTD always answers `ERR_NOMOTD` rather than silently
/// dropping the command.
pub fn handle_motd(_ctx: &mut Context) -> Result<(), HandlerError> {
    Err(HandlerError::NoMotd)
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
    use crate::sync::PeerRegistry;
    use std::time::Instant;

    fn base_config() -> Config {
        toml::from_str(
            r#"
            [server]
            name = "irc.example"
            sid = "1AB"
            description = "test network"
            [[listen]]
            address = "0.0.0.0:6667"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn lusers_counts_one_registered_user() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(Client::new_local_user("alice", "a", "h", ClassId(0), now));
        if let Some(c) = dir.client_mut(id) {
            c.ident = "a".to_string();
        }
        let mut out = Outbound::default();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        out.register(id, tx);
        let config = base_config();
        let mut stats = CommandStats::default();
        let mut peers = PeerRegistry::default();
        let (connect_tx, _connect_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut ctx =
            Context { dir: &mut dir, out: &mut out, config: &config, stats: &mut stats, peers: &mut peers, connect_tx: &connect_tx, id };

        assert!(handle_lusers(&mut ctx).is_ok());
        drop(ctx);
        let mut seen = 0;
        while rx.try_recv().is_ok() {
            seen += 1;
        }
        assert_eq!(seen, 5);
    }

    #[test]
    fn motd_without_a_file_is_an_error_numeric() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(Client::new_local_user("alice", "a", "h", ClassId(0), now));
        let mut out = Outbound::default();
        let config = base_config();
        let mut stats = CommandStats::default();
        let mut peers = PeerRegistry::default();
        let (connect_tx, _connect_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut ctx =
            Context { dir: &mut dir, out: &mut out, config: &config, stats: &mut stats, peers: &mut peers, connect_tx: &connect_tx, id };
        assert_eq!(handle_motd(&mut ctx), Err(HandlerError::NoMotd));
    }
}
