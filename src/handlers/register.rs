//! USER completes the registration handshake started by NICK; once both
//! have arrived, the welcome burst goes out (RFC 2812 §5.1).

use ircd_proto::{Message, Response};

use crate::error::HandlerError;

use super::{server_prefix, Context};

pub fn handle_user(ctx: &mut Context, user: &str, _mode: &str, realname: &str) -> Result<(), HandlerError> {
    let already_has_ident = ctx.dir.client(ctx.id).map(|c| !c.ident.is_empty()).unwrap_or(false);
    if already_has_ident {
        return Err(HandlerError::AlreadyRegistered);
    }

    let placeholder_nick = ctx.dir.client(ctx.id).map(|c| c.nick_lower.starts_with('*')).unwrap_or(true);

    if let Some(c) = ctx.dir.client_mut(ctx.id) {
        c.ident = user.to_string();
        c.realname = realname.to_string();
    }

    if !placeholder_nick {
        send_welcome_burst(ctx)?;
    }
    Ok(())
}

/// Sends the registration burst, but only after checking the connecting
/// mask against `security.kill_lines` — a hit replies with
/// `ERR_YOUREBANNEDCREEP` and quits the client instead of welcoming it.
pub fn send_welcome_burst(ctx: &mut Context) -> Result<(), HandlerError> {
    let mask = ctx.dir.client(ctx.id).map(|c| c.mask()).unwrap_or_default();
    if let Some(line) = crate::security::matching_kill_line(&ctx.config.security, &mask) {
        let reason = format!("K-Lined: {line}");
        ctx.reply(HandlerError::YoureBannedCreep(reason.clone()).to_irc_reply(ctx.server_name(), ctx.nick(), "").unwrap());
        return Err(HandlerError::Quit(Some(reason)));
    }

    let server_name = ctx.server_name().to_string();
    let network = ctx.config.server.network_name.clone().unwrap_or_else(|| server_name.clone());
    let nick = ctx.nick().to_string();
    let prefix = server_prefix(&server_name);

    let lines = [
        (Response::RPL_WELCOME, vec![nick.clone(), format!("Welcome to the {network} Network, {nick}")]),
        (Response::RPL_YOURHOST, vec![nick.clone(), format!("Your host is {server_name}, running spanircd")]),
        (Response::RPL_CREATED, vec![nick.clone(), "This server was started recently".to_string()]),
        (Response::RPL_MYINFO, vec![nick.clone(), server_name.clone()]),
    ];
    for (code, params) in lines {
        ctx.reply(Message::numeric(code, params).with_prefix(prefix.clone()));
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
    use crate::sync::PeerRegistry;
    use std::time::Instant;

    fn base_config() -> Config {
        toml::from_str(
            r#"
            [server]
            name = "irc.example"
            sid = "1AB"
            description = "test"
            [[listen]]
            address = "0.0.0.0:6667"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn user_before_nick_defers_welcome_burst() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(Client::new_local_user("*unregistered", "", "h", ClassId(0), now));
        let mut out = Outbound::default();
        let config = base_config();
        let mut stats = CommandStats::default();
        let mut peers = PeerRegistry::default();
        let (connect_tx, _connect_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut ctx = Context {
            dir: &mut dir,
            out: &mut out,
            config: &config,
            stats: &mut stats,
            peers: &mut peers,
            connect_tx: &connect_tx,
            id,
        };
        assert!(handle_user(&mut ctx, "alice", "0", "Alice Smith").is_ok());
        assert_eq!(ctx.dir.client(id).unwrap().ident, "alice");
    }
}
