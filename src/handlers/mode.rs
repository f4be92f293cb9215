use std::sync::Arc;
use std::time::Instant;

use ircd_proto::mode::Sign;
use ircd_proto::{Command, Message, ModeFlags};

use crate::error::{ChannelError, HandlerError};
use crate::modes::{channel::apply_channel_token, format_mode_batch, tokenize, CHANNEL_MODES, MAX_MODES_PER_COMMAND, MEMBER_MODES};

use super::Context;

pub fn handle_channel(ctx: &mut Context, channel: &str, modes: &str, params: Vec<String>) -> Result<(), HandlerError> {
    let chan_id = ctx.dir.find_channel(channel).ok_or_else(|| ChannelError::NoSuchChannel(channel.to_string()))?;

    if modes.is_empty() {
        send_channel_modeis(ctx, chan_id, channel);
        return Ok(());
    }

    let is_op = ctx
        .dir
        .channel(chan_id)
        .and_then(|c| c.member(ctx.id))
        .is_some_and(|m| m.modes.contains(ModeFlags::A_OP) || m.modes.contains(ModeFlags::A_HALFOP));
    if !is_op {
        let err = ChannelError::ChanOpPrivsNeeded;
        ctx.reply(err.to_irc_reply(ctx.server_name(), ctx.nick(), channel));
        return Ok(());
    }

    let member_tokens = tokenize(modes, params.clone(), MEMBER_MODES);
    let channel_tokens = tokenize(modes, params, CHANNEL_MODES);
    let mut tokens = if member_tokens.len() >= channel_tokens.len() { member_tokens } else { channel_tokens };
    tokens.truncate(MAX_MODES_PER_COMMAND);

    // Resolve every nick-bearing param up front so the per-token loop only
    // needs `&mut Channel`, not a concurrent borrow of the whole Directory.
    let mut resolved = std::collections::HashMap::new();
    for token in &tokens {
        if crate::modes::find_letter(MEMBER_MODES, token.letter).is_some() {
            if let Some(n) = &token.param {
                resolved.insert(n.clone(), ctx.dir.find_client(n, false));
            }
        }
    }

    let now = Instant::now();
    let nick = ctx.nick().to_string();
    let mut applied = Vec::new();
    let mut errors = Vec::new();
    for token in &tokens {
        let Some(chan) = ctx.dir.channel_mut(chan_id) else { break };
        let resolver = |n: &str| resolved.get(n).copied().flatten();
        match apply_channel_token(chan, token, &nick, resolver, now) {
            Ok((changes, _removed)) => applied.extend(changes),
            Err(e) => errors.push(e),
        }
    }
    for e in errors {
        ctx.reply(e.to_irc_reply(ctx.server_name(), &nick, channel));
    }

    if applied.is_empty() {
        return Ok(());
    }
    let (letters, out_params) = format_mode_batch(&applied);
    let mask = ctx.dir.client(ctx.id).map(|c| c.mask()).unwrap_or(nick);
    let command = Command::ChannelMode { channel: channel.to_string(), modes: letters, params: out_params };
    let msg = Arc::new(Message::new(Some(ircd_proto::Prefix::parse(&mask)), command));
    crate::broadcast::sendto_channel(ctx.dir, ctx.out, chan_id, msg, None);
    Ok(())
}

pub fn handle_user(ctx: &mut Context, target_nick: &str, modes: &str) -> Result<(), HandlerError> {
    if !target_nick.eq_ignore_ascii_case(ctx.nick()) {
        return Err(HandlerError::AccessDenied);
    }
    let mut tokens = tokenize(modes, vec![], crate::modes::USER_MODES);
    tokens.truncate(MAX_MODES_PER_COMMAND);
    let mut applied = Vec::new();
    for token in &tokens {
        if let Some(c) = ctx.dir.client_mut(ctx.id) {
            if let Ok(Some(change)) = crate::modes::user::apply_user_token(c, token) {
                applied.push(change);
            }
        }
    }
    if applied.is_empty() {
        return Ok(());
    }
    let (letters, _) = format_mode_batch(&applied);
    let nick = ctx.nick().to_string();
    let command = Command::UserMode { nick: nick.clone(), modes: letters, params: vec![] };
    ctx.reply(Message::new(Some(ircd_proto::Prefix::parse(&nick)), command));
    Ok(())
}

fn send_channel_modeis(ctx: &mut Context, chan_id: crate::directory::channel::ChannelId, channel: &str) {
    let Some(chan) = ctx.dir.channel(chan_id) else { return };
    let mut letters = String::from("+");
    let mut params = vec![];
    for m in CHANNEL_MODES {
        if !m.is_list && chan.modes.contains(m.flag) {
            letters.push(m.letter);
        }
    }
    if let Some(limit) = chan.limit {
        params.push(limit.to_string());
    }
    let nick = ctx.nick().to_string();
    let server_name = ctx.server_name().to_string();
    let mut full = vec![nick, channel.to_string(), letters];
    full.extend(params);
    ctx.reply(Message::numeric(ircd_proto::Response::RPL_CHANNELMODEIS, full).with_prefix(super::server_prefix(&server_name)));
}
