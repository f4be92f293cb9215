use std::sync::Arc;

use ircd_proto::{Message, ModeFlags};

use crate::error::HandlerError;

use super::Context;

pub fn handle_privmsg(ctx: &mut Context, target: &str, text: &str) -> Result<(), HandlerError> {
    deliver(ctx, target, text, false)
}

pub fn handle_notice(ctx: &mut Context, target: &str, text: &str) -> Result<(), HandlerError> {
    deliver(ctx, target, text, true)
}

fn deliver(ctx: &mut Context, target: &str, text: &str, notice: bool) -> Result<(), HandlerError> {
    if text.is_empty() {
        return Err(HandlerError::NoTextToSend);
    }
    let mask = ctx.dir.client(ctx.id).map(|c| c.mask()).unwrap_or_default();
    let build = |prefix_mask: &str, target: &str| {
        let cmd = if notice { Message::notice(target, text) } else { Message::privmsg(target, text) };
        Arc::new(cmd.with_prefix(ircd_proto::Prefix::parse(prefix_mask)))
    };

    // $server.mask and nick@host.mask targets reach users outside any
    // channel the sender shares with them, so only opers may use them.
    if let Some(stripped) = target.strip_prefix('$') {
        if !super::is_oper(ctx) {
            return Err(HandlerError::AccessDenied);
        }
        crate::broadcast::sendto_server_mask(ctx.dir, ctx.out, stripped, ctx.server_name(), build(&mask, target));
        return Ok(());
    }

    if target.contains('@') {
        if !super::is_oper(ctx) {
            return Err(HandlerError::AccessDenied);
        }
        crate::broadcast::sendto_host_mask(ctx.dir, ctx.out, target, build(&mask, target));
        return Ok(());
    }

    if let Some(chan_id) = ctx.dir.find_channel(target) {
        let anonymous = ctx.dir.channel(chan_id).is_some_and(|c| c.modes.contains(ModeFlags::A_ANONYMOUS));
        let send_mask = if anonymous { "anonymous!anonymous@anonymous.".to_string() } else { mask };
        crate::broadcast::sendto_channel(ctx.dir, ctx.out, chan_id, build(&send_mask, target), Some(ctx.id));
        return Ok(());
    }

    if crate::broadcast::sendto_nick(ctx.dir, ctx.out, target, build(&mask, target)) {
        return Ok(());
    }

    if notice {
        Ok(())
    } else {
        Err(HandlerError::NoSuchNick(target.to_string()))
    }
}
