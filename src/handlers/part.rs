use std::sync::Arc;
use std::time::Instant;

use ircd_proto::Message;

use crate::error::{ChannelError, HandlerError};

use super::Context;

pub fn handle(ctx: &mut Context, channels: &str, message: Option<&str>) -> Result<(), HandlerError> {
    for name in channels.split(',') {
        if let Err(e) = part_one(ctx, name, message) {
            ctx.reply(e.to_irc_reply(ctx.server_name(), ctx.nick(), name));
        }
    }
    Ok(())
}

fn part_one(ctx: &mut Context, name: &str, message: Option<&str>) -> Result<(), ChannelError> {
    let chan_id = ctx.dir.find_channel(name).ok_or_else(|| ChannelError::NoSuchChannel(name.to_string()))?;
    if !ctx.dir.channel(chan_id).is_some_and(|c| c.has_member(ctx.id)) {
        return Err(ChannelError::NotOnChannel);
    }

    let mask = ctx.dir.client(ctx.id).map(|c| c.mask()).unwrap_or_default();
    let part_msg = Arc::new(Message::part(name, message.map(str::to_string)).with_prefix(ircd_proto::Prefix::parse(&mask)));
    crate::broadcast::sendto_channel(ctx.dir, ctx.out, chan_id, part_msg, None);

    let now = Instant::now();
    if let Some(chan) = ctx.dir.channel_mut(chan_id) {
        chan.remove_member(ctx.id, now);
    }
    if let Some(client) = ctx.dir.client_mut(ctx.id) {
        client.channels.retain(|&c| c != chan_id);
    }
    if let Some(chan) = ctx.dir.channel_mut(chan_id) {
        if chan.is_empty() {
            chan.hold_upto = Some(now + std::time::Duration::from_secs(ctx.config.limits.hold_period));
        }
    }
    Ok(())
}
