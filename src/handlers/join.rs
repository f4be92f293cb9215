use std::sync::Arc;
use std::time::Instant;

use ircd_proto::{Message, ModeFlags, Response};

use crate::directory::channel::Channel;
use crate::error::{ChannelError, HandlerError};

use super::{server_prefix, topic::send_topic_reply, Context};

pub fn handle(ctx: &mut Context, channels: &str, keys: Option<&str>) -> Result<(), HandlerError> {
    let chan_names: Vec<&str> = channels.split(',').collect();
    let keys: Vec<Option<&str>> = match keys {
        Some(k) => k.split(',').map(Some).collect(),
        None => vec![],
    };

    for (i, &name) in chan_names.iter().enumerate() {
        let key = keys.get(i).copied().flatten();
        if let Err(e) = join_one(ctx, name, key) {
            ctx.reply(e.to_irc_reply(ctx.server_name(), ctx.nick(), name));
        }
    }
    Ok(())
}

fn join_one(ctx: &mut Context, name: &str, key: Option<&str>) -> Result<(), ChannelError> {
    let now = Instant::now();
    let existing = ctx.dir.find_channel(name);
    let member_count = ctx.dir.client(ctx.id).map(|c| c.channels.len()).unwrap_or(0);
    if existing.is_none_or(|id| !ctx.dir.channel(id).is_some_and(|c| c.has_member(ctx.id)))
        && member_count >= ctx.config.limits.max_channels_per_user
    {
        return Err(ChannelError::TooManyChannels(name.to_string()));
    }
    let chan_id = match existing {
        Some(id) => id,
        None => ctx.dir.insert_channel(Channel::new(name, default_channel_modes())),
    };

    {
        let chan = ctx.dir.channel(chan_id).ok_or_else(|| ChannelError::NoSuchChannel(name.to_string()))?;
        if chan.has_member(ctx.id) {
            return Ok(());
        }
        if chan.modes.contains(ModeFlags::A_INVITEONLY) && !chan.invited.contains(&ctx.id) {
            return Err(ChannelError::InviteOnlyChan);
        }
        if let Some(required) = &chan.key {
            if key != Some(required.as_str()) {
                return Err(ChannelError::BadChannelKey);
            }
        }
        if let Some(limit) = chan.limit {
            if chan.members.len() as u32 >= limit {
                return Err(ChannelError::ChannelIsFull);
            }
        }
        let mask = ctx.dir.client(ctx.id).map(|c| c.mask()).unwrap_or_default();
        if chan.bans.iter().any(|b| crate::directory::channel::glob_match(&b.mask, &mask))
            && !chan.excepts.iter().any(|e| crate::directory::channel::glob_match(&e.mask, &mask))
        {
            return Err(ChannelError::BannedFromChan);
        }
    }

    let grants_op = ctx.dir.channel(chan_id).map(|c| c.is_empty()).unwrap_or(true);
    let member_modes = if grants_op { ModeFlags::A_OP } else { ModeFlags::NONE };

    if let Some(chan) = ctx.dir.channel_mut(chan_id) {
        chan.add_member(ctx.id, member_modes, now);
        chan.invited.retain(|&c| c != ctx.id);
        // A join always un-holds: the channel just stopped being empty,
        // so it's no longer a GC candidate even if it raced the sweep.
        chan.hold_upto = None;
    }
    if let Some(client) = ctx.dir.client_mut(ctx.id) {
        client.channels.push(chan_id);
    }

    let mask = ctx.dir.client(ctx.id).map(|c| c.mask()).unwrap_or_default();
    let join_msg = Arc::new(Message::join(name).with_prefix(ircd_proto::Prefix::parse(&mask)));
    crate::broadcast::sendto_channel(ctx.dir, ctx.out, chan_id, join_msg, None);

    send_topic_reply(ctx, chan_id, name);
    send_names_reply(ctx, chan_id, name);
    Ok(())
}

fn send_names_reply(ctx: &mut Context, chan_id: crate::directory::channel::ChannelId, name: &str) {
    let server_name = ctx.server_name().to_string();
    let prefix = server_prefix(&server_name);
    let nick = ctx.nick().to_string();
    let Some(chan) = ctx.dir.channel(chan_id) else { return };

    let mut entries = Vec::with_capacity(chan.members.len());
    for member in &chan.members {
        let Some(c) = ctx.dir.client(member.client) else { continue };
        let prefix_char = ircd_proto::mode::prefix_char(member.modes).unwrap_or(' ');
        entries.push(if prefix_char == ' ' { c.nick.clone() } else { format!("{prefix_char}{}", c.nick) });
    }

    // RFC 2812's 512-byte line cap keeps one NAMES reply from growing
    // unbounded; chunk at a conservative count instead of re-measuring
    // the formatted length per line.
    for chunk in entries.chunks(50) {
        ctx.reply(
            Message::numeric(Response::RPL_NAMREPLY, vec![nick.clone(), "=".to_string(), name.to_string(), chunk.join(" ")])
                .with_prefix(prefix.clone()),
        );
    }
    ctx.reply(Message::numeric(Response::RPL_ENDOFNAMES, vec![nick, name.to_string(), "End of /NAMES list".into()]).with_prefix(prefix));
}

fn default_channel_modes() -> ModeFlags {
    ModeFlags::NONE
}
