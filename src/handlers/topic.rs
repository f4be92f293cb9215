use std::sync::Arc;
use std::time::Instant;

use ircd_proto::{Message, ModeFlags, Response};

use crate::directory::channel::Topic;
use crate::error::{ChannelError, HandlerError};

use super::{server_prefix, Context};

pub fn handle(ctx: &mut Context, channel: &str, new_topic: Option<&str>) -> Result<(), HandlerError> {
    let result = apply(ctx, channel, new_topic);
    if let Err(e) = &result {
        ctx.reply(e.to_irc_reply(ctx.server_name(), ctx.nick(), channel));
    }
    Ok(())
}

fn apply(ctx: &mut Context, channel: &str, new_topic: Option<&str>) -> Result<(), ChannelError> {
    let chan_id = ctx.dir.find_channel(channel).ok_or_else(|| ChannelError::NoSuchChannel(channel.to_string()))?;
    let Some(chan) = ctx.dir.channel(chan_id) else {
        return Err(ChannelError::NoSuchChannel(channel.to_string()));
    };
    if !chan.has_member(ctx.id) {
        return Err(ChannelError::NotOnChannel);
    }

    let Some(text) = new_topic else {
        send_topic_reply(ctx, chan_id, channel);
        return Ok(());
    };

    if chan.modes.contains(ModeFlags::A_TOPICLOCK) {
        let is_op = chan.member(ctx.id).is_some_and(|m| m.modes.contains(ModeFlags::A_OP) || m.modes.contains(ModeFlags::A_HALFOP));
        if !is_op {
            return Err(ChannelError::ChanOpPrivsNeeded);
        }
    }

    let nick = ctx.nick().to_string();
    let now = Instant::now();
    if let Some(chan) = ctx.dir.channel_mut(chan_id) {
        chan.topic =
            Some(Topic { text: text.to_string(), set_by: nick.clone(), set_at: now, set_at_unix: chrono::Utc::now().timestamp() });
    }
    let mask = ctx.dir.client(ctx.id).map(|c| c.mask()).unwrap_or(nick);
    let command = ircd_proto::Command::TOPIC { channel: channel.to_string(), topic: Some(text.to_string()) };
    let msg = Arc::new(Message::new(Some(ircd_proto::Prefix::parse(&mask)), command));
    crate::broadcast::sendto_channel(ctx.dir, ctx.out, chan_id, msg, None);
    Ok(())
}

pub(crate) fn send_topic_reply(ctx: &mut Context, chan_id: crate::directory::channel::ChannelId, channel: &str) {
    let server_name = ctx.server_name().to_string();
    let prefix = server_prefix(&server_name);
    let nick = ctx.nick().to_string();
    match ctx.dir.channel(chan_id).and_then(|c| c.topic.clone()) {
        Some(topic) => {
            ctx.reply(
                Message::numeric(Response::RPL_TOPIC, vec![nick.clone(), channel.to_string(), topic.text]).with_prefix(prefix.clone()),
            );
            ctx.reply(
                Message::numeric(
                    Response::RPL_TOPICWHOTIME,
                    vec![nick, channel.to_string(), topic.set_by, topic.set_at_unix.to_string()],
                )
                .with_prefix(prefix),
            );
        }
        None => {
            ctx.reply(Message::numeric(Response::RPL_NOTOPIC, vec![nick, channel.to_string(), "No topic is set".into()]).with_prefix(prefix));
        }
    }
}
