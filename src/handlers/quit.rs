//! Shared QUIT/disconnect path, called by the dispatch task both for an
//! explicit QUIT command and for a socket simply going away.

use std::sync::Arc;
use std::time::Instant;

use ircd_proto::Message;

use crate::broadcast::{sendto_common_channels, Outbound};
use crate::config::Config;
use crate::directory::client::ClientId;
use crate::directory::Directory;

pub fn process(dir: &mut Directory, out: &mut Outbound, config: &Config, id: ClientId, reason: Option<String>) {
    let Some(client) = dir.client(id) else { return };
    let mask = client.mask();
    let channels = client.channels.clone();
    let reason_text = reason.unwrap_or_else(|| "Client Quit".to_string());

    let quit_msg = Arc::new(Message::quit(Some(reason_text)).with_prefix(ircd_proto::Prefix::parse(&mask)));
    sendto_common_channels(dir, out, id, quit_msg, None);

    let now = Instant::now();
    for chan_id in channels {
        if let Some(chan) = dir.channel_mut(chan_id) {
            chan.remove_member(id, now);
            if chan.is_empty() {
                chan.hold_upto = Some(now + std::time::Duration::from_secs(config.limits.hold_period));
            }
        }
    }

    out.unregister(id);
    let server_name = config.server.name.clone();
    dir.quit_to_phantom(id, Instant::now(), config.limits.hold_period, &server_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::channel::Channel;
    use crate::directory::class::ClassId;
    use crate::directory::client::Client;
    use ircd_proto::ModeFlags;

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
    fn quit_removes_from_channels_and_becomes_phantom() {
        let mut dir = Directory::new();
        let now = Instant::now();
        let id = dir.insert_live(Client::new_local_user("alice", "a", "h", ClassId(0), now));
        let mut chan = Channel::new("#x", ModeFlags::NONE);
        chan.add_member(id, ModeFlags::NONE, now);
        let chan_id = dir.insert_channel(chan);
        dir.client_mut(id).unwrap().channels.push(chan_id);

        let mut out = Outbound::default();
        let config = base_config();
        process(&mut dir, &mut out, &config, id, Some("bye".into()));

        assert!(dir.client(id).unwrap().is_phantom());
        let chan_id = dir.find_channel("#x").expect("channel held, not removed yet");
        assert!(dir.channel(chan_id).unwrap().is_empty());
        assert!(dir.channel(chan_id).unwrap().hold_upto.is_some());
    }
}
