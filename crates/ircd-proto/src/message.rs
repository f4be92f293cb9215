//! The `Message` envelope: optional tags, optional prefix, and a `Command`.

use std::borrow::Cow;
use std::fmt;

use crate::command::Command;
use crate::error::Result;
use crate::prefix::Prefix;
use crate::raw;
use crate::response::Response;

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Tag(pub Cow<'static, str>, pub Option<String>);

impl Tag {
    pub fn new(key: impl Into<Cow<'static, str>>, value: Option<String>) -> Self {
        Tag(key.into(), value)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.1 {
            Some(v) => write!(f, "{}={v}", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub tags: Option<Vec<Tag>>,
    pub prefix: Option<Prefix>,
    pub command: Command,
}

impl Message {
    pub fn new(prefix: Option<Prefix>, command: Command) -> Self {
        Message { tags: None, prefix, command }
    }

    pub fn with_tags(mut self, tags: Vec<Tag>) -> Self {
        self.tags = if tags.is_empty() { None } else { Some(tags) };
        self
    }

    pub fn with_tag(mut self, key: impl Into<Cow<'static, str>>, value: Option<String>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(Tag::new(key, value));
        self
    }

    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|t| t.0 == key)
            .and_then(|t| t.1.as_deref())
    }

    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nickname)
    }

    pub fn parse(line: &str) -> Result<Message> {
        let line = line.trim_end_matches(['\r', '\n']);
        let raw = raw::parse_line(line)?;
        let command = Command::from_raw(&raw)?;
        let prefix = raw.prefix.map(Prefix::parse);
        let tags = raw.tags.map(parse_tags_str);
        Ok(Message { tags, prefix, command })
    }

    // --- ergonomic constructors, mirroring the common shapes handlers build ---

    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Message {
        Message::new(None, Command::PRIVMSG { target: target.into(), text: text.into() })
    }

    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Message {
        Message::new(None, Command::NOTICE { target: target.into(), text: text.into() })
    }

    pub fn join(channels: impl Into<String>) -> Message {
        Message::new(None, Command::JOIN { channels: channels.into(), keys: None })
    }

    pub fn part(channels: impl Into<String>, message: Option<String>) -> Message {
        Message::new(None, Command::PART { channels: channels.into(), message })
    }

    pub fn nick(n: impl Into<String>) -> Message {
        Message::new(None, Command::NICK(n.into()))
    }

    pub fn ping(token: impl Into<String>) -> Message {
        Message::new(None, Command::PING(token.into()))
    }

    pub fn pong(token: impl Into<String>) -> Message {
        Message::new(None, Command::PONG(token.into()))
    }

    pub fn quit(message: Option<String>) -> Message {
        Message::new(None, Command::QUIT(message))
    }

    pub fn kick(channel: impl Into<String>, user: impl Into<String>, comment: Option<String>) -> Message {
        Message::new(None, Command::KICK { channel: channel.into(), user: user.into(), comment })
    }

    pub fn numeric(code: Response, params: Vec<String>) -> Message {
        Message::new(None, Command::Numeric(code, params))
    }
}

fn parse_tags_str(s: &str) -> Vec<Tag> {
    s.split(';')
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((k, v)) => Tag::new(k.to_string(), Some(v.to_string())),
            None => Tag::new(t.to_string(), None),
        })
        .collect()
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tags) = &self.tags {
            if !tags.is_empty() {
                write!(f, "@")?;
                for (i, t) in tags.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, "{t}")?;
                }
                write!(f, " ")?;
            }
        }
        if let Some(p) = &self.prefix {
            write!(f, ":{p} ")?;
        }
        write_command(f, &self.command)
    }
}

fn write_last(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if s.is_empty() || s.contains(' ') || s.starts_with(':') {
        write!(f, " :{s}")
    } else {
        write!(f, " {s}")
    }
}

fn write_command(f: &mut fmt::Formatter<'_>, c: &Command) -> fmt::Result {
    use Command::*;
    match c {
        PASS(p) => write!(f, "PASS {p}"),
        NICK(n) => write!(f, "NICK {n}"),
        USER { user, mode, realname } => write!(f, "USER {user} {mode} * :{realname}"),
        OPER(n, p) => write!(f, "OPER {n} {p}"),
        QUIT(msg) => {
            write!(f, "QUIT")?;
            if let Some(m) = msg {
                write_last(f, m)?;
            }
            Ok(())
        }
        PING(tok) => write!(f, "PING :{tok}"),
        PONG(tok) => write!(f, "PONG :{tok}"),
        UserMode { nick, modes, params } => {
            write!(f, "MODE {nick} {modes}")?;
            for p in params {
                write!(f, " {p}")?;
            }
            Ok(())
        }
        JOIN { channels, keys } => {
            write!(f, "JOIN {channels}")?;
            if let Some(k) = keys {
                write!(f, " {k}")?;
            }
            Ok(())
        }
        PART { channels, message } => {
            write!(f, "PART {channels}")?;
            if let Some(m) = message {
                write_last(f, m)?;
            }
            Ok(())
        }
        ChannelMode { channel, modes, params } => {
            write!(f, "MODE {channel} {modes}")?;
            for p in params {
                write!(f, " {p}")?;
            }
            Ok(())
        }
        TOPIC { channel, topic } => {
            write!(f, "TOPIC {channel}")?;
            if let Some(t) = topic {
                write_last(f, t)?;
            }
            Ok(())
        }
        NAMES(c) => {
            write!(f, "NAMES")?;
            if let Some(c) = c {
                write!(f, " {c}")?;
            }
            Ok(())
        }
        INVITE { nick, channel } => write!(f, "INVITE {nick} {channel}"),
        KICK { channel, user, comment } => {
            write!(f, "KICK {channel} {user}")?;
            if let Some(c) = comment {
                write_last(f, c)?;
            }
            Ok(())
        }
        PRIVMSG { target, text } => {
            write!(f, "PRIVMSG {target}")?;
            write_last(f, text)
        }
        NOTICE { target, text } => {
            write!(f, "NOTICE {target}")?;
            write_last(f, text)
        }
        WHO(m) => {
            write!(f, "WHO")?;
            if let Some(m) = m {
                write!(f, " {m}")?;
            }
            Ok(())
        }
        WHOIS { target, mask } => {
            write!(f, "WHOIS")?;
            if let Some(t) = target {
                write!(f, " {t}")?;
            }
            write!(f, " {mask}")
        }
        WHOWAS { nick, count } => {
            write!(f, "WHOWAS {nick}")?;
            if let Some(c) = count {
                write!(f, " {c}")?;
            }
            Ok(())
        }
        ISON(nicks) => write!(f, "ISON {}", nicks.join(" ")),
        AWAY(msg) => {
            write!(f, "AWAY")?;
            if let Some(m) = msg {
                write_last(f, m)?;
            }
            Ok(())
        }
        MOTD(t) => {
            write!(f, "MOTD")?;
            if let Some(t) = t {
                write!(f, " {t}")?;
            }
            Ok(())
        }
        LUSERS => write!(f, "LUSERS"),
        VERSION(t) => {
            write!(f, "VERSION")?;
            if let Some(t) = t {
                write!(f, " {t}")?;
            }
            Ok(())
        }
        STATS { query, target } => {
            write!(f, "STATS")?;
            if let Some(q) = query {
                write!(f, " {q}")?;
            }
            if let Some(t) = target {
                write!(f, " {t}")?;
            }
            Ok(())
        }
        LINKS { remote, mask } => {
            write!(f, "LINKS")?;
            if let Some(r) = remote {
                write!(f, " {r}")?;
            }
            if let Some(m) = mask {
                write!(f, " {m}")?;
            }
            Ok(())
        }
        TIME(t) => {
            write!(f, "TIME")?;
            if let Some(t) = t {
                write!(f, " {t}")?;
            }
            Ok(())
        }
        ADMIN(t) => {
            write!(f, "ADMIN")?;
            if let Some(t) = t {
                write!(f, " {t}")?;
            }
            Ok(())
        }
        INFO(t) => {
            write!(f, "INFO")?;
            if let Some(t) = t {
                write!(f, " {t}")?;
            }
            Ok(())
        }
        KILL { nick, comment } => {
            write!(f, "KILL {nick}")?;
            write_last(f, comment)
        }
        SQUIT { server, comment } => {
            write!(f, "SQUIT {server}")?;
            write_last(f, comment)
        }
        REHASH => write!(f, "REHASH"),
        WALLOPS(text) => {
            write!(f, "WALLOPS")?;
            write_last(f, text)
        }
        CONNECT { target, port, remote } => {
            write!(f, "CONNECT {target} {port}")?;
            if let Some(r) = remote {
                write!(f, " {r}")?;
            }
            Ok(())
        }
        SERVER { name, hopcount, info } => {
            write!(f, "SERVER {name} {hopcount}")?;
            write_last(f, info)
        }
        NJOIN { channel, nicks } => write!(f, "NJOIN {channel} :{nicks}"),
        IMODE { id, target, modes, params } => {
            write!(f, "IMODE {id} {target} {modes}")?;
            for p in params {
                write!(f, " {p}")?;
            }
            Ok(())
        }
        ITOPIC { id, channel, topic } => write!(f, "ITOPIC {id} {channel} :{topic}"),
        INUM { id, numeric, params } => {
            write!(f, "INUM {id} {numeric:03}")?;
            for p in params {
                write!(f, " {p}")?;
            }
            Ok(())
        }
        ISERVER { name, hopcount, token, info } => {
            write!(f, "ISERVER {name} {hopcount} {token}")?;
            write_last(f, info)
        }
        IPRIVMSG { id, target, text } => {
            write!(f, "IPRIVMSG {id} {target}")?;
            write_last(f, text)
        }
        INOTICE { id, target, text } => {
            write!(f, "INOTICE {id} {target}")?;
            write_last(f, text)
        }
        ISQUERY { id, target, text } => {
            write!(f, "ISQUERY {id} {target}")?;
            write_last(f, text)
        }
        IWALLOPS { id, text } => {
            write!(f, "IWALLOPS {id}")?;
            write_last(f, text)
        }
        ACK { cmd, target, channel } => {
            write!(f, "ACK {cmd} {target}")?;
            if let Some(c) = channel {
                write!(f, " {c}")?;
            }
            Ok(())
        }
        Numeric(code, params) => {
            write!(f, "{:03}", code.code())?;
            for (i, p) in params.iter().enumerate() {
                if i + 1 == params.len() {
                    write_last(f, p)?;
                } else {
                    write!(f, " {p}")?;
                }
            }
            Ok(())
        }
        Raw(name, params) => {
            write!(f, "{name}")?;
            for (i, p) in params.iter().enumerate() {
                if i + 1 == params.len() {
                    write_last(f, p)?;
                } else {
                    write!(f, " {p}")?;
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_line_round_trip() {
        let m = Message::parse(":alice!a@h PRIVMSG #chan :hi there\r\n").unwrap();
        assert_eq!(m.source_nickname(), Some("alice"));
        assert_eq!(m.command, Command::PRIVMSG { target: "#chan".into(), text: "hi there".into() });
        assert_eq!(m.to_string(), ":alice!a@h PRIVMSG #chan :hi there");
    }

    #[test]
    fn privmsg_constructor_serializes() {
        let m = Message::privmsg("#x", "hi");
        assert_eq!(m.to_string(), "PRIVMSG #x :hi");
    }

    #[test]
    fn tag_round_trips() {
        let m = Message::ping("tok").with_tag("label", Some("42".into()));
        let text = m.to_string();
        assert!(text.starts_with("@label=42 "));
        let parsed = Message::parse(&text).unwrap();
        assert_eq!(parsed.tag_value("label"), Some("42"));
    }

    #[test]
    fn mode_batch_with_parameters_round_trips() {
        let m = Message::parse("MODE #y +kl secret 50\r\n").unwrap();
        assert_eq!(
            m.command,
            Command::ChannelMode { channel: "#y".into(), modes: "+kl".into(), params: vec!["secret".into(), "50".into()] }
        );
    }
}
