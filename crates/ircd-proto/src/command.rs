//! Command enum: a type-safe view over the subset of RFC 2812 plus the
//! multi-connect S2S extensions spanircd speaks.

use crate::error::{ProtocolError, Result};
use crate::raw::RawLine;
use crate::response::Response;

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Command {
    // --- registration ---
    PASS(String),
    NICK(String),
    USER { user: String, mode: String, realname: String },
    OPER(String, String),
    QUIT(Option<String>),
    PING(String),
    PONG(String),

    // --- user mode ---
    UserMode { nick: String, modes: String, params: Vec<String> },

    // --- channel operations ---
    JOIN { channels: String, keys: Option<String> },
    PART { channels: String, message: Option<String> },
    ChannelMode { channel: String, modes: String, params: Vec<String> },
    TOPIC { channel: String, topic: Option<String> },
    NAMES(Option<String>),
    INVITE { nick: String, channel: String },
    KICK { channel: String, user: String, comment: Option<String> },

    // --- messaging ---
    PRIVMSG { target: String, text: String },
    NOTICE { target: String, text: String },

    // --- queries ---
    WHO(Option<String>),
    WHOIS { target: Option<String>, mask: String },
    WHOWAS { nick: String, count: Option<i32> },
    ISON(Vec<String>),
    AWAY(Option<String>),
    MOTD(Option<String>),
    LUSERS,
    VERSION(Option<String>),
    STATS { query: Option<String>, target: Option<String> },
    LINKS { remote: Option<String>, mask: Option<String> },
    TIME(Option<String>),
    ADMIN(Option<String>),
    INFO(Option<String>),

    // --- operator / netsplit ---
    KILL { nick: String, comment: String },
    SQUIT { server: String, comment: String },
    REHASH,
    WALLOPS(String),
    CONNECT { target: String, port: String, remote: Option<String> },

    // --- server-to-server handshake ---
    /// `SERVER name hopcount :info`, the plain-link introduction.
    SERVER { name: String, hopcount: u32, info: String },
    /// `NJOIN chan :[@@|@|%|+]nick[,...]` — burst channel membership.
    NJOIN { channel: String, nicks: String },

    // --- multi-connect ("I"-prefixed) wire forms, each carrying an id ---
    IMODE { id: u32, target: String, modes: String, params: Vec<String> },
    ITOPIC { id: u32, channel: String, topic: String },
    INUM { id: u32, numeric: u16, params: Vec<String> },
    ISERVER { name: String, hopcount: u32, token: u32, info: String },
    IPRIVMSG { id: u32, target: String, text: String },
    INOTICE { id: u32, target: String, text: String },
    ISQUERY { id: u32, target: String, text: String },
    IWALLOPS { id: u32, text: String },

    /// `ACK cmd target [channel]` — acknowledges an id-bearing command.
    ACK { cmd: String, target: String, channel: Option<String> },

    /// A numeric reply being *emitted*, with pre-built text parameters.
    Numeric(Response, Vec<String>),

    /// Anything not recognized above: preserved verbatim for forwarding.
    Raw(String, Vec<String>),
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::PASS(_) => "PASS",
            Command::NICK(_) => "NICK",
            Command::USER { .. } => "USER",
            Command::OPER(..) => "OPER",
            Command::QUIT(_) => "QUIT",
            Command::PING(_) => "PING",
            Command::PONG(_) => "PONG",
            Command::UserMode { .. } => "MODE",
            Command::JOIN { .. } => "JOIN",
            Command::PART { .. } => "PART",
            Command::ChannelMode { .. } => "MODE",
            Command::TOPIC { .. } => "TOPIC",
            Command::NAMES(_) => "NAMES",
            Command::INVITE { .. } => "INVITE",
            Command::KICK { .. } => "KICK",
            Command::PRIVMSG { .. } => "PRIVMSG",
            Command::NOTICE { .. } => "NOTICE",
            Command::WHO(_) => "WHO",
            Command::WHOIS { .. } => "WHOIS",
            Command::WHOWAS { .. } => "WHOWAS",
            Command::ISON(_) => "ISON",
            Command::AWAY(_) => "AWAY",
            Command::MOTD(_) => "MOTD",
            Command::LUSERS => "LUSERS",
            Command::VERSION(_) => "VERSION",
            Command::STATS { .. } => "STATS",
            Command::LINKS { .. } => "LINKS",
            Command::TIME(_) => "TIME",
            Command::ADMIN(_) => "ADMIN",
            Command::INFO(_) => "INFO",
            Command::KILL { .. } => "KILL",
            Command::SQUIT { .. } => "SQUIT",
            Command::REHASH => "REHASH",
            Command::WALLOPS(_) => "WALLOPS",
            Command::CONNECT { .. } => "CONNECT",
            Command::SERVER { .. } => "SERVER",
            Command::NJOIN { .. } => "NJOIN",
            Command::IMODE { .. } => "IMODE",
            Command::ITOPIC { .. } => "ITOPIC",
            Command::INUM { .. } => "INUM",
            Command::ISERVER { .. } => "ISERVER",
            Command::IPRIVMSG { .. } => "IPRIVMSG",
            Command::INOTICE { .. } => "INOTICE",
            Command::ISQUERY { .. } => "ISQUERY",
            Command::IWALLOPS { .. } => "IWALLOPS",
            Command::ACK { .. } => "ACK",
            Command::Numeric(r, _) => return_numeric_name(*r),
            Command::Raw(name, _) => name,
        }
    }

    /// True for the `I`-prefixed forms a multi-connect peer uses once both
    /// sides have negotiated the `I` option during handshake.
    pub fn is_multiconnect_form(&self) -> bool {
        matches!(
            self,
            Command::IMODE { .. }
                | Command::ITOPIC { .. }
                | Command::INUM { .. }
                | Command::ISERVER { .. }
                | Command::IPRIVMSG { .. }
                | Command::INOTICE { .. }
                | Command::ISQUERY { .. }
                | Command::IWALLOPS { .. }
        )
    }
}

fn return_numeric_name(_r: Response) -> &'static str {
    "NUMERIC"
}

fn parse_id(cmd: &str, raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| ProtocolError::MalformedModeString(format!("{cmd}: bad id field {raw:?}")))
}

impl Command {
    /// Build a `Command` from an already-tokenized wire line. Commands this
    /// server doesn't special-case fall through to `Raw`.
    pub fn from_raw(raw: &RawLine<'_>) -> Result<Command> {
        let p = &raw.params;
        let s = |i: usize| p.get(i).map(|v| v.to_string());
        let cmd = raw.command.to_ascii_uppercase();
        let need = |n: usize| -> Result<()> {
            if p.len() < n {
                Err(ProtocolError::NeedMoreParams { command: cmd.clone(), expected: n, got: p.len() })
            } else {
                Ok(())
            }
        };

        Ok(match cmd.as_str() {
            "PASS" => {
                need(1)?;
                Command::PASS(p[0].to_string())
            }
            "NICK" => {
                need(1)?;
                Command::NICK(p[0].to_string())
            }
            "USER" => {
                need(4)?;
                Command::USER { user: p[0].to_string(), mode: p[1].to_string(), realname: p[3].to_string() }
            }
            "OPER" => {
                need(2)?;
                Command::OPER(p[0].to_string(), p[1].to_string())
            }
            "QUIT" => Command::QUIT(s(0)),
            "PING" => {
                need(1)?;
                Command::PING(p[0].to_string())
            }
            "PONG" => {
                need(1)?;
                Command::PONG(p[0].to_string())
            }
            "JOIN" => {
                need(1)?;
                Command::JOIN { channels: p[0].to_string(), keys: s(1) }
            }
            "PART" => {
                need(1)?;
                Command::PART { channels: p[0].to_string(), message: s(1) }
            }
            "TOPIC" => {
                need(1)?;
                Command::TOPIC { channel: p[0].to_string(), topic: s(1) }
            }
            "NAMES" => Command::NAMES(s(0)),
            "INVITE" => {
                need(2)?;
                Command::INVITE { nick: p[0].to_string(), channel: p[1].to_string() }
            }
            "KICK" => {
                need(2)?;
                Command::KICK { channel: p[0].to_string(), user: p[1].to_string(), comment: s(2) }
            }
            "PRIVMSG" => {
                need(2)?;
                Command::PRIVMSG { target: p[0].to_string(), text: p[1].to_string() }
            }
            "NOTICE" => {
                need(2)?;
                Command::NOTICE { target: p[0].to_string(), text: p[1].to_string() }
            }
            "WHO" => Command::WHO(s(0)),
            "WHOIS" => {
                need(1)?;
                if p.len() >= 2 {
                    Command::WHOIS { target: s(0), mask: p[1].to_string() }
                } else {
                    Command::WHOIS { target: None, mask: p[0].to_string() }
                }
            }
            "WHOWAS" => {
                need(1)?;
                Command::WHOWAS { nick: p[0].to_string(), count: s(1).and_then(|v| v.parse().ok()) }
            }
            "ISON" => Command::ISON(p.iter().map(|s| s.to_string()).collect()),
            "AWAY" => Command::AWAY(s(0)),
            "MOTD" => Command::MOTD(s(0)),
            "LUSERS" => Command::LUSERS,
            "VERSION" => Command::VERSION(s(0)),
            "STATS" => Command::STATS { query: s(0), target: s(1) },
            "LINKS" => {
                if p.len() >= 2 {
                    Command::LINKS { remote: s(0), mask: s(1) }
                } else {
                    Command::LINKS { remote: None, mask: s(0) }
                }
            }
            "TIME" => Command::TIME(s(0)),
            "ADMIN" => Command::ADMIN(s(0)),
            "INFO" => Command::INFO(s(0)),
            "KILL" => {
                need(2)?;
                Command::KILL { nick: p[0].to_string(), comment: p[1].to_string() }
            }
            "SQUIT" => {
                need(2)?;
                Command::SQUIT { server: p[0].to_string(), comment: p[1].to_string() }
            }
            "REHASH" => Command::REHASH,
            "WALLOPS" => {
                need(1)?;
                Command::WALLOPS(p[0].to_string())
            }
            "CONNECT" => {
                need(2)?;
                Command::CONNECT { target: p[0].to_string(), port: p[1].to_string(), remote: s(2) }
            }
            "SERVER" => {
                need(3)?;
                Command::SERVER {
                    name: p[0].to_string(),
                    hopcount: p[1].parse().unwrap_or(1),
                    info: p[2].to_string(),
                }
            }
            "NJOIN" => {
                need(2)?;
                Command::NJOIN { channel: p[0].to_string(), nicks: p[1].to_string() }
            }
            "ACK" => {
                need(2)?;
                Command::ACK { cmd: p[0].to_string(), target: p[1].to_string(), channel: s(2) }
            }
            "MODE" => {
                need(2)?;
                let target = p[0];
                let modes = p[1].to_string();
                let params: Vec<String> = p[2..].iter().map(|s| s.to_string()).collect();
                if target.starts_with(['#', '&', '+', '!']) {
                    Command::ChannelMode { channel: target.to_string(), modes, params }
                } else {
                    Command::UserMode { nick: target.to_string(), modes, params }
                }
            }
            "IMODE" => {
                need(3)?;
                let id = parse_id(&cmd, p[0])?;
                Command::IMODE {
                    id,
                    target: p[1].to_string(),
                    modes: p[2].to_string(),
                    params: p[3..].iter().map(|s| s.to_string()).collect(),
                }
            }
            "ITOPIC" => {
                need(3)?;
                Command::ITOPIC {
                    id: parse_id(&cmd, p[0])?,
                    channel: p[1].to_string(),
                    topic: p[2].to_string(),
                }
            }
            "INUM" => {
                need(2)?;
                let numeric: u16 = p[1]
                    .parse()
                    .map_err(|_| ProtocolError::MalformedModeString(format!("bad INUM numeric {}", p[1])))?;
                Command::INUM {
                    id: parse_id(&cmd, p[0])?,
                    numeric,
                    params: p[2..].iter().map(|s| s.to_string()).collect(),
                }
            }
            "ISERVER" => {
                need(4)?;
                Command::ISERVER {
                    name: p[0].to_string(),
                    hopcount: p[1].parse().unwrap_or(1),
                    token: parse_id(&cmd, p[2])?,
                    info: p[3].to_string(),
                }
            }
            "IPRIVMSG" => {
                need(3)?;
                Command::IPRIVMSG { id: parse_id(&cmd, p[0])?, target: p[1].to_string(), text: p[2].to_string() }
            }
            "INOTICE" => {
                need(3)?;
                Command::INOTICE { id: parse_id(&cmd, p[0])?, target: p[1].to_string(), text: p[2].to_string() }
            }
            "ISQUERY" => {
                need(3)?;
                Command::ISQUERY { id: parse_id(&cmd, p[0])?, target: p[1].to_string(), text: p[2].to_string() }
            }
            "IWALLOPS" => {
                need(2)?;
                Command::IWALLOPS { id: parse_id(&cmd, p[0])?, text: p[1].to_string() }
            }
            _ => Command::Raw(cmd, p.iter().map(|s| s.to_string()).collect()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_reports_wire_command() {
        assert_eq!(Command::NICK("alice".into()).name(), "NICK");
        assert_eq!(
            Command::IMODE { id: 1, target: "#x".into(), modes: "+o".into(), params: vec!["bob".into()] }.name(),
            "IMODE"
        );
    }

    #[test]
    fn multiconnect_forms_are_tagged() {
        assert!(Command::ISERVER { name: "b".into(), hopcount: 1, token: 2, info: "i".into() }
            .is_multiconnect_form());
        assert!(!Command::SERVER { name: "b".into(), hopcount: 1, info: "i".into() }.is_multiconnect_form());
    }

    #[test]
    fn from_raw_parses_join_with_key() {
        let raw = crate::raw::parse_line("JOIN #secret key1").unwrap();
        let cmd = Command::from_raw(&raw).unwrap();
        assert_eq!(cmd, Command::JOIN { channels: "#secret".into(), keys: Some("key1".into()) });
    }

    #[test]
    fn from_raw_splits_user_vs_channel_mode() {
        let raw = crate::raw::parse_line("MODE #y +kl secret 50").unwrap();
        let cmd = Command::from_raw(&raw).unwrap();
        assert_eq!(
            cmd,
            Command::ChannelMode {
                channel: "#y".into(),
                modes: "+kl".into(),
                params: vec!["secret".into(), "50".into()],
            }
        );

        let raw = crate::raw::parse_line("MODE alice +i").unwrap();
        let cmd = Command::from_raw(&raw).unwrap();
        assert_eq!(cmd, Command::UserMode { nick: "alice".into(), modes: "+i".into(), params: vec![] });
    }

    #[test]
    fn from_raw_falls_back_to_raw_for_unknown_command() {
        let raw = crate::raw::parse_line("ZORP a b").unwrap();
        let cmd = Command::from_raw(&raw).unwrap();
        assert_eq!(cmd, Command::Raw("ZORP".into(), vec!["a".into(), "b".into()]));
    }

    #[test]
    fn from_raw_rejects_missing_params() {
        let raw = crate::raw::parse_line("PRIVMSG #x").unwrap();
        assert!(Command::from_raw(&raw).is_err());
    }

    #[test]
    fn from_raw_parses_multiconnect_privmsg() {
        let raw = crate::raw::parse_line("IPRIVMSG 42 #chan :hello").unwrap();
        let cmd = Command::from_raw(&raw).unwrap();
        assert_eq!(cmd, Command::IPRIVMSG { id: 42, target: "#chan".into(), text: "hello".into() });
        assert!(cmd.is_multiconnect_form());
    }
}
