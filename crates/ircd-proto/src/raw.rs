//! Nom-based tokenizer for a raw wire line into (tags, prefix, command,
//! params) before `Command` interprets the command-specific shape.

use nom::{
    bytes::complete::{take_until, take_while1},
    character::complete::char,
    combinator::opt,
    error::ErrorKind,
    sequence::preceded,
    IResult,
};
use smallvec::SmallVec;

use crate::error::{ProtocolError, Result};

pub const MAX_LINE_LEN: usize = 512;
pub const MAX_PARAMS: usize = 15;

pub struct RawLine<'a> {
    pub tags: Option<&'a str>,
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub params: SmallVec<[&'a str; MAX_PARAMS]>,
}

fn parse_tags(input: &str) -> IResult<&str, &str> {
    preceded(char('@'), take_until(" "))(input)
}

fn parse_prefix(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

fn parse_command(input: &str) -> IResult<&str, &str> {
    let (rest, cmd) = take_while1(|c: char| c.is_alphanumeric())(input)?;
    let is_all_letters = cmd.chars().all(|c| c.is_ascii_alphabetic());
    let is_three_digits = cmd.len() == 3 && cmd.chars().all(|c| c.is_ascii_digit());
    if is_all_letters || is_three_digits {
        Ok((rest, cmd))
    } else {
        Err(nom::Err::Error(nom::error::Error::new(input, ErrorKind::AlphaNumeric)))
    }
}

fn parse_params(input: &str) -> (&str, SmallVec<[&str; MAX_PARAMS]>) {
    let mut params: SmallVec<[&str; MAX_PARAMS]> = SmallVec::new();
    let mut rest = input;

    while rest.as_bytes().first() == Some(&b' ') {
        if params.len() >= MAX_PARAMS {
            break;
        }
        while rest.as_bytes().first() == Some(&b' ') {
            rest = &rest[1..];
        }
        if rest.is_empty() {
            break;
        }
        if rest.as_bytes().first() == Some(&b':') {
            params.push(&rest[1..]);
            rest = "";
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        let param = &rest[..end];
        if param.is_empty() {
            break;
        }
        params.push(param);
        rest = &rest[end..];
    }

    (rest, params)
}

/// Parse one line (no trailing CRLF) into its wire pieces. Does not
/// interpret the command name; that's `Command::from_raw`'s job.
pub fn parse_line(line: &str) -> Result<RawLine<'_>> {
    if line.is_empty() {
        return Err(ProtocolError::EmptyLine);
    }
    if line.len() > MAX_LINE_LEN {
        return Err(ProtocolError::LineTooLong { max: MAX_LINE_LEN });
    }

    let (rest, tags) = opt(parse_tags)(line).unwrap_or((line, None));
    let rest = rest.strip_prefix(' ').unwrap_or(rest);

    let (rest, prefix) = opt(parse_prefix)(rest).unwrap_or((rest, None));
    let rest = rest.strip_prefix(' ').unwrap_or(rest);

    let (rest, command) = parse_command(rest).map_err(|_| ProtocolError::MissingCommand)?;
    let (_, params) = parse_params(rest);

    Ok(RawLine { tags, prefix, command, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_command() {
        let r = parse_line("JOIN #chan").unwrap();
        assert_eq!(r.command, "JOIN");
        assert_eq!(&r.params[..], &["#chan"]);
    }

    #[test]
    fn parses_prefix_and_trailing_param() {
        let r = parse_line(":alice!a@h PRIVMSG #chan :hello there").unwrap();
        assert_eq!(r.prefix, Some("alice!a@h"));
        assert_eq!(r.command, "PRIVMSG");
        assert_eq!(&r.params[..], &["#chan", "hello there"]);
    }

    #[test]
    fn parses_tags_prefix_and_numeric_command() {
        let r = parse_line("@label=1 :irc.example PING :token").unwrap();
        assert_eq!(r.tags, Some("label=1"));
        assert_eq!(r.command, "PING");
        assert_eq!(&r.params[..], &["token"]);
    }

    #[test]
    fn rejects_empty_line() {
        assert_eq!(parse_line(""), Err(ProtocolError::EmptyLine));
    }

    #[test]
    fn caps_params_at_fifteen() {
        let many: String = (0..20).map(|i| format!(" p{i}")).collect();
        let line = format!("CMD{many}");
        let r = parse_line(&line).unwrap();
        assert_eq!(r.params.len(), MAX_PARAMS);
    }
}
