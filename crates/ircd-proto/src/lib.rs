//! Wire protocol types for spanircd.
//!
//! This crate is deliberately narrow: it owns the `Message`/`Command`
//! vocabulary, RFC 2812 numerics, prefix parsing, case-folding, and the
//! mode-flag bitset. Everything stateful (the directory, channel engine,
//! peer FSM) lives in the `spanircd` binary crate and depends on this one.

pub mod casefold;
pub mod command;
pub mod error;
pub mod message;
pub mod mode;
pub mod prefix;
pub mod raw;
pub mod response;

pub use command::Command;
pub use error::{ProtocolError, Result};
pub use message::{Message, Tag};
pub use mode::ModeFlags;
pub use prefix::Prefix;
pub use response::Response;
