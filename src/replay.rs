//! Replay-level access to an archive's well-known members.
//!
//! # Usage
//!
//! ```no_run
//! use blizzard_replay::protocol::SchemaRegistry;
//! use blizzard_replay::replay::Replay;
//!
//! let mut replay = Replay::open_path("game.SC2Replay").unwrap();
//! let details = replay.details().unwrap();
//! println!("{} on {}", details.players.len(), details.map_name);
//!
//! for event in replay.tracker_events().unwrap() {
//!     let event = event.unwrap();
//!     println!("{} {}", event.frame, event.event_type);
//! }
//!
//! let registry = SchemaRegistry::new();
//! let events = replay.game_events(&registry).unwrap();
//! println!("game events decoded: {}", events.count());
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::archive::Archive;
use crate::decompress::MemberReader;
use crate::error::{ParserError, Result};
use crate::events::{BitEventReader, TrackerEventReader};
use crate::protocol::{SchemaRegistry, StreamKind};
use crate::tagged::{decode_value, Value};

/// Match summary member.
pub const DETAILS: &str = "replay.details";
/// Bit-packed game events member.
pub const GAME_EVENTS: &str = "replay.game.events";
/// Bit-packed message events member.
pub const MESSAGE_EVENTS: &str = "replay.message.events";
/// Tracker events member.
pub const TRACKER_EVENTS: &str = "replay.tracker.events";
/// Lobby initialization member.
pub const INIT_DATA: &str = "replay.initData";

/// A reader over one member, buffered for the event readers.
pub type MemberStream<'a, R> = BufReader<MemberReader<&'a mut R>>;

/// One player from the details member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    /// Display name (key 0).
    pub name: String,
    /// Team index (key 5).
    pub team: i64,
    /// Handicap percentage (key 6).
    pub handicap: i64,
    /// Result flag (key 8).
    pub is_winner: i64,
    /// Hero or race name (key 10), if recorded.
    pub character: Option<String>,
    /// The undecoded player map.
    pub raw: Value,
}

impl Player {
    /// Extracts a player from its tagged map.
    ///
    /// # Errors
    ///
    /// `ParserError::UnexpectedValue` if a required key is missing or has
    /// the wrong type.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Player {
            name: text(value, 0, "player name")?,
            team: int(value, 5, "player team")?,
            handicap: int(value, 6, "player handicap")?,
            is_winner: int(value, 8, "player result")?,
            character: value.get(10).and_then(Value::as_str),
            raw: value.clone(),
        })
    }
}

/// Summary of a match from `replay.details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Details {
    /// Players in slot order (key 0).
    pub players: Vec<Player>,
    /// Map title (key 1).
    pub map_name: String,
    /// Start time as a Windows file time (key 5).
    pub timestamp: i64,
    /// Local offset from UTC in file time units (key 6).
    pub utc_offset: i64,
    /// The undecoded details map.
    pub raw: Value,
}

impl Details {
    /// Extracts details from the member's tagged value.
    ///
    /// # Errors
    ///
    /// `ParserError::UnexpectedValue` if a required key is missing or has
    /// the wrong type.
    pub fn from_value(value: &Value) -> Result<Self> {
        let players = value
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| unexpected("details player list"))?
            .iter()
            .map(Player::from_value)
            .collect::<Result<Vec<_>>>()?;

        Ok(Details {
            players,
            map_name: text(value, 1, "map name")?,
            timestamp: int(value, 5, "timestamp")?,
            utc_offset: int(value, 6, "utc offset")?,
            raw: value.clone(),
        })
    }
}

fn unexpected(what: &str) -> ParserError {
    ParserError::UnexpectedValue {
        reason: format!("missing or mistyped {what}"),
    }
}

fn text(value: &Value, key: i64, what: &str) -> Result<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| unexpected(what))
}

fn int(value: &Value, key: i64, what: &str) -> Result<i64> {
    value
        .get(key)
        .and_then(Value::as_int)
        .ok_or_else(|| unexpected(what))
}

/// A replay archive.
#[derive(Debug)]
pub struct Replay<R> {
    archive: Archive<R>,
}

impl Replay<BufReader<File>> {
    /// Opens the replay at `path`.
    ///
    /// # Errors
    ///
    /// Same as [`Archive::open_path`].
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Replay {
            archive: Archive::open_path(path)?,
        })
    }
}

impl<R: Read + Seek> Replay<R> {
    /// Opens a replay from a seekable source.
    ///
    /// # Errors
    ///
    /// Same as [`Archive::open`].
    pub fn open(source: R) -> Result<Self> {
        Ok(Replay {
            archive: Archive::open(source)?,
        })
    }

    /// Wraps an already opened archive.
    pub fn from_archive(archive: Archive<R>) -> Self {
        Replay { archive }
    }

    /// The underlying archive.
    pub fn archive(&mut self) -> &mut Archive<R> {
        &mut self.archive
    }

    /// Decodes the user data content as a tagged value.
    ///
    /// Returns `Ok(None)` if the archive has no user data preamble.
    ///
    /// # Errors
    ///
    /// Any tagged-value decoding error.
    pub fn header_value(&self) -> Result<Option<Value>> {
        let Some(user_data) = self.archive.user_data() else {
            return Ok(None);
        };
        let mut content = user_data.content.as_slice();
        decode_value(&mut content).map(Some)
    }

    /// Reads and decodes `replay.details`.
    ///
    /// # Errors
    ///
    /// Member access and tagged-value errors, or
    /// `ParserError::UnexpectedValue` if the value has the wrong shape.
    pub fn details(&mut self) -> Result<Details> {
        let member = self.archive.open_member(DETAILS)?;
        let value = decode_value(&mut BufReader::new(member))?;
        let details = Details::from_value(&value)?;
        debug!(
            players = details.players.len(),
            map = %details.map_name,
            "Decoded replay details"
        );
        Ok(details)
    }

    /// Reads `replay.initData` undecoded.
    ///
    /// # Errors
    ///
    /// Same as [`Archive::read_member`].
    pub fn init_data(&mut self) -> Result<Vec<u8>> {
        self.archive.read_member(INIT_DATA)
    }

    /// Opens `replay.game.events` for decoding with `registry`.
    ///
    /// # Errors
    ///
    /// Same as [`Archive::open_member`].
    pub fn game_events<'a>(
        &'a mut self,
        registry: &'a SchemaRegistry,
    ) -> Result<BitEventReader<'a, MemberStream<'a, R>>> {
        self.bit_events(GAME_EVENTS, StreamKind::Game, registry)
    }

    /// Opens `replay.message.events` for decoding with `registry`.
    ///
    /// # Errors
    ///
    /// Same as [`Archive::open_member`].
    pub fn message_events<'a>(
        &'a mut self,
        registry: &'a SchemaRegistry,
    ) -> Result<BitEventReader<'a, MemberStream<'a, R>>> {
        self.bit_events(MESSAGE_EVENTS, StreamKind::Message, registry)
    }

    fn bit_events<'a>(
        &'a mut self,
        name: &str,
        stream: StreamKind,
        registry: &'a SchemaRegistry,
    ) -> Result<BitEventReader<'a, MemberStream<'a, R>>> {
        let member = self.archive.open_member(name)?;
        Ok(BitEventReader::new(BufReader::new(member), stream, registry))
    }

    /// Opens `replay.tracker.events`.
    ///
    /// # Errors
    ///
    /// Same as [`Archive::open_member`].
    pub fn tracker_events(&mut self) -> Result<TrackerEventReader<MemberStream<'_, R>>> {
        let member = self.archive.open_member(TRACKER_EVENTS)?;
        Ok(TrackerEventReader::new(BufReader::new(member)))
    }
}
