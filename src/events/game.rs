//! Bit-packed game and message event streams.
//!
//! # Record layout
//!
//! | Bits | Field |
//! |------|-------|
//! | 2 + 6/14/22/32 | game-loop delta (selector, then magnitude) |
//! | 5 | user id |
//! | 7 | event type id |
//! | var | body, per the registered schema |
//! | 0-7 | padding to the next byte |
//!
//! The stream ends when the source is exhausted exactly where the next
//! delta would start.

use std::io::BufRead;

use tracing::{debug, trace};

use super::{EventMetadata, GameEvent};
use crate::bits::BitCursor;
use crate::error::{ParserError, Result};
use crate::limits::DecodeLimits;
use crate::protocol::{decode_with_limits, Decoded, SchemaRegistry, StreamKind, TypeDescriptor};

/// Width of the user id field.
pub const USER_ID_BITS: u32 = 5;

/// Width of the event type id field.
pub const EVENT_TYPE_BITS: u32 = 7;

/// The game-loop delta: a 2-bit selector over 6, 14, 22 or 32-bit magnitudes.
#[must_use]
pub fn game_loop_delta_descriptor() -> TypeDescriptor {
    TypeDescriptor::choice(
        2,
        [
            (0, "m_uint6", TypeDescriptor::uint(6)),
            (1, "m_uint14", TypeDescriptor::uint(14)),
            (2, "m_uint22", TypeDescriptor::uint(22)),
            (3, "m_uint32", TypeDescriptor::uint(32)),
        ],
    )
}

/// Pull reader over a bit-packed event stream.
///
/// Yields events through [`BitEventReader::decode_next`] or as an
/// iterator. After an error or the end of the stream it yields nothing.
pub struct BitEventReader<'a, R> {
    cursor: BitCursor<R>,
    registry: &'a SchemaRegistry,
    stream: StreamKind,
    limits: DecodeLimits,
    delta: TypeDescriptor,
    game_loop: u64,
    events_read: u64,
    finished: bool,
}

impl<'a, R: BufRead> BitEventReader<'a, R> {
    /// Creates a reader for `stream` over `source`.
    pub fn new(source: R, stream: StreamKind, registry: &'a SchemaRegistry) -> Self {
        Self::with_limits(source, stream, registry, DecodeLimits::default())
    }

    /// Creates a reader over `replay.game.events` data.
    pub fn game(source: R, registry: &'a SchemaRegistry) -> Self {
        Self::new(source, StreamKind::Game, registry)
    }

    /// Creates a reader over `replay.message.events` data.
    pub fn message(source: R, registry: &'a SchemaRegistry) -> Self {
        Self::new(source, StreamKind::Message, registry)
    }

    /// Creates a reader with explicit decode limits.
    pub fn with_limits(
        source: R,
        stream: StreamKind,
        registry: &'a SchemaRegistry,
        limits: DecodeLimits,
    ) -> Self {
        Self {
            cursor: BitCursor::new(source),
            registry,
            stream,
            limits,
            delta: game_loop_delta_descriptor(),
            game_loop: 0,
            events_read: 0,
            finished: false,
        }
    }

    /// The game loop of the last event read.
    #[must_use]
    pub fn game_loop(&self) -> u64 {
        self.game_loop
    }

    /// Returns whether the reader has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decodes the next event.
    ///
    /// Returns `Ok(None)` once the stream is exhausted at a record
    /// boundary.
    ///
    /// # Errors
    ///
    /// - `ParserError::TruncatedStream` if the source ends inside a record
    /// - `ParserError::UnknownEventType` if the type id is not registered
    /// - any error from decoding the event body
    pub fn decode_next(&mut self) -> Result<Option<GameEvent>> {
        if self.finished {
            return Ok(None);
        }

        match self.read_record() {
            Ok(Some(event)) => {
                self.events_read += 1;
                Ok(Some(event))
            }
            Ok(None) => {
                self.finished = true;
                debug!(
                    stream = self.stream.name(),
                    events = self.events_read,
                    game_loop = self.game_loop,
                    "End of event stream"
                );
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    fn read_record(&mut self) -> Result<Option<GameEvent>> {
        if self.cursor.at_end()? {
            return Ok(None);
        }

        let delta = decode_with_limits(&mut self.cursor, &self.delta, &self.limits)?;
        self.game_loop = self.game_loop.saturating_add(loop_delta(&delta)?);

        let user_id = self.cursor.read_bits(USER_ID_BITS)? as u8;
        let type_id = self.cursor.read_bits(EVENT_TYPE_BITS)? as u32;

        let schema = self.registry.lookup(self.stream, type_id)?;
        let body = decode_with_limits(&mut self.cursor, &schema.descriptor, &self.limits)?;
        self.cursor.realign();

        trace!(
            stream = self.stream.name(),
            game_loop = self.game_loop,
            user_id,
            type_id,
            name = %schema.name,
            "Decoded event"
        );

        Ok(Some(GameEvent {
            meta: EventMetadata {
                game_loop: self.game_loop,
                user_id,
            },
            stream: self.stream,
            type_id,
            name: schema.name.clone(),
            body,
        }))
    }
}

/// Extracts the tick count from a decoded delta choice.
fn loop_delta(decoded: &Decoded) -> Result<u64> {
    let magnitude = match decoded {
        Decoded::Choice { value, .. } => value.as_int(),
        _ => None,
    };
    magnitude
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| ParserError::UnexpectedValue {
            reason: format!("game loop delta decoded as {decoded:?}"),
        })
}

impl<R: BufRead> Iterator for BitEventReader<'_, R> {
    type Item = Result<GameEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_next().transpose()
    }
}

impl<R: BufRead> std::iter::FusedIterator for BitEventReader<'_, R> {}
