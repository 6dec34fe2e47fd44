//! Tracker event stream.
//!
//! # Record layout
//!
//! | Size | Field |
//! |------|-------|
//! | 3 | marker, `03 00 09` or `03 02 09` |
//! | var | frame number (signed varint) |
//! | 1 | trailer, `09` |
//! | var | event type (signed varint) |
//! | var | body (tagged value) |
//!
//! The stream ends when the source is exhausted exactly before a marker.

use std::fmt;
use std::io::BufRead;

use serde::Serialize;
use tracing::{debug, trace};

use crate::binary::{read_array_from, read_u8_from};
use crate::error::{ParserError, Result};
use crate::limits::DecodeLimits;
use crate::tagged::{decode_value_with_limits, read_varint, Value};

/// Marker of the first framing variant.
pub const MARKER_V0: [u8; 3] = [0x03, 0x00, 0x09];

/// Marker of the second framing variant.
pub const MARKER_V2: [u8; 3] = [0x03, 0x02, 0x09];

/// Byte between the frame number and the event type.
pub const FRAME_TRAILER: u8 = 0x09;

/// Known tracker event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TrackerEventType {
    /// Periodic per-player statistics.
    PlayerStats,
    /// A unit was created.
    UnitBorn,
    /// A unit died.
    UnitDied,
    /// A unit changed owner.
    OwnerChange,
    /// A unit changed type.
    TypeChange,
    /// Unidentified event with id 5.
    Unknown1,
    /// Batched unit positions.
    UnitPositions,
    /// Player slot setup.
    PlayerSetup,
    /// Any other id.
    Other(i64),
}

impl TrackerEventType {
    /// Maps a wire id to an event type.
    #[must_use]
    pub fn from_id(id: i64) -> Self {
        match id {
            0 => TrackerEventType::PlayerStats,
            1 => TrackerEventType::UnitBorn,
            2 => TrackerEventType::UnitDied,
            3 => TrackerEventType::OwnerChange,
            4 => TrackerEventType::TypeChange,
            5 => TrackerEventType::Unknown1,
            8 => TrackerEventType::UnitPositions,
            9 => TrackerEventType::PlayerSetup,
            other => TrackerEventType::Other(other),
        }
    }

    /// The wire id.
    #[must_use]
    pub fn id(self) -> i64 {
        match self {
            TrackerEventType::PlayerStats => 0,
            TrackerEventType::UnitBorn => 1,
            TrackerEventType::UnitDied => 2,
            TrackerEventType::OwnerChange => 3,
            TrackerEventType::TypeChange => 4,
            TrackerEventType::Unknown1 => 5,
            TrackerEventType::UnitPositions => 8,
            TrackerEventType::PlayerSetup => 9,
            TrackerEventType::Other(id) => id,
        }
    }
}

impl fmt::Display for TrackerEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerEventType::Other(id) => write!(f, "TrackerEventType({id})"),
            known => write!(f, "{known:?}"),
        }
    }
}

/// One tracker event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerEvent {
    /// Middle byte of the marker (0 or 2).
    pub variant: u8,
    /// Frame number.
    pub frame: i64,
    /// Event type.
    pub event_type: TrackerEventType,
    /// Event body.
    pub body: Value,
}

/// Pull reader over a tracker event stream.
#[derive(Debug)]
pub struct TrackerEventReader<R> {
    source: R,
    limits: DecodeLimits,
    events_read: u64,
    finished: bool,
}

impl<R: BufRead> TrackerEventReader<R> {
    /// Creates a reader over `replay.tracker.events` data.
    pub fn new(source: R) -> Self {
        Self::with_limits(source, DecodeLimits::default())
    }

    /// Creates a reader with explicit decode limits.
    pub fn with_limits(source: R, limits: DecodeLimits) -> Self {
        Self {
            source,
            limits,
            events_read: 0,
            finished: false,
        }
    }

    /// Returns whether the reader has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decodes the next event.
    ///
    /// Returns `Ok(None)` once the source is exhausted before a marker.
    ///
    /// # Errors
    ///
    /// - `ParserError::InvalidFrameMarker` for an unknown marker or trailer
    /// - `ParserError::TruncatedStream` if the source ends inside a record
    /// - any error from decoding the tagged body
    pub fn decode_next(&mut self) -> Result<Option<TrackerEvent>> {
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
                debug!(events = self.events_read, "End of tracker event stream");
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    fn read_record(&mut self) -> Result<Option<TrackerEvent>> {
        if self.source.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let marker: [u8; 3] = read_array_from(&mut self.source, "tracker event marker")?;
        let variant = match marker {
            MARKER_V0 | MARKER_V2 => marker[1],
            other => return Err(ParserError::invalid_frame_marker(&other)),
        };

        let frame = read_varint(&mut self.source)?;

        let trailer = read_u8_from(&mut self.source, "tracker event trailer")?;
        if trailer != FRAME_TRAILER {
            return Err(ParserError::invalid_frame_marker(&[trailer]));
        }

        let event_type = TrackerEventType::from_id(read_varint(&mut self.source)?);
        let body = decode_value_with_limits(&mut self.source, &self.limits)?;

        trace!(frame, %event_type, "Decoded tracker event");
        Ok(Some(TrackerEvent {
            variant,
            frame,
            event_type,
            body,
        }))
    }
}

impl<R: BufRead> Iterator for TrackerEventReader<R> {
    type Item = Result<TrackerEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.decode_next().transpose()
    }
}

impl<R: BufRead> std::iter::FusedIterator for TrackerEventReader<R> {}
