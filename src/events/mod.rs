//! Event stream framing.
//!
//! Replays carry three event streams:
//!
//! - **Game** and **message** events are bit-packed. Each record is a
//!   game-loop delta, a user id and a type id, followed by a body whose
//!   layout comes from a [`SchemaRegistry`](crate::protocol::SchemaRegistry).
//!   See [`BitEventReader`].
//! - **Tracker** events are byte-aligned and self-describing. Each record
//!   is a framing marker, a frame number and an event type, followed by a
//!   tagged value. See [`TrackerEventReader`].
//!
//! All readers pull one record per call and stop at the first error; no
//! resynchronization is attempted.

pub mod game;
pub mod tracker;

pub use game::{game_loop_delta_descriptor, BitEventReader};
pub use tracker::{TrackerEvent, TrackerEventReader, TrackerEventType};

use serde::Serialize;

use crate::protocol::{Decoded, StreamKind};

/// Timing and origin of a bit-packed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventMetadata {
    /// Game loop at which the event occurred, accumulated from deltas.
    pub game_loop: u64,
    /// Id of the user that produced the event.
    pub user_id: u8,
}

/// A decoded game or message event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameEvent {
    /// When and from whom.
    pub meta: EventMetadata,
    /// The stream the event was read from.
    pub stream: StreamKind,
    /// Numeric event type.
    pub type_id: u32,
    /// Name from the registered schema.
    pub name: String,
    /// Decoded body.
    pub body: Decoded,
}
