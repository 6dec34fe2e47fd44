//! Event schemas keyed by stream and type id.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use super::descriptor::TypeDescriptor;
use crate::error::{ParserError, Result};

/// Which bit-packed stream an event id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamKind {
    /// `replay.game.events`.
    Game,
    /// `replay.message.events`.
    Message,
}

impl StreamKind {
    /// Lowercase name used in logs and errors.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            StreamKind::Game => "game",
            StreamKind::Message => "message",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The decoder for one event type.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSchema {
    /// Event name.
    pub name: String,
    /// Layout of the event body.
    pub descriptor: TypeDescriptor,
}

/// Maps `(stream, type id)` to the schema that decodes the event body.
///
/// The registry holds no schemas of its own. Callers register the event
/// types of the protocol build they are reading.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<(StreamKind, u32), EventSchema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, returning the one it replaced.
    pub fn register(
        &mut self,
        stream: StreamKind,
        type_id: u32,
        name: impl Into<String>,
        descriptor: TypeDescriptor,
    ) -> Option<EventSchema> {
        self.schemas.insert(
            (stream, type_id),
            EventSchema {
                name: name.into(),
                descriptor,
            },
        )
    }

    /// Builder form of [`SchemaRegistry::register`].
    #[must_use]
    pub fn with(
        mut self,
        stream: StreamKind,
        type_id: u32,
        name: impl Into<String>,
        descriptor: TypeDescriptor,
    ) -> Self {
        self.register(stream, type_id, name, descriptor);
        self
    }

    /// Looks up a schema.
    #[must_use]
    pub fn get(&self, stream: StreamKind, type_id: u32) -> Option<&EventSchema> {
        self.schemas.get(&(stream, type_id))
    }

    /// Looks up a schema, failing for unregistered ids.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnknownEventType` if nothing is registered.
    pub fn lookup(&self, stream: StreamKind, type_id: u32) -> Result<&EventSchema> {
        self.get(stream, type_id)
            .ok_or(ParserError::UnknownEventType {
                stream: stream.name(),
                type_id,
            })
    }

    /// Number of registered schemas.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    /// Returns whether no schema is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
