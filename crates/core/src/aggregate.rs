//! Aggregate trait for records whose state changes through commands.

use chrono::{DateTime, Utc};

use crate::entity::Entity;

/// Domain event emitted by an aggregate.
pub trait Event: Clone + core::fmt::Debug {
    /// Stable, dotted event name (e.g. `invoicing.invoice.payment_registered`).
    fn event_type(&self) -> &'static str;

    /// Schema version of the event payload.
    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Aggregates must not perform IO. Callers that persist the aggregate apply
/// the returned events and write the record back to its store.
pub trait Aggregate: Entity {
    type Command: Clone + core::fmt::Debug;
    type Event: Event;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    ///
    /// This must not mutate state. State evolution is done through `apply`.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Handle a command and apply the resulting events in one step.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}
