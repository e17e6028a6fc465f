//! Domain events: the `Event` trait every aggregate event implements, and the
//! envelope committed events are journaled in.

pub mod envelope;
pub mod event;

pub use envelope::EventEnvelope;
pub use event::Event;
