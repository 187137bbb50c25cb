//! Conversation orchestration.
//!
//! The [`Orchestrator`] runs the iterative generate/dispatch loop for one
//! inbound message; the [`Dispatcher`] sits in front of it and applies the
//! channel-level rules (control state, the clear command, media resolution,
//! observer notifications). Outbound delivery and media download live behind
//! the traits in [`outbound`].

pub mod dispatcher;
pub mod error;
pub mod observer;
pub mod orchestrator;
pub mod outbound;

pub use dispatcher::{Dispatcher, InboundEvent, InboundMedia};
pub use error::EngineError;
pub use observer::{ObserverEvent, ObserverHub, TurnSnapshot};
pub use orchestrator::{LoopOutcome, Orchestrator, OrchestratorConfig};
pub use outbound::{MediaError, MediaResolver, OutboundError, OutboundMessenger, ResolvedMedia};
