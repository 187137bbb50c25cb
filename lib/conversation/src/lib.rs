//! Conversation data model and persistence contract for wicara.
//!
//! This crate provides:
//!
//! - **Content model**: role-tagged bundles of [`Part`]s, the unit the
//!   generation boundary consumes and produces
//! - **Turns**: one persisted exchange (user segment + bot segment, either
//!   possibly absent) and the per-conversation control state
//! - **Store contract**: the [`ConversationStore`] trait plus an in-memory
//!   implementation with FIFO history eviction

pub mod content;
pub mod error;
pub mod memory;
pub mod store;
pub mod turn;

pub use content::{Content, Part, Role};
pub use error::StoreError;
pub use memory::MemoryConversationStore;
pub use store::ConversationStore;
pub use turn::{ControlState, Turn};
