//! Core domain types shared across the wicara workspace.

pub mod id;

pub use id::{ActivationId, ChatId, ParseChatIdError};
