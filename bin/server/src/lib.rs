//! wicara webhook server.
//!
//! Receives WhatsApp Cloud API webhooks, runs them through the conversation
//! engine, and exposes the operator console API plus its observer socket.

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod wa;
