//! Application layer for Mnemo.
//!
//! This crate provides the chat use case that coordinates the session store,
//! context builder, model backend and insight extraction.

pub mod chat_service;

pub use chat_service::{ChatService, SubmitOutcome};
