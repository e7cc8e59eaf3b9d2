//! Domain layer for Mnemo: chat sessions and their memory.
//!
//! - [`session`]: sessions, turns, settings and the persisting [`SessionStore`](session::SessionStore)
//! - [`context`]: which prior turns accompany a new prompt
//! - [`insight`]: distilling recent turns into durable insights
//! - [`summary`]: rolling conversation summaries
//! - [`agent`]: the model invocation interface
//! - [`storage`]: the key-value persistence interface

pub mod agent;
pub mod context;
pub mod error;
pub mod insight;
mod prompt;
pub mod session;
pub mod storage;
pub mod summary;

// Re-export common error type
pub use error::{MnemoError, Result};
