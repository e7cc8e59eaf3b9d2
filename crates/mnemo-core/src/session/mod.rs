//! Session domain module.
//!
//! This module contains the chat session model, the process-wide settings and
//! the store that owns and persists them.
//!
//! # Module Structure
//!
//! - `message`: Conversation turn types (`TurnRole`, `Turn`)
//! - `model`: Core session domain model (`Session`, `SessionFlags`)
//! - `settings`: Generation and context settings (`Settings`)
//! - `store`: Session lifecycle and persistence (`SessionStore`)

mod message;
mod model;
mod settings;
mod store;

// Re-export public API
pub use message::{Turn, TurnRole};
pub use model::{DEFAULT_SESSION_TITLE, Session, SessionFlags};
pub use settings::Settings;
pub use store::SessionStore;
