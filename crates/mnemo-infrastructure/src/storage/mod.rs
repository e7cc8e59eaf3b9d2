//! Storage layer for atomic file operations.

mod file_store;

pub use file_store::FileKeyValueStore;
