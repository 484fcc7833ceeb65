//! Core modules for the shared discovery store.

pub mod document;
pub mod error;
pub mod lock;
pub mod output;
pub mod store;
pub mod summary;
pub mod time;
