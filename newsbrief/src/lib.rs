// Library interface for newsbrief modules
// This allows tests and other binaries to import modules

pub mod app;
pub mod bookmarks;
pub mod clock;
pub mod error;
pub mod llm;
pub mod models;
pub mod news;
pub mod server;
pub mod stats;
pub mod store;

pub use error::{NewsError, Result};
