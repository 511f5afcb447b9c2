//! Infrastructure layer
//!
//! Everything that talks to the outside world:
//! - The backend collaborator trait and an in-memory backend
//! - Configuration loading
//! - Command line arguments of the demo binary

pub mod cli;
pub mod config;
pub mod memory_source;
pub mod source;
