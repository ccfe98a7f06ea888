//! Request handlers.

pub mod health;
pub mod project;

pub use health::*;
pub use project::*;
