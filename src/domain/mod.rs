//! Domain types and DTOs for projects and generated estimates.

pub mod estimates;
pub mod projects;

pub use estimates::*;
pub use projects::*;
