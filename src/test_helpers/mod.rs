//! Shared fixtures for unit tests.

mod fixtures;
mod sdk;
mod temp;

pub use fixtures::*;
pub use sdk::*;
pub use temp::*;
