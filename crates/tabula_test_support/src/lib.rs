mod fake_backend;
mod fixtures;

pub use fake_backend::{FakeBackend, FakeBackendStats};
pub use fixtures::*;
