//! Deterministic doubles for exercising the plugin without real processes
//! or DNS.

mod mocks;

pub use mocks::{RecordedCall, RecordingExecutor, StaticResolver};
