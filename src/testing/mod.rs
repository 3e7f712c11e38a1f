//! Testing utilities and fixtures
//!
//! Scripted stand-ins for the LLM, research and retrieval services plus
//! canned model responses, shared by unit and integration tests.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
