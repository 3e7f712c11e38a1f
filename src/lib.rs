//! # Postcraft
//!
//! Multi-pass LLM pipeline that drafts social media posts.
//!
//! ## Usage
//!
//! ```bash
//! postcraft generate --idea "Highlight sustainable fishing" --product-name "Tôm hùm Cô Tô"
//! ```
//!
//! ## Modules
//!
//! - `app` - Logging and runtime wiring for the binary
//! - `config` - Layered pipeline configuration (defaults, file, environment)
//! - `error` - Crate-wide error type
//! - `llm` - LLM completion capability and the OpenAI-compatible HTTP adapter
//! - `pipeline` - Passes, event protocol, prompt templates and the orchestrator
//! - `research` - Web research capability and the Perplexity adapter
//! - `retrieval` - Embedding and vector search contracts for RAG
//! - `session` - Memoized per-session pass results and the caches that hold them
//! - `testing` - Scripted mocks of every external capability
pub mod app;
pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod research;
pub mod retrieval;
pub mod session;

pub mod testing;

pub use error::{PipelineError, Result};
