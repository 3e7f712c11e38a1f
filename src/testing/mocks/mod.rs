//! Mock implementations of the pipeline's external capabilities

pub mod llm;
pub mod research;
pub mod retrieval;

pub use llm::{pass_for_request, MockLlm, MockLlmBuilder};
pub use research::MockResearch;
pub use retrieval::{MockEmbedder, MockVectorStore};
