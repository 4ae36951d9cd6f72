//! Literature-review generation pipeline.
//!
//! Article selection, text loading, prompt construction, the LLM client,
//! artifact storage, and the orchestrator tying them together.

pub mod artifact;
pub mod llm;
pub mod loader;
pub mod pipeline;
pub mod prompt;
pub mod selector;
