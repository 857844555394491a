//! The digital twin agent.
//!
//! [`TwinAgent`] runs the retrieval-and-answer workflow for every chat
//! message; [`PromptSet`] holds the prompts it speaks with.

pub mod prompts;
pub mod twin;

pub use prompts::PromptSet;
pub use twin::{AgentSettings, AgentState, TwinAgent};
