//! These models represent the objects passed around by the planning agent
//!
//! There are a few related formats we need to interact with:
//! - the conversation history, owned by the caller and shared with the agent
//! - openai messages/tools, sent from the agent to the LLM
//! - tool requests, sent from the LLM back to the agent
//!
//! We always immediately convert the wire formats into the internal structs using
//! to/from helpers in `providers::utils`.
pub mod message;
pub mod role;
pub mod tool;
