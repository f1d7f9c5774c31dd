// LLM side of the agent: Claude streaming client with tool use, the stream
// accumulator, the tool-calling loop and the system prompt.

pub mod agent;
pub mod client;
pub mod message;
pub mod prompt;
pub mod stream;

pub use agent::Agent;
pub use client::{ChatModel, ClaudeClient, LlmClient};
pub use message::{AssistantTurn, ContentBlock, Message, Role, StopReason, ToolCall, Usage};
