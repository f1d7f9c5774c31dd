// Tool-calling agent loop.
//
// Sends the user's message, runs whatever tools the model asks for, feeds the
// results back, and repeats until the model ends its turn. Each request gets
// a fresh conversation; nothing is remembered between runs.

use std::sync::Arc;

use anyhow::bail;
use serde_json::Value;
use tracing::{debug, info};

use money_buddy_core::tool::ToolRegistry;

use crate::client::ChatModel;
use crate::message::{ContentBlock, Message, StopReason, ToolCall};

pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;

pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    system: String,
    max_tokens: u32,
    max_tool_rounds: usize,
}

impl Agent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, system: impl Into<String>) -> Self {
        Self {
            model,
            tools,
            system: system.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_limits(mut self, max_tokens: u32, max_tool_rounds: usize) -> Self {
        self.max_tokens = max_tokens;
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    /// Run one exchange and return the model's final text.
    pub async fn run(&self, user_message: &str) -> anyhow::Result<String> {
        let specs = self.tools.specs();
        let mut messages = vec![Message::user_text(user_message)];
        let mut rounds = 0;

        loop {
            let turn = self
                .model
                .complete(&self.system, &messages, &specs, self.max_tokens)
                .await?;
            let calls = turn.tool_calls();

            if turn.stop_reason != StopReason::ToolUse || calls.is_empty() {
                debug!(rounds, stop_reason = ?turn.stop_reason, "Agent finished");
                return Ok(turn.text());
            }
            if rounds == self.max_tool_rounds {
                bail!(
                    "Agent stopped after {} tool rounds without a final answer",
                    self.max_tool_rounds
                );
            }
            rounds += 1;

            messages.push(Message::assistant(turn.content));
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.run_tool(call).await);
            }
            messages.push(Message::tool_results(results));
        }
    }

    async fn run_tool(&self, call: ToolCall) -> ContentBlock {
        let input = tool_input(&call.input);
        info!(tool = %call.name, "Running tool");
        let output = self.tools.invoke(&call.name, &input).await;
        debug!(tool = %call.name, output = %output, "Tool finished");
        ContentBlock::ToolResult {
            tool_use_id: call.id,
            content: output,
        }
    }
}

/// The string handed to a tool: the `input` property when it is a string,
/// otherwise the JSON the model produced.
fn tool_input(input: &Value) -> String {
    match input.get("input") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None if input.as_object().is_some_and(|o| o.is_empty()) => String::new(),
        None => input.to_string(),
    }
}
