// Folds Messages API stream events into a complete `AssistantTurn`.
//
// Kept free of I/O so the event handling can be tested with literal SSE
// payloads.

use anyhow::{anyhow, bail, Context};
use serde_json::Value;
use tracing::{debug, warn};

use crate::message::{AssistantTurn, ContentBlock, StopReason, Usage};

/// How far past the last known block a new block may start. Ignored block
/// types leave holes, but indexes still arrive in order.
const MAX_BLOCK_GAP: usize = 16;

#[derive(Debug)]
enum PartialBlock {
    Text(String),
    ToolUse { id: String, name: String, json: String },
}

#[derive(Debug, Default)]
pub struct TurnAccumulator {
    blocks: Vec<Option<PartialBlock>>,
    stop_reason: Option<StopReason>,
    usage: Usage,
    done: bool,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `message_stop` has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Apply one SSE event. An `error` event from the API is returned as `Err`.
    pub fn apply(&mut self, event: &str, data: &str) -> anyhow::Result<()> {
        match event {
            "message_start" => match parse_input_tokens(data) {
                Some(n) => self.usage.input_tokens = n,
                None => warn!("failed to parse input_tokens from message_start"),
            },
            "content_block_start" => self.start_block(data)?,
            "content_block_delta" => self.apply_delta(data)?,
            "message_delta" => {
                if let Some(n) = parse_output_tokens(data) {
                    self.usage.output_tokens = n;
                }
                if let Some(reason) = parse_stop_reason(data) {
                    self.stop_reason = Some(StopReason::parse(&reason));
                }
            }
            "message_stop" => self.done = true,
            "error" => bail!("{}", parse_stream_error(data)),
            // ping, content_block_stop
            _ => debug!(event, "ignoring SSE event"),
        }
        Ok(())
    }

    fn start_block(&mut self, data: &str) -> anyhow::Result<()> {
        let v: Value = serde_json::from_str(data).context("content_block_start is not JSON")?;
        let index = block_index(&v)?;
        if index > self.blocks.len() + MAX_BLOCK_GAP {
            bail!(
                "content block index {index} is out of sequence ({} blocks so far)",
                self.blocks.len()
            );
        }
        let block = v
            .get("content_block")
            .ok_or_else(|| anyhow!("content_block_start without content_block"))?;

        let partial = match block.get("type").and_then(Value::as_str) {
            Some("text") => PartialBlock::Text(
                block.get("text").and_then(Value::as_str).unwrap_or_default().to_string(),
            ),
            Some("tool_use") => PartialBlock::ToolUse {
                id: str_field(block, "id")?,
                name: str_field(block, "name")?,
                json: String::new(),
            },
            other => {
                debug!(?other, "ignoring content block type");
                return Ok(());
            }
        };

        if self.blocks.len() <= index {
            self.blocks.resize_with(index + 1, || None);
        }
        self.blocks[index] = Some(partial);
        Ok(())
    }

    fn apply_delta(&mut self, data: &str) -> anyhow::Result<()> {
        let v: Value = serde_json::from_str(data).context("content_block_delta is not JSON")?;
        let index = block_index(&v)?;
        let delta = v.get("delta").unwrap_or(&Value::Null);

        match (self.blocks.get_mut(index), delta.get("type").and_then(Value::as_str)) {
            (Some(Some(PartialBlock::Text(text))), Some("text_delta")) => {
                if let Some(piece) = parse_delta_text(data) {
                    text.push_str(&piece);
                }
            }
            (Some(Some(PartialBlock::ToolUse { json, .. })), Some("input_json_delta")) => {
                if let Some(piece) = delta.get("partial_json").and_then(Value::as_str) {
                    json.push_str(piece);
                }
            }
            (_, kind) => debug!(index, ?kind, "delta for unknown block"),
        }
        Ok(())
    }

    /// Close the turn. Tool inputs are parsed from their accumulated JSON.
    pub fn finish(self) -> anyhow::Result<AssistantTurn> {
        let mut content = Vec::with_capacity(self.blocks.len());
        for block in self.blocks.into_iter().flatten() {
            content.push(match block {
                PartialBlock::Text(text) => ContentBlock::Text { text },
                PartialBlock::ToolUse { id, name, json } => {
                    let input = if json.trim().is_empty() {
                        Value::Object(Default::default())
                    } else {
                        serde_json::from_str(&json)
                            .with_context(|| format!("tool input for {name} is not valid JSON"))?
                    };
                    ContentBlock::ToolUse { id, name, input }
                }
            });
        }

        let stop_reason = match self.stop_reason {
            Some(reason) => reason,
            None if content.is_empty() => bail!("Stream ended unexpectedly without any content"),
            None => StopReason::EndTurn,
        };

        Ok(AssistantTurn {
            content,
            stop_reason,
            usage: self.usage,
        })
    }
}

fn block_index(v: &Value) -> anyhow::Result<usize> {
    v.get("index")
        .and_then(Value::as_u64)
        .map(|n| n as usize)
        .ok_or_else(|| anyhow!("content block event without index"))
}

fn str_field(v: &Value, field: &str) -> anyhow::Result<String> {
    v.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("tool_use block without {field}"))
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract `input_tokens` from a `message_start` event's JSON.
///
/// Expected shape: `{ "type": "message_start", "message": { "usage": { "input_tokens": N } } }`
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("message")?
        .get("usage")?
        .get("input_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `delta.text` from a `content_block_delta` event's JSON.
pub(crate) fn parse_delta_text(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("text")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `output_tokens` from a `message_delta` event's JSON.
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("usage")?
        .get("output_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Extract `delta.stop_reason` from a `message_delta` event's JSON.
pub(crate) fn parse_stop_reason(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("stop_reason")?
        .as_str()
        .map(|s| s.to_string())
}

/// `{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}`
fn parse_stream_error(data: &str) -> String {
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|v| {
            let err = v.get("error")?;
            let kind = err.get("type").and_then(Value::as_str).unwrap_or("error");
            let message = err.get("message").and_then(Value::as_str)?;
            Some(format!("{kind}: {message}"))
        })
        .unwrap_or_else(|| format!("Stream error: {data}"))
}
