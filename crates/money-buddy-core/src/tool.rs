// Agent tool contract: a named, described, string-in/string-out function the
// LLM may invoke during a conversation.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name and natural-language description advertised to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
}

/// A single tool the agent can call.
///
/// `call` must not fail: any error from the underlying operation is rendered
/// into the returned string so the model can read it.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn call(&self, input: &str) -> String;
}

/// Ordered collection of tools, looked up by name at invocation time.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool. A later tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        match self.by_name.get(name) {
            Some(&idx) => {
                warn!(tool = name, "replacing previously registered tool");
                self.tools[idx] = tool;
            }
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn extend<I>(&mut self, tools: I)
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        for tool in tools {
            self.register(tool);
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    /// Specs in registration order.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools
            .iter()
            .map(|t| ToolSpec {
                name: t.name().to_string(),
                description: t.description().to_string(),
            })
            .collect()
    }

    /// Run the named tool. Unknown names produce a message rather than an error.
    pub async fn invoke(&self, name: &str, input: &str) -> String {
        match self.get(name) {
            Some(tool) => {
                debug!(tool = name, "invoking tool");
                tool.call(input).await
            }
            None => {
                warn!(tool = name, "model requested an unknown tool");
                format!("Unknown tool: {name}")
            }
        }
    }
}
