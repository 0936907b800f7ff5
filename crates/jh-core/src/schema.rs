//! Structured output the model returns on every step.
//!
//! The schema is rebuilt from the toolset before each step: the called tool
//! must be one of the selected tools, the next tool one of the available ones.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CoreError, Result};
use crate::toolset::Toolset;
use crate::tools::{ToolInput, ToolKind};

pub const CHAIN_SCHEMA_NAME: &str = "ChainToolOutputSchema";

const CHAIN_DESCRIPTION: &str = "Output schema for calling a tool and chaining to the next tool.\n\n\
Some specific scenarios include:\n\
- *Skip tool call and select next tool:* If (a) no tool from the Selected Tool(s) is applicable to \
address the user query, AND if (b) a tool from the Available Tool(s) may be applicable, then \
*skip* with `called_tool_input=None` and select the next tool with `next_tool`.\n\
- *Trigger exit with explanation*: If no tool from the Available Tool(s) is applicable to \
specifically address the user query, use `RespondTool` to respond to the remainder.\n\
- *Exit with successful completion:* If `remainder=''` (is blank), then `next_tool` MUST be \
`None` to signal successful completion and exit.\n";

const CALLED_TOOL_DESCRIPTION: &str =
    "The input parameters used to call one of the Selected Tool(s).";

const REMAINDER_DESCRIPTION: &str = "ALL remaining text from the user query that has NOT been \
addressed by the called tool in `called_tool_input`. The format should be maintained as a text \
query with instructions as if provided by the user.";

const NEXT_TOOL_DESCRIPTION: &str = "The next tool to select and call in the next iteration to \
address some or all of the remainder of the user query in `remainder`. Can be one of any of the \
Available Tool(s).";

/// One step of the chain as decided by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChainOutput {
    pub called_tool_input: Option<ToolInput>,
    pub remainder: String,
    pub next_tool: Option<String>,
}

/// Strict JSON schema for [`ChainOutput`] under the current selection.
pub fn chain_output_schema(toolset: &Toolset) -> Value {
    let mut called: Vec<Value> = toolset
        .selected_tools()
        .iter()
        .map(ToolKind::input_schema)
        .collect();
    called.push(json!({"type": "null"}));

    let names: Vec<Value> = toolset
        .available_tool_names()
        .into_iter()
        .map(Value::from)
        .collect();

    json!({
        "type": "object",
        "title": CHAIN_SCHEMA_NAME,
        "description": CHAIN_DESCRIPTION,
        "properties": {
            "called_tool_input": {
                "description": CALLED_TOOL_DESCRIPTION,
                "anyOf": called
            },
            "remainder": {
                "type": "string",
                "description": REMAINDER_DESCRIPTION
            },
            "next_tool": {
                "description": NEXT_TOOL_DESCRIPTION,
                "anyOf": [
                    {"type": "string", "enum": names},
                    {"type": "null"}
                ]
            }
        },
        "required": ["called_tool_input", "remainder", "next_tool"],
        "additionalProperties": false
    })
}

impl ChainOutput {
    /// Check the chaining rules against the toolset. Messages are phrased
    /// for the model, since they are sent back on a re-ask.
    pub fn validate(&self, toolset: &Toolset) -> std::result::Result<(), String> {
        let remainder_empty = self.remainder.trim().is_empty();

        if !remainder_empty && self.next_tool.is_none() {
            return Err("If `remainder` is not empty, `next_tool` must not be `None`.".to_string());
        }
        if remainder_empty && self.next_tool.is_some() {
            return Err("If `remainder` is empty, `next_tool` must be `None`.".to_string());
        }

        if let Some(input) = &self.called_tool_input {
            let kind = input.kind();
            if kind == ToolKind::Respond && (!remainder_empty || self.next_tool.is_some()) {
                return Err("If `called_tool_input` calls `RespondTool`, `remainder` must be \
                    empty and `next_tool` must be `None`."
                    .to_string());
            }
            if !toolset.is_selected(kind) {
                return Err(format!(
                    "`called_tool_input` must call one of the Selected Tool(s): {}; got {kind}.",
                    toolset.selected_tool_names().join(", ")
                ));
            }
            input.validate()?;
        }

        if let Some(name) = &self.next_tool {
            let available = ToolKind::from_name(name).is_some_and(|kind| toolset.is_available(kind));
            if !available {
                return Err(format!(
                    "`next_tool` must be one of the Available Tool(s): {}; got {name}.",
                    toolset.available_tool_names().join(", ")
                ));
            }
        }

        Ok(())
    }

    /// The next tool, resolved against the toolset.
    pub fn next_kind(&self, toolset: &Toolset) -> Result<Option<ToolKind>> {
        self.next_tool
            .as_deref()
            .map(|name| toolset.get_tool(name))
            .transpose()
    }
}

/// Parse and validate a raw model reply.
pub fn parse_chain_output(text: &str, toolset: &Toolset) -> Result<ChainOutput> {
    let output: ChainOutput = serde_json::from_str(text.trim())
        .or_else(|_| serde_json::from_str(extract_json(text)))
        .map_err(|e| CoreError::InvalidOutput(format!("reply is not a valid {CHAIN_SCHEMA_NAME}: {e}")))?;
    output.validate(toolset).map_err(CoreError::InvalidOutput)?;
    Ok(output)
}

/// Pull the JSON object out of a reply that may be wrapped in a code fence
/// or surrounded by prose.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        let content_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let content = &after_fence[content_start..];
        if let Some(end) = content.find("```") {
            return content[..end].trim();
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            return &trimmed[start..=end];
        }
    }

    trimmed
}
