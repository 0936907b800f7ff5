//! Tools the assistant can call, with their JSON schemas.
//!
//! Every tool has a stable name (`AddTasksTool`, ...), a one-line summary
//! shown to the model, an input schema and an output schema. Inputs arrive
//! from the model as bare JSON objects and are told apart by their fields.

pub mod add_shopping_items;
pub mod add_tasks;
pub mod read_recipe;
pub mod respond;

use std::fmt;
use std::sync::Arc;

use jh_services::{ShoppingService, TaskService};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{CoreError, Result};

pub use add_shopping_items::AddShoppingItemsInput;
pub use add_tasks::AddTasksInput;
pub use read_recipe::ReadRecipeInput;
pub use respond::RespondInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    AddTasks,
    AddShoppingItems,
    ReadRecipe,
    Respond,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::AddTasks,
        ToolKind::AddShoppingItems,
        ToolKind::ReadRecipe,
        ToolKind::Respond,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::AddTasks => "AddTasksTool",
            ToolKind::AddShoppingItems => "AddShoppingItemsTool",
            ToolKind::ReadRecipe => "ReadRecipeTool",
            ToolKind::Respond => "RespondTool",
        }
    }

    /// One-line description listed under the available tools.
    pub fn summary(&self) -> &'static str {
        match self {
            ToolKind::AddTasks => add_tasks::SUMMARY,
            ToolKind::AddShoppingItems => add_shopping_items::SUMMARY,
            ToolKind::ReadRecipe => read_recipe::SUMMARY,
            ToolKind::Respond => respond::SUMMARY,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn input_schema(&self) -> Value {
        match self {
            ToolKind::AddTasks => add_tasks::input_schema(),
            ToolKind::AddShoppingItems => add_shopping_items::input_schema(),
            ToolKind::ReadRecipe => read_recipe::input_schema(),
            ToolKind::Respond => respond::input_schema(),
        }
    }

    pub fn output_schema(&self) -> Value {
        match self {
            ToolKind::Respond => respond::output_schema(),
            other => result_schema(other.result_description()),
        }
    }

    fn result_description(&self) -> &'static str {
        match self {
            ToolKind::AddTasks => "Confirmation message after adding the tasks.",
            ToolKind::AddShoppingItems => "Confirmation message after adding the items.",
            ToolKind::ReadRecipe => "Recipe in Markdown format, or a fallback message.",
            ToolKind::Respond => "The response to the user.",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output schema shared by the tools that return a single `result` string.
fn result_schema(description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "result": {"type": "string", "description": description}
        },
        "required": ["result"],
        "additionalProperties": false
    })
}

/// Arguments for one tool call. Variants are tried in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolInput {
    AddTasks(AddTasksInput),
    AddShoppingItems(AddShoppingItemsInput),
    ReadRecipe(ReadRecipeInput),
    Respond(RespondInput),
}

impl ToolInput {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolInput::AddTasks(_) => ToolKind::AddTasks,
            ToolInput::AddShoppingItems(_) => ToolKind::AddShoppingItems,
            ToolInput::ReadRecipe(_) => ToolKind::ReadRecipe,
            ToolInput::Respond(_) => ToolKind::Respond,
        }
    }

    /// Constraints the JSON schema cannot express in strict mode.
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            ToolInput::AddTasks(input) if input.tasks.is_empty() => {
                Err("`tasks` must contain at least one task.".to_string())
            }
            ToolInput::AddShoppingItems(input) if input.items.is_empty() => {
                Err("`items` must contain at least one item.".to_string())
            }
            ToolInput::ReadRecipe(input) if input.recipe_name.trim().is_empty() => {
                Err("`recipe_name` must not be empty.".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Result of running a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Result { result: String },
    Respond { response: Option<String> },
}

impl ToolOutput {
    pub fn result(text: impl Into<String>) -> Self {
        ToolOutput::Result {
            result: text.into(),
        }
    }

    /// Text to show the user, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ToolOutput::Result { result } => Some(result),
            ToolOutput::Respond { response } => response.as_deref(),
        }
    }

    /// The reflected response, for `RespondTool` outputs only.
    pub fn response(&self) -> Option<&str> {
        match self {
            ToolOutput::Respond { response } => response.as_deref(),
            ToolOutput::Result { .. } => None,
        }
    }
}

/// External services the tools act on. Missing services make the tools
/// report success without side effects.
#[derive(Clone, Default)]
pub struct Services {
    pub shopping: Option<Arc<dyn ShoppingService>>,
    pub tasks: Option<Arc<dyn TaskService>>,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("shopping", &self.shopping.is_some())
            .field("tasks", &self.tasks.is_some())
            .finish()
    }
}

/// Run one tool call against `services`.
pub async fn run(input: &ToolInput, services: &Services) -> Result<ToolOutput> {
    input.validate().map_err(CoreError::InvalidOutput)?;
    let output = match input {
        ToolInput::AddTasks(input) => add_tasks::run(input, services.tasks.as_deref()).await?,
        ToolInput::AddShoppingItems(input) => {
            add_shopping_items::run(input, services.shopping.as_deref()).await?
        }
        ToolInput::ReadRecipe(input) => read_recipe::run(input, services.shopping.as_deref()).await?,
        ToolInput::Respond(input) => respond::run(input),
    };
    Ok(output)
}
