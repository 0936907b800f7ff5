use jh_services::TaskService;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::ToolOutput;
use crate::error::Result;

pub const SUMMARY: &str = "Add one or more independent tasks to the task list.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddTasksInput {
    pub tasks: Vec<String>,
}

pub fn input_schema() -> Value {
    json!({
        "type": "object",
        "title": "AddTasksInputSchema",
        "description": "Input schema for AddTasksTool.\n\n\
            Use this tool for adding one or more tasks, action items, or to-dos. \
            Do NOT use this tool for adding tasks to purchase shopping items.",
        "properties": {
            "tasks": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Individual tasks to add, with all applicable context. \
                    The first word of each task should be capitalized. \
                    Each task should be written in the imperative mood, as if \
                    written by the user for the user to perform. \
                    If requested by the user to add or remind of a task, extract the \
                    task and do not use 'add' or 'remind' as the task."
            }
        },
        "required": ["tasks"],
        "additionalProperties": false
    })
}

pub async fn run(input: &AddTasksInput, tasks: Option<&dyn TaskService>) -> Result<ToolOutput> {
    if let Some(service) = tasks {
        service.add_tasks(&input.tasks).await?;
        info!(count = input.tasks.len(), "added tasks");
    }
    Ok(ToolOutput::result(format!(
        "Successfully added task(s): {}",
        input.tasks.join(", ")
    )))
}
