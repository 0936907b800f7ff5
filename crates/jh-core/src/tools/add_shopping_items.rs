use jh_services::ShoppingService;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::ToolOutput;
use crate::error::Result;

pub const SUMMARY: &str = "Add one or more individual shopping items to the shopping list.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddShoppingItemsInput {
    pub items: Vec<String>,
}

pub fn input_schema() -> Value {
    json!({
        "type": "object",
        "title": "AddShoppingItemsInputSchema",
        "description": "Input schema for AddShoppingItemsTool.\n\n\
            Use this tool for adding any and all items that need to be purchased. \
            For example, all groceries and regular purchases.",
        "properties": {
            "items": {
                "type": "array",
                "items": {"type": "string"},
                "description": "Individual shopping items to add. Do not capitalize items."
            }
        },
        "required": ["items"],
        "additionalProperties": false
    })
}

pub async fn run(
    input: &AddShoppingItemsInput,
    shopping: Option<&dyn ShoppingService>,
) -> Result<ToolOutput> {
    if let Some(service) = shopping {
        service.add_items(&input.items).await?;
        info!(count = input.items.len(), "added shopping items");
    }
    Ok(ToolOutput::result(format!(
        "Successfully added item(s): {}",
        input.items.join(", ")
    )))
}
