use jh_services::ShoppingService;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use super::ToolOutput;
use crate::error::Result;

pub const SUMMARY: &str = "Read a recipe.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadRecipeInput {
    pub recipe_name: String,
    /// `null` or missing means 1.
    #[serde(default = "default_scale", deserialize_with = "scale_or_default")]
    pub scale_factor: f64,
    #[serde(default)]
    pub target_servings: Option<u32>,
}

fn default_scale() -> f64 {
    1.0
}

fn scale_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_scale))
}

impl ReadRecipeInput {
    pub fn new(recipe_name: impl Into<String>) -> Self {
        Self {
            recipe_name: recipe_name.into(),
            scale_factor: default_scale(),
            target_servings: None,
        }
    }
}

pub fn input_schema() -> Value {
    json!({
        "type": "object",
        "title": "ReadRecipeInputSchema",
        "description": "Input schema for ReadRecipeTool.\n\n\
            Use this tool to read a Markdown-formatted recipe.",
        "properties": {
            "recipe_name": {
                "type": "string",
                "description": "Name of the recipe to retrieve."
            },
            "scale_factor": {
                "type": ["number", "null"],
                "description": "The factor by which to scale the recipe ingredients (default: 1)."
            },
            "target_servings": {
                "type": ["integer", "null"],
                "description": "The desired number of servings to scale the recipe to (optional)."
            }
        },
        "required": ["recipe_name", "scale_factor", "target_servings"],
        "additionalProperties": false
    })
}

pub async fn run(input: &ReadRecipeInput, shopping: Option<&dyn ShoppingService>) -> Result<ToolOutput> {
    let text = match shopping {
        Some(service) => {
            service
                .read_recipe(&input.recipe_name, input.scale_factor, input.target_servings)
                .await?
        }
        None => format!(
            "Mealie instance not available to read recipe '{}'.",
            input.recipe_name
        ),
    };
    Ok(ToolOutput::result(text))
}
