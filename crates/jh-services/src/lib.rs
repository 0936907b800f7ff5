//! jh-services: clients for the external services the assistant acts on.
//!
//! - [`Mealie`]: recipes, foods and the household shopping list.
//! - [`Obsidian`]: an Obsidian vault synced to a GitHub repository.
//!
//! The assistant's tools talk to these through the [`ShoppingService`] and
//! [`TaskService`] traits so they can be swapped out in tests.

use async_trait::async_trait;

pub mod error;
pub mod http;
pub mod mealie;
pub mod obsidian;
pub mod recipe;
pub mod time;

pub use error::{Result, ServiceError};
pub use mealie::Mealie;
pub use obsidian::Obsidian;

/// Shopping list and recipe operations used by the assistant.
#[async_trait]
pub trait ShoppingService: Send + Sync {
    /// Parse free-text item names and add them to the shopping list.
    async fn add_items(&self, items: &[String]) -> Result<()>;

    /// Render a recipe as Markdown, scaled by `scale_factor` or to `target_servings`.
    async fn read_recipe(
        &self,
        recipe_name: &str,
        scale_factor: f64,
        target_servings: Option<u32>,
    ) -> Result<String>;
}

/// Task list operations used by the assistant.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn add_tasks(&self, tasks: &[String]) -> Result<()>;
}
