//! Mealie REST client: foods, shopping list and recipes.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::error::{Result, ServiceError};
use crate::http::{auth_headers, ApiClient};
use crate::recipe::{self, Recipe, RecipeSummary};
use crate::ShoppingService;

/// Initial page size when loading foods.
pub const N_FOODS: usize = 500;
/// Page size when paging through shopping items.
pub const N_ITEMS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Food {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A shopping-list item. Unknown fields are carried through untouched so that
/// parsed ingredients can be posted back as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shopping_list_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ShoppingItem {
    pub fn with_note(note: impl Into<String>) -> Self {
        Self {
            note: Some(note.into()),
            ..Self::default()
        }
    }

    pub fn has_list_id(&self) -> bool {
        self.shopping_list_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub next: Option<String>,
}

/// Response of the bulk-create endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    #[serde(default)]
    pub created_items: Vec<ShoppingItem>,
    #[serde(default)]
    pub updated_items: Vec<ShoppingItem>,
    #[serde(default)]
    pub deleted_items: Vec<ShoppingItem>,
}

impl BulkResult {
    /// IDs of created and updated items.
    pub fn touched_ids(&self) -> Vec<String> {
        self.created_items
            .iter()
            .chain(&self.updated_items)
            .filter_map(|item| item.id.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
struct Cache {
    shopping_list_id: Option<String>,
    foods: Vec<Food>,
    shopping_items: Option<Vec<ShoppingItem>>,
}

/// Client for a Mealie instance.
#[derive(Debug)]
pub struct Mealie {
    api: ApiClient,
    cache: Mutex<Cache>,
}

impl Mealie {
    pub fn new(api_url: &str, api_key: &str, shopping_list_id: Option<String>) -> Self {
        let api = ApiClient::new(
            api_url,
            auth_headers(&format!("Bearer {api_key}"), "application/json"),
        );
        Self {
            api,
            cache: Mutex::new(Cache {
                shopping_list_id: shopping_list_id.filter(|id| !id.is_empty()),
                ..Cache::default()
            }),
        }
    }

    /// Build from `MEALIE_API_URL`, `MEALIE_API_KEY` and `MEALIE_SHOPPING_LIST_ID`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self::new(
            &var("MEALIE_API_URL"),
            &var("MEALIE_API_KEY"),
            std::env::var("MEALIE_SHOPPING_LIST_ID").ok(),
        )
    }

    pub fn api_url(&self) -> &str {
        self.api.base_url()
    }

    fn cache(&self) -> MutexGuard<'_, Cache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn shopping_list_id(&self) -> Option<String> {
        self.cache().shopping_list_id.clone()
    }

    /// Change the target shopping list; a different ID drops cached items.
    pub fn set_shopping_list_id(&self, id: Option<String>) {
        let id = id.filter(|id| !id.is_empty());
        let mut cache = self.cache();
        if cache.shopping_list_id != id {
            cache.shopping_items = None;
        }
        cache.shopping_list_id = id;
    }

    /// Load all foods, refetching once with a larger page if the first page
    /// did not cover `total`.
    pub async fn load_foods(&self, initial_per_page: usize, force: bool) -> Result<Vec<Food>> {
        {
            let cache = self.cache();
            if !force && !cache.foods.is_empty() {
                return Ok(cache.foods.clone());
            }
        }

        let mut page: Page<Food> = self.fetch_foods(initial_per_page).await?;
        if let Some(total) = page.total.filter(|total| *total > initial_per_page) {
            debug!(total, "refetching foods with full page size");
            page = self.fetch_foods(total).await?;
        }

        let foods = page.items;
        self.cache().foods = foods.clone();
        Ok(foods)
    }

    async fn fetch_foods(&self, per_page: usize) -> Result<Page<Food>> {
        let query = [
            ("page", "1".to_string()),
            ("perPage", per_page.to_string()),
            ("orderBy", "name".to_string()),
            ("orderDirection", "asc".to_string()),
        ];
        let value = self.api.get("api/foods", &query).await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn foods(&self) -> Result<Vec<Food>> {
        self.load_foods(N_FOODS, false).await
    }

    /// Load unchecked shopping items, filtered to the configured list if any.
    pub async fn load_shopping_items(&self, per_page: usize, force: bool) -> Result<Vec<ShoppingItem>> {
        if !force {
            if let Some(items) = &self.cache().shopping_items {
                return Ok(items.clone());
            }
        }

        let mut items = Vec::new();
        let mut page_number = 1usize;
        loop {
            let query = [
                ("page", page_number.to_string()),
                ("perPage", per_page.to_string()),
                ("orderBy", "checked".to_string()),
                ("orderDirection", "asc".to_string()),
            ];
            let value = self.api.get("api/households/shopping/items", &query).await?;
            let page: Page<ShoppingItem> = serde_json::from_value(value)?;

            let unchecked: Vec<ShoppingItem> =
                page.items.into_iter().filter(|item| !item.checked).collect();
            let fetched = unchecked.len();
            items.extend(unchecked);

            if fetched < per_page || page.next.is_none() {
                break;
            }
            page_number += 1;
        }

        let mut cache = self.cache();
        if let Some(list_id) = &cache.shopping_list_id {
            items.retain(|item| item.shopping_list_id.as_deref() == Some(list_id.as_str()));
        }
        debug!(count = items.len(), pages = page_number, "loaded shopping items");
        cache.shopping_items = Some(items.clone());
        Ok(items)
    }

    pub async fn shopping_items(&self) -> Result<Vec<ShoppingItem>> {
        self.load_shopping_items(N_ITEMS, false).await
    }

    /// Bulk-add items, stamping each with the configured shopping list.
    pub async fn add_shopping_items(&self, mut items: Vec<ShoppingItem>) -> Result<BulkResult> {
        let list_id = self.shopping_list_id();
        for item in &mut items {
            if let Some(id) = &list_id {
                item.shopping_list_id = Some(id.clone());
            }
            if !item.has_list_id() {
                return Err(ServiceError::MissingShoppingList);
            }
        }

        let value = self
            .api
            .post("api/households/shopping/items/create-bulk", &items)
            .await?;
        let result: BulkResult = serde_json::from_value(value)?;
        info!(
            created = result.created_items.len(),
            updated = result.updated_items.len(),
            "added shopping items"
        );
        self.cache().shopping_items = None;
        Ok(result)
    }

    pub async fn delete_shopping_items(&self, ids: &[String]) -> Result<Value> {
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        let value = self
            .api
            .delete::<_, ()>("api/households/shopping/items", Some(&query), None)
            .await?;
        self.cache().shopping_items = None;
        Ok(value)
    }

    /// Run free-text item names through Mealie's NLP ingredient parser.
    pub async fn parse_items(&self, names: &[String]) -> Result<Vec<ShoppingItem>> {
        let body = json!({ "parser": "nlp", "ingredients": names });
        let value = self.api.post("api/parser/ingredients", &body).await?;
        let entries = value
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| ServiceError::Unexpected("parser response is not a list".to_string()))?;

        entries
            .iter()
            .map(|entry| {
                let ingredient = entry
                    .get("ingredient")
                    .cloned()
                    .ok_or_else(|| ServiceError::Unexpected("parsed entry has no ingredient".to_string()))?;
                Ok(serde_json::from_value(ingredient)?)
            })
            .collect()
    }

    /// Find a recipe by name and fetch it in full.
    pub async fn find_recipe(&self, name: &str) -> Result<Recipe> {
        let value = self
            .api
            .get("api/recipes", &[("search", name), ("page", "1"), ("perPage", "10")])
            .await?;
        let page: Page<RecipeSummary> = serde_json::from_value(value)?;
        let hit = recipe::best_match(&page.items, name)
            .ok_or_else(|| ServiceError::NotFound(format!("recipe '{name}'")))?;

        let value = self.api.fetch(&format!("api/recipes/{}", hit.slug)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Render a recipe as Markdown, scaled by servings or by factor.
    pub async fn read_recipe(
        &self,
        name: &str,
        scale_factor: f64,
        target_servings: Option<u32>,
    ) -> Result<String> {
        let recipe = self.find_recipe(name).await?;
        let scale = recipe::effective_scale(&recipe, scale_factor, target_servings);
        debug!(recipe = %recipe.slug, scale, "rendering recipe");
        Ok(recipe::render_markdown(&recipe, scale))
    }
}

#[async_trait]
impl ShoppingService for Mealie {
    async fn add_items(&self, items: &[String]) -> Result<()> {
        let parsed = self.parse_items(items).await?;
        self.add_shopping_items(parsed).await?;
        Ok(())
    }

    async fn read_recipe(
        &self,
        recipe_name: &str,
        scale_factor: f64,
        target_servings: Option<u32>,
    ) -> Result<String> {
        Mealie::read_recipe(self, recipe_name, scale_factor, target_servings).await
    }
}
