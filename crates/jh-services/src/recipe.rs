//! Mealie recipe model and Markdown rendering.

use serde::Deserialize;

/// A recipe as returned by `GET api/recipes/{slug}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub recipe_yield: Option<String>,
    #[serde(default)]
    pub recipe_servings: Option<f64>,
    #[serde(default)]
    pub recipe_ingredient: Vec<Ingredient>,
    #[serde(default)]
    pub recipe_instructions: Vec<Instruction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<Named>,
    #[serde(default)]
    pub food: Option<Named>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    /// Section heading shown above this ingredient.
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Named {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instruction {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
}

/// One hit from `GET api/recipes?search=...`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeSummary {
    pub name: String,
    pub slug: String,
}

/// Pick the hit whose name matches `name` case-insensitively, else the first.
pub fn best_match<'a>(hits: &'a [RecipeSummary], name: &str) -> Option<&'a RecipeSummary> {
    let wanted = name.trim().to_lowercase();
    hits.iter()
        .find(|hit| hit.name.trim().to_lowercase() == wanted)
        .or_else(|| hits.first())
}

/// Scale to apply: `target / recipeServings` when both are positive, else `scale_factor`.
pub fn effective_scale(recipe: &Recipe, scale_factor: f64, target_servings: Option<u32>) -> f64 {
    match (target_servings, recipe.recipe_servings) {
        (Some(target), Some(servings)) if target > 0 && servings > 0.0 => {
            f64::from(target) / servings
        }
        _ => scale_factor,
    }
}

/// Format a quantity with at most two decimals and no trailing zeros.
pub fn format_quantity(value: f64) -> String {
    let text = format!("{value:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Ingredient {
    /// Render one ingredient line, scaling the quantity when it is known.
    pub fn render(&self, scale: f64) -> String {
        let food = self.food.as_ref().map(|f| f.name.trim()).filter(|s| !s.is_empty());
        let quantity = self.quantity.filter(|q| *q > 0.0);

        if quantity.is_none() && food.is_none() {
            return non_empty(&self.display)
                .or_else(|| non_empty(&self.original_text))
                .or_else(|| non_empty(&self.note))
                .unwrap_or_default()
                .to_string();
        }

        let mut parts: Vec<String> = Vec::new();
        if let Some(q) = quantity {
            parts.push(format_quantity(q * scale));
        }
        if let Some(unit) = self.unit.as_ref().map(|u| u.name.trim()).filter(|s| !s.is_empty()) {
            parts.push(unit.to_string());
        }
        if let Some(food) = food {
            parts.push(food.to_string());
        }
        let mut line = parts.join(" ");
        if let Some(note) = non_empty(&self.note) {
            if line.is_empty() {
                line = note.to_string();
            } else {
                line.push_str(", ");
                line.push_str(note);
            }
        }
        line
    }
}

/// Render a recipe as Markdown.
pub fn render_markdown(recipe: &Recipe, scale: f64) -> String {
    let mut out = format!("# {}\n", recipe.name.trim());

    if let Some(description) = non_empty(&recipe.description) {
        out.push('\n');
        out.push_str(description);
        out.push('\n');
    }

    let servings = recipe
        .recipe_servings
        .filter(|s| *s > 0.0)
        .map(|s| format_quantity(s * scale));
    match (servings, non_empty(&recipe.recipe_yield)) {
        (Some(servings), _) => out.push_str(&format!("\nServings: {servings}\n")),
        (None, Some(yld)) => out.push_str(&format!("\nYield: {yld}\n")),
        (None, None) => {}
    }
    if (scale - 1.0).abs() > f64::EPSILON {
        out.push_str(&format!("Scaled by: {}\n", format_quantity(scale)));
    }

    if !recipe.recipe_ingredient.is_empty() {
        out.push_str("\n## Ingredients\n\n");
        for ingredient in &recipe.recipe_ingredient {
            if let Some(title) = non_empty(&ingredient.title) {
                out.push_str(&format!("\n### {title}\n\n"));
            }
            let line = ingredient.render(scale);
            if !line.is_empty() {
                out.push_str(&format!("- {line}\n"));
            }
        }
    }

    let steps: Vec<&Instruction> = recipe
        .recipe_instructions
        .iter()
        .filter(|step| !step.text.trim().is_empty())
        .collect();
    if !steps.is_empty() {
        out.push_str("\n## Instructions\n\n");
        for (i, step) in steps.iter().enumerate() {
            if let Some(title) = non_empty(&step.title) {
                out.push_str(&format!("\n### {title}\n\n"));
            }
            out.push_str(&format!("{}. {}\n", i + 1, step.text.trim()));
        }
    }

    out
}
