//! Tool availability by mode and the current selection.

use std::sync::Arc;

use jh_services::{ShoppingService, TaskService};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::tools::{self, Services, ToolInput, ToolKind, ToolOutput};

pub const DEFAULT_MODE: &str = "default";

/// Modes and the tools each one makes available.
pub const MODES: &[(&str, &[ToolKind])] = &[
    (
        "default",
        &[
            ToolKind::AddTasks,
            ToolKind::AddShoppingItems,
            ToolKind::ReadRecipe,
            ToolKind::Respond,
        ],
    ),
    ("shopping", &[ToolKind::AddShoppingItems, ToolKind::Respond]),
];

pub fn mode_names() -> Vec<&'static str> {
    MODES.iter().map(|(name, _)| *name).collect()
}

#[derive(Debug, Clone)]
pub struct Toolset {
    mode: String,
    available: Vec<ToolKind>,
    selected: Vec<ToolKind>,
    services: Services,
}

impl Toolset {
    pub fn new(mode: &str) -> Result<Self> {
        let available = tools_for_mode(mode)?;
        Ok(Self {
            mode: mode.to_string(),
            selected: available.clone(),
            available,
            services: Services::default(),
        })
    }

    /// Back tools with services. `None` keeps a tool side-effect free.
    pub fn with_services(
        mut self,
        shopping: Option<Arc<dyn ShoppingService>>,
        tasks: Option<Arc<dyn TaskService>>,
    ) -> Self {
        self.services = Services { shopping, tasks };
        self
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Switch modes; the selection resets to the new available tools.
    pub fn set_mode(&mut self, mode: &str) -> Result<()> {
        self.available = tools_for_mode(mode)?;
        self.selected = self.available.clone();
        self.mode = mode.to_string();
        Ok(())
    }

    pub fn all_tools(&self) -> &'static [ToolKind] {
        &ToolKind::ALL
    }

    pub fn available_tools(&self) -> &[ToolKind] {
        &self.available
    }

    pub fn selected_tools(&self) -> &[ToolKind] {
        &self.selected
    }

    /// Replace the selection; every tool must be available in this mode.
    pub fn set_selected_tools(&mut self, tools: &[ToolKind]) -> Result<()> {
        if let Some(tool) = tools.iter().find(|t| !self.available.contains(*t)) {
            return Err(CoreError::ToolNotAvailable {
                tool: tool.name().to_string(),
                mode: self.mode.clone(),
            });
        }
        self.selected = tools.to_vec();
        Ok(())
    }

    pub fn reset_selection(&mut self) {
        self.selected = self.available.clone();
    }

    pub fn all_tool_names(&self) -> Vec<&'static str> {
        names(self.all_tools())
    }

    pub fn available_tool_names(&self) -> Vec<&'static str> {
        names(&self.available)
    }

    pub fn selected_tool_names(&self) -> Vec<&'static str> {
        names(&self.selected)
    }

    pub fn is_available(&self, tool: ToolKind) -> bool {
        self.available.contains(&tool)
    }

    pub fn is_selected(&self, tool: ToolKind) -> bool {
        self.selected.contains(&tool)
    }

    pub fn get_tool(&self, name: &str) -> Result<ToolKind> {
        ToolKind::from_name(name).ok_or_else(|| CoreError::ToolNotFound(name.to_string()))
    }

    pub fn get_tool_by_input(&self, input: &ToolInput) -> ToolKind {
        input.kind()
    }

    pub fn input_schema(&self, name: &str) -> Result<Value> {
        Ok(self.get_tool(name)?.input_schema())
    }

    pub fn output_schema(&self, name: &str) -> Result<Value> {
        Ok(self.get_tool(name)?.output_schema())
    }

    pub async fn run(&self, input: &ToolInput) -> Result<ToolOutput> {
        tools::run(input, &self.services).await
    }
}

impl Default for Toolset {
    fn default() -> Self {
        let available = MODES[0].1.to_vec();
        Self {
            mode: DEFAULT_MODE.to_string(),
            selected: available.clone(),
            available,
            services: Services::default(),
        }
    }
}

fn tools_for_mode(mode: &str) -> Result<Vec<ToolKind>> {
    MODES
        .iter()
        .find(|(name, _)| *name == mode)
        .map(|(_, tools)| tools.to_vec())
        .ok_or_else(|| CoreError::UnknownMode {
            mode: mode.to_string(),
            available: mode_names().join(", "),
        })
}

fn names(tools: &[ToolKind]) -> Vec<&'static str> {
    tools.iter().map(ToolKind::name).collect()
}
