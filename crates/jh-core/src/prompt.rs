//! System prompt assembly.
//!
//! The prompt is laid out in three sections: identity and purpose, output
//! instructions, and extra context supplied by providers that are re-read on
//! every step.

use crate::toolset::Toolset;

pub const ASSISTANT_BACKGROUND: &[&str] = &[
    "You are an assistant who helps address user input queries by sequentially calling tools to perform actions.",
];

pub const OUTPUT_INSTRUCTIONS: &[&str] = &[
    "Analyze the user input query to fill out ChainToolOutputSchema.",
    "Make sure to follow the instructions in the schema EXACTLY.",
];

const STANDARD_INSTRUCTIONS: &[&str] = &[
    "Always respond using the proper JSON schema.",
    "Always use the available additional information and context to enhance the response.",
];

/// A titled block of dynamic context.
pub trait ContextProvider {
    fn title(&self) -> &str;
    fn info(&self) -> String;
}

/// "- Name: summary" for each available tool.
pub struct AvailableToolsProvider<'a> {
    toolset: &'a Toolset,
}

impl<'a> AvailableToolsProvider<'a> {
    pub fn new(toolset: &'a Toolset) -> Self {
        Self { toolset }
    }
}

impl ContextProvider for AvailableToolsProvider<'_> {
    fn title(&self) -> &str {
        "Available Tool(s)"
    }

    fn info(&self) -> String {
        self.toolset
            .available_tools()
            .iter()
            .map(|tool| format!("- {}: {}", tool.name(), tool.summary()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// "- Name" for each selected tool.
pub struct SelectedToolsProvider<'a> {
    toolset: &'a Toolset,
}

impl<'a> SelectedToolsProvider<'a> {
    pub fn new(toolset: &'a Toolset) -> Self {
        Self { toolset }
    }
}

impl ContextProvider for SelectedToolsProvider<'_> {
    fn title(&self) -> &str {
        "Selected Tool(s)"
    }

    fn info(&self) -> String {
        self.toolset
            .selected_tools()
            .iter()
            .map(|tool| format!("- {}", tool.name()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemPrompt {
    pub background: Vec<String>,
    pub steps: Vec<String>,
    pub output_instructions: Vec<String>,
}

impl SystemPrompt {
    /// Prompt for the tool-chaining assistant.
    pub fn assistant() -> Self {
        Self {
            background: ASSISTANT_BACKGROUND.iter().map(|s| s.to_string()).collect(),
            steps: Vec::new(),
            output_instructions: OUTPUT_INSTRUCTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn render(&self, providers: &[&dyn ContextProvider]) -> String {
        let mut sections: Vec<String> = Vec::new();

        if !self.background.is_empty() {
            sections.push(format!("# IDENTITY and PURPOSE\n{}", bullets(&self.background)));
        }
        if !self.steps.is_empty() {
            sections.push(format!("# INTERNAL ASSISTANT STEPS\n{}", bullets(&self.steps)));
        }

        let mut instructions = self.output_instructions.clone();
        instructions.extend(STANDARD_INSTRUCTIONS.iter().map(|s| s.to_string()));
        sections.push(format!("# OUTPUT INSTRUCTIONS\n{}", bullets(&instructions)));

        if !providers.is_empty() {
            let context: Vec<String> = providers
                .iter()
                .map(|p| format!("## {}\n{}", p.title(), p.info()))
                .collect();
            sections.push(format!("# EXTRA INFORMATION AND CONTEXT\n{}", context.join("\n\n")));
        }

        sections.join("\n\n")
    }

    /// Render with the available and selected tool providers.
    pub fn render_for(&self, toolset: &Toolset) -> String {
        let available = AvailableToolsProvider::new(toolset);
        let selected = SelectedToolsProvider::new(toolset);
        self.render(&[&available, &selected])
    }
}

fn bullets(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("- {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolKind;

    #[test]
    fn sections_in_order() {
        let prompt = SystemPrompt::assistant().render_for(&Toolset::default());
        let identity = prompt.find("# IDENTITY and PURPOSE").unwrap();
        let output = prompt.find("# OUTPUT INSTRUCTIONS").unwrap();
        let extra = prompt.find("# EXTRA INFORMATION AND CONTEXT").unwrap();
        assert!(identity < output && output < extra);
        assert!(!prompt.contains("INTERNAL ASSISTANT STEPS"));
        assert!(prompt.contains("- Analyze the user input query to fill out ChainToolOutputSchema."));
        assert!(prompt.contains("- Always respond using the proper JSON schema."));
    }

    #[test]
    fn lists_available_and_selected_tools() {
        let mut toolset = Toolset::default();
        toolset.set_selected_tools(&[ToolKind::ReadRecipe]).unwrap();
        let prompt = SystemPrompt::assistant().render_for(&toolset);

        assert!(prompt.contains(
            "## Available Tool(s)\n- AddTasksTool: Add one or more independent tasks to the task list.\n"
        ));
        assert!(prompt.contains("- RespondTool: Respond to the user, such as by answering a question or explaining."));
        assert!(prompt.ends_with("## Selected Tool(s)\n- ReadRecipeTool"));
    }

    #[test]
    fn shopping_mode_hides_other_tools() {
        let toolset = Toolset::new("shopping").unwrap();
        let info = AvailableToolsProvider::new(&toolset).info();
        assert!(!info.contains("AddTasksTool"));
        assert_eq!(info.lines().count(), 2);
    }

    #[test]
    fn steps_section_when_present() {
        let prompt = SystemPrompt {
            steps: vec!["Think.".to_string()],
            ..SystemPrompt::assistant()
        }
        .render(&[]);
        assert!(prompt.contains("# INTERNAL ASSISTANT STEPS\n- Think."));
        assert!(!prompt.contains("EXTRA INFORMATION"));
    }
}
