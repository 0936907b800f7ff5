//! Tool-chaining assistant.
//!
//! Each query is handled as a chain: the model picks one selected tool to
//! call, hands back the unaddressed remainder of the query and names the next
//! tool. The loop runs the call, narrows the selection to the next tool and
//! repeats with the remainder until no next tool is named.

use std::sync::Arc;

use jh_backend::{collect_reply, ChatBackend, OpenAiClient};
use jh_protocol::{ChatMessage, ChatRequest, ResponseFormat};
use jh_services::{Mealie, Obsidian, ShoppingService, TaskService};
use serde_json::json;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::Config;
use crate::error::{CoreError, Result};
use crate::journal::Journal;
use crate::prompt::SystemPrompt;
use crate::schema::{chain_output_schema, parse_chain_output, ChainOutput, CHAIN_SCHEMA_NAME};
use crate::toolset::Toolset;
use crate::tools::ToolOutput;

pub const DONE: &str = "Done.";

#[derive(Debug, Clone, PartialEq)]
pub struct AssistantSettings {
    pub model: String,
    pub temperature: f32,
    pub max_steps: usize,
    pub max_retries: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: jh_backend::openai::DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_steps: 10,
            max_retries: 2,
        }
    }
}

pub struct Assistant {
    backend: Arc<dyn ChatBackend>,
    toolset: Toolset,
    settings: AssistantSettings,
    prompt: SystemPrompt,
    history: Vec<ChatMessage>,
    journal: Journal,
}

impl Assistant {
    pub fn new(backend: Arc<dyn ChatBackend>, toolset: Toolset) -> Self {
        Self {
            backend,
            toolset,
            settings: AssistantSettings::default(),
            prompt: SystemPrompt::assistant(),
            history: Vec::new(),
            journal: Journal::noop(),
        }
    }

    pub fn with_settings(mut self, settings: AssistantSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Build the backend, services, toolset and journal from configuration.
    /// Mealie and Obsidian are wired in only when their credentials are set.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .assistant
            .resolve_api_key()
            .map_err(|e| CoreError::Config(e.to_string()))?;
        let backend = OpenAiClient::with_base_url(api_key, config.assistant.base_url.clone());

        let (shopping, tasks) = build_services(config);
        let toolset = Toolset::new(&config.assistant.mode)?.with_services(shopping, tasks);

        let journal = if config.journal.enabled {
            let path = config.journal.resolve_path();
            Journal::new(&path).unwrap_or_else(|e| {
                warn!("failed to open journal at {}: {e}", path.display());
                Journal::noop()
            })
        } else {
            Journal::noop()
        };

        let settings = AssistantSettings {
            model: config.assistant.model.clone(),
            temperature: config.assistant.temperature,
            max_steps: config.assistant.max_steps,
            max_retries: config.assistant.max_retries,
        };

        Ok(Self::new(Arc::new(backend), toolset)
            .with_settings(settings)
            .with_journal(journal))
    }

    pub fn toolset(&self) -> &Toolset {
        &self.toolset
    }

    pub fn settings(&self) -> &AssistantSettings {
        &self.settings
    }

    /// Conversation so far: alternating user and assistant turns.
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Handle one user query and return the text to show the user.
    pub async fn run(&mut self, query: &str) -> Result<String> {
        self.journal.log_query(query);
        let result = self.run_chain(query).await;
        match &result {
            Ok(response) => self.journal.log_response(response),
            Err(e) => self.journal.log_error(&e.to_string()),
        }
        result
    }

    async fn run_chain(&mut self, query: &str) -> Result<String> {
        self.toolset.reset_selection();
        let mut query = query.to_string();

        for step in 1..=self.settings.max_steps {
            let span = info_span!("step", step, selected = ?self.toolset.selected_tool_names());
            let output = self.next_output(&query).instrument(span).await?;
            self.journal.log_step(step, &output);

            let mut tool_output: Option<ToolOutput> = None;
            if let Some(input) = &output.called_tool_input {
                let tool = input.kind();
                info!(step, %tool, "calling tool");
                let result = self.toolset.run(input).await?;
                self.journal.log_tool_result(step, tool.name(), &result);
                tool_output = Some(result);
            }

            let Some(next) = output.next_kind(&self.toolset)? else {
                let response = tool_output
                    .as_ref()
                    .and_then(ToolOutput::response)
                    .unwrap_or(DONE);
                return Ok(response.to_string());
            };

            debug!(step, next = %next, remainder = %output.remainder, "chaining");
            query = output.remainder;
            self.toolset.set_selected_tools(&[next])?;
        }

        Err(CoreError::StepLimit(self.settings.max_steps))
    }

    /// Ask the model for the next step, re-asking with the validation error
    /// when the reply does not fit the schema.
    async fn next_output(&mut self, query: &str) -> Result<ChainOutput> {
        let user_turn = ChatMessage::user(json!({ "query": query }).to_string());
        let system_prompt = self.prompt.render_for(&self.toolset);
        let format = ResponseFormat::json_schema(CHAIN_SCHEMA_NAME, chain_output_schema(&self.toolset));

        let mut messages = self.history.clone();
        messages.push(user_turn.clone());

        let mut attempt = 0;
        loop {
            let request = ChatRequest::new(self.settings.model.clone())
                .with_system_prompt(system_prompt.clone())
                .with_messages(messages.clone())
                .with_temperature(self.settings.temperature)
                .with_response_format(format.clone());

            let reply = collect_reply(self.backend.send(&request)).await?;
            debug!(
                input_tokens = reply.input_tokens,
                output_tokens = reply.output_tokens,
                "model reply"
            );

            match parse_chain_output(&reply.text, &self.toolset) {
                Ok(output) => {
                    self.history.push(user_turn);
                    self.history.push(ChatMessage::assistant(serde_json::to_string(&output)?));
                    return Ok(output);
                }
                Err(CoreError::InvalidOutput(reason)) if attempt < self.settings.max_retries => {
                    attempt += 1;
                    warn!(attempt, %reason, "re-asking after invalid output");
                    messages.push(ChatMessage::assistant(reply.text));
                    messages.push(ChatMessage::user(format!(
                        "Validation Error found:\n{reason}\nRecall the function correctly, fix the errors"
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("toolset", &self.toolset)
            .field("settings", &self.settings)
            .field("history", &self.history.len())
            .field("journal", &self.journal)
            .finish_non_exhaustive()
    }
}

/// Service clients for whatever is configured.
pub fn build_services(
    config: &Config,
) -> (Option<Arc<dyn ShoppingService>>, Option<Arc<dyn TaskService>>) {
    let shopping = config.mealie.credentials().map(|(url, key)| {
        Arc::new(Mealie::new(url, key, config.mealie.shopping_list_id.clone())) as Arc<dyn ShoppingService>
    });
    let tasks = config.obsidian.credentials().map(|(owner, repo, token)| {
        Arc::new(
            Obsidian::new(owner, repo, &config.obsidian.branch, token)
                .with_tasks_folder(config.obsidian.tasks_folder.clone()),
        ) as Arc<dyn TaskService>
    });
    debug!(
        mealie = shopping.is_some(),
        obsidian = tasks.is_some(),
        "configured services"
    );
    (shopping, tasks)
}
