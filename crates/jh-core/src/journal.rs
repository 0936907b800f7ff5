//! Append-only JSONL journal of assistant activity.
//!
//! One JSON object per line: queries, chain steps, tool results, final
//! responses and errors, tagged with a session id.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};

use crate::schema::ChainOutput;
use crate::tools::ToolOutput;

pub struct Journal {
    writer: Option<BufWriter<File>>,
    session_id: String,
}

impl Journal {
    /// Open (or create) the journal at `path`, creating parent directories.
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            session_id: generate_session_id(),
        })
    }

    /// A journal that discards everything.
    pub fn noop() -> Self {
        Self {
            writer: None,
            session_id: generate_session_id(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn log_query(&mut self, query: &str) {
        self.write_event("query", json!({ "query": query }));
    }

    pub fn log_step(&mut self, step: usize, output: &ChainOutput) {
        self.write_event(
            "step",
            json!({
                "step": step,
                "tool": output.called_tool_input.as_ref().map(|i| i.kind().name()),
                "input": output.called_tool_input,
                "remainder": output.remainder,
                "next_tool": output.next_tool,
            }),
        );
    }

    pub fn log_tool_result(&mut self, step: usize, tool: &str, output: &ToolOutput) {
        self.write_event(
            "tool_result",
            json!({ "step": step, "tool": tool, "output": output }),
        );
    }

    pub fn log_response(&mut self, response: &str) {
        self.write_event("response", json!({ "response": response }));
    }

    pub fn log_error(&mut self, error: &str) {
        self.write_event("error", json!({ "error": error }));
    }

    fn write_event(&mut self, kind: &str, fields: Value) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let mut event = json!({
            "ts": Utc::now().to_rfc3339(),
            "session": self.session_id,
            "type": kind,
        });
        if let (Some(event), Value::Object(fields)) = (event.as_object_mut(), fields) {
            event.extend(fields);
        }
        if let Ok(line) = serde_json::to_string(&event) {
            let _ = writeln!(writer, "{line}");
            let _ = writer.flush();
        }
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("session_id", &self.session_id)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

fn generate_session_id() -> String {
    let pid = std::process::id();
    let millis = Utc::now().timestamp_millis() as u64;
    format!("s{:x}", u64::from(pid) ^ millis)
}
