use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::ToolOutput;

pub const SUMMARY: &str = "Respond to the user, such as by answering a question or explaining.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondInput {
    // Present but possibly null.
    #[serde(deserialize_with = "Option::deserialize")]
    pub response: Option<String>,
}

pub fn input_schema() -> Value {
    json!({
        "type": "object",
        "title": "RespondInputSchema",
        "description": "Input schema for RespondTool.\n\n\
            Use RespondTool to send a response to the user if none of the other \
            Available Tool(s) are applicable to address the user query. For example, \
            use this to answer questions, or to explain to the user that you do not \
            know how to address their query. If called, this should always be the last \
            tool because it responds to the user.",
        "properties": {
            "response": {
                "type": ["string", "null"],
                "description": "The concise response to be sent addressing the entirety of the \
                    user query. \
                    This input value will be directly reflected to the user. \
                    Do not make up answers for the sake of responding. \
                    If you do not know the answer, say so honestly."
            }
        },
        "required": ["response"],
        "additionalProperties": false
    })
}

pub fn output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "response": {"type": ["string", "null"], "description": "The response to the user."}
        },
        "required": ["response"],
        "additionalProperties": false
    })
}

pub fn run(input: &RespondInput) -> ToolOutput {
    ToolOutput::Respond {
        response: input.response.clone(),
    }
}
