//! Model provider seam — the opaque turn-taking collaborator.
//!
//! The engine never talks to an LLM API directly; it hands the conversation
//! and the admissible tool prompt to a [`ModelProvider`] and acts on the
//! reply. Providers live outside this crate (HTTP, local inference, test
//! scripts) behind this trait.

use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Message role within a turn's conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One conversation message fed to the provider each round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
        }
    }
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
}

/// What the model emitted for one round.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelReply {
    /// The model wants tools run before it can answer. `text` carries any
    /// partial answer emitted alongside the requests; `parallel` asks for
    /// batch execution.
    ToolCalls {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        calls: Vec<ToolCallRequest>,
        #[serde(default)]
        parallel: bool,
    },
    /// Final answer; the turn is over.
    Final { text: String },
}

/// Turn-taking collaborator producing one reply per round.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn next_reply(&self, conversation: &[ChatMessage], tool_prompt: &str) -> Result<ModelReply>;
}

/// Provider that replays a fixed script of replies.
///
/// Used by tests and offline harnesses; once the script is exhausted it
/// keeps producing an empty final answer.
#[derive(Debug)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ModelReply>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn next_reply(
        &self,
        _conversation: &[ChatMessage],
        _tool_prompt: &str,
    ) -> Result<ModelReply> {
        let reply = match self.replies.lock() {
            Ok(mut replies) => replies.pop_front(),
            Err(_) => None,
        };
        Ok(reply.unwrap_or(ModelReply::Final {
            text: String::new(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new(vec![
            ModelReply::ToolCalls {
                text: None,
                calls: vec![ToolCallRequest {
                    tool_name: "search_jobs".to_string(),
                    args: json!({"query": "fitter"}),
                }],
                parallel: false,
            },
            ModelReply::Final {
                text: "done".to_string(),
            },
        ]);

        let first = provider.next_reply(&[], "").await.unwrap();
        assert!(matches!(first, ModelReply::ToolCalls { .. }));

        let second = provider.next_reply(&[], "").await.unwrap();
        assert!(matches!(second, ModelReply::Final { text } if text == "done"));

        // Exhausted script keeps ending the turn.
        let third = provider.next_reply(&[], "").await.unwrap();
        assert!(matches!(third, ModelReply::Final { text } if text.is_empty()));
    }

    #[test]
    fn test_model_reply_serde() {
        let reply: ModelReply = serde_json::from_value(json!({
            "type": "tool_calls",
            "calls": [{"tool_name": "get_job", "args": {"job_id": "j-1"}}],
            "parallel": true
        }))
        .unwrap();
        match reply {
            ModelReply::ToolCalls { calls, parallel, text } => {
                assert_eq!(calls.len(), 1);
                assert!(parallel);
                assert!(text.is_none());
            }
            ModelReply::Final { .. } => panic!("expected tool calls"),
        }
    }
}
