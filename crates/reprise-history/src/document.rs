//! Structured (stage-grouped) dialogue log document.

use crate::record::Role;
use serde::{Deserialize, Serialize};

/// Root of a structured dialogue log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StructuredLog {
    #[serde(default)]
    pub metadata: LogMetadata,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

/// Run-level metadata; ignored when parsing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct LogMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_end_time: Option<String>,
    #[serde(default)]
    pub total_rounds: u32,
    #[serde(default)]
    pub total_steps: usize,
}

/// One workflow stage and its messages in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    #[serde(default, alias = "stageIndex")]
    pub stage_index: usize,
    #[serde(default, alias = "stageName", skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,
    #[serde(default, alias = "stepId")]
    pub step_id: String,
    #[serde(default)]
    pub messages: Vec<StageMessage>,
}

/// A role-tagged message inside a stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Message author in the structured format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The workflow side; its messages are questions.
    Assistant,
    /// The respondent; its messages are answers.
    User,
}

impl MessageRole {
    /// Map the message author onto the record role.
    pub fn record_role(self) -> Role {
        match self {
            MessageRole::Assistant => Role::Question,
            MessageRole::User => Role::Answer,
        }
    }
}

impl From<Role> for MessageRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Question => MessageRole::Assistant,
            Role::Answer => MessageRole::User,
        }
    }
}
