//! Parser for stage-grouped JSON dialogue logs.

use super::{LogFormat, LogParser};
use crate::document::MessageRole;
use crate::error::HistoryError;
use crate::record::{DEFAULT_SOURCE, Record};
use log::{debug, warn};
use serde_json::Value;

/// Parser for the structured (JSON) log format.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuredLogParser;

impl LogParser for StructuredLogParser {
    fn format(&self) -> LogFormat {
        LogFormat::Structured
    }

    fn parse_str(&self, contents: &str) -> Result<Vec<Record>, HistoryError> {
        let document: Value = serde_json::from_str(contents)?;
        let Some(stages) = document.get("stages").and_then(Value::as_array) else {
            warn!("structured log has no stages array");
            return Ok(Vec::new());
        };

        let mut records = Vec::new();
        for (stage_pos, stage) in stages.iter().enumerate() {
            let step_id = stage
                .get("step_id")
                .or_else(|| stage.get("stepId"))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let Some(messages) = stage.get("messages").and_then(Value::as_array) else {
                debug!("stage without messages (stage={stage_pos}, step_id={step_id})");
                continue;
            };
            for (message_pos, message) in messages.iter().enumerate() {
                match parse_message(message, step_id) {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(reason) => warn!(
                        "skipping structured message (stage={stage_pos}, message={message_pos}, reason={reason})"
                    ),
                }
            }
        }
        debug!("parsed structured log (records={})", records.len());
        Ok(records)
    }
}

/// Convert one message; `Ok(None)` marks an empty message.
fn parse_message(message: &Value, step_id: &str) -> Result<Option<Record>, String> {
    let role = message
        .get("role")
        .and_then(Value::as_str)
        .ok_or_else(|| "missing role".to_string())?;
    let role = match role {
        "assistant" => MessageRole::Assistant,
        "user" => MessageRole::User,
        other => return Err(format!("unknown role `{other}`")),
    };
    let content = match message.get("content") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(content)) => content.trim(),
        Some(_) => return Err("content is not a string".to_string()),
    };
    if content.is_empty() {
        return Ok(None);
    }
    let round_num = message
        .get("round")
        .and_then(Value::as_u64)
        .and_then(|round| u32::try_from(round).ok())
        .filter(|round| *round > 0);
    let timestamp = message
        .get("timestamp")
        .and_then(Value::as_str)
        .unwrap_or_default();

    Ok(Some(Record {
        timestamp: timestamp.to_string(),
        step_id: step_id.to_string(),
        source: DEFAULT_SOURCE.to_string(),
        round_num,
        role: role.record_role(),
        text: content.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::StructuredLogParser;
    use crate::{HistoryError, LogParser, Role};
    use pretty_assertions::assert_eq;

    #[test]
    fn messages_become_records_with_stage_attribution() {
        let doc = r#"{
            "metadata": {"task_id": "t-1", "student_profile": "good"},
            "stages": [
                {"stage_index": 1, "stage_name": "导入", "step_id": "s1", "messages": [
                    {"round": 0, "role": "assistant", "content": "  你准备好了吗？ "},
                    {"round": 1, "role": "user", "content": "好的"}
                ]},
                {"stageIndex": 2, "stepId": "s2", "messages": [
                    {"round": 2, "role": "assistant", "content": "下一题？"}
                ]}
            ]
        }"#;
        let records = StructuredLogParser.parse_str(doc).expect("parse");
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].role, Role::Question);
        assert_eq!(records[0].text, "你准备好了吗？");
        assert_eq!(records[0].round_num, None);
        assert_eq!(records[0].step_id, "s1");
        assert_eq!(records[1].role, Role::Answer);
        assert_eq!(records[1].round_num, Some(1));
        assert_eq!(records[1].source, "chat");
        assert_eq!(records[2].step_id, "s2");
    }

    #[test]
    fn malformed_messages_are_skipped() {
        let doc = r#"{"stages": [{"step_id": "s1", "messages": [
            {"role": "system", "content": "ignored"},
            {"role": "assistant", "content": 42},
            {"content": "no role"},
            {"role": "user", "content": "   "},
            {"role": "user"},
            {"role": "assistant", "content": "Q?"}
        ]}]}"#;
        let records = StructuredLogParser.parse_str(doc).expect("parse");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "Q?");
    }

    #[test]
    fn missing_stages_yield_no_records() {
        let records = StructuredLogParser
            .parse_str(r#"{"metadata": {}}"#)
            .expect("parse");
        assert!(records.is_empty());
    }

    #[test]
    fn invalid_json_is_a_source_error() {
        let err = StructuredLogParser
            .parse_str("{not json")
            .expect_err("invalid json");
        assert!(matches!(err, HistoryError::Serde(_)));
    }
}
