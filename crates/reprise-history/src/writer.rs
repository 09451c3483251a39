//! Writers producing dialogue logs in the formats the parsers read.

use crate::document::{LogMetadata, Stage, StageMessage, StructuredLog};
use crate::error::HistoryError;
use crate::parser::BLOCK_DELIMITER_WIDTH;
use crate::record::{DEFAULT_SOURCE, Record, Role};
use chrono::Local;
use log::{debug, info};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const PREAMBLE_RULE_WIDTH: usize = 60;
const UNKNOWN_STEP_NAME: &str = "未知步骤";
const UNSET_PROFILE: &str = "未设置";

/// Local wall-clock time in the log timestamp format.
pub fn now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// One text-log block: the answer to the previous question and/or the next
/// question, under a single header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: String,
    pub step_id: String,
    /// Display name of the step; the step id is shown when absent.
    pub step_name: Option<String>,
    pub round_num: Option<u32>,
    pub source: String,
    pub answer: Option<String>,
    pub question: Option<String>,
}

impl LogEntry {
    /// Create an empty entry for a step, stamped with the current time.
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            timestamp: now(),
            step_id: step_id.into(),
            step_name: None,
            round_num: None,
            source: DEFAULT_SOURCE.to_string(),
            answer: None,
            question: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_step_name(mut self, step_name: impl Into<String>) -> Self {
        self.step_name = Some(step_name.into());
        self
    }

    pub fn with_round(mut self, round_num: Option<u32>) -> Self {
        self.round_num = round_num;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(answer.into());
        self
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    fn has_dialogue(&self) -> bool {
        let present = |text: &Option<String>| text.as_deref().is_some_and(|t| !t.is_empty());
        present(&self.answer) || present(&self.question)
    }

    fn display_name(&self) -> &str {
        match self.step_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if self.step_id.is_empty() => UNKNOWN_STEP_NAME,
            _ => &self.step_id,
        }
    }
}

/// Render an entry as a text-log block, or `None` when it has no dialogue.
pub fn format_block(entry: &LogEntry) -> Option<String> {
    if !entry.has_dialogue() {
        return None;
    }
    let round_info = entry
        .round_num
        .filter(|round| *round > 0)
        .map(|round| format!(" | 第 {round} 轮"))
        .unwrap_or_default();
    let mut lines = vec![format!(
        "[{}] Step: {} | step_id: {}{} | 来源: {}",
        entry.timestamp,
        entry.display_name(),
        entry.step_id,
        round_info,
        entry.source
    )];
    if let Some(answer) = entry.answer.as_deref().filter(|text| !text.is_empty()) {
        lines.push(format!("用户: {answer}"));
    }
    if let Some(question) = entry.question.as_deref().filter(|text| !text.is_empty()) {
        lines.push(format!("AI: {question}"));
    }
    lines.push("-".repeat(BLOCK_DELIMITER_WIDTH));
    Some(lines.join("\n"))
}

/// Appends blocks to a text dialogue log.
#[derive(Debug, Clone)]
pub struct TextLogWriter {
    path: PathBuf,
}

impl TextLogWriter {
    /// Create (or truncate) a log and write the file preamble.
    pub fn create(
        path: impl Into<PathBuf>,
        task_id: &str,
        profile: Option<&str>,
    ) -> Result<Self, HistoryError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let preamble = [
            format!("日志创建时间: {}", now()),
            format!("task_id: {task_id}"),
            format!("学生档位: {}", profile.unwrap_or(UNSET_PROFILE)),
            "=".repeat(PREAMBLE_RULE_WIDTH),
        ]
        .join("\n");
        fs::write(&path, preamble + "\n")?;
        info!("created dialogue log (path={})", path.display());
        Ok(Self { path })
    }

    /// Append to an existing log without writing a preamble.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one block; returns `false` when the entry carried no dialogue.
    pub fn append(&self, entry: &LogEntry) -> Result<bool, HistoryError> {
        let Some(block) = format_block(entry) else {
            return Ok(false);
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{block}")?;
        debug!(
            "appended dialogue block (path={}, step_id={})",
            self.path.display(),
            entry.step_id
        );
        Ok(true)
    }
}

/// Collects messages into stages keyed by step id.
#[derive(Debug, Clone, Default)]
pub struct StructuredLogBuilder {
    task_id: Option<String>,
    start_time: Option<String>,
    stages: Vec<Stage>,
    stage_by_step: HashMap<String, usize>,
    total_rounds: u32,
}

impl StructuredLogBuilder {
    /// Start a document stamped with the current time.
    pub fn new() -> Self {
        Self {
            start_time: Some(now()),
            ..Self::default()
        }
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_start_time(mut self, start_time: impl Into<String>) -> Self {
        self.start_time = Some(start_time.into());
        self
    }

    /// Regroup a record sequence into stages, preserving order.
    pub fn from_records(records: &[Record]) -> Self {
        let mut builder = Self::new();
        if let Some(first) = records.iter().find(|record| !record.timestamp.is_empty()) {
            builder.start_time = Some(first.timestamp.clone());
        }
        for record in records {
            builder.push_record(record);
        }
        builder
    }

    /// Add a message; the stage is created on first sight of its step id.
    pub fn push(
        &mut self,
        step_id: &str,
        step_name: Option<&str>,
        round: Option<u32>,
        role: Role,
        content: impl Into<String>,
    ) {
        let index = match self.stage_by_step.get(step_id) {
            Some(index) => *index,
            None => {
                let index = self.stages.len();
                self.stages.push(Stage {
                    stage_index: index + 1,
                    stage_name: Some(step_name.unwrap_or(step_id).to_string()),
                    step_id: step_id.to_string(),
                    messages: Vec::new(),
                });
                self.stage_by_step.insert(step_id.to_string(), index);
                index
            }
        };
        if let Some(round) = round {
            self.total_rounds = self.total_rounds.max(round);
        }
        self.stages[index].messages.push(StageMessage {
            round,
            role: role.into(),
            content: content.into(),
            timestamp: None,
        });
    }

    pub fn push_record(&mut self, record: &Record) {
        self.push(
            &record.step_id,
            None,
            record.round_num,
            record.role,
            record.text.as_str(),
        );
        if let Some(message) = self
            .stages
            .iter_mut()
            .find(|stage| stage.step_id == record.step_id)
            .and_then(|stage| stage.messages.last_mut())
            .filter(|_| !record.timestamp.is_empty())
        {
            message.timestamp = Some(record.timestamp.clone());
        }
    }

    /// Render the document, stamping the end time.
    pub fn build(&self) -> StructuredLog {
        StructuredLog {
            metadata: LogMetadata {
                task_id: self.task_id.clone(),
                workflow_start_time: self.start_time.clone(),
                workflow_end_time: Some(now()),
                total_rounds: self.total_rounds,
                total_steps: self.stages.len(),
            },
            stages: self.stages.clone(),
        }
    }

    /// Write the rendered document as pretty JSON.
    pub fn write_to(&self, path: &Path) -> Result<(), HistoryError> {
        let document = self.build();
        let json = serde_json::to_string_pretty(&document)?;
        fs::write(path, json)?;
        info!(
            "wrote structured dialogue log (path={}, stages={})",
            path.display(),
            document.stages.len()
        );
        Ok(())
    }
}
