use reprise_history::{LogEntry, Role, StructuredLogBuilder, format_block};
use std::fs;
use std::path::{Path, PathBuf};

const FIXTURE_TIMESTAMP: &str = "2025-11-28 16:01:21";

/// Builds text dialogue logs block by block.
#[derive(Debug, Clone, Default)]
pub struct TextLogFixture {
    entries: Vec<LogEntry>,
    preamble: bool,
    round: u32,
}

impl TextLogFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the file with the logger's title preamble.
    pub fn with_preamble(mut self) -> Self {
        self.preamble = true;
        self
    }

    /// Block carrying only a question.
    pub fn question(mut self, step_id: &str, text: &str) -> Self {
        let entry = self.entry(step_id).with_question(text);
        self.entries.push(entry);
        self
    }

    /// Block carrying only an answer; advances the round.
    pub fn answer(mut self, step_id: &str, text: &str) -> Self {
        self.round += 1;
        let entry = self
            .entry(step_id)
            .with_round(Some(self.round))
            .with_answer(text);
        self.entries.push(entry);
        self
    }

    /// Combined block: an answer followed by the next question.
    pub fn exchange(mut self, step_id: &str, answer: &str, next_question: &str) -> Self {
        self.round += 1;
        let entry = self
            .entry(step_id)
            .with_round(Some(self.round))
            .with_answer(answer)
            .with_question(next_question);
        self.entries.push(entry);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.preamble {
            out.push_str("日志创建时间: 2025-11-28 16:00:00\ntask_id: fixture\n学生档位: 未设置\n");
            out.push_str(&"=".repeat(60));
            out.push('\n');
        }
        for block in self.entries.iter().filter_map(format_block) {
            out.push_str(&block);
            out.push('\n');
        }
        out
    }

    /// Write the log into `dir` and return its path.
    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        fs::write(&path, self.render()).expect("write text log fixture");
        path
    }

    fn entry(&self, step_id: &str) -> LogEntry {
        LogEntry::new(step_id).with_timestamp(FIXTURE_TIMESTAMP)
    }
}

/// Builds structured dialogue logs message by message.
#[derive(Debug, Clone)]
pub struct StructuredLogFixture {
    builder: StructuredLogBuilder,
    round: u32,
}

impl Default for StructuredLogFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl StructuredLogFixture {
    pub fn new() -> Self {
        Self {
            builder: StructuredLogBuilder::new()
                .with_task_id("fixture")
                .with_start_time(FIXTURE_TIMESTAMP),
            round: 0,
        }
    }

    pub fn question(mut self, step_id: &str, text: &str) -> Self {
        let round = (self.round > 0).then_some(self.round);
        self.builder.push(step_id, None, round, Role::Question, text);
        self
    }

    pub fn answer(mut self, step_id: &str, text: &str) -> Self {
        self.round += 1;
        self.builder
            .push(step_id, None, Some(self.round), Role::Answer, text);
        self
    }

    pub fn render(&self) -> String {
        serde_json::to_string_pretty(&self.builder.build()).expect("render structured fixture")
    }

    pub fn write_to(&self, dir: &Path, file_name: &str) -> PathBuf {
        let path = dir.join(file_name);
        fs::write(&path, self.render()).expect("write structured log fixture");
        path
    }
}
