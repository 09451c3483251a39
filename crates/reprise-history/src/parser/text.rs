//! Parser for delimiter-separated text dialogue logs.
//!
//! A log is a sequence of blocks separated by a line of 80 dashes. The first
//! line of a block is a header such as
//! `[2025-11-28 16:01:21] Step: Intro | step_id: s1 | 第 1 轮 | 来源: chat`
//! (or the legacy `[ts] Step s1 | 第 1 轮 | 来源: chat`), followed by role lines
//! prefixed with `用户:` (answer) and `AI:` (question).

use super::{LogFormat, LogParser};
use crate::error::HistoryError;
use crate::record::{DEFAULT_SOURCE, Record, Role};
use log::{debug, warn};

/// Width of the dash line separating blocks.
pub const BLOCK_DELIMITER_WIDTH: usize = 80;

const QUESTION_MARKERS: &[&str] = &["AI:"];
const ANSWER_MARKERS: &[&str] = &["用户:", "User:"];
const STEP_ID_KEY: &str = "step_id: ";
const LEGACY_STEP_KEY: &str = "Step ";
const SOURCE_KEYS: &[&str] = &["来源: ", "source: "];
const FIELD_SEPARATOR: &str = " |";
/// Minimum length of the `=` rule that closes a file preamble.
const PREAMBLE_RULE_MIN: usize = 20;

/// Parser for the text log format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLogParser;

impl LogParser for TextLogParser {
    fn format(&self) -> LogFormat {
        LogFormat::Text
    }

    fn parse_str(&self, contents: &str) -> Result<Vec<Record>, HistoryError> {
        let normalized = contents.replace("\r\n", "\n").replace('\r', "\n");
        let mut records = Vec::new();
        for (index, block) in split_blocks(&normalized).iter().enumerate() {
            let lines = if index == 0 {
                strip_preamble(block)
            } else {
                block.as_slice()
            };
            records.extend(parse_block(lines));
        }
        debug!("parsed text log (records={})", records.len());
        Ok(records)
    }
}

/// Header fields shared by every record of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockHeader {
    timestamp: String,
    step_id: String,
    round_num: Option<u32>,
    source: String,
}

impl BlockHeader {
    fn record(&self, role: Role, text: &str) -> Record {
        Record {
            timestamp: self.timestamp.clone(),
            step_id: self.step_id.clone(),
            source: self.source.clone(),
            round_num: self.round_num,
            role,
            text: text.to_string(),
        }
    }
}

/// Split normalized contents into raw line groups at delimiter lines.
fn split_blocks(contents: &str) -> Vec<Vec<&str>> {
    let delimiter = "-".repeat(BLOCK_DELIMITER_WIDTH);
    let mut blocks = vec![Vec::new()];
    for line in contents.split('\n') {
        if line.trim() == delimiter {
            blocks.push(Vec::new());
        } else if let Some(current) = blocks.last_mut() {
            current.push(line);
        }
    }
    blocks
}

/// Drop the file title/header lines written before the first block.
fn strip_preamble<'a, 'b>(lines: &'b [&'a str]) -> &'b [&'a str] {
    match lines.iter().position(|line| is_preamble_rule(line)) {
        Some(pos) => &lines[pos + 1..],
        None => lines,
    }
}

fn is_preamble_rule(line: &str) -> bool {
    let line = line.trim();
    line.chars().count() >= PREAMBLE_RULE_MIN && line.chars().all(|c| c == '=')
}

/// Parse one block into zero, one, or two records.
///
/// When a block carries both roles the answer is emitted first: the logger
/// writes the reply to the previous question and the next question together.
fn parse_block(lines: &[&str]) -> Vec<Record> {
    let mut lines = lines
        .iter()
        .map(|line| line.trim())
        .skip_while(|line| line.is_empty());
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let header = parse_header(header_line);

    let mut question = None;
    let mut answer = None;
    for line in lines {
        if let Some(text) = strip_marker(line, QUESTION_MARKERS) {
            question = Some(text);
        } else if let Some(text) = strip_marker(line, ANSWER_MARKERS) {
            answer = Some(text);
        }
    }

    if question.is_none() && answer.is_none() {
        warn!("skipping dialogue block without question or answer (header={header_line})");
        return Vec::new();
    }

    let mut records = Vec::with_capacity(2);
    if let Some(text) = answer {
        records.push(header.record(Role::Answer, text));
    }
    if let Some(text) = question {
        records.push(header.record(Role::Question, text));
    }
    records
}

/// Return the trimmed text after any of the markers, if non-empty.
fn strip_marker<'a>(line: &'a str, markers: &[&str]) -> Option<&'a str> {
    markers
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
        .map(str::trim)
        .filter(|text| !text.is_empty())
}

fn parse_header(header: &str) -> BlockHeader {
    BlockHeader {
        timestamp: parse_timestamp(header),
        step_id: parse_step_id(header),
        round_num: parse_round(header),
        source: SOURCE_KEYS
            .iter()
            .find_map(|key| field_after(header, key))
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_SOURCE)
            .to_string(),
    }
}

fn parse_timestamp(header: &str) -> String {
    header
        .strip_prefix('[')
        .and_then(|rest| rest.find(']').map(|end| rest[..end].trim().to_string()))
        .unwrap_or_default()
}

/// Newer headers carry `step_id: <id>`; older ones put the id right after `Step `.
fn parse_step_id(header: &str) -> String {
    field_after(header, STEP_ID_KEY)
        .or_else(|| field_after(header, LEGACY_STEP_KEY))
        .unwrap_or_default()
        .to_string()
}

/// Round from a `第 N 轮` or `round N` field; the marker must fill its field.
fn parse_round(header: &str) -> Option<u32> {
    header.split('|').find_map(|field| {
        let field = field.trim();
        let value = field
            .strip_prefix('第')
            .and_then(|rest| rest.strip_suffix('轮'))
            .or_else(|| field.strip_prefix("round "))?;
        value.trim().parse::<u32>().ok().filter(|round| *round > 0)
    })
}

/// Text following `key` up to the next field separator or end of line.
fn field_after<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = header.find(key)? + key.len();
    let rest = &header[start..];
    let end = rest.find(FIELD_SEPARATOR).unwrap_or(rest.len());
    Some(rest[..end].trim())
}
