//! Command implementations for the `reprise` binary.

use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use log::{debug, info};
use reprise_config::{LayeredConfigOptions, ReplayConfig};
use reprise_core::{MatchResult, ReplayEngine};
use reprise_history::{LogFormat, StructuredLogBuilder, extract_pairs};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Command-line options for dialogue replay.
#[derive(Debug, Parser)]
#[command(name = "reprise", version, about = "Replay recorded dialogue answers")]
pub struct Cli {
    /// Extra reprise.json5 layered over the user and cwd configs
    #[arg(long, global = true)]
    pub config: Vec<PathBuf>,
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List question/answer pairs extracted from a log
    Pairs {
        log: PathBuf,
        /// Print pairs as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up the replay answer for one question
    Ask {
        log: PathBuf,
        question: String,
        /// Restrict candidates to this workflow step
        #[arg(long)]
        step: Option<String>,
        /// Override the similarity threshold
        #[arg(long)]
        threshold: Option<f64>,
        /// Print full match diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replay questions read line by line (`question` or `step_id<TAB>question`)
    Replay {
        log: PathBuf,
        /// Read questions from a file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// Override the similarity threshold
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Convert a text log into the structured JSON format
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Task id recorded in the document metadata
        #[arg(long)]
        task_id: Option<String>,
    },
}

/// Run a parsed command line against stdout.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        config: config_paths,
        command,
        ..
    } = cli;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Command::Pairs { log, json } => list_pairs(&log, json, &mut out),
        Command::Ask {
            log,
            question,
            step,
            threshold,
            json,
        } => {
            let config = load_config(&config_paths, threshold)?;
            ask(&log, &question, step.as_deref(), &config, json, &mut out)
        }
        Command::Replay {
            log,
            input,
            threshold,
        } => {
            let config = load_config(&config_paths, threshold)?;
            match input {
                Some(path) => {
                    let file = File::open(&path)
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    replay(&log, BufReader::new(file), &config, &mut out)
                }
                None => replay(&log, io::stdin().lock(), &config, &mut out),
            }
        }
        Command::Convert {
            input,
            output,
            task_id,
        } => convert(&input, &output, task_id.as_deref(), &mut out),
    }
}

/// Load the layered config and apply a CLI threshold override.
pub fn load_config(
    runtime_paths: &[PathBuf],
    threshold: Option<f64>,
) -> anyhow::Result<ReplayConfig> {
    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let options = runtime_paths
        .iter()
        .fold(LayeredConfigOptions::new(&cwd), |options, path| {
            options.with_runtime_path(path)
        });
    let layered = ReplayConfig::load_layered_with_options(options)
        .context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());
    let mut config = layered.config;
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            bail!("threshold must be within [0, 1], got {threshold}");
        }
        config.replay.threshold = Some(threshold);
    }
    Ok(config)
}

fn load_engine(log: &Path, config: &ReplayConfig) -> anyhow::Result<ReplayEngine> {
    let mut engine = ReplayEngine::from_config(log, config)
        .with_context(|| format!("failed to configure replay for {}", log.display()))?;
    engine
        .load()
        .with_context(|| format!("failed to load dialogue history from {}", log.display()))?;
    Ok(engine)
}

/// Print the pairs a log yields.
pub fn list_pairs(log: &Path, json: bool, out: &mut dyn Write) -> anyhow::Result<()> {
    let records = LogFormat::from_path(log)
        .parser()
        .parse_path(log)
        .with_context(|| format!("failed to read {}", log.display()))?;
    let pairs = extract_pairs(&records);
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&pairs)?)?;
        return Ok(());
    }
    for (index, pair) in pairs.iter().enumerate() {
        let round = pair
            .round_num
            .map(|round| round.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "#{} step={} round={round}\n  Q: {}\n  A: {}",
            index + 1,
            display_step(&pair.step_id),
            pair.question_raw,
            pair.answer
        )?;
    }
    writeln!(out, "{} pairs", pairs.len())?;
    Ok(())
}

/// Answer one question from history.
pub fn ask(
    log: &Path,
    question: &str,
    step_id: Option<&str>,
    config: &ReplayConfig,
    json: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut engine = load_engine(log, config)?;
    let result = engine.query(question, step_id);
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    } else {
        write_result_line(question, &result, out)?;
    }
    Ok(())
}

/// Replay every non-blank input line and report the hit rate.
pub fn replay<R: BufRead>(
    log: &Path,
    input: R,
    config: &ReplayConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let mut engine = load_engine(log, config)?;
    for line in input.lines() {
        let line = line.context("failed to read question input")?;
        let Some((step_id, question)) = parse_replay_line(&line) else {
            continue;
        };
        let result = engine.query(question, step_id);
        write_result_line(question, &result, out)?;
    }
    let stats = engine.stats();
    info!(
        "replay finished (queries={}, hits={})",
        stats.queries, stats.hits
    );
    writeln!(
        out,
        "hits {}/{} ({:.1}%)",
        stats.hits,
        stats.queries,
        stats.hit_rate() * 100.0
    )?;
    Ok(())
}

/// Regroup a text log into a structured document.
pub fn convert(
    input: &Path,
    output: &Path,
    task_id: Option<&str>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let records = LogFormat::Text
        .parser()
        .parse_path(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let mut builder = StructuredLogBuilder::from_records(&records);
    if let Some(task_id) = task_id {
        builder = builder.with_task_id(task_id);
    }
    builder
        .write_to(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    writeln!(
        out,
        "converted {} records into {}",
        records.len(),
        output.display()
    )?;
    Ok(())
}

/// Split an input line into an optional step id and the question.
pub fn parse_replay_line(line: &str) -> Option<(Option<&str>, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (step_id, question) = match line.split_once('\t') {
        Some((step_id, question)) => {
            let step_id = step_id.trim();
            ((!step_id.is_empty()).then_some(step_id), question.trim())
        }
        None => (None, line.trim()),
    };
    (!question.is_empty()).then_some((step_id, question))
}

fn write_result_line(
    question: &str,
    result: &MatchResult,
    out: &mut dyn Write,
) -> io::Result<()> {
    let status = if result.matched { "HIT " } else { "MISS" };
    let answer = result.replay_answer().unwrap_or("-");
    writeln!(
        out,
        "{status} {:.3}/{:.2} pool={} {question} => {answer}",
        result.similarity, result.threshold, result.candidate_pool_size
    )
}

fn display_step(step_id: &str) -> &str {
    if step_id.is_empty() { "-" } else { step_id }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, ask, convert, list_pairs, parse_replay_line, replay};
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use reprise_config::ReplayConfig;
    use reprise_history::{LogFormat, extract_pairs};
    use reprise_test_utils::TextLogFixture;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn fixture(dir: &std::path::Path) -> PathBuf {
        TextLogFixture::new()
            .with_preamble()
            .question("s1", "你准备好了吗？")
            .exchange("s1", "好的", "请说说你的理解？")
            .answer("s2", "我认为需要先分析原因")
            .write_to(dir, "run_dialogue.txt")
    }

    fn output(buffer: Vec<u8>) -> String {
        String::from_utf8(buffer).expect("utf8 output")
    }

    #[test]
    fn parses_ask_arguments() {
        let cli = Cli::try_parse_from([
            "reprise",
            "-vv",
            "ask",
            "run.txt",
            "你准备好了吗？",
            "--step",
            "s1",
            "--threshold",
            "0.6",
            "--config",
            "extra.json5",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, vec![PathBuf::from("extra.json5")]);
        match cli.command {
            Command::Ask {
                question,
                step,
                threshold,
                json,
                ..
            } => {
                assert_eq!(question, "你准备好了吗？");
                assert_eq!(step.as_deref(), Some("s1"));
                assert_eq!(threshold, Some(0.6));
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn replay_lines_accept_optional_step() {
        assert_eq!(parse_replay_line("问题？"), Some((None, "问题？")));
        assert_eq!(parse_replay_line("s1\t问题？\r"), Some((Some("s1"), "问题？")));
        assert_eq!(parse_replay_line("\t问题？"), Some((None, "问题？")));
        assert_eq!(parse_replay_line("   "), None);
        assert_eq!(parse_replay_line("s1\t "), None);
    }

    #[test]
    fn pairs_command_lists_pairs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = fixture(dir.path());
        let mut buffer = Vec::new();
        list_pairs(&log, false, &mut buffer).expect("pairs");
        let text = output(buffer);
        assert!(text.contains("Q: 你准备好了吗？"));
        assert!(text.contains("A: 好的"));
        assert!(text.ends_with("2 pairs\n"));
    }

    #[test]
    fn ask_command_reports_json_diagnostics() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = fixture(dir.path());
        let mut buffer = Vec::new();
        ask(
            &log,
            "你准备好了吗？",
            Some("s1"),
            &ReplayConfig::default(),
            true,
            &mut buffer,
        )
        .expect("ask");
        let value: serde_json::Value = serde_json::from_str(&output(buffer)).expect("json");
        assert_eq!(value["matched"], serde_json::json!(true));
        assert_eq!(value["answer"], serde_json::json!("好的"));
        assert_eq!(value["candidate_pool_size"], serde_json::json!(2));
    }

    #[test]
    fn replay_command_reports_hit_rate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = fixture(dir.path());
        let input = Cursor::new("s1\t你准备好了吗？\n\n完全无关的内容\n");
        let mut buffer = Vec::new();
        replay(&log, input, &ReplayConfig::default(), &mut buffer).expect("replay");
        let text = output(buffer);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("HIT  1.000/0.70"));
        assert!(lines[0].ends_with("=> 好的"));
        assert!(lines[1].starts_with("MISS"));
        assert_eq!(lines[2], "hits 1/2 (50.0%)");
    }

    #[test]
    fn replay_fails_when_history_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("empty.txt");
        std::fs::write(&log, "").expect("write");
        let mut buffer = Vec::new();
        let result = replay(&log, Cursor::new(""), &ReplayConfig::default(), &mut buffer);
        assert!(result.is_err());
    }

    #[test]
    fn convert_command_writes_structured_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = fixture(dir.path());
        let output_path = dir.path().join("run_dialogue.json");
        let mut buffer = Vec::new();
        convert(&log, &output_path, Some("task-7"), &mut buffer).expect("convert");

        let records = LogFormat::from_path(&output_path)
            .parser()
            .parse_path(&output_path)
            .expect("parse converted");
        assert_eq!(extract_pairs(&records).len(), 2);
        let document: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output_path).expect("read"))
                .expect("json");
        assert_eq!(document["metadata"]["task_id"], serde_json::json!("task-7"));
        assert!(output(buffer).starts_with("converted 4 records"));
    }
}
