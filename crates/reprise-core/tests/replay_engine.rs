//! Replay engine integration tests.

use pretty_assertions::assert_eq;
use reprise_config::{CacheConfig, EmbeddingConfig, MatcherSelection, ReplayConfig};
use reprise_core::{EngineError, ReplayEngine};
use reprise_match::{EmbeddingError, MatcherKind};
use reprise_test_utils::{StructuredLogFixture, StubEmbeddingProvider, TextLogFixture};
use std::fs;
use tempfile::tempdir;

fn classroom_text_log() -> TextLogFixture {
    TextLogFixture::new()
        .with_preamble()
        .question("s1", "你准备好了吗？")
        .exchange("s1", "好的", "请说说你对这个问题的理解？")
        .answer("s2", "我认为需要先分析原因")
        .question("s2", "你准备好了吗？")
        .answer("s2", "准备好了，老师")
}

fn classroom_structured_log() -> StructuredLogFixture {
    StructuredLogFixture::new()
        .question("s1", "同学你好。你准备好了吗？")
        .answer("s1", "好的")
        .question("s2", "请说说你对这个问题的理解？")
        .answer("s2", "我认为需要先分析原因")
}

/// A recorded question is replayed verbatim with similarity 1.0.
#[test]
fn replays_recorded_answer_for_identical_question() {
    let dir = tempdir().expect("tempdir");
    let path = TextLogFixture::new()
        .question("s1", "你准备好了吗？")
        .answer("s1", "好的")
        .write_to(dir.path(), "run_dialogue.txt");

    let mut engine = ReplayEngine::from_config(&path, &ReplayConfig::default()).expect("engine");
    assert_eq!(engine.matcher_kind(), MatcherKind::Text);
    assert_eq!(engine.load().expect("load"), 1);

    let result = engine.query("你准备好了吗？", None);
    assert!(result.matched);
    assert_eq!(result.similarity, 1.0);
    assert_eq!(result.threshold, 0.7);
    assert_eq!(result.answer.as_deref(), Some("好的"));
    assert_eq!(engine.answer("你准备好了吗？", None).as_deref(), Some("好的"));
}

/// Step scoping picks the step's own pair and falls back to the full pool.
#[test]
fn step_scoping_restricts_candidates() {
    let dir = tempdir().expect("tempdir");
    let path = classroom_text_log().write_to(dir.path(), "run_dialogue.txt");
    let mut engine = ReplayEngine::from_config(&path, &ReplayConfig::default()).expect("engine");
    assert_eq!(engine.load().expect("load"), 3);

    let first = engine.query("你准备好了吗？", Some("s1"));
    assert_eq!(first.answer.as_deref(), Some("好的"));
    assert_eq!(first.candidate_pool_size, 2);

    let second = engine.query("你准备好了吗？", Some("s2"));
    assert_eq!(second.answer.as_deref(), Some("准备好了，老师"));
    assert_eq!(second.candidate_pool_size, 1);

    let fallback = engine.query("你准备好了吗？", Some("unknown-step"));
    assert_eq!(fallback.candidate_pool_size, 3);
    assert_eq!(fallback.answer.as_deref(), Some("好的"));
}

/// Similarity equal to the threshold counts as a match.
#[test]
fn threshold_boundary_is_inclusive() {
    let dir = tempdir().expect("tempdir");
    let path = TextLogFixture::new()
        .question("s1", "bcde")
        .answer("s1", "answer")
        .write_to(dir.path(), "run_dialogue.txt");
    let config = ReplayConfig::builder().threshold(0.75).build();
    let mut engine = ReplayEngine::from_config(&path, &config).expect("engine");
    engine.load().expect("load");

    let result = engine.query("abcd", None);
    assert_eq!(result.similarity, 0.75);
    assert!(result.matched);

    let below = engine.query("axyd", None);
    assert!(!below.matched);
    assert_eq!(below.answer.as_deref(), Some("answer"));
    assert_eq!(engine.answer("axyd", None), None);
}

/// An empty log fails to load and the engine answers nothing.
#[test]
fn empty_log_leaves_engine_unloaded() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("empty.txt");
    fs::write(&path, "").expect("write");

    let mut engine = ReplayEngine::from_config(&path, &ReplayConfig::default()).expect("engine");
    let err = engine.load().expect_err("no pairs");
    assert!(matches!(err, EngineError::NoPairs(_)));
    assert!(!engine.is_loaded());

    let result = engine.query("你准备好了吗？", None);
    assert!(!result.matched);
    assert_eq!(result.answer, None);
    assert_eq!(result.candidate_pool_size, 0);
}

/// A missing log is a source error.
#[test]
fn missing_log_is_a_source_error() {
    let dir = tempdir().expect("tempdir");
    let mut engine =
        ReplayEngine::from_config(dir.path().join("missing.txt"), &ReplayConfig::default())
            .expect("engine");
    assert!(matches!(engine.load(), Err(EngineError::Source(_))));
}

/// Cached diagnostics are reused for the same query and counted once.
#[test]
fn match_info_reuses_last_result() {
    let dir = tempdir().expect("tempdir");
    let path = classroom_text_log().write_to(dir.path(), "run_dialogue.txt");
    let mut engine = ReplayEngine::from_config(&path, &ReplayConfig::default()).expect("engine");
    engine.load().expect("load");

    let answered = engine.answer("你准备好了吗？", Some("s1"));
    let info = engine.match_info("你准备好了吗？", Some("s1"));
    assert_eq!(answered, info.answer);
    assert_eq!(engine.stats().queries, 1);

    let other = engine.match_info("完全不同的问题", Some("s1"));
    assert!(!other.matched);
    assert_eq!(engine.stats().queries, 2);
    assert_eq!(engine.stats().hits, 1);
}

/// Structured logs use the vector matcher and the sidecar cache on reload.
#[test]
fn vector_replay_reuses_sidecar_cache() {
    let dir = tempdir().expect("tempdir");
    let path = classroom_structured_log().write_to(dir.path(), "run_dialogue.json");
    let config = ReplayConfig::default();

    let first_provider = StubEmbeddingProvider::new();
    let mut first =
        ReplayEngine::from_config_with_provider(&path, &config, Box::new(first_provider.clone()));
    assert_eq!(first.matcher_kind(), MatcherKind::Vector);
    assert_eq!(first.load().expect("load"), 2);
    assert_eq!(first_provider.calls(), 1);
    assert!(dir.path().join("run_dialogue_replay_index.json").exists());
    let first_result = first.query("那么，你准备好了吗？", Some("s1"));
    assert!(first_result.matched);
    assert_eq!(first_result.answer.as_deref(), Some("好的"));
    assert_eq!(first_result.threshold, 0.8);

    let second_provider = StubEmbeddingProvider::new();
    let mut second =
        ReplayEngine::from_config_with_provider(&path, &config, Box::new(second_provider.clone()));
    second.load().expect("load");
    assert_eq!(second_provider.calls(), 0);
    let second_result = second.query("那么，你准备好了吗？", Some("s1"));
    assert_eq!(second_result, first_result);
    assert_eq!(second_provider.calls(), 1);
}

/// Disabling the cache writes no sidecar.
#[test]
fn disabled_cache_writes_no_sidecar() {
    let dir = tempdir().expect("tempdir");
    let path = classroom_structured_log().write_to(dir.path(), "run_dialogue.json");
    let config = ReplayConfig::builder()
        .cache(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        })
        .build();
    let mut engine =
        ReplayEngine::from_config_with_provider(&path, &config, Box::new(StubEmbeddingProvider::new()));
    engine.load().expect("load");
    assert!(!dir.path().join("run_dialogue_replay_index.json").exists());
}

/// A provider failure while querying yields an unmatched result.
#[test]
fn provider_failure_at_query_time_is_not_matched() {
    let dir = tempdir().expect("tempdir");
    let path = classroom_structured_log().write_to(dir.path(), "run_dialogue.json");
    let provider = StubEmbeddingProvider::new().failing_after(1);
    let mut engine =
        ReplayEngine::from_config_with_provider(&path, &ReplayConfig::default(), Box::new(provider));
    engine.load().expect("load");

    let result = engine.query("你准备好了吗？", None);
    assert!(!result.matched);
    assert_eq!(result.similarity, 0.0);
    assert_eq!(result.answer, None);
    assert_eq!(result.candidate_pool_size, 2);
}

/// Vector matching without credentials fails instead of degrading to text.
#[test]
fn missing_credentials_fail_vector_construction() {
    let dir = tempdir().expect("tempdir");
    let path = classroom_structured_log().write_to(dir.path(), "run_dialogue.json");
    let config = ReplayConfig::builder()
        .embedding(EmbeddingConfig {
            api_key_env: vec!["REPRISE_TEST_UNSET_EMBEDDING_KEY".to_string()],
            ..EmbeddingConfig::default()
        })
        .build();
    let err = ReplayEngine::from_config(&path, &config).err().expect("missing key");
    assert!(matches!(
        err,
        EngineError::Embedding(EmbeddingError::MissingCredentials { .. })
    ));
}

/// An explicit text matcher replays structured logs without embeddings.
#[test]
fn text_matcher_can_replay_structured_logs() {
    let dir = tempdir().expect("tempdir");
    let path = classroom_structured_log().write_to(dir.path(), "run_dialogue.json");
    let config = ReplayConfig::builder()
        .matcher(MatcherSelection::Text)
        .build();
    let mut engine = ReplayEngine::from_config(&path, &config).expect("engine");
    assert_eq!(engine.matcher_kind(), MatcherKind::Text);
    engine.load().expect("load");
    assert_eq!(
        engine.answer("请说说你对这个问题的理解？", None).as_deref(),
        Some("我认为需要先分析原因")
    );
}
