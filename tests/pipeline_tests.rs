use bctgen::config::RunConfig;
use bctgen::merge::merge_and_write;
use bctgen::openai::fake::FakeOpenAIClient;
use bctgen::pipeline;
use bctgen::storage;
use bctgen::taxonomy::{Taxonomy, TaxonomySource};
use bctgen::test_utils::init_test_logging;
use bctgen::DatasetError;
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

const TAXONOMY: &str = "\
No,Label,Definition,Examples
1.1,Goal setting (behavior),Set or agree on a goal defined in terms of the behavior,Agree on a daily walking goal
4.1,Instruction on how to perform the behavior,Advise or agree on how to perform the behavior,Show how to use a pedometer
7,Prompts/cues,Introduce environmental or social stimuli,Put a sticker on the bathroom mirror
";

const TEMPLATE: &str = "You write short healthcare messages.\n=====\nWrite {num_messages} messages that use {bct_label} ({bct_definition}). Example: {bct_examples}";

/// Lays out `prompts/`, `data/` and the taxonomy table in a temp dir.
fn workspace() -> (TempDir, RunConfig) {
    init_test_logging();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("prompts")).unwrap();
    std::fs::write(dir.path().join("prompts/baseline.txt"), TEMPLATE).unwrap();
    std::fs::write(dir.path().join("bcts.csv"), TAXONOMY).unwrap();

    let mut config = RunConfig::new("baseline", 3, "sk-test");
    config.prompts_dir = dir.path().join("prompts");
    config.data_dir = dir.path().join("data");
    config.taxonomy_source = TaxonomySource::File(dir.path().join("bcts.csv"));
    (dir, config)
}

fn user_prompt(client: &FakeOpenAIClient, index: usize) -> String {
    let requests = client.requests.lock().unwrap();
    format!("{:?}", requests[index].messages[1])
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_full_run_writes_tables_and_merged_dataset() {
    let (_dir, config) = workspace();
    let client = FakeOpenAIClient::new().with_responses(vec![
        "1. Pick a step goal\n2. Write your goal down\n3. Share your goal",
        "Sure! Here you go:\n1. Clip the pedometer on\n2. Check it at noon\n3. Log the total",
        "1. Stick a note on the mirror\n2. Set a phone reminder\n3. Leave shoes by the door",
    ]);

    let summary = pipeline::run(&config, &client).await.unwrap();

    assert_eq!(summary.category_files.len(), 3);
    assert_eq!(
        read(&storage::category_path(&config.data_dir, "baseline", "4.1")),
        "Clip the pedometer on\nCheck it at noon\nLog the total\n"
    );
    assert_eq!(summary.merged_file, config.data_dir.join("baseline.csv"));
    assert_eq!(
        read(&summary.merged_file),
        ",message,bct\n\
         0,Pick a step goal,1.1\n\
         1,Write your goal down,1.1\n\
         2,Share your goal,1.1\n\
         3,Clip the pedometer on,4.1\n\
         4,Check it at noon,4.1\n\
         5,Log the total,4.1\n\
         6,Stick a note on the mirror,7\n\
         7,Set a phone reminder,7\n\
         8,Leave shoes by the door,7\n"
    );

    // Prompts were filled per category
    assert_eq!(client.request_count(), 3);
    let first = user_prompt(&client, 0);
    assert!(first.contains("Write 3 messages that use Goal setting (behavior)"));
    assert!(first.contains("Agree on a daily walking goal"));
    assert!(user_prompt(&client, 2).contains("Prompts/cues"));
}

#[tokio::test]
async fn test_malformed_answer_retried_then_run_continues() {
    let (_dir, config) = workspace();
    let client = FakeOpenAIClient::new()
        .with_response("1. Pick a step goal\n2. Write your goal down")
        .with_truncated_response("1. Pick a step goal\n2. Wri")
        .with_responses(vec![
            "1. Pick a step goal\n2. Write your goal down\n3. Share your goal",
            "1. a\n2. b\n3. c",
            "1. d\n2. e\n3. f",
        ]);

    let summary = pipeline::run(&config, &client).await.unwrap();

    assert_eq!(client.request_count(), 5);
    assert_eq!(user_prompt(&client, 0), user_prompt(&client, 2));
    assert!(read(&summary.merged_file).contains("0,Pick a step goal,1.1\n"));
}

#[tokio::test]
async fn test_exhausted_retries_abort_run_and_keep_earlier_tables() {
    let (_dir, config) = workspace();
    let client = FakeOpenAIClient::new().with_responses(vec![
        "1. a\n2. b\n3. c",
        "1. only\n2. two",
        "1. only\n2. two",
        "1. only\n2. two",
    ]);

    let err = pipeline::run(&config, &client).await.unwrap_err();

    match &err {
        DatasetError::ResponseFormat {
            category,
            expected,
            actual,
            content,
        } => {
            assert_eq!(category, "4.1");
            assert_eq!(*expected, 3);
            assert_eq!(*actual, 2);
            assert_eq!(content, "1. only\n2. two");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(client.request_count(), 4);
    assert!(storage::category_path(&config.data_dir, "baseline", "1.1").is_file());
    assert!(!storage::category_path(&config.data_dir, "baseline", "4.1").exists());
    assert!(!storage::merged_path(&config.data_dir, "baseline").exists());

    // The merge names the BCTs that still need generating
    let taxonomy = Taxonomy::load(&config.taxonomy_source).await.unwrap();
    let err = merge_and_write(&taxonomy, &config.data_dir, "baseline").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing generated output for BCT(s) 4.1, 7"
    );
}

#[tokio::test]
async fn test_bad_template_fails_before_any_request() {
    let (dir, config) = workspace();
    std::fs::write(dir.path().join("prompts/baseline.txt"), "one\ntwo\nthree")
        .unwrap();
    let client = FakeOpenAIClient::new();

    let err = pipeline::run(&config, &client).await.unwrap_err();

    assert!(matches!(err, DatasetError::TemplateFormat { .. }));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_unknown_placeholder_fails_before_any_request() {
    let (dir, config) = workspace();
    std::fs::write(
        dir.path().join("prompts/baseline.txt"),
        "System.\nWrite {num_messages} messages about {bct_topic}.",
    )
    .unwrap();
    let client = FakeOpenAIClient::new();

    let err = pipeline::run(&config, &client).await.unwrap_err();

    assert!(err.to_string().contains("{bct_topic}"));
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_unavailable_taxonomy_is_fatal() {
    let (dir, mut config) = workspace();
    config.taxonomy_source = TaxonomySource::File(dir.path().join("missing.csv"));
    let client = FakeOpenAIClient::new();

    let err = pipeline::run(&config, &client).await.unwrap_err();

    assert!(matches!(err, DatasetError::SourceUnavailable { .. }));
    assert_eq!(client.request_count(), 0);
}
