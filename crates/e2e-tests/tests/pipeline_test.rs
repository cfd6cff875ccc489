//! End-to-end pipeline tests for readagent.
//!
//! Dataset -> paginate batch -> answer batch -> evaluation report, plus the
//! paging and lookup behaviors observable from the outside.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{long_article, sample_dataset, TestHarness};
use readagent_llm::MockBackend;
use readagent_pager::{segment, Capabilities, ReadAgent};
use readagent_runner::{evaluate_dir, read_records, run_batch, snapshot_path, Dataset};
use readagent_types::{AnswerRecord, BatchPolicy, Document, ErrorRecord, PaginationConfig, Question};

async fn paginate_all(harness: &TestHarness, mock: Arc<MockBackend>, dataset: &Dataset) {
    let job = Arc::new(harness.paginate_job(mock));
    let items: Vec<(String, Document)> = dataset
        .items()
        .into_iter()
        .map(|item| (item.document.doc_id.clone(), item.document))
        .collect();

    let summary = run_batch(items, 2, BatchPolicy::FailFast, move |document: Document| {
        let job = Arc::clone(&job);
        async move { job.run(&document).await.map(|_| ()) }
    })
    .await
    .expect("pagination batch failed");
    assert_eq!(summary.failed, 0);
}

async fn answer_all(harness: &TestHarness, mock: Arc<MockBackend>, dataset: &Dataset) {
    let job = Arc::new(harness.answer_job(mock));
    let items: Vec<(String, (String, Vec<Question>))> = dataset
        .items()
        .into_iter()
        .map(|item| {
            let doc_id = item.document.doc_id;
            (doc_id.clone(), (doc_id, item.questions))
        })
        .collect();

    run_batch(
        items,
        2,
        BatchPolicy::FailFast,
        move |(doc_id, questions): (String, Vec<Question>)| {
            let job = Arc::clone(&job);
            async move { job.run(&doc_id, &questions).await.map(|_| ()) }
        },
    )
    .await
    .expect("answer batch failed");
}

/// Full run over a three-document dataset with the mock backend.
#[tokio::test]
async fn test_full_pipeline_dataset_to_report() {
    let harness = TestHarness::new();
    let dataset = Dataset::load(&harness.write_dataset(&sample_dataset())).unwrap();
    let mock = Arc::new(MockBackend::new());

    paginate_all(&harness, mock.clone(), &dataset).await;
    for item in dataset.items() {
        let doc_id = &item.document.doc_id;
        assert!(snapshot_path(&harness.pages_dir, doc_id).unwrap().exists());
        assert!(snapshot_path(&harness.gists_dir, doc_id).unwrap().exists());
    }

    answer_all(&harness, mock.clone(), &dataset).await;

    let answers: Vec<AnswerRecord> = read_records(&harness.answers_path).unwrap();
    let errors: Vec<ErrorRecord> = read_records(&harness.errors_path()).unwrap();
    assert_eq!(answers.len(), 4);
    assert!(errors.is_empty());

    let report = evaluate_dir(&harness.answers_dir).unwrap();
    assert_eq!(report.logs.len(), 1);
    let log = &report.logs[0];
    assert_eq!(log.file, "run.jsonl");
    assert_eq!(log.documents, 3);
    assert_eq!(log.total_entries, 4);
    // The mock always picks option 1.
    assert_eq!(log.correct, 2);
    assert_eq!(log.accuracy, 50.0);
    assert_eq!((log.hard_entries, log.hard_correct), (1, 1));
    assert_eq!(log.f1_questions, 1);
    assert_eq!(log.f1, Some(57.14));
}

/// Saved pages are exactly the segmented article, in order.
#[tokio::test]
async fn test_page_snapshots_partition_the_article() {
    let harness = TestHarness::new();
    let dataset = Dataset::load(&harness.write_dataset(&sample_dataset())).unwrap();
    paginate_all(&harness, Arc::new(MockBackend::new()), &dataset).await;

    for item in dataset.items() {
        let pages_path = snapshot_path(&harness.pages_dir, &item.document.doc_id).unwrap();
        let gists_path = snapshot_path(&harness.gists_dir, &item.document.doc_id).unwrap();
        let pages: Vec<Vec<String>> =
            serde_json::from_str(&std::fs::read_to_string(pages_path).unwrap()).unwrap();
        let gists: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(gists_path).unwrap()).unwrap();

        let flattened: Vec<String> = pages.into_iter().flatten().collect();
        let expected: Vec<String> = segment(&item.document.text, 600)
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(flattened, expected);
        assert!(!gists.is_empty());
    }
}

/// A document below the pagination minimum becomes one page and the
/// boundary oracle is never asked.
#[tokio::test]
async fn test_short_document_is_single_page() {
    let mock = Arc::new(MockBackend::new());
    let mut agent = ReadAgent::new(
        Capabilities::from_backend(mock.clone()),
        PaginationConfig::default(),
    );

    let pages = agent.create_pages(&long_article("tiny", 3, 10)).await.unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].len(), 3);
    assert_eq!(mock.oracle_calls(), 0);
}

/// Selector output `[2, 99, abc, 3]` over five pages expands pages 2 and 3.
#[tokio::test]
async fn test_lookup_expands_only_valid_selection() {
    let mock = Arc::new(
        MockBackend::new()
            .with_boundary_response("Label: <0>")
            .with_selection_response("I want to look up Page [2, 99, abc, 3] to answer."),
    );
    let mut agent = ReadAgent::new(
        Capabilities::from_backend(mock.clone()),
        PaginationConfig::default(),
    );

    // Rejected boundaries fall back to 30-sentence windows: five pages.
    let page_count = agent
        .create_pages(&long_article("cliff", 140, 20))
        .await
        .unwrap()
        .len();
    assert_eq!(page_count, 5);
    agent.shorten_pages().await.unwrap();

    let answer = agent.answer_question("What happened?", None, 6).await.unwrap();

    assert_eq!(answer.selected_pages, vec![2, 3]);
    let context = mock.last_context().unwrap();
    let store = agent.store();
    assert!(context.contains(&store.pages()[2].text()));
    assert!(context.contains(&store.pages()[3].text()));
    assert!(!context.contains(&store.pages()[1].text()));
    assert!(context.contains(&store.gists()[1]));
}

/// A fresh agent answers from snapshots exactly like the one that built them.
#[tokio::test]
async fn test_answers_identical_after_reload() {
    let harness = TestHarness::new();
    let mock = Arc::new(MockBackend::new().with_selection_response("Page [1]"));
    let document = Document::with_id("reload", long_article("reload", 50, 20));
    harness.paginate_job(mock.clone()).run(&document).await.unwrap();

    let capabilities = Capabilities::from_backend(mock.clone());
    let mut first = ReadAgent::new(capabilities.clone(), PaginationConfig::default());
    first.load_pages(&snapshot_path(&harness.pages_dir, "reload").unwrap()).unwrap();
    first.load_gists(&snapshot_path(&harness.gists_dir, "reload").unwrap()).unwrap();
    let mut second = ReadAgent::new(capabilities, PaginationConfig::default());
    second.load_pages(&snapshot_path(&harness.pages_dir, "reload").unwrap()).unwrap();
    second.load_gists(&snapshot_path(&harness.gists_dir, "reload").unwrap()).unwrap();

    let a = first.answer_question("Q?", None, 6).await.unwrap();
    let b = second.answer_question("Q?", None, 6).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(a.selected_pages, vec![1]);
}
