//! Integration tests for the full classification pipeline.
//!
//! These tests exercise the end-to-end flow over mocks:
//! 1. Parse a sitemap
//! 2. Merge with prior results
//! 3. Run the queue (fetch → classify)
//! 4. Export and re-import the results collection

use std::time::Duration;

use classification::testing::{MockClassifier, MockFetcher};
use classification::{
    export_results, import_results, parse_sitemap, BackendConfig, ItemState, PipelineError,
    ProcessingQueue, QueueConfig, SecretString,
};

const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>https://site.org/about</loc></url>
  <url><loc>https://site.org/guides/memory</loc></url>
  <url><loc>https://site.org/guides/school</loc></url>
</urlset>"#;

fn quick_config() -> QueueConfig {
    QueueConfig::default().with_pacing(Duration::from_millis(1))
}

#[tokio::test]
async fn test_full_run_classifies_every_sitemap_url() {
    let urls = parse_sitemap(SITEMAP);
    assert_eq!(urls.len(), 3);

    let fetcher = MockFetcher::new().with_content("cleaned page text");
    let classifier = MockClassifier::new();

    // Pacing follows the configured backend, as a caller would wire it up.
    let backend = BackendConfig::Gemini {
        api_key: SecretString::from("test-key"),
        model: "gemini-2.0-flash".to_string(),
    };
    let config = QueueConfig::for_backend(backend.provider())
        .with_pacing(Duration::from_millis(1));

    let mut queue = ProcessingQueue::new(urls, &[], config);
    let results = queue.run(&fetcher, &classifier).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(queue.is_finished());
    assert_eq!(results[0].url, "https://site.org/about");
    assert!(!results[0].tags.is_empty());
}

#[tokio::test]
async fn test_export_import_round_trip_restores_completed_state() {
    let urls = parse_sitemap(SITEMAP);
    let fetcher = MockFetcher::new();
    let classifier = MockClassifier::new();

    // First run produces results.
    let mut queue = ProcessingQueue::new(urls.clone(), &[], quick_config());
    let results = queue.run(&fetcher, &classifier).await.unwrap();
    let exported = export_results(&results).unwrap();

    // Re-import and re-run the same sitemap: every URL starts Completed
    // and no network work happens, not even a credential check.
    let prior = import_results(&exported).unwrap();
    assert_eq!(prior, results);

    let fetcher2 = MockFetcher::new();
    let classifier2 = MockClassifier::new().with_failing_preflight();
    let mut queue2 = ProcessingQueue::new(urls, &prior, quick_config());

    assert!(queue2.is_finished());
    let results2 = queue2.run(&fetcher2, &classifier2).await.unwrap();

    assert!(fetcher2.calls().is_empty());
    assert!(classifier2.calls().is_empty());
    assert_eq!(results2, results);
}

#[tokio::test]
async fn test_partial_run_resumes_where_it_stopped() {
    let urls = parse_sitemap(SITEMAP);
    let fetcher = MockFetcher::new();
    let classifier = MockClassifier::new();

    // Simulate a partial first run: only the first URL got classified.
    let mut first = ProcessingQueue::new(vec![urls[0].clone()], &[], quick_config());
    let partial = first.run(&fetcher, &classifier).await.unwrap();
    assert_eq!(partial.len(), 1);

    // Resume with the full sitemap.
    let fetcher2 = MockFetcher::new();
    let classifier2 = MockClassifier::new();
    let mut second = ProcessingQueue::new(urls, &partial, quick_config());
    let results = second.run(&fetcher2, &classifier2).await.unwrap();

    assert_eq!(results.len(), 3);
    // Only the two new URLs were fetched.
    assert_eq!(
        fetcher2.calls(),
        vec!["https://site.org/guides/memory", "https://site.org/guides/school"]
    );
}

#[tokio::test]
async fn test_failures_are_isolated_and_reported_per_item() {
    let urls = parse_sitemap(SITEMAP);
    let fetcher = MockFetcher::new().failing_for("https://site.org/guides/memory");
    let classifier = MockClassifier::new().failing_for("https://site.org/guides/school");

    let mut queue = ProcessingQueue::new(urls, &[], quick_config());
    let results = queue.run(&fetcher, &classifier).await.unwrap();

    assert_eq!(results.len(), 1);

    let items = queue.items();
    assert_eq!(items[0].state, ItemState::Completed);
    assert_eq!(items[1].state, ItemState::Error);
    assert!(items[1].error.as_deref().unwrap().contains("strategies"));
    assert_eq!(items[2].state, ItemState::Error);
    assert!(items[2].error.as_deref().unwrap().contains("classification"));
    assert!(queue.is_finished());
}

#[tokio::test]
async fn test_progress_stream_is_monotonic() {
    let urls = parse_sitemap(SITEMAP);
    let fetcher = MockFetcher::new();
    let classifier = MockClassifier::new();

    let mut queue = ProcessingQueue::new(urls, &[], quick_config());
    let mut progress = queue.subscribe();

    let mut seen = vec![progress.borrow().percent];
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        while progress.changed().await.is_ok() {
            seen.push(progress.borrow().percent);
        }
        seen
    });

    queue.run(&fetcher, &classifier).await.unwrap();
    drop(queue);

    seen.extend(handle.await.unwrap());
    assert!(seen.windows(2).all(|w| w[0] <= w[1]), "percent went backwards: {seen:?}");
    assert_eq!(*seen.last().unwrap(), 100.0);
}

#[tokio::test]
async fn test_credential_failure_aborts_before_spending_fetch_quota() {
    let urls = parse_sitemap(SITEMAP);
    let fetcher = MockFetcher::new();
    let classifier = MockClassifier::new().with_failing_preflight();

    let mut queue = ProcessingQueue::new(urls, &[], quick_config());
    let err = queue.run(&fetcher, &classifier).await.unwrap_err();

    assert!(matches!(err, PipelineError::Credential(_)));
    // Nothing was fetched and every item is still Pending, so a later run
    // with fixed credentials starts from scratch.
    assert!(fetcher.calls().is_empty());
    assert!(queue.items().iter().all(|i| i.state == ItemState::Pending));
}

#[tokio::test]
async fn test_empty_sitemap_is_nothing_to_do_not_an_error() {
    let urls = parse_sitemap("no locs here");
    assert!(urls.is_empty());

    let queue = ProcessingQueue::new(urls, &[], quick_config());
    assert!(queue.is_finished());
}
