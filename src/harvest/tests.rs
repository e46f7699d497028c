//! Harvesting Module Tests
//!
//! Validates traversal, extraction and fan-out of the harvesting pipeline.
//!
//! ## Test Scopes
//! - **Crawl completeness**: every live record reaches `add`, every tombstone `delete`,
//!   in discovery order, for every subscriber.
//! - **Fan-out isolation**: one failing consumer does not starve the others.
//! - **Dispatch**: unsupported repository types fail before any read.
//! - **Failure policy**: malformed units are skipped, an unreadable root is fatal.

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::harvest::consumers::{
        DeletionService, InMemoryStore, IndexUpdateClient, IndexWriter, RecordRemover,
    };
    use crate::harvest::producer::RecordConsumer;
    use crate::record::Record;
    use crate::harvest::crawler::Crawler;
    use crate::harvest::dispatcher::HarvestWiring;
    use crate::harvest::generator::RecordGenerator;
    use crate::harvest::source::{ContentSource, FileSource};
    use crate::harvest::types::{CrawlTarget, RepositoryType};
    use crate::testing::{FakeSource, RecordingConsumer, oai_page};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tempfile::TempDir;
    use url::Url;

    fn oai_repository() -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("a.xml"),
            oai_page(&[("rec-1", false, "First"), ("rec-2", true, "")], None),
        )
        .unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(
            tmp.path().join("nested").join("b.xml"),
            oai_page(&[("rec-3", false, "Third"), ("rec-4", false, "Fourth")], None),
        )
        .unwrap();
        tmp
    }

    fn target(dir: &TempDir, recursive: bool) -> CrawlTarget {
        CrawlTarget::new(Url::from_file_path(dir.path()).unwrap(), recursive)
    }

    // ============================================================
    // CRAWL TARGET TESTS
    // ============================================================

    #[test]
    fn test_crawl_target_accepts_uris_and_paths() {
        let http = CrawlTarget::parse("http://repo.example.org/oai", true).unwrap();
        assert_eq!(http.uri.scheme(), "http");
        assert!(http.recursive);

        let tmp = TempDir::new().unwrap();
        let path = CrawlTarget::parse(tmp.path().to_str().unwrap(), false).unwrap();
        assert_eq!(path.uri.scheme(), "file");
    }

    #[test]
    fn test_crawl_target_rejects_empty() {
        let err = CrawlTarget::parse("  ", false).unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));
    }

    #[test]
    fn test_repository_type_from_str() {
        assert_eq!("OAI".parse::<RepositoryType>().unwrap(), RepositoryType::Oai);
        assert_eq!(
            "catalog".parse::<RepositoryType>().unwrap(),
            RepositoryType::Catalog
        );
        let err = "thredds".parse::<RepositoryType>().unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    // ============================================================
    // CRAWL COMPLETENESS
    // ============================================================

    #[tokio::test]
    async fn test_recursive_crawl_delivers_every_record_to_every_consumer() {
        let repo = oai_repository();
        let first = Arc::new(RecordingConsumer::new("first"));
        let second = Arc::new(RecordingConsumer::new("second"));

        let mut crawler =
            Crawler::repository(RepositoryType::Oai, Arc::new(FileSource)).unwrap();
        crawler.subscribe(first.clone());
        crawler.subscribe(second.clone());

        let report = crawler.crawl(&target(&repo, true)).await.unwrap();

        assert_eq!(report.documents, 2);
        assert_eq!(report.harvested, 3);
        assert_eq!(report.deleted, 1);
        assert!(report.skipped.is_empty());

        let expected = vec!["add:rec-1", "delete:rec-2", "add:rec-3", "add:rec-4"];
        assert_eq!(first.events(), expected);
        assert_eq!(second.events(), expected);
    }

    #[tokio::test]
    async fn test_non_recursive_crawl_stays_at_top_level() {
        let repo = oai_repository();
        let sink = Arc::new(RecordingConsumer::new("sink"));

        let mut crawler =
            Crawler::repository(RepositoryType::Oai, Arc::new(FileSource)).unwrap();
        crawler.subscribe(sink.clone());

        let report = crawler.crawl(&target(&repo, false)).await.unwrap();

        assert_eq!(report.documents, 1);
        assert_eq!(sink.events(), vec!["add:rec-1", "delete:rec-2"]);
    }

    #[tokio::test]
    async fn test_extracted_fields_reach_the_store() {
        let repo = oai_repository();
        let store = InMemoryStore::new();

        let dispatcher = HarvestWiring::new()
            .crawler(Crawler::repository(RepositoryType::Oai, Arc::new(FileSource)).unwrap())
            .consumer(store.clone())
            .build();

        dispatcher
            .harvest(repo.path().to_str().unwrap(), true, RepositoryType::Oai)
            .await
            .unwrap();

        assert_eq!(store.len(), 3);
        let third = store.get("rec-3").unwrap();
        assert_eq!(third.first("Entry_Title"), Some("Third"));
        assert_eq!(third.first("subject"), Some("climate"));
        assert_eq!(third.first("datestamp"), Some("2010-01-01"));
        assert!(store.get("rec-2").is_none());
    }

    #[tokio::test]
    async fn test_resumption_tokens_are_followed_to_exhaustion() {
        let source = FakeSource::new()
            .document(
                "http://repo.test/oai?verb=ListRecords",
                oai_page(&[("p1-a", false, "A")], Some("t2")),
            )
            .document(
                "http://repo.test/oai?verb=ListRecords&resumptionToken=t2",
                oai_page(&[("p2-a", false, "B"), ("p2-b", true, "")], Some("t3")),
            )
            .document(
                "http://repo.test/oai?verb=ListRecords&resumptionToken=t3",
                oai_page(&[("p3-a", false, "C")], None),
            );
        let sink = Arc::new(RecordingConsumer::new("sink"));

        let mut crawler = Crawler::repository(RepositoryType::Oai, Arc::new(source)).unwrap();
        crawler.subscribe(sink.clone());

        let uri = Url::parse("http://repo.test/oai?verb=ListRecords").unwrap();
        let report = crawler.crawl(&CrawlTarget::new(uri, false)).await.unwrap();

        assert_eq!(report.documents, 3);
        assert_eq!(
            sink.events(),
            vec!["add:p1-a", "add:p2-a", "delete:p2-b", "add:p3-a"]
        );
    }

    #[tokio::test]
    async fn test_catalog_references_followed_only_when_recursive() {
        let source = Arc::new(
            FakeSource::new()
                .document(
                    "http://cat.test/root.json",
                    r#"{"datasets":[{"id":"d1","fields":{"project":"AIRS"}}],"catalogs":["sub/child.json"]}"#,
                )
                .document(
                    "http://cat.test/sub/child.json",
                    r#"{"datasets":[{"id":"d2"},{"id":"d3","deleted":true}],"catalogs":["../root.json"]}"#,
                ),
        );
        let root = Url::parse("http://cat.test/root.json").unwrap();

        let shallow_sink = Arc::new(RecordingConsumer::new("shallow"));
        let mut shallow = Crawler::repository(RepositoryType::Catalog, source.clone()).unwrap();
        shallow.subscribe(shallow_sink.clone());
        shallow
            .crawl(&CrawlTarget::new(root.clone(), false))
            .await
            .unwrap();
        assert_eq!(shallow_sink.events(), vec!["add:d1"]);

        let deep_sink = Arc::new(RecordingConsumer::new("deep"));
        let mut deep = Crawler::repository(RepositoryType::Catalog, source.clone()).unwrap();
        deep.subscribe(deep_sink.clone());
        let report = deep.crawl(&CrawlTarget::new(root, true)).await.unwrap();

        // the child's back-reference to the root is not crawled twice
        assert_eq!(report.documents, 2);
        assert_eq!(deep_sink.events(), vec!["add:d1", "add:d2", "delete:d3"]);
    }

    #[tokio::test]
    async fn test_generator_emits_configured_number_of_records() {
        let store = InMemoryStore::new();
        let dispatcher = HarvestWiring::new()
            .crawler(Crawler::generator(RecordGenerator::new(4)))
            .consumer(store.clone())
            .build();

        let report = dispatcher
            .harvest("generator:records", false, RepositoryType::Generator)
            .await
            .unwrap();

        assert_eq!(report.harvested, 4);
        assert_eq!(store.len(), 4);
        assert_eq!(store.records()[0].first("project"), Some("AIRS"));
    }

    // ============================================================
    // FAN-OUT ISOLATION
    // ============================================================

    #[tokio::test]
    async fn test_failing_consumer_does_not_block_siblings() {
        let repo = oai_repository();
        let failing = Arc::new(RecordingConsumer::failing_on("failing", "rec-3"));
        let healthy = Arc::new(RecordingConsumer::new("healthy"));

        let mut crawler =
            Crawler::repository(RepositoryType::Oai, Arc::new(FileSource)).unwrap();
        crawler.subscribe(failing.clone());
        crawler.subscribe(healthy.clone());

        let err = crawler.crawl(&target(&repo, true)).await.unwrap_err();

        match err {
            Error::Consumer {
                consumer,
                record_id,
                ..
            } => {
                assert_eq!(consumer, "failing");
                assert_eq!(record_id, "rec-3");
            }
            other => panic!("unexpected error: {other}"),
        }

        // the crawl kept going past the failing record for both consumers
        let expected = vec!["add:rec-1", "delete:rec-2", "add:rec-3", "add:rec-4"];
        assert_eq!(failing.events(), expected);
        assert_eq!(healthy.events(), expected);
    }

    #[tokio::test]
    async fn test_first_consumer_error_is_the_one_surfaced() {
        let repo = oai_repository();
        let late = Arc::new(RecordingConsumer::failing_on("late", "rec-4"));
        let early = Arc::new(RecordingConsumer::failing_on("early", "rec-1"));

        let mut crawler =
            Crawler::repository(RepositoryType::Oai, Arc::new(FileSource)).unwrap();
        crawler.subscribe(late.clone());
        crawler.subscribe(early.clone());

        let err = crawler.crawl(&target(&repo, true)).await.unwrap_err();
        assert!(matches!(err, Error::Consumer { ref record_id, .. } if record_id == "rec-1"));
    }

    // ============================================================
    // DISPATCH VALIDATION
    // ============================================================

    #[tokio::test]
    async fn test_unsupported_repository_type_fails_before_io() {
        let source = Arc::new(FakeSource::new().document(
            "http://repo.test/catalog.json",
            r#"{"datasets":[]}"#,
        ));
        let dispatcher = HarvestWiring::new()
            .crawler(Crawler::repository(RepositoryType::Oai, source.clone()).unwrap())
            .consumer(InMemoryStore::new())
            .build();

        let err = dispatcher
            .harvest("http://repo.test/catalog.json", true, RepositoryType::Catalog)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::UnsupportedRepositoryType(RepositoryType::Catalog)
        ));
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_wiring_is_cross_product() {
        let dispatcher = HarvestWiring::with_all_repositories(
            Arc::new(FakeSource::new()),
            RecordGenerator::new(1),
        )
        .unwrap()
        .consumer(InMemoryStore::new())
        .consumer(Arc::new(RecordingConsumer::new("other")))
        .build();

        for kind in RepositoryType::ALL {
            assert!(dispatcher.supports(kind));
            assert_eq!(dispatcher.subscriber_count(kind), 2);
        }
    }

    #[test]
    fn test_generator_has_no_repository_crawler() {
        let result = Crawler::repository(RepositoryType::Generator, Arc::new(FakeSource::new()));
        assert!(matches!(
            result,
            Err(Error::UnsupportedRepositoryType(RepositoryType::Generator))
        ));
    }

    // ============================================================
    // FAILURE POLICY
    // ============================================================

    #[tokio::test]
    async fn test_malformed_unit_is_skipped() {
        let repo = oai_repository();
        fs::write(repo.path().join("broken.xml"), "<html>not oai</html>").unwrap();
        let sink = Arc::new(RecordingConsumer::new("sink"));

        let mut crawler =
            Crawler::repository(RepositoryType::Oai, Arc::new(FileSource)).unwrap();
        crawler.subscribe(sink.clone());

        let report = crawler.crawl(&target(&repo, true)).await.unwrap();

        assert_eq!(report.harvested, 3);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].uri.ends_with("broken.xml"));
        assert_eq!(sink.events().len(), 4);
    }

    #[tokio::test]
    async fn test_record_without_identifier_is_rejected_not_fatal() {
        let body = oai_page(&[("ok", false, "Fine")], None).replace(
            "</ListRecords>",
            "<record><header><datestamp>2010</datestamp></header></record></ListRecords>",
        );
        let source = FakeSource::new().document("http://repo.test/oai", body);
        let sink = Arc::new(RecordingConsumer::new("sink"));

        let mut crawler = Crawler::repository(RepositoryType::Oai, Arc::new(source)).unwrap();
        crawler.subscribe(sink.clone());

        let uri = Url::parse("http://repo.test/oai").unwrap();
        let report = crawler.crawl(&CrawlTarget::new(uri, false)).await.unwrap();

        assert_eq!(report.harvested, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(sink.events(), vec!["add:ok"]);
    }

    #[tokio::test]
    async fn test_unreadable_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("does-not-exist");
        let crawler = Crawler::repository(RepositoryType::Oai, Arc::new(FileSource)).unwrap();

        let err = crawler
            .crawl(&CrawlTarget::new(
                Url::from_file_path(&missing).unwrap(),
                true,
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Transport { .. }));
    }

    #[tokio::test]
    async fn test_unreadable_child_is_skipped() {
        let source = FakeSource::new()
            .collection(
                "http://repo.test/root",
                &["http://repo.test/gone", "http://repo.test/page"],
            )
            .document(
                "http://repo.test/page",
                oai_page(&[("kept", false, "Kept")], None),
            );
        let sink = Arc::new(RecordingConsumer::new("sink"));

        let mut crawler = Crawler::repository(RepositoryType::Oai, Arc::new(source)).unwrap();
        crawler.subscribe(sink.clone());

        let uri = Url::parse("http://repo.test/root").unwrap();
        let report = crawler.crawl(&CrawlTarget::new(uri, true)).await.unwrap();

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].uri, "http://repo.test/gone");
        assert_eq!(sink.events(), vec!["add:kept"]);
    }

    #[tokio::test]
    async fn test_file_source_lists_directories_in_name_order() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.xml"), "").unwrap();
        fs::write(tmp.path().join("a.xml"), "").unwrap();
        fs::write(tmp.path().join(".hidden"), "").unwrap();

        let content = FileSource
            .read(&Url::from_file_path(tmp.path()).unwrap())
            .await
            .unwrap();

        match content {
            crate::harvest::source::Content::Collection(children) => {
                let names: Vec<String> = children
                    .iter()
                    .map(|c| c.path_segments().unwrap().last().unwrap().to_string())
                    .collect();
                assert_eq!(names, vec!["a.xml", "b.xml"]);
            }
            other => panic!("expected a collection, got {other:?}"),
        }
    }

    // ============================================================
    // INDEX UPDATE CLIENT
    // ============================================================

    type Updates = Arc<Mutex<Vec<serde_json::Value>>>;

    /// An update endpoint that records every JSON payload; `/broken/update` fails.
    async fn spawn_index() -> (String, Updates) {
        use axum::Router;
        use axum::http::StatusCode;
        use axum::routing::post;

        let updates: Updates = Arc::new(Mutex::new(Vec::new()));
        let sink = updates.clone();
        let app = Router::new()
            .route(
                "/solr/update",
                post(move |axum::Json(body): axum::Json<serde_json::Value>| {
                    let sink = sink.clone();
                    async move {
                        sink.lock().unwrap().push(body);
                        StatusCode::OK
                    }
                }),
            )
            .route(
                "/broken/update",
                post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), updates)
    }

    #[test]
    fn test_update_url_commits() {
        let client = IndexUpdateClient::new("http://localhost:8983/solr/", Duration::from_secs(1));
        assert_eq!(
            client.update_url(),
            "http://localhost:8983/solr/update?commit=true"
        );
    }

    #[tokio::test]
    async fn test_index_writer_posts_documents_and_deletions() {
        let (base, updates) = spawn_index().await;
        let client = Arc::new(IndexUpdateClient::new(
            &format!("{}/solr", base),
            Duration::from_secs(5),
        ));
        let writer = IndexWriter::new(client.clone());

        let record = Record::new("ds-1").with_field("project", "AIRS");
        writer.add(&record).await.unwrap();
        writer.delete("ds-0").await.unwrap();

        let updates = updates.lock().unwrap().clone();
        assert_eq!(updates.len(), 2);
        assert_eq!(
            updates[0],
            serde_json::json!([{"id": "ds-1", "project": ["AIRS"]}])
        );
        assert_eq!(updates[1], serde_json::json!({"delete": ["ds-0"]}));
    }

    #[tokio::test]
    async fn test_record_remover_deletes_live_records() {
        let (base, updates) = spawn_index().await;
        let client = Arc::new(IndexUpdateClient::new(
            &format!("{}/solr", base),
            Duration::from_secs(5),
        ));
        let remover = RecordRemover::new(client);

        remover.add(&Record::new("ds-7")).await.unwrap();

        assert_eq!(
            updates.lock().unwrap().clone(),
            vec![serde_json::json!({"delete": ["ds-7"]})]
        );
    }

    #[tokio::test]
    async fn test_rejected_update_is_an_error() {
        let (base, _updates) = spawn_index().await;
        let client = IndexUpdateClient::new(&format!("{}/broken", base), Duration::from_secs(5));

        let err = client.delete_ids(&["x".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_in_memory_store_keeps_first_seen_order() {
        let store = InMemoryStore::new();
        store.insert(Record::new("b"));
        store.insert(Record::new("a"));
        store.insert(Record::new("b").with_field("v", "2"));

        let records = store.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "b");
        assert_eq!(records[0].first("v"), Some("2"));

        store.delete_ids(&["b".to_string()]).await.unwrap();
        assert_eq!(store.len(), 1);
    }
}
