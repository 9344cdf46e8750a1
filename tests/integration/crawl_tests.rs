//! Integration tests for the harvester
//!
//! These tests use wiremock to serve a small directory site and exercise the
//! fetcher, the pagination walker and the full category walk end-to-end.

use directory_harvest::config::{parse_config, Config};
use directory_harvest::crawler::{
    build_http_client, CompanyExtractor, ExtractOutcome, FetchResult, Fetcher, Harvester,
    PageParser, PaginationWalker,
};
use directory_harvest::storage::{
    lock_store, shared, CategoryCount, CompanyRecord, CompanyStore, InsertOutcome, RunRecord,
    RunStatus, SharedStore, SqliteStorage, StorageError, StorageResult,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &str, crawler_extra: &str) -> Config {
    parse_config(&format!(
        r#"
[site]
base-url = "{base_url}"
root-path = "/shops/"

[crawler]
max-concurrent-extractions = 4
request-timeout-secs = 5
{crawler_extra}

[output]
database-path = "{db_path}"

[selectors]
main-category-item = "ul.main li a"
main-category-name = "div.name"
sub-category-item = "aside ul.sub li a"
sub-category-name = "span.name"
listing-item = "main a.result"
pagination-link = "div.pagination a"
"#
    ))
    .expect("test config should be valid")
}

fn category_page(list_class: &str, name_tag: &str, categories: &[(&str, &str)]) -> String {
    let items: String = categories
        .iter()
        .map(|(name, href)| {
            format!(
                r#"<li><a href="{href}"><{name_tag} class="name">{name}</{name_tag}></a></li>"#
            )
        })
        .collect();
    if list_class == "sub" {
        format!(r#"<html><body><aside><ul class="sub">{items}</ul></aside></body></html>"#)
    } else {
        format!(r#"<html><body><ul class="main">{items}</ul></body></html>"#)
    }
}

fn root_page(categories: &[(&str, &str)]) -> String {
    category_page("main", "div", categories)
}

fn main_category_page(sub_categories: &[(&str, &str)]) -> String {
    category_page("sub", "span", sub_categories)
}

fn listing_page(links: &[&str]) -> String {
    let items: String = links
        .iter()
        .map(|href| format!(r#"<a class="result" href="{href}">Shop</a>"#))
        .collect();
    format!(
        r#"<html><body><main>{items}</main>
        <div class="pagination"><a href="?page=1">1</a><a href="?page=2">2</a><a>Next</a><a>Last</a></div>
        </body></html>"#
    )
}

fn profile_page(profile: Value) -> String {
    let payload = json!({ "props": { "pageProps": { "profile": profile } } });
    format!(
        r#"<html><head><script id="__NEXT_DATA__" type="application/json">{payload}</script></head><body></body></html>"#
    )
}

fn company_profile(name: &str, email: &str) -> Value {
    json!({
        "name": name,
        "url": format!("https://{}.example", name),
        "organization": { "name": format!("{} GmbH", name) },
        "address": { "street": "Weg 1", "zip": "50667", "city": "Köln" },
        "contactData": { "phone": "+49 221 1", "email": email },
        "reviewStatistic": { "allTimeReviewCount": 42, "grade": 4.5 }
    })
}

async fn mount_html(server: &MockServer, route: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

async fn mount_listing(server: &MockServer, route: &str, page: &str, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Store double that records inserts and shares its event log with responders
struct RecordingStore {
    contacted: HashSet<String>,
    emails: HashSet<String>,
    records: Arc<Mutex<Vec<CompanyRecord>>>,
    insert_calls: Arc<AtomicUsize>,
    events: Arc<Mutex<Vec<String>>>,
    run_status: Arc<Mutex<Option<RunStatus>>>,
    panic_on: Option<String>,
    disk_full: bool,
}

impl RecordingStore {
    fn new(contacted: &[&str], events: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            contacted: contacted.iter().map(|e| e.to_string()).collect(),
            emails: HashSet::new(),
            records: Arc::new(Mutex::new(Vec::new())),
            insert_calls: Arc::new(AtomicUsize::new(0)),
            events,
            run_status: Arc::new(Mutex::new(None)),
            panic_on: None,
            disk_full: false,
        }
    }

    /// Panics while inserting this email, with the store lock held
    fn panicking_on(mut self, email: &str) -> Self {
        self.panic_on = Some(email.to_string());
        self
    }

    /// Fails every insert the way a full disk would
    fn with_full_disk(mut self) -> Self {
        self.disk_full = true;
        self
    }
}

impl CompanyStore for RecordingStore {
    fn ensure_schema(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn insert_company(&mut self, record: &CompanyRecord) -> StorageResult<InsertOutcome> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.events
            .lock()
            .unwrap()
            .push(format!("insert {}", record.email));
        if self.panic_on.as_deref() == Some(record.email.as_str()) {
            panic!("insert of {} blew up", record.email);
        }
        if self.disk_full {
            return Err(StorageError::Sqlite(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
                Some("database or disk is full".to_string()),
            )));
        }
        if !self.emails.insert(record.email.clone()) {
            return Ok(InsertOutcome::Duplicate);
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn is_contacted(&self, email: &str) -> StorageResult<bool> {
        Ok(self.contacted.contains(email))
    }

    fn create_run(&mut self, _config_hash: &str) -> StorageResult<i64> {
        *self.run_status.lock().unwrap() = Some(RunStatus::Running);
        Ok(1)
    }

    fn complete_run(&mut self, _run_id: i64, _companies_inserted: u64) -> StorageResult<()> {
        *self.run_status.lock().unwrap() = Some(RunStatus::Completed);
        Ok(())
    }

    fn fail_run(&mut self, _run_id: i64) -> StorageResult<()> {
        *self.run_status.lock().unwrap() = Some(RunStatus::Failed);
        Ok(())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        Ok(None)
    }

    fn count_companies(&self) -> StorageResult<u64> {
        Ok(self.emails.len() as u64)
    }

    fn count_companies_by_category(&self) -> StorageResult<Vec<CategoryCount>> {
        Ok(Vec::new())
    }
}

/// Responder that notes when it was hit in the shared event log
struct LoggingResponder {
    events: Arc<Mutex<Vec<String>>>,
    label: &'static str,
    body: String,
}

impl Respond for LoggingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.events.lock().unwrap().push(self.label.to_string());
        ResponseTemplate::new(200).set_body_string(self.body.clone())
    }
}

fn walker_for(config: &Config, store: SharedStore) -> PaginationWalker {
    let fetcher = Fetcher::from_config(&config.crawler).expect("Failed to build fetcher");
    let parser = Arc::new(
        PageParser::new(&config.site.base_url, &config.selectors).expect("Failed to build parser"),
    );
    let extractor = Arc::new(CompanyExtractor::new(
        fetcher.clone(),
        Arc::clone(&parser),
        store,
    ));
    PaginationWalker::new(
        fetcher,
        parser,
        extractor,
        config.crawler.max_concurrent_extractions as usize,
    )
}

#[tokio::test]
async fn test_fetch_gives_up_after_retry_ceiling() {
    let mock_server = MockServer::start().await;

    // Initial attempt plus three retries, then abandoned
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), "unused.db", "");
    let fetcher = Fetcher::from_config(&config.crawler).unwrap();

    let result = fetcher
        .fetch(&format!("{}/flaky", mock_server.uri()), &[])
        .await;

    match result {
        FetchResult::Exhausted {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 4);
            assert_eq!(last_error, "HTTP 503");
        }
        other => panic!("expected Exhausted, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_recovers_after_transient_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/recovering"))
        .respond_with(ResponseTemplate::new(200).set_body_string("finally"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(
        build_http_client(&create_test_config(&mock_server.uri(), "unused.db", "").crawler)
            .unwrap(),
        3,
        Duration::ZERO,
    );

    let result = fetcher
        .fetch(&format!("{}/recovering", mock_server.uri()), &[])
        .await;

    assert_eq!(result.into_body().as_deref(), Some("finally"));
}

#[tokio::test]
async fn test_non_200_success_status_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/accepted"))
        .respond_with(ResponseTemplate::new(202).set_body_string("not yet"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(
        build_http_client(&create_test_config(&mock_server.uri(), "unused.db", "").crawler)
            .unwrap(),
        1,
        Duration::ZERO,
    );

    let result = fetcher
        .fetch(&format!("{}/accepted", mock_server.uri()), &[])
        .await;

    assert!(matches!(result, FetchResult::Exhausted { attempts: 2, .. }));
}

#[tokio::test]
async fn test_fetch_reports_url_after_redirect() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old-profile"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("Location", format!("{}/new-profile", mock_server.uri()).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_html(&mock_server, "/new-profile", "moved here".to_string(), 1).await;

    let config = create_test_config(&mock_server.uri(), "unused.db", "");
    let fetcher = Fetcher::from_config(&config.crawler).unwrap();

    match fetcher
        .fetch(&format!("{}/old-profile", mock_server.uri()), &[])
        .await
    {
        FetchResult::Success {
            final_url,
            status_code,
            body,
        } => {
            assert_eq!(final_url, format!("{}/new-profile", mock_server.uri()));
            assert_eq!(status_code, 200);
            assert_eq!(body, "moved here");
        }
        other => panic!("expected Success, got {:?}", other),
    }
}

#[tokio::test]
async fn test_contacted_email_never_reaches_insert() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/profile/known",
        profile_page(company_profile("known", "known@shop.example")),
        1,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.db", "");
    let events = Arc::new(Mutex::new(Vec::new()));
    let store = RecordingStore::new(&["known@shop.example"], events);
    let insert_calls = Arc::clone(&store.insert_calls);

    let fetcher = Fetcher::from_config(&config.crawler).unwrap();
    let parser = Arc::new(PageParser::new(&config.site.base_url, &config.selectors).unwrap());
    let extractor = CompanyExtractor::new(fetcher, parser, shared(store));

    let outcome = extractor
        .extract(
            &format!("{}/profile/known", mock_server.uri()),
            "A",
            "B",
        )
        .await
        .unwrap();

    assert_eq!(outcome, ExtractOutcome::AlreadyContacted);
    assert_eq!(insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_profile_without_email_or_payload_is_skipped() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/profile/no-email",
        profile_page(json!({ "name": "Anonymous" })),
        1,
    )
    .await;
    mount_html(
        &mock_server,
        "/profile/plain",
        "<html><body>Moved</body></html>".to_string(),
        1,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.db", "");
    let store = RecordingStore::new(&[], Arc::new(Mutex::new(Vec::new())));
    let insert_calls = Arc::clone(&store.insert_calls);

    let fetcher = Fetcher::from_config(&config.crawler).unwrap();
    let parser = Arc::new(PageParser::new(&config.site.base_url, &config.selectors).unwrap());
    let extractor = CompanyExtractor::new(fetcher, parser, shared(store));

    let no_email = extractor
        .extract(&format!("{}/profile/no-email", mock_server.uri()), "A", "B")
        .await
        .unwrap();
    let plain = extractor
        .extract(&format!("{}/profile/plain", mock_server.uri()), "A", "B")
        .await
        .unwrap();

    assert_eq!(no_email, ExtractOutcome::MissingEmail);
    assert_eq!(plain, ExtractOutcome::NotAProfile);
    assert_eq!(insert_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_address_stored_as_empty() {
    let mock_server = MockServer::start().await;
    mount_html(
        &mock_server,
        "/profile/bare",
        profile_page(json!({
            "name": "Bare",
            "contactData": { "email": "bare@shop.example" }
        })),
        1,
    )
    .await;

    let config = create_test_config(&mock_server.uri(), "unused.db", "");
    let store = RecordingStore::new(&[], Arc::new(Mutex::new(Vec::new())));
    let records = Arc::clone(&store.records);

    let fetcher = Fetcher::from_config(&config.crawler).unwrap();
    let parser = Arc::new(PageParser::new(&config.site.base_url, &config.selectors).unwrap());
    let extractor = CompanyExtractor::new(fetcher, parser, shared(store));

    let outcome = extractor
        .extract(&format!("{}/profile/bare", mock_server.uri()), "Home", "Garden")
        .await
        .unwrap();

    assert_eq!(outcome, ExtractOutcome::Inserted);
    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].address, "");
    assert_eq!(records[0].phone, "");
    assert_eq!(records[0].rating_count, "0");
    assert_eq!(records[0].rating_value, "0");
    assert_eq!(records[0].main_category, "Home");
    assert_eq!(records[0].sub_category, "Garden");
}

#[tokio::test]
async fn test_page_barrier_completes_extractions_before_next_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let events = Arc::new(Mutex::new(Vec::new()));

    mount_listing(
        &mock_server,
        "/shops/a/b/",
        "1",
        listing_page(&["/profile/1", "/profile/2", "/profile/3"]),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/shops/a/b/"))
        .and(query_param("page", "2"))
        .respond_with(LoggingResponder {
            events: Arc::clone(&events),
            label: "page 2",
            body: listing_page(&[]),
        })
        .expect(1)
        .mount(&mock_server)
        .await;

    for i in 1..=3 {
        Mock::given(method("GET"))
            .and(path(format!("/profile/{}", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(profile_page(company_profile(
                        &format!("shop{}", i),
                        &format!("shop{}@shop.example", i),
                    )))
                    .set_delay(Duration::from_millis(150 * i)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&base_url, "unused.db", "");
    let store = RecordingStore::new(&[], Arc::clone(&events));
    let walker = walker_for(&config, shared(store));

    let stats = walker
        .walk("A", "B", &format!("{}/shops/a/b/", base_url))
        .await
        .unwrap();

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.inserted, 3);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 4, "events: {:?}", *events);
    assert!(events[..3].iter().all(|e| e.starts_with("insert ")));
    assert_eq!(events[3], "page 2");
}

#[tokio::test]
async fn test_walk_stops_at_first_unavailable_page() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_listing(
        &mock_server,
        "/shops/a/b/",
        "1",
        listing_page(&["/profile/dup-1", "/profile/dup-2", "/profile/gone"]),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/shops/a/b/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(4)
        .mount(&mock_server)
        .await;

    mount_listing(&mock_server, "/shops/a/b/", "3", listing_page(&[]), 0).await;

    // Two listings for the same company: one insert, one duplicate
    mount_html(
        &mock_server,
        "/profile/dup-1",
        profile_page(company_profile("dup", "dup@shop.example")),
        1,
    )
    .await;
    mount_html(
        &mock_server,
        "/profile/dup-2",
        profile_page(company_profile("dup", "dup@shop.example")),
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/profile/gone"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&base_url, "unused.db", "");
    let store = shared(SqliteStorage::new_in_memory().unwrap());
    let walker = walker_for(&config, Arc::clone(&store));

    let stats = walker
        .walk("A", "B", &format!("{}/shops/a/b/", base_url))
        .await
        .unwrap();

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.fetch_failed, 1);
    assert_eq!(lock_store(&store).count_companies().unwrap(), 1);
}

#[tokio::test]
async fn test_walk_respects_page_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_listing(&mock_server, "/list/", "3", listing_page(&["/profile/x"]), 1).await;
    mount_listing(&mock_server, "/list/", "4", listing_page(&["/profile/x"]), 0).await;
    mount_html(
        &mock_server,
        "/profile/x",
        profile_page(company_profile("x", "x@shop.example")),
        1,
    )
    .await;

    let config = create_test_config(&base_url, "unused.db", "");
    let store = shared(SqliteStorage::new_in_memory().unwrap());
    let walker = walker_for(&config, store)
        .with_start_page(3)
        .with_max_pages(Some(1));

    let stats = walker
        .walk("A", "B", &format!("{}/list/", base_url))
        .await
        .unwrap();

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.inserted, 1);
}

#[tokio::test]
async fn test_full_harvest_single_category() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/shops/", root_page(&[("A", "/shops/a/")]), 1).await;
    mount_html(
        &mock_server,
        "/shops/a/",
        main_category_page(&[("B", "/shops/a/b/")]),
        1,
    )
    .await;
    mount_listing(
        &mock_server,
        "/shops/a/b/",
        "1",
        listing_page(&["/profile/fresh", "/profile/known"]),
        1,
    )
    .await;
    mount_listing(&mock_server, "/shops/a/b/", "2", listing_page(&[]), 1).await;
    mount_listing(&mock_server, "/shops/a/b/", "3", listing_page(&[]), 0).await;
    mount_html(
        &mock_server,
        "/profile/fresh",
        profile_page(company_profile("fresh", "fresh@shop.example")),
        1,
    )
    .await;
    mount_html(
        &mock_server,
        "/profile/known",
        profile_page(company_profile("known", "known@shop.example")),
        1,
    )
    .await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("harvest.db");
    let db_path_str = db_path.to_str().unwrap().to_string();

    {
        let mut storage = SqliteStorage::new(&db_path).expect("Failed to create DB");
        storage
            .record_contacted("known@shop.example", "directory.example")
            .unwrap();
    }

    let config = create_test_config(&base_url, &db_path_str, "");
    let harvester = Harvester::new(&config, "test-hash").expect("Failed to create harvester");
    let stats = harvester.run().await.expect("Harvest failed");

    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.already_contacted, 1);

    let requests: Vec<String> = mock_server
        .received_requests()
        .await
        .expect("request recording enabled")
        .iter()
        .map(|r| match r.url.query() {
            Some(q) => format!("{}?{}", r.url.path(), q),
            None => r.url.path().to_string(),
        })
        .collect();
    let listing_order: Vec<&str> = requests
        .iter()
        .map(String::as_str)
        .filter(|r| r.starts_with("/shops/"))
        .collect();
    assert_eq!(
        listing_order,
        vec!["/shops/", "/shops/a/", "/shops/a/b/?page=1", "/shops/a/b/?page=2"]
    );
    let page2_position = requests
        .iter()
        .position(|r| r == "/shops/a/b/?page=2")
        .unwrap();
    let last_profile_position = requests
        .iter()
        .rposition(|r| r.starts_with("/profile/"))
        .unwrap();
    assert!(last_profile_position < page2_position);

    drop(harvester);
    let storage = SqliteStorage::new(&db_path).expect("Failed to open DB");
    assert_eq!(storage.count_companies().unwrap(), 1);

    let counts = storage.count_companies_by_category().unwrap();
    assert_eq!(
        counts,
        vec![CategoryCount {
            main_category: "A".to_string(),
            sub_category: "B".to_string(),
            companies: 1,
        }]
    );

    let run = storage.get_latest_run().unwrap().expect("run recorded");
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.companies_inserted, 1);
    assert_eq!(run.config_hash, "test-hash");
}

#[tokio::test]
async fn test_main_category_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/shops/",
        root_page(&[("A", "/shops/a/"), ("C", "/shops/c/")]),
        1,
    )
    .await;
    mount_html(&mock_server, "/shops/a/", main_category_page(&[]), 1).await;
    mount_html(&mock_server, "/shops/c/", main_category_page(&[]), 0).await;

    let config = create_test_config(&base_url, "unused.db", "max-main-categories = 1");
    let store = shared(SqliteStorage::new_in_memory().unwrap());
    let harvester = Harvester::with_store(&config, store, "hash").unwrap();

    let stats = harvester.run().await.unwrap();
    assert_eq!(stats.pages_fetched, 0);
}

#[tokio::test]
async fn test_all_main_categories_by_default() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(
        &mock_server,
        "/shops/",
        root_page(&[("A", "/shops/a/"), ("C", "/shops/c/")]),
        1,
    )
    .await;
    mount_html(&mock_server, "/shops/a/", main_category_page(&[]), 1).await;
    mount_html(
        &mock_server,
        "/shops/c/",
        main_category_page(&[("D", "/shops/c/d/")]),
        1,
    )
    .await;
    mount_listing(
        &mock_server,
        "/shops/c/d/",
        "1",
        listing_page(&["/profile/d"]),
        1,
    )
    .await;
    mount_listing(&mock_server, "/shops/c/d/", "2", listing_page(&[]), 1).await;
    mount_html(
        &mock_server,
        "/profile/d",
        profile_page(company_profile("d", "d@shop.example")),
        1,
    )
    .await;

    let config = create_test_config(&base_url, "unused.db", "");
    let store = shared(SqliteStorage::new_in_memory().unwrap());
    let harvester = Harvester::with_store(&config, Arc::clone(&store), "hash").unwrap();

    let stats = harvester.run().await.unwrap();
    assert_eq!(stats.inserted, 1);

    let store = lock_store(&store);
    let counts = store.count_companies_by_category().unwrap();
    assert_eq!(counts[0].main_category, "C");
    assert_eq!(counts[0].sub_category, "D");
}

#[tokio::test]
async fn test_unreachable_root_ends_run_quietly() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/shops/"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), "unused.db", "max-retries = 0");
    let store = shared(SqliteStorage::new_in_memory().unwrap());
    let harvester = Harvester::with_store(&config, Arc::clone(&store), "hash").unwrap();

    let stats = harvester.run().await.unwrap();
    assert_eq!(stats.companies_seen(), 0);

    let run = lock_store(&store).get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.companies_inserted, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_extractions_limited_by_gate() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let delay = Duration::from_millis(300);

    let links: Vec<String> = (1..=6).map(|i| format!("/profile/slow-{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_listing(&mock_server, "/list/", "1", listing_page(&link_refs), 1).await;
    mount_listing(&mock_server, "/list/", "2", listing_page(&[]), 1).await;

    for i in 1..=6 {
        Mock::given(method("GET"))
            .and(path(format!("/profile/slow-{}", i)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(profile_page(company_profile(
                        &format!("slow{}", i),
                        &format!("slow{}@shop.example", i),
                    )))
                    .set_delay(delay),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config(&base_url, "unused.db", "");
    config.crawler.max_concurrent_extractions = 2;
    let walker = walker_for(&config, shared(SqliteStorage::new_in_memory().unwrap()));

    let started = Instant::now();
    let stats = walker
        .walk("A", "B", &format!("{}/list/", base_url))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // Six profiles two at a time take at least three delayed waves
    assert_eq!(stats.inserted, 6);
    assert!(elapsed >= delay * 3, "finished in {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_extraction_is_counted_and_walk_continues() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_listing(
        &mock_server,
        "/list/",
        "1",
        listing_page(&["/profile/boom", "/profile/fine"]),
        1,
    )
    .await;
    mount_listing(&mock_server, "/list/", "2", listing_page(&["/profile/later"]), 1).await;
    mount_listing(&mock_server, "/list/", "3", listing_page(&[]), 1).await;
    for name in ["boom", "fine", "later"] {
        mount_html(
            &mock_server,
            &format!("/profile/{}", name),
            profile_page(company_profile(name, &format!("{}@shop.example", name))),
            1,
        )
        .await;
    }

    let config = create_test_config(&base_url, "unused.db", "");
    let store = RecordingStore::new(&[], Arc::new(Mutex::new(Vec::new())))
        .panicking_on("boom@shop.example");
    let records = Arc::clone(&store.records);
    let walker = walker_for(&config, shared(store));

    let stats = walker
        .walk("A", "B", &format!("{}/list/", base_url))
        .await
        .unwrap();

    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.failed_tasks, 1);
    assert_eq!(stats.inserted, 2);

    let mut stored: Vec<String> = records
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.email.clone())
        .collect();
    stored.sort();
    assert_eq!(stored, vec!["fine@shop.example", "later@shop.example"]);
}

#[tokio::test]
async fn test_database_failure_marks_run_failed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_html(&mock_server, "/shops/", root_page(&[("A", "/shops/a/")]), 1).await;
    mount_html(
        &mock_server,
        "/shops/a/",
        main_category_page(&[("B", "/shops/a/b/")]),
        1,
    )
    .await;
    mount_listing(
        &mock_server,
        "/shops/a/b/",
        "1",
        listing_page(&["/profile/x", "/profile/y"]),
        1,
    )
    .await;
    // The harvest stops once the failing page has joined
    mount_listing(&mock_server, "/shops/a/b/", "2", listing_page(&["/profile/z"]), 0).await;
    for name in ["x", "y"] {
        mount_html(
            &mock_server,
            &format!("/profile/{}", name),
            profile_page(company_profile(name, &format!("{}@shop.example", name))),
            1,
        )
        .await;
    }

    let config = create_test_config(&base_url, "unused.db", "");
    let store = RecordingStore::new(&[], Arc::new(Mutex::new(Vec::new()))).with_full_disk();
    let insert_calls = Arc::clone(&store.insert_calls);
    let run_status = Arc::clone(&store.run_status);
    let harvester = Harvester::with_store(&config, shared(store), "hash").unwrap();

    let error = harvester.run().await.expect_err("harvest should fail");

    assert!(error.is_store_failure(), "unexpected error: {}", error);
    assert_eq!(insert_calls.load(Ordering::SeqCst), 2);
    assert_eq!(*run_status.lock().unwrap(), Some(RunStatus::Failed));
}
