//! End-to-end tests for the extraction job
//!
//! A wiremock server stands in for the transaction API and an in-memory
//! object store captures the upload, covering:
//! - Page discovery and sequential page fetches
//! - CSV layout of the uploaded object
//! - Abort-before-upload on HTTP, parse and coercion failures

use async_trait::async_trait;
use rtms_etl::api::{ApiClient, DEFAULT_USER_AGENT};
use rtms_etl::config::{ApiConfig, EtlConfig, RunConfig, StorageConfig};
use rtms_etl::sink::{LocalDirObjectStore, ObjectStore, UTF8_BOM};
use rtms_etl::{EtlError, EtlJob, FieldSchema};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const TRADES_PATH: &str = "/getRTMSDataSvcAptTrade";

/// Captures uploads instead of writing them anywhere
#[derive(Default, Clone)]
struct MemoryStore {
    objects: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl MemoryStore {
    fn uploads(&self) -> Vec<(String, Vec<u8>)> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(
        &self,
        key: &str,
        body: Vec<u8>,
        _content_type: &str,
    ) -> rtms_etl::Result<()> {
        self.objects.lock().unwrap().push((key.to_string(), body));
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("memory://{}", key)
    }
}

fn config(server: &MockServer, page_size: u32) -> EtlConfig {
    EtlConfig {
        api: ApiConfig {
            endpoint: format!("{}{}", server.uri(), TRADES_PATH),
            service_key: "test-key".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: Some(5),
        },
        storage: StorageConfig::default(),
        run: RunConfig {
            page_size,
            ..RunConfig::default()
        },
    }
}

fn client() -> ApiClient {
    ApiClient::new(Some(Duration::from_secs(5))).unwrap()
}

/// One `<item>` with an amount, an apartment name and a zero-padded code
fn item(amount: &str, apartment: &str) -> String {
    format!(
        "<item><거래금액>{}</거래금액><아파트>{}</아파트><법정동본번코드>0001</법정동본번코드>\
         <지역코드>11110</지역코드><층>3</층></item>",
        amount, apartment
    )
}

fn page_body(total_count: u64, items: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <response><header><resultCode>00</resultCode><resultMsg>NORMAL SERVICE.</resultMsg></header>\
         <body><items>{}</items><numOfRows>10</numOfRows><pageNo>1</pageNo>\
         <totalCount>{}</totalCount></body></response>",
        items.concat(),
        total_count
    )
}

fn xml(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "application/xml")
}

async fn mount_page(server: &MockServer, page_no: u32, body: String, times: u64) {
    Mock::given(method("GET"))
        .and(path(TRADES_PATH))
        .and(query_param("pageNo", page_no.to_string()))
        .respond_with(xml(body))
        .expect(times)
        .mount(server)
        .await;
}

fn csv_lines(body: &[u8]) -> Vec<String> {
    assert!(body.starts_with(UTF8_BOM));
    std::str::from_utf8(&body[UTF8_BOM.len()..])
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn column(lines: &[String], name: &str) -> Vec<String> {
    let header: Vec<&str> = lines[0].split(',').collect();
    let index = header.iter().position(|h| *h == name).unwrap();
    lines[1..]
        .iter()
        .map(|line| line.split(',').nth(index).unwrap().to_string())
        .collect()
}

// ============================================================================
// Happy path
// ============================================================================

#[tokio::test]
async fn test_three_pages_uploaded_in_order() {
    let server = MockServer::start().await;
    let amounts: Vec<String> = (1..=25).map(|n| format!("{},000", n)).collect();
    let pages: Vec<Vec<String>> = amounts
        .chunks(10)
        .map(|chunk| chunk.iter().map(|a| item(a, "풍림")).collect())
        .collect();

    // page 1 serves discovery and the first data fetch
    mount_page(&server, 1, page_body(25, &pages[0]), 2).await;
    mount_page(&server, 2, page_body(25, &pages[1]), 1).await;
    mount_page(&server, 3, page_body(25, &pages[2]), 1).await;

    let store = MemoryStore::default();
    let summary = EtlJob::new(&config(&server, 10), client(), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.page_count, 3);
    assert_eq!(summary.row_count, 25);
    assert_eq!(summary.object_key, "df_tmp.csv");
    assert_eq!(summary.location, "memory://df_tmp.csv");

    let uploads = store.uploads();
    assert_eq!(uploads.len(), 1);
    let (key, body) = &uploads[0];
    assert_eq!(key, "df_tmp.csv");
    assert_eq!(summary.bytes_written, body.len());

    let lines = csv_lines(body);
    assert_eq!(lines.len(), 26);
    let schema = FieldSchema::apartment_trades();
    assert_eq!(lines[0], schema.names().collect::<Vec<_>>().join(","));
    assert_eq!(
        column(&lines, "거래금액"),
        (1..=25).map(|n| (n * 1000).to_string()).collect::<Vec<_>>()
    );
    assert!(column(&lines, "법정동본번코드").iter().all(|c| c == "0001"));
    assert!(column(&lines, "도로명").iter().all(String::is_empty));
}

#[tokio::test]
async fn test_request_carries_query_and_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TRADES_PATH))
        .and(query_param("serviceKey", "test-key"))
        .and(query_param("pageNo", "1"))
        .and(query_param("numOfRows", "10"))
        .and(query_param("LAWD_CD", "11110"))
        .and(query_param("DEAL_YMD", "202301"))
        .respond_with(xml(page_body(1, &[item("1,234,000", "광화문")])))
        .expect(2)
        .mount(&server)
        .await;

    let store = MemoryStore::default();
    let summary = EtlJob::new(&config(&server, 10), client(), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.row_count, 1);
    let lines = csv_lines(&store.uploads()[0].1);
    assert_eq!(column(&lines, "거래금액"), vec!["1234000"]);
    assert_eq!(column(&lines, "아파트"), vec!["광화문"]);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in requests {
        let agent = request.headers.get("user-agent").unwrap();
        assert_eq!(agent.to_str().unwrap(), DEFAULT_USER_AGENT);
    }
}

#[tokio::test]
async fn test_zero_total_uploads_header_only() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page_body(0, &[]), 1).await;

    let store = MemoryStore::default();
    let summary = EtlJob::new(&config(&server, 10), client(), store.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.page_count, 0);
    assert_eq!(summary.row_count, 0);
    let lines = csv_lines(&store.uploads()[0].1);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("거래금액,"));
}

#[tokio::test]
async fn test_dry_run_store_writes_local_file() {
    let server = MockServer::start().await;
    mount_page(&server, 1, page_body(1, &[item("82,500", "경희궁")]), 2).await;

    let dir = tempfile::tempdir().unwrap();
    let summary = EtlJob::new(
        &config(&server, 10),
        client(),
        LocalDirObjectStore::new(dir.path()),
    )
    .run()
    .await
    .unwrap();

    let written = std::fs::read(dir.path().join("df_tmp.csv")).unwrap();
    assert_eq!(written.len(), summary.bytes_written);
    assert_eq!(column(&csv_lines(&written), "거래금액"), vec!["82500"]);
}

// ============================================================================
// Failures abort before upload
// ============================================================================

#[tokio::test]
async fn test_non_200_status_aborts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TRADES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::default();
    let err = EtlJob::new(&config(&server, 10), client(), store.clone())
        .run()
        .await
        .unwrap_err();

    match err {
        EtlError::Connection { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "API connection error");
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_later_page_failure_aborts() {
    let server = MockServer::start().await;
    let first: Vec<String> = (0..10).map(|_| item("100", "a")).collect();

    mount_page(&server, 1, page_body(15, &first), 2).await;
    Mock::given(method("GET"))
        .and(path(TRADES_PATH))
        .and(query_param("pageNo", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let store = MemoryStore::default();
    let err = EtlJob::new(&config(&server, 10), client(), store.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Connection { status: 503, .. }));
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_malformed_xml_aborts() {
    let server = MockServer::start().await;
    mount_page(&server, 1, "<response><body><totalCount>3".to_string(), 1).await;

    let store = MemoryStore::default();
    let err = EtlJob::new(&config(&server, 10), client(), store.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Parse(_)));
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_non_numeric_amount_aborts() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        1,
        page_body(2, &[item("1,000", "a"), item("미정", "b")]),
        2,
    )
    .await;

    let store = MemoryStore::default();
    let err = EtlJob::new(&config(&server, 10), client(), store.clone())
        .run()
        .await
        .unwrap_err();

    match err {
        EtlError::TypeCoercion { column, row, value, .. } => {
            assert_eq!(column, "거래금액");
            assert_eq!(row, 1);
            assert_eq!(value, "미정");
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.uploads().is_empty());
}

#[tokio::test]
async fn test_malformed_later_page_aborts() {
    let server = MockServer::start().await;
    let first: Vec<String> = (0..10).map(|_| item("100", "a")).collect();

    mount_page(&server, 1, page_body(15, &first), 2).await;
    mount_page(
        &server,
        2,
        "<response><body><totalCount>15</totalCount></body></response>".to_string(),
        1,
    )
    .await;

    let store = MemoryStore::default();
    let err = EtlJob::new(&config(&server, 10), client(), store.clone())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::Parse(_)));
    assert!(store.uploads().is_empty());
}
