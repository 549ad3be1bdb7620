//! Page-count discovery and the sequential fetch loop

use crate::api::{ApiRequest, PageFetcher};
use crate::error::{EtlError, Result};
use crate::extract::{extract, parse_total_count};
use crate::record::RecordSet;
use crate::schema::FieldSchema;
use tracing::{debug, info, info_span, Instrument};

/// Number of pages needed for `total_count` rows at `page_size` rows per page
///
/// A zero `page_size` yields zero pages.
pub fn page_count(total_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(u64::from(page_size))
}

/// Drives a [`PageFetcher`] through every page of one query
pub struct PaginationController<F> {
    fetcher: F,
}

impl<F: PageFetcher> PaginationController<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Fetch page 1 and derive the page count from `body/totalCount`
    pub async fn discover_page_count(&self, base: &ApiRequest) -> Result<u32> {
        let page_size = base.page_size();
        if page_size == 0 {
            return Err(EtlError::config("Page size must be greater than 0"));
        }

        let response = self.fetcher.fetch(&base.for_page(1)).await?;
        let total_count = parse_total_count(&response.body)?;
        let pages = page_count(total_count, page_size);

        info!(total_count, page_size, pages, "Discovered page count");

        u32::try_from(pages)
            .map_err(|_| EtlError::parse(format!("page count {} is out of range", pages)))
    }

    /// Fetch pages `1..=N` in order and extract every item
    ///
    /// The first failure aborts the run; records gathered so far are dropped.
    pub async fn run(&self, base: &ApiRequest, schema: &FieldSchema) -> Result<RecordSet> {
        let pages = self.discover_page_count(base).await?;
        self.fetch_pages(base, schema, pages).await
    }

    /// Fetch pages `1..=pages` in order without rediscovering the count
    pub async fn fetch_pages(
        &self,
        base: &ApiRequest,
        schema: &FieldSchema,
        pages: u32,
    ) -> Result<RecordSet> {
        let mut records = RecordSet::new();

        for page_no in 1..=pages {
            let span = info_span!("page", page_no, pages);
            let extracted = async {
                let response = self.fetcher.fetch(&base.for_page(page_no)).await?;
                let extracted = extract(&response.body, schema)?;
                debug!(records = extracted.len(), "Extracted page");
                Ok::<_, EtlError>(extracted)
            }
            .instrument(span)
            .await?;

            records.extend(extracted);
        }

        info!(pages, records = records.len(), "Fetched all pages");
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::api::{ApiResponse, QueryParams};
    use crate::schema::{FieldDef, AMOUNT_FIELD};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies per page and records the order of requests
    #[derive(Default)]
    struct ScriptedFetcher {
        pages: HashMap<u32, std::result::Result<String, u16>>,
        requested: Mutex<Vec<u32>>,
    }

    impl ScriptedFetcher {
        fn page(mut self, page_no: u32, body: String) -> Self {
            self.pages.insert(page_no, Ok(body));
            self
        }

        fn failing_page(mut self, page_no: u32, status: u16) -> Self {
            self.pages.insert(page_no, Err(status));
            self
        }

        fn requested(&self) -> Vec<u32> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, request: &ApiRequest) -> Result<ApiResponse> {
            let page_no = request.params.page_no;
            self.requested.lock().unwrap().push(page_no);
            match self.pages.get(&page_no) {
                Some(Ok(body)) => Ok(ApiResponse {
                    status: 200,
                    body: body.clone(),
                }),
                Some(Err(status)) => Err(EtlError::Connection {
                    status: *status,
                    message: "API connection error".to_string(),
                }),
                None => panic!("unexpected request for page {}", page_no),
            }
        }
    }

    fn body(total_count: u64, amounts: &[u32]) -> String {
        let items: String = amounts
            .iter()
            .map(|a| format!("<item><거래금액>{}</거래금액></item>", a))
            .collect();
        format!(
            "<response><body><items>{}</items><totalCount>{}</totalCount></body></response>",
            items, total_count
        )
    }

    fn base(page_size: u32) -> ApiRequest {
        ApiRequest::new(
            "http://example.com/trades",
            QueryParams::new("key", page_size, "11110", "202301"),
        )
    }

    fn schema() -> FieldSchema {
        FieldSchema::new(vec![FieldDef::amount(AMOUNT_FIELD), FieldDef::string("층")]).unwrap()
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(1, 10), 1);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(25, 10), 3);
        assert_eq!(page_count(u64::MAX, 1), u64::MAX);
    }

    proptest! {
        #[test]
        fn prop_page_count_is_ceiling(total in 0u64..10_000_000, size in 1u32..5_000) {
            let pages = page_count(total, size);
            let size = u64::from(size);
            prop_assert!(pages * size >= total);
            prop_assert!(pages == 0 || (pages - 1) * size < total);
            prop_assert_eq!(pages == 0, total == 0);
        }
    }

    #[tokio::test]
    async fn test_run_fetches_pages_in_order() {
        let fetcher = ScriptedFetcher::default()
            .page(1, body(25, &(1..=10).collect::<Vec<_>>()))
            .page(2, body(25, &(11..=20).collect::<Vec<_>>()))
            .page(3, body(25, &(21..=25).collect::<Vec<_>>()));
        let controller = PaginationController::new(fetcher);

        let records = controller.run(&base(10), &schema()).await.unwrap();

        assert_eq!(controller.fetcher().requested(), vec![1, 1, 2, 3]);
        assert_eq!(records.len(), 25);
        let amounts: Vec<u32> = records
            .iter()
            .map(|r| r.get(AMOUNT_FIELD).unwrap().parse().unwrap())
            .collect();
        assert_eq!(amounts, (1..=25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_zero_total_count_yields_empty_set() {
        let controller = PaginationController::new(ScriptedFetcher::default().page(1, body(0, &[])));

        assert_eq!(controller.discover_page_count(&base(10)).await.unwrap(), 0);
        let records = controller.run(&base(10), &schema()).await.unwrap();
        assert!(records.is_empty());
        // discovery only, twice
        assert_eq!(controller.fetcher().requested(), vec![1, 1]);
    }

    #[tokio::test]
    async fn test_failed_page_aborts_before_later_pages() {
        let fetcher = ScriptedFetcher::default()
            .page(1, body(30, &[1, 2]))
            .failing_page(2, 500)
            .page(3, body(30, &[3]));
        let controller = PaginationController::new(fetcher);

        let err = controller.run(&base(10), &schema()).await.unwrap_err();
        assert!(matches!(err, EtlError::Connection { status: 500, .. }));
        assert_eq!(controller.fetcher().requested(), vec![1, 1, 2]);
    }

    #[tokio::test]
    async fn test_malformed_discovery_page() {
        let controller = PaginationController::new(
            ScriptedFetcher::default().page(1, "<response><body>".to_string()),
        );
        let err = controller.run(&base(10), &schema()).await.unwrap_err();
        assert!(matches!(err, EtlError::Parse(_)));
        assert_eq!(controller.fetcher().requested(), vec![1]);
    }

    #[tokio::test]
    async fn test_zero_page_size_rejected() {
        let controller = PaginationController::new(ScriptedFetcher::default());
        let err = controller.discover_page_count(&base(0)).await.unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
        assert!(controller.fetcher().requested().is_empty());
    }
}
