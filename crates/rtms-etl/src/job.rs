//! End-to-end run: discover, fetch, extract, build, upload

use crate::api::{ApiClient, ApiRequest, PageFetcher};
use crate::config::EtlConfig;
use crate::error::Result;
use crate::pagination::PaginationController;
use crate::schema::FieldSchema;
use crate::sink::{CsvSink, ObjectStore, S3ObjectStore};
use crate::table::Table;
use tracing::{info, instrument};

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub page_count: u32,
    pub row_count: usize,
    pub object_key: String,
    pub location: String,
    pub bytes_written: usize,
    pub checksum: String,
}

/// One extraction run for a single region and period
pub struct EtlJob<F, S> {
    controller: PaginationController<F>,
    sink: CsvSink<S>,
    schema: FieldSchema,
    base_request: ApiRequest,
    object_key: String,
}

impl<F: PageFetcher, S: ObjectStore> EtlJob<F, S> {
    /// Job over the apartment trade schema
    pub fn new(config: &EtlConfig, fetcher: F, store: S) -> Self {
        Self {
            controller: PaginationController::new(fetcher),
            sink: CsvSink::new(store),
            schema: FieldSchema::apartment_trades(),
            base_request: config.base_request(),
            object_key: config.run.object_key.clone(),
        }
    }

    pub fn with_schema(mut self, schema: FieldSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Run every stage in order; nothing is uploaded unless all pages were
    /// fetched, extracted and coerced
    #[instrument(
        skip(self),
        fields(
            region_code = %self.base_request.params.region_code,
            deal_ymd = %self.base_request.params.deal_ymd,
        )
    )]
    pub async fn run(&self) -> Result<RunSummary> {
        info!("Starting extraction");

        let pages = self.controller.discover_page_count(&self.base_request).await?;
        let records = self
            .controller
            .fetch_pages(&self.base_request, &self.schema, pages)
            .await?;
        info!(rows = records.len(), "Extracted records");

        let table = Table::build(&records, &self.schema)?;
        let upload = self.sink.upload(&table, &self.object_key).await?;

        Ok(RunSummary {
            page_count: pages,
            row_count: table.row_count(),
            object_key: upload.key,
            location: upload.location,
            bytes_written: upload.size,
            checksum: upload.checksum,
        })
    }
}

/// Run against the live API and the configured S3 bucket
pub async fn run_etl(config: &EtlConfig) -> Result<RunSummary> {
    let client = ApiClient::new(config.api.timeout())?;
    let store = S3ObjectStore::new(&config.storage).await?;
    EtlJob::new(config, client, store).run().await
}
