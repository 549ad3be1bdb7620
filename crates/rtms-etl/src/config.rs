//! Job configuration
//!
//! Settings come from two JSON documents per environment, with
//! environment-variable overrides on top:
//!
//! - `<dir>/<env>_config.json`: API endpoint and service key
//! - `<dir>/<env>_aws_config.json`: storage region and credentials
//!
//! The run parameters (region code, period, page size, object key) are
//! supplied by the caller.

use crate::api::{ApiRequest, QueryParams, DEFAULT_USER_AGENT};
use crate::error::{EtlError, Result};
use chrono::NaiveDate;
use rtms_common::config::{env_parse, env_var, load_json_document};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_ENV: &str = "dev";
pub const DEFAULT_CONFIG_DIR: &str = "env";
pub const DEFAULT_BUCKET: &str = "public-data-01";
pub const DEFAULT_STORAGE_REGION: &str = "ap-northeast-2";
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Jongno-gu, Seoul
pub const DEFAULT_REGION_CODE: &str = "11110";
pub const DEFAULT_DEAL_YMD: &str = "202301";
pub const DEFAULT_OBJECT_KEY: &str = "df_tmp.csv";

/// Transaction API settings
#[derive(Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(alias = "end_point")]
    pub endpoint: String,

    #[serde(alias = "serviceKey")]
    pub service_key: String,

    #[serde(default = "default_user_agent", alias = "userAgent")]
    pub user_agent: String,

    /// Per-request timeout; unset waits indefinitely
    #[serde(default, alias = "timeoutSecs")]
    pub timeout_secs: Option<u64>,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ApiConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    fn merge_env(&mut self) -> Result<()> {
        if let Some(endpoint) = env_var("RTMS_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(key) = env_var("RTMS_SERVICE_KEY") {
            self.service_key = key;
        }
        if let Some(secs) = env_parse("RTMS_TIMEOUT_SECS")? {
            self.timeout_secs = Some(secs);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("endpoint", &self.endpoint)
            .field("service_key", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Object storage settings
#[derive(Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(alias = "region_name", alias = "regionName")]
    pub region: String,

    #[serde(default, alias = "aws_access_key_id", alias = "accessKeyId")]
    pub access_key_id: Option<String>,

    #[serde(default, alias = "aws_secret_access_key", alias = "secretAccessKey")]
    pub secret_access_key: Option<String>,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Custom endpoint for S3-compatible services (e.g. MinIO)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default, alias = "pathStyle")]
    pub path_style: bool,
}

fn default_bucket() -> String {
    DEFAULT_BUCKET.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_STORAGE_REGION.to_string(),
            access_key_id: None,
            secret_access_key: None,
            bucket: default_bucket(),
            endpoint: None,
            path_style: false,
        }
    }
}

impl StorageConfig {
    fn merge_env(&mut self) -> Result<()> {
        if let Some(region) = env_var("AWS_REGION") {
            self.region = region;
        }
        if let Some(key) = env_var("AWS_ACCESS_KEY_ID") {
            self.access_key_id = Some(key);
        }
        if let Some(secret) = env_var("AWS_SECRET_ACCESS_KEY") {
            self.secret_access_key = Some(secret);
        }
        if let Some(bucket) = env_var("S3_BUCKET") {
            self.bucket = bucket;
        }
        if let Some(endpoint) = env_var("S3_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(path_style) = env_parse("S3_PATH_STYLE")? {
            self.path_style = path_style;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id.as_ref().map(|_| "<redacted>"))
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "<redacted>"))
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("path_style", &self.path_style)
            .finish()
    }
}

/// Parameters of one extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Legal-district region code (`LAWD_CD`)
    pub region_code: String,
    /// Contract month, `YYYYMM`
    pub deal_ymd: String,
    pub page_size: u32,
    pub object_key: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            region_code: DEFAULT_REGION_CODE.to_string(),
            deal_ymd: DEFAULT_DEAL_YMD.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            object_key: DEFAULT_OBJECT_KEY.to_string(),
        }
    }
}

/// Everything a run needs, passed explicitly into the job
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub run: RunConfig,
}

impl EtlConfig {
    /// Load `<dir>/<env>_config.json` and `<dir>/<env>_aws_config.json`,
    /// then apply environment overrides
    pub fn load(config_dir: impl AsRef<Path>, env: &str, run: RunConfig) -> Result<Self> {
        dotenvy::dotenv().ok();

        let dir = config_dir.as_ref();
        let mut api: ApiConfig = load_json_document(dir.join(format!("{}_config.json", env)))?;
        let mut storage: StorageConfig =
            load_json_document(dir.join(format!("{}_aws_config.json", env)))?;

        api.merge_env()?;
        storage.merge_env()?;

        let config = Self { api, storage, run };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api.endpoint.trim().is_empty() {
            return Err(EtlError::config("API endpoint cannot be empty"));
        }
        if self.api.service_key.trim().is_empty() {
            return Err(EtlError::config("API service key cannot be empty"));
        }
        if self.api.timeout_secs == Some(0) {
            return Err(EtlError::config("API timeout must be greater than 0"));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(EtlError::config("Storage bucket cannot be empty"));
        }
        if self.storage.region.trim().is_empty() {
            return Err(EtlError::config("Storage region cannot be empty"));
        }
        if self.storage.access_key_id.is_some() != self.storage.secret_access_key.is_some() {
            return Err(EtlError::config(
                "Storage access key id and secret access key must be set together",
            ));
        }

        if self.run.page_size == 0 {
            return Err(EtlError::config("Page size must be greater than 0"));
        }
        if self.run.region_code.trim().is_empty() {
            return Err(EtlError::config("Region code cannot be empty"));
        }
        validate_deal_ymd(&self.run.deal_ymd)?;
        if self.run.object_key.trim().is_empty() {
            return Err(EtlError::config("Object key cannot be empty"));
        }

        Ok(())
    }

    /// Page-1 request for this run
    pub fn base_request(&self) -> ApiRequest {
        let params = QueryParams::new(
            self.api.service_key.clone(),
            self.run.page_size,
            self.run.region_code.clone(),
            self.run.deal_ymd.clone(),
        );
        ApiRequest::with_user_agent(self.api.endpoint.clone(), params, self.api.user_agent.clone())
    }
}

/// `YYYYMM` naming a real calendar month
pub fn validate_deal_ymd(deal_ymd: &str) -> Result<()> {
    let well_formed = deal_ymd.len() == 6 && deal_ymd.bytes().all(|b| b.is_ascii_digit());
    if well_formed && NaiveDate::parse_from_str(&format!("{}01", deal_ymd), "%Y%m%d").is_ok() {
        Ok(())
    } else {
        Err(EtlError::config(format!(
            "Period '{}' is not a valid YYYYMM month",
            deal_ymd
        )))
    }
}
