//! API request and response types

use std::collections::BTreeMap;

/// Browser-like agent; the endpoint rejects some default client agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/71.0.3578.98 Safari/537.36";

/// Query parameters of one page request
#[derive(Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub service_key: String,
    /// 1-based page number
    pub page_no: u32,
    /// Page size, fixed for the whole run
    pub num_of_rows: u32,
    /// Legal-district region code (`LAWD_CD`)
    pub region_code: String,
    /// Contract month, `YYYYMM` (`DEAL_YMD`)
    pub deal_ymd: String,
}

impl QueryParams {
    pub fn new(
        service_key: impl Into<String>,
        num_of_rows: u32,
        region_code: impl Into<String>,
        deal_ymd: impl Into<String>,
    ) -> Self {
        Self {
            service_key: service_key.into(),
            page_no: 1,
            num_of_rows,
            region_code: region_code.into(),
            deal_ymd: deal_ymd.into(),
        }
    }

    /// Copy of these parameters pointing at another page
    pub fn with_page(&self, page_no: u32) -> Self {
        Self {
            page_no,
            ..self.clone()
        }
    }

    /// Wire names and values, in the order they are sent
    pub fn to_query(&self) -> [(&'static str, String); 5] {
        [
            ("serviceKey", self.service_key.clone()),
            ("pageNo", self.page_no.to_string()),
            ("numOfRows", self.num_of_rows.to_string()),
            ("LAWD_CD", self.region_code.clone()),
            ("DEAL_YMD", self.deal_ymd.clone()),
        ]
    }
}

impl std::fmt::Debug for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParams")
            .field("service_key", &"<redacted>")
            .field("page_no", &self.page_no)
            .field("num_of_rows", &self.num_of_rows)
            .field("region_code", &self.region_code)
            .field("deal_ymd", &self.deal_ymd)
            .finish()
    }
}

/// Headers, URL and parameters of one page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub headers: BTreeMap<String, String>,
    pub url: String,
    pub params: QueryParams,
}

impl ApiRequest {
    /// Request with the default User-Agent header
    pub fn new(url: impl Into<String>, params: QueryParams) -> Self {
        Self::with_user_agent(url, params, DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(
        url: impl Into<String>,
        params: QueryParams,
        user_agent: impl Into<String>,
    ) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("User-Agent".to_string(), user_agent.into());
        Self {
            headers,
            url: url.into(),
            params,
        }
    }

    /// Same headers and URL, parameters pointing at `page_no`
    pub fn for_page(&self, page_no: u32) -> Self {
        Self {
            headers: self.headers.clone(),
            url: self.url.clone(),
            params: self.params.with_page(page_no),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.params.num_of_rows
    }
}

/// Raw status and body of one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}
