use serde::Deserialize;

/// Main configuration structure for Directory-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site origin; relative category and listing links resolve against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the page listing the main categories
    #[serde(rename = "root-path", default = "default_root_path")]
    pub root_path: String,
}

impl SiteConfig {
    /// Full URL of the root category listing
    pub fn root_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.root_path)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of company pages extracted at once within one listing page
    #[serde(rename = "max-concurrent-extractions")]
    pub max_concurrent_extractions: u32,

    /// Retries after the initial attempt before a fetch is abandoned
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds), 0 retries immediately
    #[serde(rename = "retry-delay-ms", default)]
    pub retry_delay_ms: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// First listing page requested for every sub-category
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Only the first N main categories are harvested; all when absent
    #[serde(rename = "max-main-categories", default)]
    pub max_main_categories: Option<usize>,

    /// Upper bound on listing pages walked per sub-category; unlimited when absent
    #[serde(rename = "max-pages-per-sub-category", default)]
    pub max_pages_per_sub_category: Option<u32>,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// CSS selectors describing the target site's markup
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    #[serde(rename = "main-category-item")]
    pub main_category_item: String,

    #[serde(rename = "main-category-name")]
    pub main_category_name: String,

    #[serde(rename = "sub-category-item")]
    pub sub_category_item: String,

    #[serde(rename = "sub-category-name")]
    pub sub_category_name: String,

    /// Anchor of one company entry on a listing page
    #[serde(rename = "listing-item")]
    pub listing_item: String,

    /// Anchors of the pagination bar; the third-last one holds the page count
    #[serde(rename = "pagination-link")]
    pub pagination_link: String,

    /// Script block carrying the profile page's JSON payload
    #[serde(rename = "profile-payload")]
    pub profile_payload: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            main_category_item: "ul.CategoryFilterstyles__Category-sc-vu79ja-1 li a".to_string(),
            main_category_name: "div.categoryName".to_string(),
            sub_category_item: "aside ul.CategoryFilterstyles__Category-sc-vu79ja-1 li a"
                .to_string(),
            sub_category_name: "span.categoryName".to_string(),
            listing_item: "main a.ShopResultItemstyles__ResultItem-sc-3gooul-0".to_string(),
            pagination_link: "div.Paginationstyles__Pagination-sc-1uibxtv-0 a".to_string(),
            profile_payload: "script#__NEXT_DATA__".to_string(),
        }
    }
}

fn default_root_path() -> String {
    "/shops/".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_request_timeout() -> u64 {
    30
}

fn default_start_page() -> u32 {
    1
}

fn default_user_agent() -> String {
    format!("directory-harvest/{}", env!("CARGO_PKG_VERSION"))
}
