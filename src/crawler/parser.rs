//! HTML parser for category, listing and profile pages
//!
//! All selectors come from [`SelectorConfig`] and are compiled once, so the
//! extraction rules can be swapped per target site without code changes.
//! Profile pages carry their data as a JSON payload in a script block; the
//! profile object is read from `props.pageProps.profile`.

use crate::config::{compile_selector, SelectorConfig};
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Map, Value};
use url::Url;

/// Name and absolute URL of a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLink {
    pub name: String,
    pub url: String,
}

/// Company fields read from a profile page's embedded payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyProfile {
    pub company_name: String,
    pub organization_name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub email: String,
    pub rating_count: String,
    pub rating_value: String,
}

/// Compiled selector set for one target site
#[derive(Debug)]
pub struct PageParser {
    base_url: Url,
    main_category_item: Selector,
    main_category_name: Selector,
    sub_category_item: Selector,
    sub_category_name: Selector,
    listing_item: Selector,
    pagination_link: Selector,
    profile_payload: Selector,
}

impl PageParser {
    /// Compiles the selector set
    ///
    /// # Arguments
    ///
    /// * `base_url` - Site root that relative category and listing links resolve against
    /// * `selectors` - CSS selectors for every kind of page
    ///
    /// # Returns
    ///
    /// * `Ok(PageParser)` - Parser ready to be shared between tasks
    /// * `Err(ConfigError)` - The base URL or one of the selectors is invalid
    pub fn new(base_url: &str, selectors: &SelectorConfig) -> Result<Self, ConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

        Ok(Self {
            base_url,
            main_category_item: compile_selector(&selectors.main_category_item)?,
            main_category_name: compile_selector(&selectors.main_category_name)?,
            sub_category_item: compile_selector(&selectors.sub_category_item)?,
            sub_category_name: compile_selector(&selectors.sub_category_name)?,
            listing_item: compile_selector(&selectors.listing_item)?,
            pagination_link: compile_selector(&selectors.pagination_link)?,
            profile_payload: compile_selector(&selectors.profile_payload)?,
        })
    }

    /// Extracts the main categories from the root listing page
    pub fn extract_main_categories(&self, html: &str) -> Vec<CategoryLink> {
        self.extract_categories(html, &self.main_category_item, &self.main_category_name)
    }

    /// Extracts the sub-categories from a main category page
    pub fn extract_sub_categories(&self, html: &str) -> Vec<CategoryLink> {
        self.extract_categories(html, &self.sub_category_item, &self.sub_category_name)
    }

    fn extract_categories(
        &self,
        html: &str,
        item_selector: &Selector,
        name_selector: &Selector,
    ) -> Vec<CategoryLink> {
        let document = Html::parse_document(html);

        document
            .select(item_selector)
            .filter_map(|element| {
                let Some(url) = self.resolve_href(&element) else {
                    tracing::debug!("Skipping category item without a usable href");
                    return None;
                };
                let name = element
                    .select(name_selector)
                    .next()
                    .map(|node| element_text(&node))
                    .unwrap_or_default();
                Some(CategoryLink { name, url })
            })
            .collect()
    }

    /// Extracts the company profile URLs listed on a listing page
    pub fn extract_listing_links(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);

        document
            .select(&self.listing_item)
            .filter_map(|element| self.resolve_href(&element))
            .collect()
    }

    /// Reads the page count label from the pagination bar
    ///
    /// The bar ends with the last page number followed by two navigation
    /// anchors, so the count is the third anchor from the end.
    pub fn extract_page_count(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let anchors: Vec<ElementRef<'_>> = document.select(&self.pagination_link).collect();

        anchors
            .len()
            .checked_sub(3)
            .map(|index| element_text(&anchors[index]))
            .filter(|text| !text.is_empty())
    }

    /// Extracts the company profile embedded in a profile page
    ///
    /// Returns `None` when the page has no payload block, the payload is not
    /// valid JSON, or it carries no profile object.
    pub fn extract_profile(&self, html: &str) -> Option<CompanyProfile> {
        let document = Html::parse_document(html);
        let payload = document.select(&self.profile_payload).next()?;
        let raw: String = payload.text().collect();

        let json: Value = match serde_json::from_str(&raw) {
            Ok(json) => json,
            Err(e) => {
                tracing::debug!("Profile payload is not valid JSON: {}", e);
                return None;
            }
        };

        let profile = json
            .get("props")
            .and_then(|props| props.get("pageProps"))
            .and_then(|page_props| page_props.get("profile"))
            .and_then(Value::as_object)?;

        Some(profile_from_json(profile))
    }

    fn resolve_href(&self, element: &ElementRef<'_>) -> Option<String> {
        let href = element.value().attr("href")?.trim();
        if href.is_empty() {
            return None;
        }
        self.base_url.join(href).ok().map(|url| url.to_string())
    }
}

fn profile_from_json(profile: &Map<String, Value>) -> CompanyProfile {
    let empty = Map::new();
    let organization = nested(profile, "organization").unwrap_or(&empty);
    let contact = nested(profile, "contactData").unwrap_or(&empty);
    let reviews = nested(profile, "reviewStatistic").unwrap_or(&empty);

    let address = nested(profile, "address")
        .map(|address| {
            address
                .values()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default();

    CompanyProfile {
        company_name: text_or(profile, "name", ""),
        organization_name: text_or(organization, "name", ""),
        address,
        phone: text_or(contact, "phone", ""),
        website: text_or(profile, "url", ""),
        email: text_or(contact, "email", "").trim().to_string(),
        rating_count: text_or(reviews, "allTimeReviewCount", "0"),
        rating_value: text_or(reviews, "grade", "0"),
    }
}

fn nested<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    object.get(key).and_then(Value::as_object)
}

fn text_or(object: &Map<String, Value>, key: &str, default: &str) -> String {
    object
        .get(key)
        .and_then(scalar_text)
        .unwrap_or_else(|| default.to_string())
}

/// Renders strings, numbers and booleans as text; null and containers yield `None`
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
