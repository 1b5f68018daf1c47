//! Catalog query normalization and pagination.
//!
//! Raw query parameters (`limit`, `page`, `sort`, `query`) are turned into a
//! [`CatalogQuery`] plan once, then shared by every listing surface. The same
//! plan builds the navigation metadata and the prev/next links of a page.
//!
//! `query` is overloaded by value: `available`, `true` and `false`
//! (case-insensitive) filter on availability, anything else is an exact
//! category match using the original text.

use serde::{Deserialize, Serialize};

use crate::product::Product;

pub const DEFAULT_LIMIT: u64 = 10;
pub const DEFAULT_PAGE: u64 = 1;

/// Row filter understood by every backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProductFilter {
    #[default]
    None,
    Category(String),
    Availability(bool),
}

impl ProductFilter {
    /// Interpret the overloaded `query` parameter.
    pub fn from_query(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|q| !q.is_empty()) else {
            return Self::None;
        };
        match raw.to_lowercase().as_str() {
            q @ ("available" | "true" | "false") => Self::Availability(q != "false"),
            _ => Self::Category(raw.to_string()),
        }
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            Self::None => true,
            Self::Category(category) => product.category == *category,
            Self::Availability(status) => product.status == *status,
        }
    }
}

/// Ordering by price. `None` keeps the backend's insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriceSort {
    #[default]
    None,
    Ascending,
    Descending,
}

impl PriceSort {
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => Self::Ascending,
            Some("desc") => Self::Descending,
            _ => Self::None,
        }
    }

    /// Stable sort: products with equal prices keep their relative order.
    pub fn apply(self, products: &mut [Product]) {
        match self {
            Self::None => {}
            Self::Ascending => products.sort_by(|a, b| a.price.total_cmp(&b.price)),
            Self::Descending => products.sort_by(|a, b| b.price.total_cmp(&a.price)),
        }
    }
}

/// Normalized listing plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub limit: u64,
    pub page: u64,
    pub filter: ProductFilter,
    pub sort: PriceSort,
    /// Original parameters in arrival order (repeated keys joined with `,`).
    params: Vec<(String, String)>,
}

impl Default for CatalogQuery {
    fn default() -> Self {
        Self::from_params(Vec::<(String, String)>::new())
    }
}

impl CatalogQuery {
    pub fn from_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params = collapse_repeated(params);
        let lookup = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        Self {
            limit: positive_or(lookup("limit"), DEFAULT_LIMIT),
            page: positive_or(lookup("page"), DEFAULT_PAGE),
            filter: ProductFilter::from_query(lookup("query")),
            sort: PriceSort::from_param(lookup("sort")),
            params,
        }
    }

    /// Rows to skip before the requested page starts.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn page_info(&self, total: u64) -> PageInfo {
        PageInfo::new(self.page, self.limit, total)
    }

    /// Link to `page` keeping every other original parameter verbatim.
    pub fn link(&self, base_path: &str, page: u64) -> String {
        let page = page.to_string();
        let limit = self.limit.to_string();

        let mut pairs: Vec<(&str, &str)> = self
            .params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        for (key, value) in [("page", page.as_str()), ("limit", limit.as_str())] {
            match pairs.iter_mut().find(|(k, _)| *k == key) {
                Some(pair) => pair.1 = value,
                None => pairs.push((key, value)),
            }
        }

        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        format!("{base_path}?{encoded}")
    }

    /// Assemble the API envelope for one result page.
    pub fn to_page(&self, base_path: &str, payload: Vec<Product>, total: u64) -> ProductPage {
        let info = self.page_info(total);
        ProductPage {
            status: "success".to_string(),
            payload,
            total_pages: info.total_pages,
            prev_page: info.prev_page,
            next_page: info.next_page,
            page: info.page,
            has_prev_page: info.has_prev_page,
            has_next_page: info.has_next_page,
            prev_link: info.prev_page.map(|p| self.link(base_path, p)),
            next_link: info.next_page.map(|p| self.link(base_path, p)),
        }
    }
}

fn positive_or(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v.unsigned_abs())
        .unwrap_or(default)
}

fn collapse_repeated<I, K, V>(params: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut out: Vec<(String, String)> = Vec::new();
    for (k, v) in params {
        let (k, v) = (k.into(), v.into());
        match out.iter_mut().find(|(existing, _)| *existing == k) {
            Some((_, joined)) => {
                joined.push(',');
                joined.push_str(&v);
            }
            None => out.push((k, v)),
        }
    }
    out
}

/// Navigation metadata for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u64,
    pub total_pages: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
}

impl PageInfo {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit.max(1)).max(1);
        let has_prev_page = page > 1;
        let has_next_page = page < total_pages;
        Self {
            page,
            total_pages,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        }
    }
}

/// `GET /api/products` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub status: String,
    pub payload: Vec<Product>,
    pub total_pages: u64,
    pub prev_page: Option<u64>,
    pub next_page: Option<u64>,
    pub page: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}
