//! Product search by barcode, product code or free text.
//!
//! Exact-identifier lookups are cached per store:
//! `productstore:store-<storecode>-barcode-<barcode>` and
//! `productstore:store-<storecode>-productcode-<productcode>`. Free-text
//! search is never cached so arbitrary search strings cannot grow the cache.

use axum::{
    extract::{Query, State, rejection::QueryRejection},
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;

use super::{BRAND_ZA, fetch, json_response};
use crate::cache::ResponseCache;
use crate::error::BffError;
use crate::server::AppState;
use crate::upstream::{QueryString, UpstreamRequest};

/// Search term the trolley app sends for the Xtra Savings aisle.
pub const XTRASAVINGS_TERM: &str = "Xtrasavings";

/// Facet query the upstream search is configured with for Xtra Savings.
/// Sent exactly as written, already percent-encoded.
pub const XTRASAVINGS_FACET: &str = "%3Arelevance%3AxtraSavingInSites%3A2701%3AbrowseAllStoresFacetOff%3AbrowseAllStoresFacetOff";

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub barcode: Option<String>,
    pub productcode: Option<String>,
    pub search: Option<String>,
    pub storecode: Option<String>,
    pub currentpage: Option<String>,
}

/// What a search request is looking for, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductLookup<'a> {
    Barcode(&'a str),
    ProductCode(&'a str),
    Search(&'a str),
    Browse,
}

impl SearchParams {
    pub fn lookup(&self) -> ProductLookup<'_> {
        if let Some(barcode) = self.barcode.as_deref() {
            ProductLookup::Barcode(barcode)
        } else if let Some(code) = self.productcode.as_deref() {
            ProductLookup::ProductCode(code)
        } else if let Some(term) = self.search.as_deref() {
            ProductLookup::Search(term)
        } else {
            ProductLookup::Browse
        }
    }

    pub fn store_code(&self) -> &str {
        self.storecode.as_deref().unwrap_or_default()
    }

    pub fn current_page(&self) -> &str {
        self.currentpage
            .as_deref()
            .filter(|page| !page.is_empty())
            .unwrap_or("0")
    }

    /// Cache key for exact-identifier lookups, `None` for text search.
    pub fn cache_key(&self) -> Option<String> {
        match self.lookup() {
            ProductLookup::Barcode(barcode) => Some(barcode_key(self.store_code(), barcode)),
            ProductLookup::ProductCode(code) => Some(product_code_key(self.store_code(), code)),
            ProductLookup::Search(_) | ProductLookup::Browse => None,
        }
    }

    pub fn upstream_query(&self) -> QueryString {
        let query = QueryString::new().param("currentPage", self.current_page());
        let query = match self.lookup() {
            ProductLookup::Barcode(barcode) => query.param("barcode", barcode),
            ProductLookup::ProductCode(code) => query.param("productCode", code),
            ProductLookup::Search(term) if is_xtrasavings(term) => {
                query.raw("query", XTRASAVINGS_FACET)
            }
            ProductLookup::Search(term) => query.param("query", term),
            ProductLookup::Browse => query,
        };
        query.param("posName", self.store_code())
    }
}

pub fn barcode_key(store_code: &str, barcode: &str) -> String {
    format!("productstore:store-{store_code}-barcode-{barcode}")
}

pub fn product_code_key(store_code: &str, product_code: &str) -> String {
    format!("productstore:store-{store_code}-productcode-{product_code}")
}

pub fn is_xtrasavings(term: &str) -> bool {
    term.trim().eq_ignore_ascii_case(XTRASAVINGS_TERM)
}

/// `GET /backend/products/search?storecode=&(barcode=|productcode=|search=)&currentpage=`
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, BffError> {
    let Query(params) = query?;
    let key = params.cache_key();

    if let Some(key) = &key
        && let Some(hit) = state.cache.get(key)
    {
        return Ok(json_response(&hit));
    }

    let request = UpstreamRequest::get(format!("{BRAND_ZA}/products/search/full"))
        .query(params.upstream_query())
        .bearer();
    let body = fetch(&state, request, "product search").await?;

    let response = json_response(&body);
    if let Some(key) = key
        && has_products(&body)
    {
        populate_cache(&state.cache, &params, key, body);
    }
    Ok(response)
}

/// Stores the response under the request key, and under the key of the
/// first product's own identifier when upstream normalized it differently.
fn populate_cache(cache: &ResponseCache, params: &SearchParams, key: String, body: Value) {
    let store_code = params.store_code();
    let alias = match params.lookup() {
        ProductLookup::Barcode(_) => {
            first_product_field(&body, "barcode").map(|barcode| barcode_key(store_code, &barcode))
        }
        ProductLookup::ProductCode(_) => {
            first_product_field(&body, "code").map(|code| product_code_key(store_code, &code))
        }
        ProductLookup::Search(_) | ProductLookup::Browse => None,
    };

    let shared = cache.set(&key, body);
    if let Some(alias) = alias.filter(|alias| *alias != key) {
        cache.set_shared(&alias, shared);
    }
}

fn has_products(body: &Value) -> bool {
    body.pointer("/response/products")
        .and_then(Value::as_array)
        .is_some_and(|products| !products.is_empty())
}

fn first_product_field(body: &Value, field: &str) -> Option<String> {
    match body.pointer("/response/products/0")?.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
