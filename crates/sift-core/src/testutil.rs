//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests. Mocks that
//! record calls use `Arc<Mutex<_>>` so clones share the recording.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::Page;
use crate::traits::{Fetcher, Selector};

// ---------------------------------------------------------------------------
// StaticSelector
// ---------------------------------------------------------------------------

/// Selector that ignores its input and returns fixed values.
pub struct StaticSelector {
    values: Vec<String>,
}

impl StaticSelector {
    pub fn one(value: &str) -> Self {
        Self {
            values: vec![value.to_string()],
        }
    }

    pub fn none() -> Self {
        Self { values: vec![] }
    }
}

impl Selector for StaticSelector {
    fn expression(&self) -> &str {
        "static"
    }

    fn select(&self, _text: &str) -> Option<String> {
        self.values.first().cloned()
    }

    fn select_list(&self, _text: &str) -> Vec<String> {
        self.values.clone()
    }
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving canned HTML per URL.
///
/// Unknown URLs fail with an HTTP 404 error. Every requested URL is
/// recorded in `requested`.
#[derive(Clone, Default)]
pub struct MockFetcher {
    pages: Arc<HashMap<String, Result<String, String>>>,
    pub requested: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), Ok(html.to_string())))
                    .collect(),
            ),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Like [`new`](Self::new), with `failing` URLs answering a network error.
    pub fn with_failures(pages: &[(&str, &str)], failing: &[&str]) -> Self {
        let mut map: HashMap<String, Result<String, String>> = pages
            .iter()
            .map(|(url, html)| (url.to_string(), Ok(html.to_string())))
            .collect();
        for url in failing {
            map.insert(url.to_string(), Err("connection reset".to_string()));
        }
        Self {
            pages: Arc::new(map),
            requested: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<Page, AppError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(html)) => Ok(Page::new(url, html.as_str())),
            Some(Err(msg)) => Err(AppError::NetworkError(msg.clone())),
            None => Err(AppError::HttpError(format!("HTTP 404 for {url}"))),
        }
    }
}
