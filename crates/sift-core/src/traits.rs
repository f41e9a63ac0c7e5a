use std::future::Future;

use crate::error::AppError;
use crate::models::Page;

/// Evaluates a query over document text (HTML body or URL).
///
/// Implementations are compiled once and shared read-only across threads.
pub trait Selector: Send + Sync {
    /// The query this selector was built from.
    fn expression(&self) -> &str;

    /// First match, if any.
    fn select(&self, text: &str) -> Option<String>;

    /// Every match, in document order.
    fn select_list(&self, text: &str) -> Vec<String>;
}

/// Optional post-extraction capability of a record type.
///
/// Registered on a schema with
/// [`SchemaDefinition::after_extract`](crate::schema::SchemaDefinition::after_extract)
/// and invoked once every field has been written.
pub trait AfterExtract {
    fn after_extract(&mut self, page: &Page) -> Result<(), AppError>;
}

/// Fetches a page for a URL.
pub trait Fetcher: Send + Sync + Clone + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Page, AppError>> + Send;
}
