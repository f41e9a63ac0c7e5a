pub mod dynamic;
pub mod error;
pub mod extractor;
pub mod field;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod schema;
pub mod selector;
pub mod traits;
pub mod url_pattern;

#[cfg(test)]
pub(crate) mod testutil;

pub use dynamic::{DynamicRecord, ModelSpec};
pub use error::AppError;
pub use extractor::PageModelExtractor;
pub use field::{FieldRule, Source};
pub use models::{Page, ResultItems};
pub use pipeline::{ExtractPipeline, PipelineConfig, PipelineReporter, TracingReporter};
pub use resolver::ModelResolver;
pub use schema::{ExtractBy, ExtractByUrl, ExtractRule, Field, SchemaDefinition};
pub use selector::SelectorKind;
pub use traits::{AfterExtract, Fetcher, Selector};
pub use url_pattern::{UrlRule, UrlRuleSet};
