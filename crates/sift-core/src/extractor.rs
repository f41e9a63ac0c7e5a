use std::fmt;

use crate::error::AppError;
use crate::field::{FieldRule, Source};
use crate::models::Page;
use crate::schema::{AfterHook, ExtractRule, Factory, SchemaDefinition};
use crate::selector::RegexSelector;
use crate::traits::Selector;
use crate::url_pattern::UrlRuleSet;

/// A schema compiled for repeated application to pages.
///
/// Immutable once built, so one instance can be shared across any number
/// of concurrent [`apply`](Self::apply) calls.
pub struct PageModelExtractor<T> {
    name: String,
    record_type: &'static str,
    target: UrlRuleSet,
    help: UrlRuleSet,
    rules: Vec<FieldRule<T>>,
    factory: Factory<T>,
    after_extract: Option<AfterHook<T>>,
}

impl<T: 'static> PageModelExtractor<T> {
    /// Compile a schema.
    ///
    /// Fails on the first field whose rule does not fit its type or whose
    /// selector does not parse; no partial extractor is returned.
    pub fn compile(schema: SchemaDefinition<T>) -> Result<Self, AppError> {
        let target = UrlRuleSet::target(schema.target_url.as_ref())?;
        let help = UrlRuleSet::help(schema.help_url.as_ref())?;

        let mut rules = Vec::with_capacity(schema.fields.len());
        for field in schema.fields {
            if field.conflicting {
                return Err(AppError::SchemaError(format!(
                    "Field {} declares both extract_by and extract_by_url",
                    field.name
                )));
            }
            let Some(rule) = field.rule else {
                continue;
            };
            let rule = match rule {
                ExtractRule::Body(by) => FieldRule::new(
                    &field.name,
                    field.slot,
                    by.kind.build(&by.value)?,
                    Source::Body,
                    by.multi,
                    by.required,
                )?,
                ExtractRule::Url(by) => FieldRule::new(
                    &field.name,
                    field.slot,
                    Box::new(RegexSelector::new(by.pattern())?),
                    Source::Url,
                    by.multi,
                    by.required,
                )?,
            };
            rules.push(rule);
        }

        tracing::debug!(
            model = %schema.name,
            fields = rules.len(),
            target_patterns = target.patterns().len(),
            help_patterns = help.patterns().len(),
            "Compiled page model"
        );

        Ok(Self {
            name: schema.name,
            record_type: std::any::type_name::<T>(),
            target,
            help,
            rules,
            factory: schema.factory,
            after_extract: schema.after_extract,
        })
    }

    /// Extract a record from `page`.
    ///
    /// Returns `Ok(None)` when the URL matches no target pattern. A required
    /// field that comes back empty sets the page's skip flag; the record is
    /// still returned. Failures building or populating the record are
    /// returned as errors.
    pub fn try_apply(&self, page: &mut Page) -> Result<Option<T>, AppError> {
        if !self.target.matches(page.url()) {
            tracing::trace!(model = %self.name, url = %page.url(), "URL matches no target pattern");
            return Ok(None);
        }

        let mut record = (self.factory)().map_err(|e| match e {
            AppError::RecordError(_) => e,
            other => AppError::RecordError(other.to_string()),
        })?;

        for rule in &self.rules {
            let missing = rule.extract(&mut record, page)?;
            if missing && rule.is_required() {
                tracing::debug!(
                    model = %self.name,
                    url = %page.url(),
                    field = %rule.name(),
                    "Required field is empty, skipping page"
                );
                page.result_items_mut().set_skip(true);
            }
        }

        if let Some(hook) = &self.after_extract {
            hook(&mut record, page).map_err(|e| match e {
                AppError::AfterExtract(_) => e,
                other => AppError::AfterExtract(other.to_string()),
            })?;
        }

        Ok(Some(record))
    }

    /// Like [`try_apply`](Self::try_apply), but a failure is logged against
    /// the page URL and the page yields nothing.
    pub fn apply(&self, page: &mut Page) -> Option<T> {
        match self.try_apply(page) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(
                    model = %self.name,
                    url = %page.url(),
                    error = %e,
                    "Extraction failed, discarding page"
                );
                None
            }
        }
    }
}

impl<T> PageModelExtractor<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type name of the records this extractor produces.
    pub fn record_type(&self) -> &'static str {
        self.record_type
    }

    pub fn target_urls(&self) -> &UrlRuleSet {
        &self.target
    }

    /// Help URL rules. Not consulted by `apply`; crawlers use them to decide
    /// which discovered links to follow.
    pub fn help_urls(&self) -> &UrlRuleSet {
        &self.help
    }

    pub fn target_region_selector(&self) -> Option<&dyn Selector> {
        self.target.source_region()
    }

    pub fn help_region_selector(&self) -> Option<&dyn Selector> {
        self.help.source_region()
    }

    pub fn field_rules(&self) -> &[FieldRule<T>] {
        &self.rules
    }

    pub fn matches_target(&self, url: &str) -> bool {
        self.target.matches(url)
    }

    pub fn matches_help(&self, url: &str) -> bool {
        self.help.matches(url)
    }
}

impl<T> fmt::Debug for PageModelExtractor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageModelExtractor")
            .field("name", &self.name)
            .field("record_type", &self.record_type)
            .field("target", &self.target)
            .field("help", &self.help)
            .field("rules", &self.rules)
            .field("after_extract", &self.after_extract.is_some())
            .finish()
    }
}
