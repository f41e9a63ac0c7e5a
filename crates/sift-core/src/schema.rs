//! Explicit schema declarations.
//!
//! A [`SchemaDefinition`] says, for one record type, which URLs are
//! extracted, which are only visited, and how each field is populated.
//! It is plain data; [`PageModelExtractor::compile`](crate::PageModelExtractor::compile)
//! turns it into an executable extractor.

use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::field::FieldSlot;
use crate::models::Page;
use crate::selector::SelectorKind;
use crate::traits::AfterExtract;
use crate::url_pattern::UrlRule;

pub(crate) type Factory<T> = Arc<dyn Fn() -> Result<T, AppError> + Send + Sync>;
pub(crate) type AfterHook<T> = Arc<dyn Fn(&mut T, &Page) -> Result<(), AppError> + Send + Sync>;

/// Extract a field from the page body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractBy {
    pub value: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_kind")]
    pub kind: SelectorKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub multi: bool,
}

impl ExtractBy {
    /// XPath rule, the default kind.
    pub fn new(value: impl Into<String>) -> Self {
        Self::with_kind(SelectorKind::Xpath, value)
    }

    pub fn with_kind(kind: SelectorKind, value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind,
            required: false,
            multi: false,
        }
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::with_kind(SelectorKind::Css, value)
    }

    pub fn regex(value: impl Into<String>) -> Self {
        Self::with_kind(SelectorKind::Regex, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::with_kind(SelectorKind::Xpath, value)
    }

    pub fn xpath2(value: impl Into<String>) -> Self {
        Self::with_kind(SelectorKind::Xpath2, value)
    }

    /// An empty selection marks the page as skipped.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Collect every match into a list field.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<SelectorKind, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    Ok(SelectorKind::from_name_lenient(&name))
}

/// Extract a field from the page URL with a regex. A blank value matches
/// the whole URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractByUrl {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub multi: bool,
}

impl ExtractByUrl {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    pub(crate) fn pattern(&self) -> &str {
        if self.value.trim().is_empty() {
            ".*"
        } else {
            &self.value
        }
    }
}

/// How a field is populated, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractRule {
    Body(ExtractBy),
    Url(ExtractByUrl),
}

/// One field of `T`: its name, typed write access and extraction rule.
pub struct Field<T> {
    pub(crate) name: String,
    pub(crate) slot: FieldSlot<T>,
    pub(crate) rule: Option<ExtractRule>,
    /// Set when both a body rule and a URL rule were declared.
    pub(crate) conflicting: bool,
}

impl<T: 'static> Field<T> {
    /// A single-valued string field.
    pub fn text<F>(name: impl Into<String>, assign: F) -> Self
    where
        F: Fn(&mut T, Option<String>) + Send + Sync + 'static,
    {
        Self::with_slot(
            name,
            FieldSlot::Text {
                assign: Arc::new(assign),
                writer: None,
            },
        )
    }

    /// A list-of-strings field.
    pub fn list<F>(name: impl Into<String>, assign: F) -> Self
    where
        F: Fn(&mut T, Vec<String>) + Send + Sync + 'static,
    {
        Self::with_slot(
            name,
            FieldSlot::List {
                assign: Arc::new(assign),
                writer: None,
            },
        )
    }

    /// A string field with a custom writer, called before the direct
    /// assignment with the same value.
    pub fn text_with_writer<F, W>(name: impl Into<String>, assign: F, writer: W) -> Self
    where
        F: Fn(&mut T, Option<String>) + Send + Sync + 'static,
        W: Fn(&mut T, Option<String>) -> Result<(), AppError> + Send + Sync + 'static,
    {
        Self::with_slot(
            name,
            FieldSlot::Text {
                assign: Arc::new(assign),
                writer: Some(Arc::new(writer)),
            },
        )
    }

    /// A list field with a custom writer.
    pub fn list_with_writer<F, W>(name: impl Into<String>, assign: F, writer: W) -> Self
    where
        F: Fn(&mut T, Vec<String>) + Send + Sync + 'static,
        W: Fn(&mut T, Vec<String>) -> Result<(), AppError> + Send + Sync + 'static,
    {
        Self::with_slot(
            name,
            FieldSlot::List {
                assign: Arc::new(assign),
                writer: Some(Arc::new(writer)),
            },
        )
    }

    /// A field of some other type. It can be declared, but any extraction
    /// rule on it fails schema compilation.
    pub fn opaque<V>(name: impl Into<String>) -> Self {
        Self::with_slot(
            name,
            FieldSlot::Opaque {
                type_name: std::any::type_name::<V>().to_string(),
            },
        )
    }

    pub(crate) fn with_slot(name: impl Into<String>, slot: FieldSlot<T>) -> Self {
        Self {
            name: name.into(),
            slot,
            rule: None,
            conflicting: false,
        }
    }
}

impl<T> Field<T> {
    /// Populate the field from the page body. Replaces an earlier body
    /// rule; combined with [`extract_by_url`](Self::extract_by_url) the
    /// schema fails to compile.
    pub fn extract_by(mut self, rule: ExtractBy) -> Self {
        self.conflicting |= matches!(self.rule, Some(ExtractRule::Url(_)));
        self.rule = Some(ExtractRule::Body(rule));
        self
    }

    /// Populate the field from the page URL. Replaces an earlier URL rule;
    /// combined with [`extract_by`](Self::extract_by) the schema fails to
    /// compile.
    pub fn extract_by_url(mut self, rule: ExtractByUrl) -> Self {
        self.conflicting |= matches!(self.rule, Some(ExtractRule::Body(_)));
        self.rule = Some(ExtractRule::Url(rule));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rule(&self) -> Option<&ExtractRule> {
        self.rule.as_ref()
    }

    /// `string`, `list`, or the Rust type name of an opaque field.
    pub fn type_name(&self) -> &str {
        self.slot.type_name()
    }
}

/// Everything needed to compile an extractor for record type `T`.
pub struct SchemaDefinition<T> {
    pub(crate) name: String,
    pub(crate) target_url: Option<UrlRule>,
    pub(crate) help_url: Option<UrlRule>,
    pub(crate) fields: Vec<Field<T>>,
    pub(crate) factory: Factory<T>,
    pub(crate) after_extract: Option<AfterHook<T>>,
}

impl<T: Default + 'static> SchemaDefinition<T> {
    /// A schema whose records start from `T::default()`.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_factory(name, || Ok(T::default()))
    }
}

impl<T: 'static> SchemaDefinition<T> {
    /// A schema whose records come from a fallible constructor. A failing
    /// constructor only affects the page being processed.
    pub fn with_factory<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<T, AppError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            target_url: None,
            help_url: None,
            fields: Vec::new(),
            factory: Arc::new(factory),
            after_extract: None,
        }
    }

    pub fn target_url(mut self, rule: UrlRule) -> Self {
        self.target_url = Some(rule);
        self
    }

    pub fn help_url(mut self, rule: UrlRule) -> Self {
        self.help_url = Some(rule);
        self
    }

    /// Append a field. Fields are extracted in declaration order.
    pub fn field(mut self, field: Field<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Run [`AfterExtract::after_extract`] once all fields are written.
    pub fn after_extract(mut self) -> Self
    where
        T: AfterExtract,
    {
        self.after_extract = Some(Arc::new(|record: &mut T, page: &Page| {
            record.after_extract(page)
        }));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }
}
