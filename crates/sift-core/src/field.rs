use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::Page;
use crate::traits::Selector;

pub(crate) type TextAssign<T> = Arc<dyn Fn(&mut T, Option<String>) + Send + Sync>;
pub(crate) type ListAssign<T> = Arc<dyn Fn(&mut T, Vec<String>) + Send + Sync>;
pub(crate) type TextWriter<T> = Arc<dyn Fn(&mut T, Option<String>) -> Result<(), AppError> + Send + Sync>;
pub(crate) type ListWriter<T> = Arc<dyn Fn(&mut T, Vec<String>) -> Result<(), AppError> + Send + Sync>;

/// Where a field's selector is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The page's serialized HTML.
    Body,
    /// The page URL.
    Url,
}

/// Typed write access to one record field.
pub(crate) enum FieldSlot<T> {
    Text {
        assign: TextAssign<T>,
        writer: Option<TextWriter<T>>,
    },
    List {
        assign: ListAssign<T>,
        writer: Option<ListWriter<T>>,
    },
    /// A field whose type is neither a string nor a list of strings.
    Opaque { type_name: String },
}

impl<T> FieldSlot<T> {
    pub(crate) fn type_name(&self) -> &str {
        match self {
            FieldSlot::Text { .. } => "string",
            FieldSlot::List { .. } => "list",
            FieldSlot::Opaque { type_name } => type_name,
        }
    }
}

/// The write half of a compiled rule. Cardinality is already checked, so
/// only the two string shapes remain.
enum Sink<T> {
    Text {
        assign: TextAssign<T>,
        writer: Option<TextWriter<T>>,
    },
    List {
        assign: ListAssign<T>,
        writer: Option<ListWriter<T>>,
    },
}

/// Compiled recipe for populating one field of `T`.
pub struct FieldRule<T> {
    name: String,
    selector: Box<dyn Selector>,
    source: Source,
    required: bool,
    sink: Sink<T>,
}

impl<T> FieldRule<T> {
    /// Bind a selector to a field slot, checking cardinality.
    pub(crate) fn new(
        name: &str,
        slot: FieldSlot<T>,
        selector: Box<dyn Selector>,
        source: Source,
        multi: bool,
        required: bool,
    ) -> Result<Self, AppError> {
        let sink = match (slot, multi) {
            (FieldSlot::List { assign, writer }, true) => Sink::List { assign, writer },
            (FieldSlot::Text { assign, writer }, false) => Sink::Text { assign, writer },
            (_, true) => {
                return Err(AppError::CardinalityMismatch {
                    field: name.to_string(),
                    expected: "list",
                });
            }
            (_, false) => {
                return Err(AppError::CardinalityMismatch {
                    field: name.to_string(),
                    expected: "string",
                });
            }
        };

        Ok(Self {
            name: name.to_string(),
            selector,
            source,
            required,
            sink,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selector(&self) -> &dyn Selector {
        self.selector.as_ref()
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.sink, Sink::List { .. })
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn has_writer(&self) -> bool {
        match &self.sink {
            Sink::Text { writer, .. } => writer.is_some(),
            Sink::List { writer, .. } => writer.is_some(),
        }
    }

    /// Select this field's value from `page` and write it into `record`.
    ///
    /// The writer, when present, runs first; the direct assignment always
    /// runs as well. Returns `true` when the selection came back empty.
    pub(crate) fn extract(&self, record: &mut T, page: &Page) -> Result<bool, AppError> {
        let text = match self.source {
            Source::Body => page.html(),
            Source::Url => page.url(),
        };

        match &self.sink {
            Sink::Text { assign, writer } => {
                let value = self.selector.select(text);
                let missing = value.is_none();
                if let Some(writer) = writer {
                    writer(record, value.clone()).map_err(|e| self.write_error(e))?;
                }
                assign(record, value);
                Ok(missing)
            }
            Sink::List { assign, writer } => {
                let values = self.selector.select_list(text);
                let missing = values.is_empty();
                if let Some(writer) = writer {
                    writer(record, values.clone()).map_err(|e| self.write_error(e))?;
                }
                assign(record, values);
                Ok(missing)
            }
        }
    }

    fn write_error(&self, err: AppError) -> AppError {
        AppError::FieldWrite {
            field: self.name.clone(),
            message: err.to_string(),
        }
    }
}

impl<T> fmt::Debug for FieldRule<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldRule")
            .field("name", &self.name)
            .field("selector", &self.selector.expression())
            .field("source", &self.source)
            .field("multi", &self.is_multi())
            .field("required", &self.required)
            .field("writer", &self.has_writer())
            .finish()
    }
}
