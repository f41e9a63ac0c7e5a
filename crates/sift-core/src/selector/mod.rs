//! Selector kinds a schema can declare, and their implementations.

mod css;
mod regexp;
mod xpath;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use css::CssSelector;
pub use regexp::RegexSelector;
pub use xpath::XpathSelector;

use crate::error::AppError;
use crate::traits::Selector;

/// The query language of a body selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorKind {
    Css,
    Regex,
    #[default]
    Xpath,
    Xpath2,
}

impl SelectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectorKind::Css => "css",
            SelectorKind::Regex => "regex",
            SelectorKind::Xpath => "xpath",
            SelectorKind::Xpath2 => "xpath2",
        }
    }

    /// Look up a kind by name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "css" => Some(SelectorKind::Css),
            "regex" => Some(SelectorKind::Regex),
            "xpath" => Some(SelectorKind::Xpath),
            "xpath2" => Some(SelectorKind::Xpath2),
            _ => None,
        }
    }

    /// Like [`from_name`](Self::from_name), but an unknown name falls back
    /// to [`SelectorKind::Xpath2`].
    pub fn from_name_lenient(name: &str) -> Self {
        Self::from_name(name).unwrap_or_else(|| {
            tracing::warn!(kind = %name, "Unknown selector kind, using xpath2");
            SelectorKind::Xpath2
        })
    }

    /// Compile `expr` into a selector of this kind.
    pub fn build(&self, expr: &str) -> Result<Box<dyn Selector>, AppError> {
        let selector: Box<dyn Selector> = match self {
            SelectorKind::Css => Box::new(CssSelector::new(expr)?),
            SelectorKind::Regex => Box::new(RegexSelector::new(expr)?),
            SelectorKind::Xpath | SelectorKind::Xpath2 => Box::new(XpathSelector::new(expr)?),
        };
        Ok(selector)
    }
}

impl fmt::Display for SelectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
