use regex::{Regex, RegexBuilder};

use crate::error::AppError;
use crate::traits::Selector;

/// Regex selector.
///
/// Case-insensitive, `.` matches newlines. Yields capture group 1 when the
/// pattern declares a group, otherwise the whole match.
pub struct RegexSelector {
    expr: String,
    regex: Regex,
    group: usize,
}

impl RegexSelector {
    pub fn new(expr: &str) -> Result<Self, AppError> {
        if expr.trim().is_empty() {
            return Err(AppError::invalid_selector(expr, "regex must not be empty"));
        }
        let regex = RegexBuilder::new(expr)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| AppError::invalid_selector(expr, e.to_string()))?;
        let group = if regex.captures_len() > 1 { 1 } else { 0 };
        Ok(Self {
            expr: expr.to_string(),
            regex,
            group,
        })
    }
}

impl Selector for RegexSelector {
    fn expression(&self) -> &str {
        &self.expr
    }

    fn select(&self, text: &str) -> Option<String> {
        self.regex
            .captures(text)
            .and_then(|caps| caps.get(self.group))
            .map(|m| m.as_str().to_string())
    }

    fn select_list(&self, text: &str) -> Vec<String> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| caps.get(self.group))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}
