use scraper::Html;

use crate::error::AppError;
use crate::traits::Selector;

/// CSS selector backed by scraper. Matches yield the element's outer HTML.
pub struct CssSelector {
    expr: String,
    selector: scraper::Selector,
}

impl CssSelector {
    pub fn new(expr: &str) -> Result<Self, AppError> {
        let selector = scraper::Selector::parse(expr)
            .map_err(|e| AppError::invalid_selector(expr, e.to_string()))?;
        Ok(Self {
            expr: expr.to_string(),
            selector,
        })
    }
}

impl Selector for CssSelector {
    fn expression(&self) -> &str {
        &self.expr
    }

    fn select(&self, text: &str) -> Option<String> {
        let document = Html::parse_document(text);
        document.select(&self.selector).next().map(|el| el.html())
    }

    fn select_list(&self, text: &str) -> Vec<String> {
        let document = Html::parse_document(text);
        document.select(&self.selector).map(|el| el.html()).collect()
    }
}
