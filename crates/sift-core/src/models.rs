/// A fetched document: its URL, its serialized HTML and the result
/// context downstream stages read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    url: String,
    html: String,
    result_items: ResultItems,
}

impl Page {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            result_items: ResultItems::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    pub fn result_items(&self) -> &ResultItems {
        &self.result_items
    }

    pub fn result_items_mut(&mut self) -> &mut ResultItems {
        &mut self.result_items
    }
}

/// Per-document result context.
///
/// `skip` tells downstream consumers to discard whatever record was
/// produced for the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultItems {
    skip: bool,
}

impl ResultItems {
    pub fn set_skip(&mut self, skip: bool) {
        self.skip = skip;
    }

    pub fn is_skip(&self) -> bool {
        self.skip
    }
}
