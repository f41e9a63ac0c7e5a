//! XPath selector evaluated over scraper's DOM.
//!
//! Supports the location-path subset page models use in practice:
//!
//! - `/` (child) and `//` (descendant) steps with a tag name or `*`
//! - predicates `[n]`, `[last()]`, `[@a]`, `[@a='v']`, `[@a!='v']`,
//!   `[contains(@a,'v')]` and `[starts-with(@a,'v')]`
//! - a terminal `@attr`, `text()`, `allText()`, `tidyText()`, `html()` or
//!   `outerHtml()`
//!
//! Element results are rendered as outer HTML. Predicates apply left to
//! right, and a positional predicate counts among the siblings that passed
//! the predicates before it, so `//li[@class='a'][2]` and
//! `//li[2][@class='a']` differ as they do in XPath.

use std::collections::HashSet;

use scraper::{ElementRef, Html};

use crate::error::AppError;
use crate::traits::Selector;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Any,
    Tag(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    HasAttr(String),
    AttrEq(String, String),
    AttrNe(String, String),
    AttrContains(String, String),
    AttrStartsWith(String, String),
}

impl Predicate {
    fn is_positional(&self) -> bool {
        matches!(self, Predicate::Position(_) | Predicate::Last)
    }

    fn matches(&self, el: ElementRef<'_>) -> bool {
        let element = el.value();
        match self {
            Predicate::Position(_) | Predicate::Last => true,
            Predicate::HasAttr(name) => element.attr(name).is_some(),
            Predicate::AttrEq(name, value) => element.attr(name) == Some(value.as_str()),
            Predicate::AttrNe(name, value) => element.attr(name) != Some(value.as_str()),
            Predicate::AttrContains(name, value) => element
                .attr(name)
                .is_some_and(|v| v.contains(value.as_str())),
            Predicate::AttrStartsWith(name, value) => element
                .attr(name)
                .is_some_and(|v| v.starts_with(value.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

impl Step {
    fn test_matches(&self, el: ElementRef<'_>) -> bool {
        match &self.test {
            NodeTest::Any => true,
            NodeTest::Tag(tag) => el.value().name().eq_ignore_ascii_case(tag),
        }
    }

    /// Node test, then predicates left to right. A positional predicate
    /// counts among the siblings that passed every predicate before it.
    fn accepts(&self, el: ElementRef<'_>) -> bool {
        if !self.test_matches(el) {
            return false;
        }
        if !self.predicates.iter().any(Predicate::is_positional) {
            return self.predicates.iter().all(|p| p.matches(el));
        }

        let mut group: Vec<ElementRef<'_>> = match el.parent() {
            Some(parent) => parent
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|s| self.test_matches(*s))
                .collect(),
            None => vec![el],
        };
        for predicate in &self.predicates {
            group = match predicate {
                Predicate::Position(n) => group.get(n - 1).copied().into_iter().collect(),
                Predicate::Last => group.last().copied().into_iter().collect(),
                other => group.into_iter().filter(|s| other.matches(*s)).collect(),
            };
        }
        group.iter().any(|s| s.id() == el.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    OuterHtml,
    InnerHtml,
    OwnText,
    AllText,
    TidyText,
    Attr(String),
}

/// A compiled XPath expression.
pub struct XpathSelector {
    expr: String,
    steps: Vec<Step>,
    output: Output,
    output_axis: Axis,
}

impl XpathSelector {
    pub fn new(expr: &str) -> Result<Self, AppError> {
        let (steps, output, output_axis) = Parser::new(expr).parse()?;
        Ok(Self {
            expr: expr.to_string(),
            steps,
            output,
            output_axis,
        })
    }

    /// Elements selected by the location path, in document order.
    fn evaluate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let root = document.root_element();
        // `None` stands for the document node, the parent of the root element.
        let mut context: Option<Vec<ElementRef<'a>>> = None;

        for step in &self.steps {
            let candidates: Vec<ElementRef<'a>> = match (&context, step.axis) {
                (None, Axis::Child) => vec![root],
                (None, Axis::Descendant) => descendants_or_self(root).collect(),
                (Some(nodes), Axis::Child) => nodes
                    .iter()
                    .flat_map(|el| el.children().filter_map(ElementRef::wrap))
                    .collect(),
                (Some(nodes), Axis::Descendant) => nodes
                    .iter()
                    .flat_map(|el| descendants_or_self(*el).skip(1))
                    .collect(),
            };

            let mut seen = HashSet::new();
            let mut next: Vec<ElementRef<'a>> = candidates
                .into_iter()
                .filter(|el| seen.insert(el.id()))
                .filter(|el| step.accepts(*el))
                .collect();
            next.sort_by_key(|el| el.id());
            context = Some(next);
        }

        context.unwrap_or_else(|| vec![root])
    }

    fn render(&self, el: ElementRef<'_>) -> Vec<String> {
        match &self.output {
            Output::OuterHtml => vec![el.html()],
            Output::InnerHtml => vec![el.inner_html()],
            Output::OwnText => {
                let text: String = if self.output_axis == Axis::Descendant {
                    el.text().collect()
                } else {
                    el.children()
                        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
                        .collect()
                };
                non_blank(text.trim())
            }
            Output::AllText => non_blank(el.text().collect::<String>().trim()),
            Output::TidyText => {
                let text: String = el.text().collect();
                non_blank(&text.split_whitespace().collect::<Vec<_>>().join(" "))
            }
            Output::Attr(name) => {
                let owners: Vec<ElementRef<'_>> = if self.output_axis == Axis::Descendant {
                    descendants_or_self(el).collect()
                } else {
                    vec![el]
                };
                owners
                    .into_iter()
                    .filter_map(|owner| owner.value().attr(name).map(str::to_string))
                    .collect()
            }
        }
    }

    fn collect(&self, text: &str, limit: Option<usize>) -> Vec<String> {
        let document = Html::parse_document(text);
        let mut results = Vec::new();
        for el in self.evaluate(&document) {
            results.extend(self.render(el));
            if limit.is_some_and(|n| results.len() >= n) {
                break;
            }
        }
        results
    }
}

impl Selector for XpathSelector {
    fn expression(&self) -> &str {
        &self.expr
    }

    fn select(&self, text: &str) -> Option<String> {
        self.collect(text, Some(1)).into_iter().next()
    }

    fn select_list(&self, text: &str) -> Vec<String> {
        self.collect(text, None)
    }
}

fn descendants_or_self<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    el.descendants().filter_map(ElementRef::wrap)
}

fn non_blank(text: &str) -> Vec<String> {
    if text.is_empty() {
        vec![]
    } else {
        vec![text.to_string()]
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse(mut self) -> Result<(Vec<Step>, Output, Axis), AppError> {
        let mut steps = Vec::new();
        let mut output = Output::OuterHtml;
        let mut output_axis = Axis::Child;

        self.skip_ws();
        if self.at_end() {
            return Err(self.error("expression is empty"));
        }

        while !self.at_end() {
            let axis = if self.eat("//") {
                Axis::Descendant
            } else if self.eat("/") {
                Axis::Child
            } else if steps.is_empty() {
                Axis::Descendant
            } else {
                return Err(self.error("expected '/'"));
            };

            if self.eat("@") {
                let name = self.name().ok_or_else(|| self.error("expected attribute name"))?;
                output = Output::Attr(name);
                output_axis = axis;
                self.expect_end()?;
                break;
            }

            if self.eat("*") {
                let predicates = self.predicates()?;
                steps.push(Step {
                    axis,
                    test: NodeTest::Any,
                    predicates,
                });
                self.skip_ws();
                continue;
            }

            let name = self.name().ok_or_else(|| self.error("expected node test"))?;
            if self.eat("()") {
                output = match name.as_str() {
                    "text" => Output::OwnText,
                    "allText" => Output::AllText,
                    "tidyText" => Output::TidyText,
                    "html" => Output::InnerHtml,
                    "outerHtml" => Output::OuterHtml,
                    other => return Err(self.error(&format!("unsupported function {other}()"))),
                };
                output_axis = axis;
                self.expect_end()?;
                break;
            }

            let predicates = self.predicates()?;
            steps.push(Step {
                axis,
                test: NodeTest::Tag(name.to_lowercase()),
                predicates,
            });
            self.skip_ws();
        }

        Ok((steps, output, output_axis))
    }

    fn predicates(&mut self) -> Result<Vec<Predicate>, AppError> {
        let mut predicates = Vec::new();
        while self.eat("[") {
            self.skip_ws();
            let predicate = self.predicate()?;
            self.skip_ws();
            if !self.eat("]") {
                return Err(self.error("expected ']'"));
            }
            predicates.push(predicate);
        }
        Ok(predicates)
    }

    fn predicate(&mut self) -> Result<Predicate, AppError> {
        if let Some(n) = self.number() {
            if n == 0 {
                return Err(self.error("positions start at 1"));
            }
            return Ok(Predicate::Position(n));
        }
        if self.eat("last()") {
            return Ok(Predicate::Last);
        }
        if self.eat("@") {
            let name = self.name().ok_or_else(|| self.error("expected attribute name"))?;
            self.skip_ws();
            if self.eat("!=") {
                self.skip_ws();
                return Ok(Predicate::AttrNe(name, self.literal()?));
            }
            if self.eat("=") {
                self.skip_ws();
                return Ok(Predicate::AttrEq(name, self.literal()?));
            }
            return Ok(Predicate::HasAttr(name));
        }

        let function = self.name().ok_or_else(|| self.error("expected predicate"))?;
        if function != "contains" && function != "starts-with" {
            return Err(self.error(&format!("unsupported predicate {function}")));
        }
        self.skip_ws();
        if !self.eat("(") {
            return Err(self.error("expected '('"));
        }
        self.skip_ws();
        if !self.eat("@") {
            return Err(self.error("expected '@'"));
        }
        let name = self.name().ok_or_else(|| self.error("expected attribute name"))?;
        self.skip_ws();
        if !self.eat(",") {
            return Err(self.error("expected ','"));
        }
        self.skip_ws();
        let value = self.literal()?;
        self.skip_ws();
        if !self.eat(")") {
            return Err(self.error("expected ')'"));
        }

        Ok(if function == "contains" {
            Predicate::AttrContains(name, value)
        } else {
            Predicate::AttrStartsWith(name, value)
        })
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn name(&mut self) -> Option<String> {
        let name = self.take_while(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ':'));
        if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
            None
        } else {
            Some(name.to_string())
        }
    }

    fn number(&mut self) -> Option<usize> {
        let start = self.pos;
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return None;
        }
        match digits.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                self.pos = start;
                None
            }
        }
    }

    fn literal(&mut self) -> Result<String, AppError> {
        let quote = match self.rest().chars().next() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected quoted string")),
        };
        self.pos += 1;
        let value = self.take_while(|c| c != quote).to_string();
        if !self.eat(&quote.to_string()) {
            return Err(self.error("unterminated string"));
        }
        Ok(value)
    }

    fn expect_end(&mut self) -> Result<(), AppError> {
        self.skip_ws();
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn error(&self, message: &str) -> AppError {
        AppError::invalid_selector(self.src, format!("{message} at offset {}", self.pos))
    }
}
