//! Page models declared in JSON and extracted into map-backed records.
//!
//! ```json
//! {
//!   "name": "oschina_answer",
//!   "target_url": { "value": ["http://www.oschina.net/question/\\d+_\\d+*"] },
//!   "help_url": { "value": ["http://www.oschina.net/question/*"] },
//!   "fields": [
//!     { "name": "user", "type": "string", "extract_by": { "value": "//img/@title" } },
//!     { "name": "id", "type": "string", "extract_by_url": { "value": "question/(\\d+)_" } }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::field::FieldSlot;
use crate::schema::{ExtractBy, ExtractByUrl, Field, SchemaDefinition};
use crate::url_pattern::UrlRule;

/// A record whose fields are only known at runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DynamicRecord {
    values: serde_json::Map<String, serde_json::Value>,
}

impl DynamicRecord {
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.values.get(field)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|v| v.as_str())
    }

    pub fn list(&self, field: &str) -> Vec<&str> {
        self.values
            .get(field)
            .and_then(|v| v.as_array())
            .map(|items| items.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn set_text(&mut self, field: &str, value: Option<String>) {
        let value = value.map_or(serde_json::Value::Null, serde_json::Value::String);
        self.values.insert(field.to_string(), value);
    }

    pub fn set_list(&mut self, field: &str, values: Vec<String>) {
        let values = values.into_iter().map(serde_json::Value::String).collect();
        self.values
            .insert(field.to_string(), serde_json::Value::Array(values));
    }

    pub fn into_json(self) -> serde_json::Value {
        serde_json::Value::Object(self.values)
    }
}

/// One field of a JSON page model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    /// `string`, `list`, or any other type name.
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_by: Option<ExtractBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_by_url: Option<ExtractByUrl>,
}

fn default_field_type() -> String {
    "string".to_string()
}

/// A page model as declared in a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<UrlRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_url: Option<UrlRule>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl ModelSpec {
    pub fn from_json(json: &str) -> Result<Self, AppError> {
        serde_json::from_str(json).map_err(|e| AppError::SchemaError(format!("Invalid model: {e}")))
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::SchemaError(format!("Failed to read model file {}: {e}", path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            AppError::SchemaError(format!("Invalid JSON in model file {}: {e}", path.display()))
        })
    }

    /// Build the schema for [`DynamicRecord`]s.
    ///
    /// A field declaring both rules is rejected; a field declaring neither
    /// is kept but never populated.
    pub fn into_schema(self) -> Result<SchemaDefinition<DynamicRecord>, AppError> {
        let mut schema = SchemaDefinition::new(self.name);
        if let Some(rule) = self.target_url {
            schema = schema.target_url(rule);
        }
        if let Some(rule) = self.help_url {
            schema = schema.help_url(rule);
        }

        for spec in self.fields {
            let field = dynamic_field(&spec.name, &spec.field_type);
            let field = match (spec.extract_by, spec.extract_by_url) {
                (Some(_), Some(_)) => {
                    return Err(AppError::SchemaError(format!(
                        "Field {} declares both extract_by and extract_by_url",
                        spec.name
                    )));
                }
                (Some(by), None) => field.extract_by(by),
                (None, Some(by)) => field.extract_by_url(by),
                (None, None) => field,
            };
            schema = schema.field(field);
        }

        Ok(schema)
    }
}

fn dynamic_field(name: &str, field_type: &str) -> Field<DynamicRecord> {
    let key = name.to_string();
    match field_type.trim().to_lowercase().as_str() {
        "string" | "text" => Field::text(name, move |r: &mut DynamicRecord, v| r.set_text(&key, v)),
        "list" | "array" => Field::list(name, move |r: &mut DynamicRecord, v| r.set_list(&key, v)),
        other => Field::with_slot(
            name,
            FieldSlot::Opaque {
                type_name: other.to_string(),
            },
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::PageModelExtractor;
    use crate::models::Page;
    use crate::selector::SelectorKind;

    const MODEL: &str = r#"{
        "name": "question",
        "target_url": { "value": ["http://site/q/*"] },
        "help_url": { "value": ["http://site/list/*"], "source_region": "//div[@class='pager']" },
        "fields": [
            { "name": "id", "extract_by_url": { "value": "q/(\\d+)" } },
            { "name": "title", "type": "string", "extract_by": { "value": "//h1/text()", "required": true } },
            { "name": "tags", "type": "list", "extract_by": { "value": "a.tag", "type": "css", "multi": true } },
            { "name": "notes", "type": "string" }
        ]
    }"#;

    #[test]
    fn test_parse_model() {
        let spec = ModelSpec::from_json(MODEL).unwrap();
        assert_eq!(spec.name, "question");
        assert_eq!(spec.fields.len(), 4);
        assert_eq!(spec.fields[0].field_type, "string");
        assert_eq!(
            spec.fields[2].extract_by.as_ref().map(|b| b.kind),
            Some(SelectorKind::Css)
        );
        assert_eq!(
            spec.help_url.as_ref().and_then(|r| r.source_region.as_deref()),
            Some("//div[@class='pager']")
        );
    }

    #[test]
    fn test_extract_dynamic_record() {
        let schema = ModelSpec::from_json(MODEL).unwrap().into_schema().unwrap();
        let extractor = PageModelExtractor::compile(schema).unwrap();
        let html = r#"<h1>Why Rust?</h1><a class="tag" href="/t/rust">rust</a><a class="tag" href="/t/mem">mem</a>"#;
        let mut page = Page::new("http://site/q/7", html);

        let record = extractor.apply(&mut page).unwrap();

        assert_eq!(record.text("id"), Some("7"));
        assert_eq!(record.text("title"), Some("Why Rust?"));
        assert_eq!(record.list("tags").len(), 2);
        assert!(record.get("notes").is_none());
        assert!(!page.result_items().is_skip());
    }

    #[test]
    fn test_missing_text_serializes_as_null() {
        let schema = ModelSpec::from_json(MODEL).unwrap().into_schema().unwrap();
        let extractor = PageModelExtractor::compile(schema).unwrap();
        let mut page = Page::new("http://site/q/7", "<p>nothing</p>");

        let record = extractor.apply(&mut page).unwrap();

        assert!(page.result_items().is_skip());
        assert_eq!(
            record.into_json(),
            serde_json::json!({"id": "7", "title": null, "tags": []})
        );
    }

    #[test]
    fn test_wrong_field_type_fails_compile() {
        let json = r#"{
            "name": "bad",
            "fields": [ { "name": "votes", "type": "integer", "extract_by": { "value": "//span" } } ]
        }"#;
        let schema = ModelSpec::from_json(json).unwrap().into_schema().unwrap();
        let err = PageModelExtractor::compile(schema).unwrap_err();
        assert_eq!(err.to_string(), "Field votes must be string");
    }

    #[test]
    fn test_list_rule_on_string_field_fails_compile() {
        let json = r#"{
            "name": "bad",
            "fields": [ { "name": "tags", "extract_by": { "value": "//a", "multi": true } } ]
        }"#;
        let schema = ModelSpec::from_json(json).unwrap().into_schema().unwrap();
        let err = PageModelExtractor::compile(schema).unwrap_err();
        assert_eq!(err.to_string(), "Field tags must be list");
    }

    #[test]
    fn test_both_rules_rejected() {
        let json = r#"{
            "name": "bad",
            "fields": [ {
                "name": "id",
                "extract_by": { "value": "//h1" },
                "extract_by_url": { "value": "(\\d+)" }
            } ]
        }"#;
        let err = ModelSpec::from_json(json).unwrap().into_schema().err().unwrap();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_invalid_json() {
        let err = ModelSpec::from_json("{ not json").unwrap_err();
        assert!(matches!(err, AppError::SchemaError(_)));
    }
}
