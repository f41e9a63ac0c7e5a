use sift_core::{ModelResolver, Page, PageModelExtractor};

use crate::common::QUESTION_HTML;

const QUESTION_MODEL: &str = r#"{
    "name": "question",
    "target_url": { "value": ["http://site/question/\\d+_\\d+*"] },
    "help_url": { "value": ["http://site/question/*"] },
    "fields": [
        { "name": "id", "extract_by_url": { "value": "question/(\\d+)_", "required": true } },
        { "name": "title", "extract_by": { "value": "//h1/text()", "required": true } },
        { "name": "answers", "type": "list",
          "extract_by": { "value": "div.detail", "type": "css", "multi": true } }
    ]
}"#;

#[test]
fn test_model_file_round_trip_through_resolver() {
    let tmp = tempfile::TempDir::new().unwrap();
    let dir = tmp.path().join("question");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("1.0.0.json"), QUESTION_MODEL).unwrap();

    let resolved = ModelResolver::new(tmp.path()).resolve("question@1.0.0").unwrap();
    let extractor = PageModelExtractor::compile(resolved.spec.into_schema().unwrap()).unwrap();
    let mut page = Page::new("http://site/question/1_2", QUESTION_HTML);

    let record = extractor.apply(&mut page).unwrap();

    assert_eq!(record.text("id"), Some("1"));
    assert_eq!(record.list("answers").len(), 2);
    assert!(record.list("answers")[0].starts_with(r#"<div class="detail">"#));
    assert!(!page.result_items().is_skip());
}

#[test]
fn test_bad_model_fails_before_any_page() {
    let tmp = tempfile::TempDir::new().unwrap();
    let file = tmp.path().join("bad.json");
    std::fs::write(
        &file,
        r#"{"name": "bad", "fields": [{"name": "answers", "extract_by": {"value": "//li", "multi": true}}]}"#,
    )
    .unwrap();

    let resolved = ModelResolver::new(tmp.path())
        .resolve(file.to_str().unwrap())
        .unwrap();
    let err = PageModelExtractor::compile(resolved.spec.into_schema().unwrap()).unwrap_err();

    assert!(err.is_schema_error());
    assert_eq!(err.to_string(), "Field answers must be list");
}

#[test]
fn test_bundled_models_compile() {
    let models_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models");
    let resolved = ModelResolver::new(&models_dir)
        .resolve("oschina_answer@latest")
        .unwrap();
    let extractor = PageModelExtractor::compile(resolved.spec.into_schema().unwrap()).unwrap();

    assert_eq!(resolved.name, "oschina_answer@1.0.0");
    assert!(extractor.matches_target("https://www.oschina.net/question/12_34"));
    assert!(extractor.matches_help("https://www.oschina.net/question/ask"));
    assert!(!extractor.matches_target("https://www.oschina.net/question/ask"));
    assert_eq!(extractor.field_rules().len(), 5);
}
