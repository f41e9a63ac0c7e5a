use sift_core::{ExtractBy, Field, Page, PageModelExtractor, SchemaDefinition, UrlRule};

use crate::common::{QUESTION_HTML, question_schema};

#[derive(Debug, Default, PartialEq)]
struct Listing {
    items: Vec<String>,
}

fn listing_extractor() -> PageModelExtractor<Listing> {
    let schema = SchemaDefinition::<Listing>::new("listing")
        .target_url(UrlRule::new(["http://site/q/*"]))
        .field(
            Field::list("items", |l: &mut Listing, v| l.items = v)
                .extract_by(ExtractBy::xpath("//li[@class='a']").multi().required()),
        );
    PageModelExtractor::compile(schema).unwrap()
}

#[test]
fn test_list_items_on_target_page() {
    let extractor = listing_extractor();
    let body = r#"<ul><li class="a">1</li><li class="b">x</li><li class="a">2</li><li class="a">3</li></ul>"#;
    let mut page = Page::new("http://site/q/42", body);

    let listing = extractor.apply(&mut page).unwrap();

    assert_eq!(listing.items.len(), 3);
    assert!(!page.result_items().is_skip());
}

#[test]
fn test_other_site_yields_nothing() {
    let extractor = listing_extractor();
    let mut page = Page::new("http://other/x", r#"<li class="a">1</li>"#);

    assert!(extractor.apply(&mut page).is_none());
    assert!(!page.result_items().is_skip());
}

#[test]
fn test_question_page() {
    let extractor = PageModelExtractor::compile(question_schema()).unwrap();
    let mut page = Page::new("http://site/question/1_2", QUESTION_HTML);

    let question = extractor.apply(&mut page).unwrap();

    assert_eq!(question.id.as_deref(), Some("1"));
    assert_eq!(
        question.title.as_deref(),
        Some("How do I share state between threads?")
    );
    assert_eq!(question.user.as_deref(), Some("alice"));
    assert_eq!(
        question.answers,
        vec!["Use Arc<Mutex<T>>.".to_string(), "Or a channel.".to_string()]
    );
    assert_eq!(question.answer_count, 2);
    assert!(!page.result_items().is_skip());
}

#[test]
fn test_question_list_page_is_help_only() {
    let extractor = PageModelExtractor::compile(question_schema()).unwrap();

    assert!(extractor.matches_help("http://site/question/list"));
    assert!(!extractor.matches_target("http://site/question/list"));
    assert!(extractor.matches_target("http://site/question/1_2?page=2"));
    assert!(
        extractor
            .apply(&mut Page::new("http://site/question/list", QUESTION_HTML))
            .is_none()
    );
}

#[test]
fn test_help_region_selects_pager_links() {
    let extractor = PageModelExtractor::compile(question_schema()).unwrap();
    let region = extractor.help_region_selector().unwrap();

    let pager = region.select(QUESTION_HTML).unwrap();

    assert!(pager.contains("page=2"));
}

#[test]
fn test_question_without_title_is_skipped() {
    let extractor = PageModelExtractor::compile(question_schema()).unwrap();
    let mut page = Page::new("http://site/question/1_2", "<html><body></body></html>");

    let question = extractor.apply(&mut page).unwrap();

    assert!(question.title.is_none());
    assert_eq!(question.answer_count, 0);
    assert!(page.result_items().is_skip());
}

#[test]
fn test_same_page_twice_gives_equal_records() {
    let extractor = PageModelExtractor::compile(question_schema()).unwrap();
    let page = Page::new("http://site/question/1_2", QUESTION_HTML);

    let first = extractor.apply(&mut page.clone());
    let second = extractor.apply(&mut page.clone());

    assert!(first.is_some());
    assert_eq!(first, second);
}
