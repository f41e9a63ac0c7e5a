use sift_core::{AfterExtract, AppError, ExtractBy, ExtractByUrl, Field, Page, SchemaDefinition, UrlRule};

/// Question page with a list of answers, as served by the test site.
pub const QUESTION_HTML: &str = r#"
<html>
  <head><title>How do I share state between threads?</title></head>
  <body>
    <div class="question">
      <h1>How do I share state between threads?</h1>
      <img src="/u/1.png" title="alice">
    </div>
    <ul class="list">
      <li class="Answer"><div class="detail">Use Arc&lt;Mutex&lt;T&gt;&gt;.</div></li>
      <li class="Answer"><div class="detail">Or a channel.</div></li>
    </ul>
    <div class="pager"><a href="http://site/question/1_2?page=2">next</a></div>
  </body>
</html>
"#;

/// Record type mirroring a question page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Question {
    pub id: Option<String>,
    pub title: Option<String>,
    pub user: Option<String>,
    pub answers: Vec<String>,
    pub answer_count: usize,
}

impl AfterExtract for Question {
    fn after_extract(&mut self, _page: &Page) -> Result<(), AppError> {
        self.answer_count = self.answers.len();
        Ok(())
    }
}

pub fn question_schema() -> SchemaDefinition<Question> {
    SchemaDefinition::new("question")
        .target_url(UrlRule::new([r"http://site/question/\d+_\d+*"]))
        .help_url(UrlRule::new(["http://site/question/*"]).source_region("//div[@class='pager']"))
        .field(
            Field::text("id", |q: &mut Question, v| q.id = v)
                .extract_by_url(ExtractByUrl::new(r"question/(\d+)_").required()),
        )
        .field(
            Field::text("title", |q: &mut Question, v| q.title = v)
                .extract_by(ExtractBy::xpath("//h1/text()").required()),
        )
        .field(
            Field::text("user", |q: &mut Question, v| q.user = v)
                .extract_by(ExtractBy::xpath("//div[@class='question']/img/@title")),
        )
        .field(
            Field::list("answers", |q: &mut Question, v| q.answers = v)
                .extract_by(ExtractBy::xpath("//ul[@class='list']/li[@class='Answer']//div/allText()").multi()),
        )
        .after_extract()
}
