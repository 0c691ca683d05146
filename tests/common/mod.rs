//! Shared fixtures for the integration tests
#![allow(dead_code)]

use admin::prelude::*;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Option<i64>,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub published: bool,
    pub author_id: Option<i64>,
    pub views: i64,
}

impl Article {
    pub fn new(id: i64, title: &str, published: bool) -> Self {
        Self {
            id: Some(id),
            title: title.to_string(),
            slug: format!("{title}-post"),
            body: String::new(),
            published,
            author_id: None,
            views: id * 10,
        }
    }
}

impl Resource for Article {
    const SLUGGED: bool = true;

    fn resource_name() -> &'static str {
        "articles"
    }

    fn resource_name_singular() -> &'static str {
        "article"
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn slug(&self) -> Option<&str> {
        Some(self.slug.as_str()).filter(|s| !s.is_empty())
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.check(
            "title",
            &FieldValue::String(self.title.clone()),
            validators::required(),
        );
        errors
    }
}

pub fn article_descriptor_builder() -> admin::core::ResourceDescriptorBuilder<Article> {
    ResourceDescriptor::builder()
        .attrs_for_index(&["title", "published"])
        .attrs_for_show(&["title", "body", "published", "author"])
        .attrs_for_form(&["title", "body", "published", "author"])
        .attrs_for_export(&["id", "title", "published"])
        .belongs_to("author", "author_id")
        .filter("title", FieldType::String, FilterKind::Exact)
        .filter("views", FieldType::Integer, FilterKind::Range)
        .filter("published", FieldType::Boolean, FilterKind::Exact)
        .orderable(&["title", "views"])
        .scope("published", |a: &Article| a.published)
        .scope("drafts", |a: &Article| !a.published)
        .batch_action("destroy", DestroyAll)
        .batch_action_decl(
            BatchActionDecl::new("publish", UpdateAll::set("published", true)).except(&["published"]),
        )
}

pub fn article_descriptor() -> ResourceDescriptor<Article> {
    article_descriptor_builder().build().unwrap()
}

/// foo (1, draft), bar (2, draft), baz (3, published)
pub fn scenario_articles() -> Vec<Article> {
    vec![
        Article::new(1, "foo", false),
        Article::new(2, "bar", false),
        Article::new(3, "baz", true),
    ]
}

pub fn scenario_store() -> InMemoryStore<Article> {
    InMemoryStore::seeded(scenario_articles())
}

pub fn ids(articles: &[Article]) -> Vec<i64> {
    articles.iter().filter_map(|a| a.id).collect()
}

pub fn titles(articles: &[Article]) -> Vec<&str> {
    articles.iter().map(|a| a.title.as_str()).collect()
}
