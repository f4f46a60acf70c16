//! Document metadata generated for the todos pages.
//!
//! Generators are pure: they take the live todo count and a canonical page
//! URL and never touch the network.

use serde::Serialize;

const LIST_KEYWORDS: &str = "todos, tasks, productivity";
const ADD_TITLE: &str = "Add Todo";
const ADD_DESCRIPTION: &str = "Create a new todo item.";
const ADD_KEYWORDS: &str = "add todo, create task";

/// One `<meta>` tag. Serializes as `{name, content}` or `{property, content}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MetaElement {
    Name { name: String, content: String },
    Property { property: String, content: String },
}

impl MetaElement {
    pub fn name(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Name {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn property(property: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Property {
            property: property.into(),
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            MetaElement::Name { content, .. } | MetaElement::Property { content, .. } => content,
        }
    }

    /// Attribute pair used when rendering the tag: `("name", ..)` or `("property", ..)`.
    pub fn attribute(&self) -> (&'static str, &str) {
        match self {
            MetaElement::Name { name, .. } => ("name", name),
            MetaElement::Property { property, .. } => ("property", property),
        }
    }
}

/// The `title` entry, if present.
pub fn document_title(elements: &[MetaElement]) -> Option<&str> {
    elements.iter().find_map(|element| match element {
        MetaElement::Name { name, content } if name == "title" => Some(content.as_str()),
        _ => None,
    })
}

pub fn todos_list_meta(count: usize, page_url: &str) -> Vec<MetaElement> {
    let title = format!("{count} Todos");
    let description = format!("Track {count} todos. Add, toggle and delete.");
    page_meta(&title, &description, LIST_KEYWORDS, page_url)
}

pub fn add_todo_meta(page_url: &str) -> Vec<MetaElement> {
    page_meta(ADD_TITLE, ADD_DESCRIPTION, ADD_KEYWORDS, page_url)
}

fn page_meta(title: &str, description: &str, keywords: &str, page_url: &str) -> Vec<MetaElement> {
    vec![
        MetaElement::name("title", title),
        MetaElement::name("description", description),
        MetaElement::name("keywords", keywords),
        MetaElement::property("og:title", title),
        MetaElement::property("og:description", description),
        MetaElement::property("og:type", "website"),
        MetaElement::property("og:url", page_url),
        MetaElement::name("twitter:card", "summary"),
        MetaElement::name("twitter:title", title),
        MetaElement::name("twitter:description", description),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_meta_reflects_count() {
        let meta = todos_list_meta(2, "https://example.com/todos");

        assert_eq!(meta[0], MetaElement::name("title", "2 Todos"));
        assert_eq!(
            meta[1].content(),
            "Track 2 todos. Add, toggle and delete."
        );
        assert!(meta.contains(&MetaElement::property("og:url", "https://example.com/todos")));
        assert!(meta.contains(&MetaElement::name("twitter:card", "summary")));
    }

    #[test]
    fn list_meta_with_zero_todos() {
        let meta = todos_list_meta(0, "https://example.com/todos");
        assert_eq!(document_title(&meta), Some("0 Todos"));
    }

    #[test]
    fn add_meta_is_static() {
        let meta = add_todo_meta("https://example.com/todos/add");
        assert_eq!(document_title(&meta), Some("Add Todo"));
        assert!(meta.contains(&MetaElement::name("keywords", "add todo, create task")));
        assert!(meta.contains(&MetaElement::property("og:type", "website")));
    }

    #[test]
    fn elements_serialize_untagged() {
        let json = serde_json::to_value(vec![
            MetaElement::name("title", "1 Todos"),
            MetaElement::property("og:type", "website"),
        ])
        .expect("serialize");

        assert_eq!(
            json,
            serde_json::json!([
                {"name": "title", "content": "1 Todos"},
                {"property": "og:type", "content": "website"}
            ])
        );
    }
}
