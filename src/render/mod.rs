use std::{borrow::Cow, collections::{HashMap, HashSet}, sync::OnceLock};

use actix_web::{HttpResponse, http::{header::ContentType, StatusCode}};
use ammonia::Builder;
use html_escape::{encode_text, encode_double_quoted_attribute};
use regex::Regex;

use crate::{db::{DB, sequence::MOST_READ_LIMIT}, data::{UserID, TopicID, BookID, Book, CommentID, Comment}, auth::UserSession, forms::FieldError};

use self::format::format_date_time;

mod format;
pub mod templates;

pub fn text(s: &str) -> Cow<'_, str> {
    encode_text(s)
}

pub fn attr(s: &str) -> Cow<'_, str> {
    encode_double_quoted_attribute(s)
}

/// `q=<term>` query string linking to the listing filtered by a search term.
pub fn search_query(term: &str) -> String {
    serde_urlencoded::to_string([("q", term)]).unwrap_or_default()
}

pub fn render_page<R>(db: &DB, user_session: Option<&UserSession>, render_content: R) -> HttpResponse
    where R: FnOnce() -> String {
    render_page_with_messages(db, user_session, &[], render_content)
}

pub fn render_page_with_messages<R>(db: &DB, user_session: Option<&UserSession>, messages: &[String], render_content: R) -> HttpResponse
    where R: FnOnce() -> String {
    let user = user_session.map(|x| &x.user);
    let admin_tools = match user {
        Some(user) if db.is_superuser(user) => templates::ADMIN_TOOLS,
        _ => "",
    };
    let session_area = match user.and_then(|id| db.get_user(id).map(|u| (id, u))) {
        Some((id, user)) => fill(templates::LOGGED_IN, &[
            ("current-user-id", attr(&id.0).as_ref()),
            ("current-user-avatar", attr(&user.avatar).as_ref()),
            ("current-user-name", text(&user.username).as_ref()),
        ]),
        None => templates::LOGGED_OUT.to_string(),
    };
    let html = fill(templates::INDEX, &[
        ("admin-tools", admin_tools),
        ("session-area", session_area.as_str()),
        ("messages", render_messages(messages).as_str()),
        ("content", render_content().as_str()),
    ]);
    let mut builder = HttpResponse::build(StatusCode::OK);
    builder.content_type(ContentType::html());
    if let Some(session) = user_session {
        session.keep(&mut builder);
    }
    builder.body(html)
}

/// Stand-alone 404 page for errors raised before a user or store is at hand.
pub fn render_not_found() -> String {
    fill(templates::INDEX, &[
        ("admin-tools", ""),
        ("session-area", templates::LOGGED_OUT),
        ("messages", ""),
        ("content", templates::NOT_FOUND),
    ])
}

fn render_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let items = messages.iter()
        .map(|x| format!("<li>{}</li>", text(x)))
        .collect::<Vec<_>>().join("");
    fill(templates::MESSAGES, &[("items", items.as_str())])
}

pub fn render_errors(errors: &[FieldError], field: &str) -> String {
    let items = errors.iter()
        .filter(|e| e.field == field)
        .map(|e| format!("<li>{}</li>", text(&e.message)))
        .collect::<Vec<_>>();
    if items.is_empty() {
        String::new()
    } else {
        format!("<ul class=\"errorlist\">{}</ul>", items.join(""))
    }
}

/// Replaces every `{{<field>-errors}}` placeholder, leaving empty ones blank.
/// Runs on the bare template, before any submitted value is filled in.
pub fn fill_errors(template: &str, fields: &[&str], errors: &[FieldError]) -> String {
    let rendered = fields.iter()
        .map(|field| (format!("{field}-errors"), render_errors(errors, field)))
        .collect::<Vec<_>>();
    let values = rendered.iter()
        .map(|(key, html)| (key.as_str(), html.as_str()))
        .collect::<Vec<_>>();
    fill(template, &values)
}

/// Substitutes `{{key}}` placeholders in a single pass.
/// Inserted values are never scanned again, so user text cannot expand into template.
/// Unknown placeholders are left untouched.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        match values.iter().find(|(key, _)| *key == &after[..end]) {
            Some((_, value)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            },
            None => {
                out.push_str("{{");
                rest = after;
            },
        }
    }
    out.push_str(rest);
    out
}

pub fn render_book(db: &DB, preloaded_html: &str, id: &BookID, book: &Book) -> String {
    let topic = db.get_topic(&book.topic).map_or("", |x| x.name.as_str());
    fill(preloaded_html, &[
        ("book-id", attr(&id.0).as_ref()),
        ("image", attr(&book.image).as_ref()),
        ("topic-query", attr(&search_query(topic)).as_ref()),
        ("readers", book.readers().to_string().as_str()),
        ("topic", text(topic).as_ref()),
        ("author", text(&book.author).as_ref()),
        ("name", text(&book.name).as_ref()),
    ])
}

pub fn render_books(db: &DB, books: &[(&BookID, &Book)]) -> String {
    if books.is_empty() {
        return "<p>No books here yet.</p>".to_string();
    }
    books.iter()
        .map(|(id, book)| render_book(db, templates::BOOK, id, book))
        .collect::<Vec<_>>().join("")
}

pub fn render_comment(db: &DB, preloaded_html: &str, id: &CommentID, comment: &Comment, viewer: Option<&UserID>) -> String {
    let user_name = db.get_user(&comment.user).map_or("[user not found]", |x| x.username.as_str());
    let delete = match viewer {
        Some(viewer) if viewer == &comment.user =>
            format!("<a href=\"/delete-comment/{}\">Delete</a>", attr(&id.0)),
        _ => String::new(),
    };
    fill(preloaded_html, &[
        ("user-id", attr(&comment.user.0).as_ref()),
        ("created-time", format_date_time(&comment.created).as_str()),
        ("delete", delete.as_str()),
        ("user-name", text(user_name).as_ref()),
        ("content", comment.body.as_str()),
    ])
}

pub fn render_most_read(db: &DB) -> String {
    let items = db.most_read(MOST_READ_LIMIT).into_iter()
        .map(|(id, book)| format!(
            "<li><a href=\"/books/{}/\">{}</a> <span>{} readers</span></li>",
            attr(&id.0), text(&book.name), book.readers(),
        ))
        .collect::<Vec<_>>().join("");
    fill(templates::MOST_READ, &[("items", items.as_str())])
}

pub fn render_topic_list(db: &DB, counts: Option<&HashMap<&TopicID, usize>>) -> String {
    db.sorted_topics().into_iter()
        .map(|(id, topic)| {
            let count = counts
                .map(|c| format!(" <span>{}</span>", c.get(id).copied().unwrap_or(0)))
                .unwrap_or_default();
            format!(
                "<li><a href=\"/?{}\">{}</a>{}</li>",
                attr(&search_query(&topic.name)), text(&topic.name), count,
            )
        })
        .collect::<Vec<_>>().join("")
}

/// Keeps a few inline tags and turns line breaks into `<br>`.
pub fn sanitize_comment(body: &str) -> String {
    static LINE_BREAK: OnceLock<Regex> = OnceLock::new();
    let content = Builder::new()
        .tags(HashSet::from(["b", "i", "em", "strong", "q", "u", "code", "var"]))
        .clean_content_tags(HashSet::from(["script", "style", "iframe"]))
        .clean(body)
        .to_string();
    let line_break = LINE_BREAK.get_or_init(|| Regex::new(" *\\r?\\n *").expect("valid line break pattern"));
    line_break.replace_all(content.trim(), "<br>").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_keep_inline_tags_only() {
        assert_eq!(sanitize_comment("<b>bold</b><script>x()</script>"), "<b>bold</b>");
        assert_eq!(sanitize_comment("one\n two\r\nthree"), "one<br>two<br>three");
        assert_eq!(sanitize_comment("<a href=\"x\">link</a>"), "link");
    }

    #[test]
    fn only_matching_field_errors_are_rendered() {
        let errors = vec![
            FieldError { field: "name", message: "This field is required.".to_string() },
            FieldError { field: "image", message: "<bad>".to_string() },
        ];
        assert_eq!(render_errors(&errors, "name"), "<ul class=\"errorlist\"><li>This field is required.</li></ul>");
        assert_eq!(render_errors(&errors, "image"), "<ul class=\"errorlist\"><li>&lt;bad&gt;</li></ul>");
        assert_eq!(render_errors(&errors, "year"), "");

        let html = fill_errors("{{name-errors}}|{{year-errors}}", &["name", "year"], &errors);
        assert_eq!(html, "<ul class=\"errorlist\"><li>This field is required.</li></ul>|");
    }

    #[test]
    fn filled_values_are_not_expanded_again() {
        let html = fill("<h2>{{name}}</h2>{{books}}", &[("name", "{{books}}"), ("books", "<ul></ul>")]);
        assert_eq!(html, "<h2>{{books}}</h2><ul></ul>");
    }

    #[test]
    fn unknown_and_unterminated_placeholders_are_kept() {
        assert_eq!(fill("{{a}} {{b}} {{c", &[("a", "1")]), "1 {{b}} {{c");
        assert_eq!(fill("{{{{a}}}}", &[("a", "x")]), "{{x}}");
    }

    #[test]
    fn search_queries_are_url_encoded() {
        assert_eq!(search_query("Sci-Fi & Fantasy"), "q=Sci-Fi+%26+Fantasy");
    }

    #[test]
    fn not_found_page_uses_the_layout() {
        let html = render_not_found();
        assert!(html.contains("Not found"));
        assert!(html.contains("/login/"));
        assert!(!html.contains("{{"));
    }
}
