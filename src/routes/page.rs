use std::sync::Mutex;
use actix_web::{get, post, HttpResponse, web::{Data, Form, Path, Query}};
use serde::Deserialize;
use crate::{db::DB, error::{AppError, lock}, forms::CommentForm, render::{attr, text, fill, search_query, render_page, render_books, render_comment, render_most_read, render_topic_list, sanitize_comment, templates}, auth::UserSession, data::{BookID, UserID}};

use super::redirect;

#[derive(Debug, Deserialize)]
pub struct Search {
    #[serde(default)]
    q: String,
}

#[get("/")]
pub async fn page_home(db: Data<Mutex<DB>>, user: Option<UserSession>, query: Query<Search>) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    let books = db.search_books(query.q.as_str());
    let counts = db.topic_book_counts();
    Ok(render_page(&db, user.as_ref(), || {
        let authors = db.distinct_authors().into_iter()
            .map(|author| format!("<li><a href=\"/?{}\">{}</a></li>", attr(&search_query(author)), text(author)))
            .collect::<Vec<_>>().join("");
        fill(templates::HOME, &[
            ("total-count", db.sorted_books().len().to_string().as_str()),
            ("book-count", books.len().to_string().as_str()),
            ("topics", render_topic_list(&db, Some(&counts)).as_str()),
            ("authors", authors.as_str()),
            ("books", render_books(&db, &books).as_str()),
        ])
    }))
}

#[get("/books/{book_id}/")]
pub async fn page_book(db: Data<Mutex<DB>>, user: Option<UserSession>, book_id: Path<String>) -> Result<HttpResponse, AppError> {
    let mut db = lock(&db)?;
    let book_id = BookID(book_id.into_inner());
    if db.get_book(&book_id).is_none() {
        return Err(AppError::NotFound("book"));
    }
    if let Some(user) = &user {
        if db.add_participant(&book_id, &user.user)? {
            tracing::debug!(book = %book_id.0, user = %user.user.0, "participant added");
        }
    }
    let db = &*db;
    let Some(book) = db.get_book(&book_id) else {
        return Err(AppError::NotFound("book"));
    };
    let viewer = user.as_ref().map(|x| &x.user);
    Ok(render_page(db, user.as_ref(), || {
        let topic = db.get_topic(&book.topic).map_or("", |x| x.name.as_str());
        let host = db.get_user(&book.host).map_or("[user not found]", |x| x.username.as_str());
        let comments = db.comments_for_book(&book_id).into_iter()
            .map(|(id, comment)| render_comment(db, templates::COMMENT, id, comment, viewer))
            .collect::<Vec<_>>().join("");
        let participants = book.participants.iter()
            .filter_map(|id| db.get_user(id).map(|u| (id, u)))
            .map(|(id, u)| format!("<li><a href=\"/profile/{}/\">@{}</a></li>", attr(&id.0), text(&u.username)))
            .collect::<Vec<_>>().join("");
        let book_actions = match viewer {
            Some(viewer) if db.is_superuser(viewer) => fill(templates::BOOK_ACTIONS, &[("book-id", attr(&book_id.0).as_ref())]),
            _ => String::new(),
        };
        let comment_form = match viewer {
            Some(_) => fill(templates::COMMENT_FORM, &[("book-id", attr(&book_id.0).as_ref())]),
            None => "<p><a href=\"/login/\">Login</a> to join the conversation.</p>".to_string(),
        };
        fill(templates::BOOK_PAGE, &[
            ("image", attr(&book.image).as_ref()),
            ("topic-query", attr(&search_query(topic)).as_ref()),
            ("host-id", attr(&book.host.0).as_ref()),
            ("readers", book.readers().to_string().as_str()),
            ("year", book.year.map(|x| x.to_string()).unwrap_or_default().as_str()),
            ("book-actions", book_actions.as_str()),
            ("most-read", render_most_read(db).as_str()),
            ("participants", participants.as_str()),
            ("comment-form", comment_form.as_str()),
            ("host", text(host).as_ref()),
            ("topic", text(topic).as_ref()),
            ("author", text(&book.author).as_ref()),
            ("name", text(&book.name).as_ref()),
            ("description", text(&book.description).as_ref()),
            ("comments", comments.as_str()),
        ])
    }))
}

#[post("/books/{book_id}/")]
pub async fn make_comment(db: Data<Mutex<DB>>, user: UserSession, book_id: Path<String>, Form(input): Form<CommentForm>) -> Result<HttpResponse, AppError> {
    let mut db = lock(&db)?;
    let book_id = BookID(book_id.into_inner());
    if db.get_book(&book_id).is_none() {
        return Err(AppError::NotFound("book"));
    }
    db.add_participant(&book_id, &user.user)?;
    if let Some(id) = db.try_comment(sanitize_comment(input.body.as_str()).as_str(), &book_id, &user.user)? {
        tracing::info!(book = %book_id.0, comment = %id.0, user = %user.user.0, "comment created");
    }
    Ok(redirect(format!("/books/{}/", book_id.0), Some(&user)))
}

#[get("/profile/{user_id}/")]
pub async fn page_profile(db: Data<Mutex<DB>>, current_user: Option<UserSession>, user_id: Path<String>) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    let user_id = UserID(user_id.into_inner());
    let Some(user) = db.get_user(&user_id) else {
        return Err(AppError::NotFound("user"));
    };
    Ok(render_page(&db, current_user.as_ref(), || {
        let books = db.books_for_participant(&user_id);
        let edit_link = match &current_user {
            Some(x) if x.user == user_id => format!("<a href=\"/update-user/{}\">Edit profile</a>", attr(&user_id.0)),
            _ => String::new(),
        };
        fill(templates::PROFILE, &[
            ("avatar", attr(&user.avatar).as_ref()),
            ("edit-link", edit_link.as_str()),
            ("most-read", render_most_read(&db).as_str()),
            ("name", text(user.display_name()).as_ref()),
            ("user-name", text(&user.username).as_ref()),
            ("bio", user.bio.as_str()),
            ("books", render_books(&db, &books).as_str()),
        ])
    }))
}

#[get("/topics/")]
pub async fn page_topics(db: Data<Mutex<DB>>, user: Option<UserSession>) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    Ok(render_page(&db, user.as_ref(), || {
        fill(templates::TOPICS, &[
            ("topics", render_topic_list(&db, None).as_str()),
            ("books", render_books(&db, &db.sorted_books()).as_str()),
        ])
    }))
}
