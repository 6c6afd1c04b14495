use std::sync::Mutex;

use crate::data::{BookID, CommentID};
use crate::auth::UserSession;
use crate::db::DB;
use crate::error::{AppError, lock};
use crate::forms::{BookForm, FieldError, UserForm};
use crate::render::{attr, text, fill, fill_errors, render_page, templates};
use actix_web::web::{Data, Form, Path};
use actix_web::{get, post, HttpResponse};

use super::{deny, redirect};

const BOOK_FIELDS: [&str; 6] = ["topic", "name", "author", "year", "image", "description"];
const USER_FIELDS: [&str; 5] = ["avatar", "username", "name", "email", "bio"];

fn book_form_page(db: &DB, user: &UserSession, heading: &str, action: &str, form: &BookForm, errors: &[FieldError]) -> HttpResponse {
    render_page(db, Some(user), || {
        let topic_options = db.sorted_topics().into_iter()
            .map(|(_, topic)| format!("<option value=\"{}\">", attr(&topic.name)))
            .collect::<Vec<_>>().join("");
        let html = fill_errors(templates::BOOK_FORM, &BOOK_FIELDS, errors);
        fill(&html, &[
            ("heading", heading),
            ("action", attr(action).as_ref()),
            ("topic-options", topic_options.as_str()),
            ("topic", attr(&form.topic).as_ref()),
            ("name", attr(&form.name).as_ref()),
            ("author", attr(&form.author).as_ref()),
            ("year", attr(&form.year).as_ref()),
            ("image", attr(&form.image).as_ref()),
            ("description", text(&form.description).as_ref()),
        ])
    })
}

fn delete_page(db: &DB, user: &UserSession, action: &str, object: &str, cancel: &str) -> HttpResponse {
    render_page(db, Some(user), || {
        fill(templates::DELETE, &[
            ("action", attr(action).as_ref()),
            ("cancel", attr(cancel).as_ref()),
            ("object", text(object).as_ref()),
        ])
    })
}

fn user_form_page(db: &DB, user: &UserSession, form: &UserForm, errors: &[FieldError]) -> HttpResponse {
    render_page(db, Some(user), || {
        let html = fill_errors(templates::UPDATE_USER, &USER_FIELDS, errors);
        fill(&html, &[
            ("user-id", attr(&user.user.0).as_ref()),
            ("avatar", attr(&form.avatar).as_ref()),
            ("username", attr(&form.username).as_ref()),
            ("name", attr(&form.name).as_ref()),
            ("email", attr(&form.email).as_ref()),
            ("bio", text(&form.bio).as_ref()),
        ])
    })
}

#[get("/create-book/")]
pub async fn page_create_book(db: Data<Mutex<DB>>, user: UserSession) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    if !db.is_superuser(&user.user) {
        return Ok(deny(&user, "create-book"));
    }
    Ok(book_form_page(&db, &user, "Add a book", "/create-book/", &BookForm::default(), &[]))
}

#[post("/create-book/")]
pub async fn create_book(db: Data<Mutex<DB>>, user: UserSession, Form(input): Form<BookForm>) -> Result<HttpResponse, AppError> {
    let mut db = lock(&db)?;
    if !db.is_superuser(&user.user) {
        return Ok(deny(&user, "create-book"));
    }
    match input.validate() {
        Ok(draft) => {
            let id = db.create_new_book(&user.user, draft)?;
            tracing::info!(book = %id.0, user = %user.user.0, "book created");
            Ok(redirect("/", Some(&user)))
        },
        Err(errors) => Ok(book_form_page(&db, &user, "Add a book", "/create-book/", &input, &errors)),
    }
}

#[get("/update-book/{book_id}")]
pub async fn page_update_book(db: Data<Mutex<DB>>, user: UserSession, book_id: Path<String>) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    let book_id = BookID(book_id.into_inner());
    let Some(book) = db.get_book(&book_id) else {
        return Err(AppError::NotFound("book"));
    };
    if !db.is_superuser(&user.user) {
        return Ok(deny(&user, "update-book"));
    }
    let topic = db.get_topic(&book.topic).map_or("", |x| x.name.as_str());
    let form = BookForm::from_book(book, topic);
    Ok(book_form_page(&db, &user, "Edit book", format!("/update-book/{}", book_id.0).as_str(), &form, &[]))
}

#[post("/update-book/{book_id}")]
pub async fn update_book(db: Data<Mutex<DB>>, user: UserSession, book_id: Path<String>, Form(input): Form<BookForm>) -> Result<HttpResponse, AppError> {
    let mut db = lock(&db)?;
    let book_id = BookID(book_id.into_inner());
    if db.get_book(&book_id).is_none() {
        return Err(AppError::NotFound("book"));
    }
    if !db.is_superuser(&user.user) {
        return Ok(deny(&user, "update-book"));
    }
    match input.validate() {
        Ok(draft) => {
            db.update_book(&book_id, draft)?;
            tracing::info!(book = %book_id.0, user = %user.user.0, "book updated");
            Ok(redirect("/", Some(&user)))
        },
        Err(errors) => Ok(book_form_page(&db, &user, "Edit book", format!("/update-book/{}", book_id.0).as_str(), &input, &errors)),
    }
}

#[get("/delete-book/{book_id}")]
pub async fn page_delete_book(db: Data<Mutex<DB>>, user: UserSession, book_id: Path<String>) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    let book_id = BookID(book_id.into_inner());
    let Some(book) = db.get_book(&book_id) else {
        return Err(AppError::NotFound("book"));
    };
    if !db.is_superuser(&user.user) {
        return Ok(deny(&user, "delete-book"));
    }
    let action = format!("/delete-book/{}", book_id.0);
    let cancel = format!("/books/{}/", book_id.0);
    Ok(delete_page(&db, &user, action.as_str(), book.name.as_str(), cancel.as_str()))
}

#[post("/delete-book/{book_id}")]
pub async fn delete_book(db: Data<Mutex<DB>>, user: UserSession, book_id: Path<String>) -> Result<HttpResponse, AppError> {
    let mut db = lock(&db)?;
    let book_id = BookID(book_id.into_inner());
    if db.get_book(&book_id).is_none() {
        return Err(AppError::NotFound("book"));
    }
    if !db.is_superuser(&user.user) {
        return Ok(deny(&user, "delete-book"));
    }
    db.delete_book(&book_id)?;
    tracing::info!(book = %book_id.0, user = %user.user.0, "book deleted");
    Ok(redirect("/", Some(&user)))
}

#[get("/delete-comment/{comment_id}")]
pub async fn page_delete_comment(db: Data<Mutex<DB>>, user: UserSession, comment_id: Path<String>) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    let comment_id = CommentID(comment_id.into_inner());
    let Some(comment) = db.get_comment(&comment_id) else {
        return Err(AppError::NotFound("comment"));
    };
    if comment.user != user.user {
        return Ok(deny(&user, "delete-comment"));
    }
    let action = format!("/delete-comment/{}", comment_id.0);
    let cancel = format!("/books/{}/", comment.book.0);
    Ok(delete_page(&db, &user, action.as_str(), comment.summary().as_str(), cancel.as_str()))
}

#[post("/delete-comment/{comment_id}")]
pub async fn delete_comment(db: Data<Mutex<DB>>, user: UserSession, comment_id: Path<String>) -> Result<HttpResponse, AppError> {
    let mut db = lock(&db)?;
    let comment_id = CommentID(comment_id.into_inner());
    let Some(comment) = db.get_comment(&comment_id) else {
        return Err(AppError::NotFound("comment"));
    };
    if comment.user != user.user {
        return Ok(deny(&user, "delete-comment"));
    }
    let book = comment.book.clone();
    db.delete_comment(&comment_id)?;
    tracing::info!(comment = %comment_id.0, book = %book.0, user = %user.user.0, "comment deleted");
    Ok(redirect(format!("/books/{}/", book.0), Some(&user)))
}

/// The path id is ignored: users only ever edit their own profile.
#[get("/update-user/{user_id}")]
pub async fn page_update_user(db: Data<Mutex<DB>>, user: UserSession, _user_id: Path<String>) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    let Some(current) = db.get_user(&user.user) else {
        return Err(AppError::NotFound("user"));
    };
    Ok(user_form_page(&db, &user, &UserForm::from_user(current), &[]))
}

#[post("/update-user/{user_id}")]
pub async fn update_user(db: Data<Mutex<DB>>, user: UserSession, _user_id: Path<String>, Form(input): Form<UserForm>) -> Result<HttpResponse, AppError> {
    let mut db = lock(&db)?;
    let Some(current) = db.get_user(&user.user) else {
        return Err(AppError::NotFound("user"));
    };
    match input.validate(&db, &user.user, current) {
        Ok(updated) => {
            db.update_user(&user.user, updated)?;
            tracing::info!(user = %user.user.0, "profile updated");
            Ok(redirect(format!("/profile/{}/", user.user.0), Some(&user)))
        },
        Err(errors) => Ok(user_form_page(&db, &user, &input, &errors)),
    }
}
