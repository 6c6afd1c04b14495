use std::sync::Mutex;

use crate::{auth::{Auth, SessionID, UserSession, LoginError, SignupError, build_session_cookie, removal_cookie}, db::DB, error::{AppError, lock}, forms::{FieldError, LoginForm, RegisterForm}, render::{attr, fill, fill_errors, render_page_with_messages, templates}};
use actix_web::{get, post, web::{Form, Data}, HttpResponse, http::{StatusCode, header::LOCATION}};

use super::redirect;

const REGISTER_FIELDS: [&str; 5] = ["name", "username", "email", "password1", "password2"];

fn login_page(db: &DB, email: &str, messages: &[String]) -> HttpResponse {
    render_page_with_messages(db, None, messages, || {
        fill(templates::LOGIN, &[("email", attr(email).as_ref())])
    })
}

fn register_page(db: &DB, form: &RegisterForm, errors: &[FieldError], messages: &[String]) -> HttpResponse {
    render_page_with_messages(db, None, messages, || {
        let html = fill_errors(templates::REGISTER, &REGISTER_FIELDS, errors);
        fill(&html, &[
            ("name", attr(&form.name).as_ref()),
            ("username", attr(&form.username).as_ref()),
            ("email", attr(&form.email).as_ref()),
        ])
    })
}

fn logged_in(auth: &Auth, session_id: &SessionID) -> HttpResponse {
    HttpResponse::build(StatusCode::SEE_OTHER)
        .append_header((LOCATION, "/"))
        .cookie(build_session_cookie(session_id, auth.max_age()))
        .finish()
}

#[get("/login/")]
pub async fn page_login(db: Data<Mutex<DB>>, user: Option<UserSession>) -> Result<HttpResponse, AppError> {
    if user.is_some() {
        return Ok(redirect("/", user.as_ref()));
    }
    let db = lock(&db)?;
    Ok(login_page(&db, "", &[]))
}

#[post("/login/")]
pub async fn auth_login(auth: Data<Mutex<Auth>>, db: Data<Mutex<DB>>, user: Option<UserSession>, Form(form): Form<LoginForm>) -> Result<HttpResponse, AppError> {
    if user.is_some() {
        return Ok(redirect("/", user.as_ref()));
    }
    let mut auth = lock(&auth)?;
    let db = lock(&db)?;
    match auth.login(form.email.as_str(), form.password.as_str(), &db) {
        Ok((_, session_id)) => Ok(logged_in(&auth, &session_id)),
        Err(LoginError::Store(e)) => Err(e.into()),
        Err(e) => Ok(login_page(&db, form.email.as_str(), &[e.to_string()])),
    }
}

#[get("/logout/")]
pub async fn auth_logout_get(auth: Data<Mutex<Auth>>, user: Option<UserSession>) -> Result<HttpResponse, AppError> {
    logout(&auth, user)
}

#[post("/logout/")]
pub async fn auth_logout_post(auth: Data<Mutex<Auth>>, user: Option<UserSession>) -> Result<HttpResponse, AppError> {
    logout(&auth, user)
}

fn logout(auth: &Mutex<Auth>, user: Option<UserSession>) -> Result<HttpResponse, AppError> {
    if let Some(user) = user {
        lock(auth)?.logout(user);
    }
    Ok(HttpResponse::build(StatusCode::SEE_OTHER)
        .append_header((LOCATION, "/"))
        .cookie(removal_cookie())
        .finish())
}

#[get("/register/")]
pub async fn page_register(db: Data<Mutex<DB>>) -> Result<HttpResponse, AppError> {
    let db = lock(&db)?;
    Ok(register_page(&db, &RegisterForm::default(), &[], &[]))
}

#[post("/register/")]
pub async fn auth_register(auth: Data<Mutex<Auth>>, db: Data<Mutex<DB>>, Form(form): Form<RegisterForm>) -> Result<HttpResponse, AppError> {
    let mut auth = lock(&auth)?;
    let mut db = lock(&db)?;
    match auth.signup(&form, &mut db) {
        Ok((_, session_id)) => Ok(logged_in(&auth, &session_id)),
        Err(ref error @ SignupError::Invalid(ref errors)) => {
            tracing::info!(username = %form.username, errors = errors.len(), "registration rejected");
            Ok(register_page(&db, &form, errors, &[error.to_string()]))
        },
        Err(SignupError::Store(e)) => Err(e.into()),
    }
}
