use std::{path::PathBuf, sync::Mutex};

use actix_web::{web::{self, Data}, HttpResponse, Responder, Either, http::{Method, StatusCode, header::LOCATION}};

use crate::{auth::{Auth, UserSession}, db::DB, error::{AppError, lock}, render::{render_page, templates}};

mod auth;
mod interact;
mod page;
mod resources;


pub use auth::*;
pub use interact::*;
pub use page::*;
pub use resources::*;

/// Registers every route and the shared state on an app or test service.
pub fn configure(cfg: &mut web::ServiceConfig, auth: Data<Mutex<Auth>>, db: Data<Mutex<DB>>, static_dir: PathBuf) {
    cfg
        .app_data(auth)
        .app_data(db)

        .service(page_login)
        .service(auth_login)
        .service(auth_logout_get)
        .service(auth_logout_post)
        .service(page_register)
        .service(auth_register)

        .service(page_home)
        .service(page_book)
        .service(make_comment)
        .service(page_profile)
        .service(page_topics)

        .service(page_create_book)
        .service(create_book)
        .service(page_update_book)
        .service(update_book)
        .service(page_delete_book)
        .service(delete_book)
        .service(page_delete_comment)
        .service(delete_comment)
        .service(page_update_user)
        .service(update_user)

        .service(static_files(static_dir))
        .default_service(web::to(default_handler));
}

pub(crate) fn redirect(to: impl Into<String>, session: Option<&UserSession>) -> HttpResponse {
    let mut builder = HttpResponse::build(StatusCode::SEE_OTHER);
    builder.append_header((LOCATION, to.into()));
    if let Some(session) = session {
        session.keep(&mut builder);
    }
    builder.finish()
}

/// Silent redirect home used when a logged-in user lacks the right to act.
pub(crate) fn deny(session: &UserSession, action: &'static str) -> HttpResponse {
    tracing::info!(user = %session.user.0, action, "permission denied");
    redirect("/", Some(session))
}

async fn default_handler(req: Method, db: Data<Mutex<DB>>, user: Option<UserSession>) -> Result<impl Responder, AppError> {
    match req {
        Method::GET => {
            let db = lock(&db)?;
            let response = render_page(&db, user.as_ref(), || templates::NOT_FOUND.to_string())
                .customize()
                .with_status(StatusCode::NOT_FOUND);
            Ok(Either::Left(response))
        }
        _ => Ok(Either::Right(HttpResponse::MethodNotAllowed().finish())),
    }
}
