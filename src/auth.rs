use std::{collections::HashMap, io, sync::Mutex, pin::Pin, future::Future};

use actix_web::{cookie, FromRequest, HttpRequest, HttpResponse, dev::Payload, ResponseError, http::{StatusCode, header::LOCATION}, HttpResponseBuilder, cookie::{Cookie, SameSite}, web::Data};
use chrono::{NaiveDateTime, Local, Duration};
use sha2::{Sha256, Digest};
use rand::distributions::{Alphanumeric, DistString};

use crate::{db::DB, data::UserID, forms::{FieldError, RegisterForm}};

pub const SESSION_COOKIE: &str = "session-id";

pub struct Auth {
    sessions: HashMap<SessionID, (UserID, NaiveDateTime)>,
    max_age: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionID(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordStore {
    pub salt: String,
    pub hashed: String,
}

#[derive(thiserror::Error, Debug)]
pub enum LoginError {
    #[error("User does not exist.")]
    UserDoesNotExist,
    #[error("Password is incorrect.")]
    PasswordIncorrect,
    #[error(transparent)]
    Store(#[from] io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum SignupError {
    #[error("An Error Occurred")]
    Invalid(Vec<FieldError>),
    #[error(transparent)]
    Store(#[from] io::Error),
}

impl Auth {
    pub fn init(max_age: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            max_age,
        }
    }

    fn hash(password: &str, salt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.update(salt.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Inactivity window after which a session expires.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn secure_password(password: &str) -> PasswordStore {
        let salt = Alphanumeric.sample_string(&mut rand::thread_rng(), 16);
        let hashed = Self::hash(password, salt.as_str());
        PasswordStore { salt, hashed }
    }

    pub fn match_password(store: &PasswordStore, password: &str) -> bool {
        Self::hash(password, store.salt.as_str()) == store.hashed
    }

    fn gen_session_id(&self) -> SessionID {
        loop {
            let id = SessionID(Alphanumeric.sample_string(&mut rand::thread_rng(), 128));
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }

    fn create_session(&mut self, user: UserID) -> SessionID {
        let session_id = self.gen_session_id();
        self.sessions.insert(session_id.clone(), (user, Local::now().naive_local()));
        session_id
    }

    /// Validates the form, creates the account and logs it in.
    pub fn signup(&mut self, form: &RegisterForm, db: &mut DB) -> Result<(UserID, SessionID), SignupError> {
        let (user, password) = form.validate(db).map_err(SignupError::Invalid)?;
        let username = user.username.clone();
        let password_store = Self::secure_password(password.as_str());
        let id = db.create_new_user(user, &password_store)?;
        tracing::info!(user = %id.0, username = %username, "user registered");
        Ok((id.clone(), self.create_session(id)))
    }

    pub fn login(&mut self, email: &str, password: &str, db: &DB) -> Result<(UserID, SessionID), LoginError> {
        let email = email.trim().to_lowercase();
        let Some((id, _)) = db.find_user_by_email(email.as_str()) else {
            tracing::info!(email = %email, "login for unknown email");
            return Err(LoginError::UserDoesNotExist);
        };
        let id = id.clone();
        match db.load_user_auth(&id)? {
            Some(store) if Self::match_password(&store, password) => {
                self.delete_expired_sessions();
                tracing::info!(user = %id.0, "user logged in");
                Ok((id.clone(), self.create_session(id)))
            },
            _ => {
                tracing::info!(user = %id.0, "login with wrong password");
                Err(LoginError::PasswordIncorrect)
            },
        }
    }

    pub fn logout(&mut self, user: UserSession) {
        self.sessions.remove(&user.session_id);
        tracing::info!(user = %user.user.0, "user logged out");
    }

    /// Looks up a live session and marks it as used now.
    pub fn get_user_for_session_id(&mut self, session_id: &SessionID) -> Option<UserID> {
        let now = Local::now().naive_local();
        let max_age = self.max_age;
        let (user, last_use) = self.sessions.get_mut(session_id)?;
        if now.signed_duration_since(*last_use) > max_age {
            self.sessions.remove(session_id);
            return None;
        }
        *last_use = now;
        Some(user.clone())
    }

    pub fn delete_sessions_older_than(&mut self, age: &Duration) {
        let now = Local::now().naive_local();
        self.sessions.retain(|_, (_, last_use)| now.signed_duration_since(*last_use) <= *age)
    }

    fn delete_expired_sessions(&mut self) {
        let max_age = self.max_age;
        self.delete_sessions_older_than(&max_age)
    }
}

/// The logged-in user of the current request.
pub struct UserSession {
    pub user: UserID,
    pub session_id: SessionID,
    pub max_age: Duration,
}

impl UserSession {
    pub fn keep<'a>(&self, response: &'a mut HttpResponseBuilder) -> &'a mut HttpResponseBuilder {
        response.cookie(build_session_cookie(&self.session_id, self.max_age))
    }
}

/// The browser keeps the cookie for the same window the server keeps the session.
pub fn build_session_cookie(session_id: &SessionID, max_age: Duration) -> Cookie<'_> {
    Cookie::build(SESSION_COOKIE, session_id.0.as_str())
        .path("/")
        //.secure(true) <-- only works with https
        .same_site(SameSite::Strict)
        .http_only(true)
        .max_age(cookie::time::Duration::seconds(max_age.num_seconds()))
        .finish()
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}

#[derive(thiserror::Error, Debug)]
pub enum SessionRequestError {
    #[error("No Session")]
    NoSession,
}

impl ResponseError for SessionRequestError {
    fn status_code(&self) -> StatusCode {
        StatusCode::SEE_OTHER
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::SEE_OTHER)
            .append_header((LOCATION, "/login/"))
            .finish()
    }
}

fn session_from_request(req: &HttpRequest) -> Option<UserSession> {
    let auth = req.app_data::<Data<Mutex<Auth>>>()?;
    let session_id = SessionID(req.cookie(SESSION_COOKIE)?.value().to_string());
    let mut auth = auth.lock().ok()?;
    let max_age = auth.max_age();
    auth.get_user_for_session_id(&session_id)
        .map(|user| UserSession { user, session_id, max_age })
}

impl FromRequest for UserSession {
    type Error = SessionRequestError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = session_from_request(req);
        Box::pin(async move {
            session.ok_or(SessionRequestError::NoSession)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::Store;

    fn register_form(username: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            name: "Reader".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password1: password.to_string(),
            password2: password.to_string(),
        }
    }

    #[test]
    fn hashes_are_salted() {
        let a = Auth::secure_password("correct horse");
        let b = Auth::secure_password("correct horse");
        assert_ne!(a.hashed, b.hashed);
        assert!(Auth::match_password(&a, "correct horse"));
        assert!(!Auth::match_password(&a, "battery staple"));
    }

    #[test]
    fn signup_then_login_with_the_same_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let mut auth = Auth::init(Duration::days(30));

        let (id, _) = auth.signup(&register_form("Reader", "Reader@Example.com", "long-password"), &mut db).unwrap();
        assert_eq!(db.get_user(&id).unwrap().username, "reader");

        let (logged_in, session) = auth.login("READER@example.com", "long-password", &db).unwrap();
        assert_eq!(logged_in, id);
        assert_eq!(auth.get_user_for_session_id(&session), Some(id));
    }

    #[test]
    fn login_errors_name_the_problem() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let mut auth = Auth::init(Duration::days(30));
        auth.signup(&register_form("reader", "reader@example.com", "long-password"), &mut db).unwrap();

        let missing = auth.login("nobody@example.com", "long-password", &db).unwrap_err();
        assert_eq!(missing.to_string(), "User does not exist.");
        let wrong = auth.login("reader@example.com", "short", &db).unwrap_err();
        assert_eq!(wrong.to_string(), "Password is incorrect.");
    }

    #[test]
    fn invalid_signup_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = DB::open(Store::new(dir.path())).unwrap();
        let mut auth = Auth::init(Duration::days(30));
        let mut form = register_form("reader", "reader@example.com", "long-password");
        form.password2 = "different-password".to_string();

        let error = auth.signup(&form, &mut db).unwrap_err();
        assert_eq!(error.to_string(), "An Error Occurred");
        assert!(db.find_user_by_email("reader@example.com").is_none());
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let mut auth = Auth::init(Duration::days(30));
        let user = UserID("someone".to_string());
        let fresh = auth.create_session(user.clone());
        let stale = auth.create_session(user.clone());
        auth.sessions.get_mut(&stale).unwrap().1 = Local::now().naive_local() - Duration::days(31);

        assert_eq!(auth.get_user_for_session_id(&stale), None);
        assert!(!auth.sessions.contains_key(&stale));
        assert_eq!(auth.get_user_for_session_id(&fresh), Some(user));
    }

    #[test]
    fn session_cookie_follows_the_configured_max_age() {
        let session = SessionID("abc".to_string());
        let cookie = build_session_cookie(&session, Duration::days(7));
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::days(7)));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn pruning_keeps_recent_sessions() {
        let mut auth = Auth::init(Duration::days(30));
        let user = UserID("someone".to_string());
        let fresh = auth.create_session(user.clone());
        let stale = auth.create_session(user);
        auth.sessions.get_mut(&stale).unwrap().1 = Local::now().naive_local() - Duration::days(2);

        auth.delete_sessions_older_than(&Duration::days(1));
        assert!(auth.sessions.contains_key(&fresh));
        assert!(!auth.sessions.contains_key(&stale));
    }
}
