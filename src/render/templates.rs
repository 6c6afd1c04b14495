//! Page and element templates, compiled into the binary.

pub const INDEX: &str = include_str!("../../assets/templates/index.html");

pub const LOGGED_IN: &str = include_str!("../../assets/templates/element/top-bar/logged-in.html");
pub const LOGGED_OUT: &str = include_str!("../../assets/templates/element/top-bar/logged-out.html");
pub const ADMIN_TOOLS: &str = include_str!("../../assets/templates/element/admin-tools.html");
pub const MESSAGES: &str = include_str!("../../assets/templates/element/messages.html");
pub const BOOK: &str = include_str!("../../assets/templates/element/book.html");
pub const BOOK_ACTIONS: &str = include_str!("../../assets/templates/element/book-actions.html");
pub const COMMENT: &str = include_str!("../../assets/templates/element/comment.html");
pub const COMMENT_FORM: &str = include_str!("../../assets/templates/element/comment-form.html");
pub const MOST_READ: &str = include_str!("../../assets/templates/element/most-read.html");

pub const HOME: &str = include_str!("../../assets/templates/page/home.html");
pub const BOOK_PAGE: &str = include_str!("../../assets/templates/page/book.html");
pub const PROFILE: &str = include_str!("../../assets/templates/page/profile.html");
pub const TOPICS: &str = include_str!("../../assets/templates/page/topics.html");
pub const LOGIN: &str = include_str!("../../assets/templates/page/login.html");
pub const REGISTER: &str = include_str!("../../assets/templates/page/register.html");
pub const BOOK_FORM: &str = include_str!("../../assets/templates/page/book-form.html");
pub const UPDATE_USER: &str = include_str!("../../assets/templates/page/update-user.html");
pub const DELETE: &str = include_str!("../../assets/templates/page/delete.html");
pub const NOT_FOUND: &str = include_str!("../../assets/templates/page/404.html");
