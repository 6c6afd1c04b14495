use std::path::PathBuf;
use actix_files::Files;

/// Serves stylesheets and the default avatar under `/static`.
pub fn static_files(dir: PathBuf) -> Files {
    Files::new("/static", dir)
}
