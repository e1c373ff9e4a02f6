use thiserror::Error;

/// Errors raised before generation can start. Per-peripheral failures during
/// generation are caught, logged, and skipped rather than surfaced here.
#[derive(Error, Debug)]
pub enum GeneratorError {
    #[error(transparent)]
    Db(#[from] perigen_db::DbError),
}
