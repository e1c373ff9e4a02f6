use thiserror::Error;

/// Errors raised while dumping or restoring the canonical JSON form.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The JSON text itself did not parse, or `serde_json` failed to render
    /// a value this crate built (the latter should not happen in practice).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The database rejected an edge or attribute the codec tried to build
    /// while reloading a document.
    #[error("database error while restoring: {0}")]
    Db(#[from] perigen_db::DbError),

    /// The document's shape did not match the canonical schema.
    #[error("malformed document: {0}")]
    Malformed(String),
}
