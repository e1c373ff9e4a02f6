use thiserror::Error;

/// Errors raised while loading a vendor document into a database.
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The root device element was missing a mandatory identity attribute
    /// (name, architecture). Structural: the whole document is rejected.
    #[error("root device is missing mandatory identity: {0}")]
    MissingRootIdentity(String),

    /// The requested dialect is recognized but not yet implemented.
    #[error("dialect {0} is not yet supported")]
    UnsupportedDialect(String),

    /// The document did not parse as well-formed XML in the selected
    /// dialect's shape.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// The database rejected an edge or attribute while the document was
    /// being built, or `assert_valid` failed after loading completed.
    #[error(transparent)]
    Db(#[from] perigen_db::DbError),
}
