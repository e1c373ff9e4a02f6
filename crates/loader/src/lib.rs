//! Multi-dialect ingestion: SVD and ATDF documents, and a DSLite stub, all
//! sharing the same target database model. Each dialect module owns its
//! own element shape; the naming, inlining, mode-resolution, and
//! discontiguous-mask rules are shared only in the sense that every loader
//! implements them the same way, not through shared code (the dialects do
//! not share an input shape worth abstracting over).

mod atdf;
mod dslite;
mod error;
mod numeric;
pub mod revision;
mod svd;

pub use error::LoaderError;

use perigen_db::Database;

/// The vendor dialect a document is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Svd,
    Atdf,
    Dslite,
}

impl Dialect {
    /// Guesses a dialect from a file extension, as the CLI does when
    /// `--schema` is not given.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "svd" => Some(Dialect::Svd),
            "atdf" => Some(Dialect::Atdf),
            "dslite" => Some(Dialect::Dslite),
            _ => None,
        }
    }
}

/// Loads `document` (already-decoded XML text) as `dialect` into a fresh
/// [`Database`].
pub fn load(dialect: Dialect, document: &str) -> Result<Database, LoaderError> {
    match dialect {
        Dialect::Svd => svd::load(document),
        Dialect::Atdf => atdf::load(document),
        Dialect::Dslite => dslite::load(document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_guessing_is_case_insensitive() {
        assert_eq!(Dialect::from_extension("SVD"), Some(Dialect::Svd));
        assert_eq!(Dialect::from_extension("atdf"), Some(Dialect::Atdf));
        assert_eq!(Dialect::from_extension("txt"), None);
    }
}
