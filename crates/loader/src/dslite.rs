//! DSLite is reserved: the dialect selector is recognized so the CLI can
//! route to it, but ingestion is not yet implemented (open question (b)).

use perigen_db::Database;

use crate::LoaderError;

pub(crate) fn load(_xml: &str) -> Result<Database, LoaderError> {
    Err(LoaderError::UnsupportedDialect("dslite".to_string()))
}
