//! Canonical JSON dump/restore of a [`perigen_db::Database`].
//!
//! The JSON form is a round-trippable projection: emitting and reloading a
//! database yields one with identical attributes and edges, modulo the
//! allocator handing out fresh ids on reload. Maps are emitted in insertion
//! order (`serde_json`'s `preserve_order` feature) and only carry attributes
//! that were actually set — there are no `null`s in the output.

mod emit;
mod error;
mod load;

pub use error::CodecError;

use perigen_db::Database;
use serde_json::Value;

/// The schema version written to every JSON document's `version` field.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Projects `db` into its canonical JSON form.
pub fn emit_json(db: &Database) -> Value {
    emit::emit(db)
}

/// Projects `db` into its canonical JSON form and renders it as a string.
///
/// # Errors
/// Returns an error only if `serde_json` itself fails to serialize, which
/// does not happen for the `Value` trees this crate builds.
pub fn emit_json_string(db: &Database, pretty: bool) -> Result<String, CodecError> {
    let value = emit_json(db);
    if pretty {
        Ok(serde_json::to_string_pretty(&value)?)
    } else {
        Ok(serde_json::to_string(&value)?)
    }
}

/// Rebuilds a [`Database`] from its canonical JSON form.
pub fn load_json(value: &Value) -> Result<Database, CodecError> {
    load::load(value)
}

/// Parses `text` as JSON and rebuilds a [`Database`] from it.
pub fn load_json_str(text: &str) -> Result<Database, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    load_json(&value)
}
