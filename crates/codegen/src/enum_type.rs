use perigen_db::{Database, EntityId, Kind};

/// Renders `enum(u<size>) { NAME = 0x.., ... }`, appending a non-exhaustive
/// `_` sentinel when the declared values don't cover the full `2^size`
/// range.
pub(crate) fn render_enum_body(db: &Database, id: EntityId) -> String {
    let size = db.size(id).unwrap_or(0);
    let fields: Vec<EntityId> = db.children(id, Kind::TypeEnumField).collect();
    let mut parts: Vec<String> = fields
        .iter()
        .map(|field| {
            let name = db.name(*field).unwrap_or("UNKNOWN");
            let value = db.enum_field_value(*field).unwrap_or(0);
            format!("{name} = {value:#x}")
        })
        .collect();

    let capacity = 1u64.checked_shl(size as u32).unwrap_or(u64::MAX);
    if (fields.len() as u64) < capacity {
        parts.push("_".to_string());
    }
    format!("enum(u{size}) {{ {} }}", parts.join(", "))
}

/// Renders a named enum as a standalone top-level member: `Name = enum(...)`.
pub(crate) fn render_named_enum(db: &Database, id: EntityId) -> Option<String> {
    let name = db.name(id)?;
    Some(format!("{name} = {}", render_enum_body(db, id)))
}
